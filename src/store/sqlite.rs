//! SQLite staging store backend

use super::schema::CollectionSchema;
use super::traits::{
    BulkItemError, BulkWriteResult, CollectionInfo, Hit, Record, RecordScan, RefreshPolicy,
    SearchRequest, StagingStore, StoreError, StoreResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Rows fetched per round trip while scanning
const SCAN_PAGE_SIZE: usize = 500;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed staging store
///
/// Every collection lives in one `documents` table, partitioned by
/// collection name. Documents are stored as JSON text alongside the
/// extracted lookup key so point queries hit an index.
///
/// Thread-safe via internal mutex on the connection. A scan only holds the
/// lock while fetching a page, so point queries interleave with a running scan.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // In-memory databases report "memory" and stay that way
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                schema_json TEXT NOT NULL,
                generation INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Generation numbers are never reused, even after deletes
            CREATE TABLE IF NOT EXISTS generations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS aliases (
                alias TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                lookup_key TEXT NOT NULL,
                source_json TEXT NOT NULL,
                UNIQUE (collection, doc_id),
                FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_documents_key
                ON documents(collection, lookup_key);
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connectivity("connection lock poisoned".to_string()))
    }

    /// Resolve a collection or alias name to a concrete collection name
    fn resolve(conn: &Connection, name: &str) -> StoreResult<Option<String>> {
        let direct: Option<String> = conn
            .query_row(
                "SELECT name FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if direct.is_some() {
            return Ok(direct);
        }

        let aliased = conn
            .query_row(
                "SELECT collection FROM aliases WHERE alias = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(aliased)
    }

    fn require(conn: &Connection, name: &str) -> StoreResult<String> {
        Self::resolve(conn, name)?.ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn load_schema(conn: &Connection, collection: &str) -> StoreResult<CollectionSchema> {
        let schema_json: String = conn.query_row(
            "SELECT schema_json FROM collections WHERE name = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&schema_json)?)
    }

    fn row_to_info(name: String, generation: i64, created_at: String) -> StoreResult<CollectionInfo> {
        Ok(CollectionInfo {
            name,
            generation: generation as u64,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
        })
    }

    fn checkpoint(conn: &Connection) -> StoreResult<()> {
        conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }

    /// Fetch one page of a scan, starting after `after_seq`
    fn scan_page(&self, collection: &str, after_seq: i64) -> StoreResult<Vec<(i64, Record)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT seq, source_json FROM documents
             WHERE collection = ?1 AND seq > ?2
             ORDER BY seq LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![collection, after_seq, SCAN_PAGE_SIZE as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut page = Vec::new();
        for row in rows {
            let (seq, source) = row?;
            page.push((seq, serde_json::from_str(&source)?));
        }
        Ok(page)
    }
}

/// Lowercased alphanumeric tokens, the unit of full-text matching
fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Concatenated text of a field, flattening arrays of strings
fn field_text(source: &Record, field: &str) -> Option<String> {
    match source.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

/// Paged, lazy iterator over a collection
struct ScanCursor<'a> {
    store: &'a SqliteStore,
    collection: String,
    last_seq: i64,
    buffer: VecDeque<Record>,
    exhausted: bool,
}

impl Iterator for ScanCursor<'_> {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.store.scan_page(&self.collection, self.last_seq) {
                Ok(page) => {
                    if page.len() < SCAN_PAGE_SIZE {
                        self.exhausted = true;
                    }
                    for (seq, record) in page {
                        self.last_seq = seq;
                        self.buffer.push_back(record);
                    }
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl StagingStore for SqliteStore {
    // === Collection Operations ===

    fn index_exists(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        Ok(Self::resolve(&conn, name)?.is_some())
    }

    fn create_collection(&self, name: &str, schema: &CollectionSchema) -> StoreResult<CollectionInfo> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM documents WHERE collection = ?1", params![name])?;
        tx.execute("DELETE FROM aliases WHERE collection = ?1", params![name])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;

        tx.execute("INSERT INTO generations (collection) VALUES (?1)", params![name])?;
        let generation = tx.last_insert_rowid();
        let created_at = Utc::now();

        tx.execute(
            "INSERT INTO collections (name, schema_json, generation, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, serde_json::to_string(schema)?, generation, created_at.to_rfc3339()],
        )?;
        tx.commit()?;

        debug!(collection = name, generation, "created collection");
        Ok(CollectionInfo {
            name: name.to_string(),
            generation: generation as u64,
            created_at,
        })
    }

    fn delete_collection(&self, name: &str) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM documents WHERE collection = ?1", params![name])?;
        tx.execute("DELETE FROM aliases WHERE collection = ?1", params![name])?;
        let rows = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    fn list_collections(&self, prefix: &str) -> StoreResult<Vec<CollectionInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, generation, created_at FROM collections
             WHERE substr(name, 1, length(?1)) = ?1
             ORDER BY generation",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut infos = Vec::new();
        for row in rows {
            let (name, generation, created_at) = row?;
            infos.push(Self::row_to_info(name, generation, created_at)?);
        }
        Ok(infos)
    }

    fn put_alias(&self, alias: &str, collection: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let target = Self::require(&conn, collection)?;
        conn.execute(
            r#"
            INSERT INTO aliases (alias, collection) VALUES (?1, ?2)
            ON CONFLICT(alias) DO UPDATE SET collection = excluded.collection
            "#,
            params![alias, target],
        )?;
        Ok(())
    }

    fn resolve_alias(&self, alias: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let target = conn
            .query_row(
                "SELECT collection FROM aliases WHERE alias = ?1",
                params![alias],
                |row| row.get(0),
            )
            .optional()?;
        Ok(target)
    }

    // === Document Operations ===

    fn bulk_write(
        &self,
        collection: &str,
        records: Vec<Record>,
        refresh: RefreshPolicy,
    ) -> StoreResult<BulkWriteResult> {
        let mut conn = self.conn()?;
        let target = Self::require(&conn, collection)?;
        let schema = Self::load_schema(&conn, &target)?;

        let mut result = BulkWriteResult::default();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare_cached(
                r#"
                INSERT INTO documents (collection, doc_id, lookup_key, source_json)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(collection, doc_id) DO UPDATE SET
                    lookup_key = excluded.lookup_key,
                    source_json = excluded.source_json
                "#,
            )?;

            for (index, record) in records.into_iter().enumerate() {
                let key = schema.key_of(&record).map(str::to_string);
                if let Err(reason) = schema.validate(&record) {
                    result.errors.push(BulkItemError { index, key, reason });
                    continue;
                }
                // validate() guarantees a key
                let key = key.unwrap_or_default();
                let doc_id = if schema.unique_key {
                    key.clone()
                } else {
                    uuid::Uuid::new_v4().to_string()
                };

                let written = serde_json::to_string(&record)
                    .map_err(StoreError::from)
                    .and_then(|json| {
                        upsert
                            .execute(params![target, doc_id, key, json])
                            .map_err(StoreError::from)
                    });
                match written {
                    Ok(_) => result.success_count += 1,
                    Err(e) => result.errors.push(BulkItemError {
                        index,
                        key: Some(key),
                        reason: e.to_string(),
                    }),
                }
            }
        }
        tx.commit()?;

        if refresh == RefreshPolicy::Wait {
            Self::checkpoint(&conn)?;
        }

        Ok(result)
    }

    fn point_query(&self, collection: &str, key: &str, limit: usize) -> StoreResult<Vec<Record>> {
        let conn = self.conn()?;
        let target = Self::require(&conn, collection)?;
        let mut stmt = conn.prepare_cached(
            "SELECT source_json FROM documents WHERE collection = ?1 AND lookup_key = ?2 LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![target, key, limit as i64], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn scan<'a>(&'a self, collection: &str) -> StoreResult<RecordScan<'a>> {
        let target = {
            let conn = self.conn()?;
            Self::require(&conn, collection)?
        };
        Ok(Box::new(ScanCursor {
            store: self,
            collection: target,
            last_seq: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn search(&self, collection: &str, request: &SearchRequest) -> StoreResult<Vec<Hit>> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = analyze(&request.terms)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if terms.is_empty() || request.fields.is_empty() || request.size == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let target = Self::require(&conn, collection)?;

        // Token matching happens here rather than in SQL: SQLite's lower()
        // and LIKE only fold ASCII case.
        let mut stmt = conn.prepare_cached(
            "SELECT seq, doc_id, source_json FROM documents WHERE collection = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![target], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut scored: Vec<(usize, i64, Hit)> = Vec::new();
        for row in rows {
            let (seq, doc_id, source_json) = row?;
            let source: Record = serde_json::from_str(&source_json)?;

            let mut score = 0;
            for field in &request.fields {
                if let Some(text) = field_text(&source, field) {
                    let tokens: HashSet<String> = analyze(&text).into_iter().collect();
                    score += terms.iter().filter(|t| tokens.contains(*t)).count();
                }
            }
            if score > 0 {
                scored.push((score, seq, Hit { id: doc_id, source }));
            }
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(request.size);
        Ok(scored.into_iter().map(|(_, _, hit)| hit).collect())
    }

    fn count(&self, collection: &str) -> StoreResult<usize> {
        let conn = self.conn()?;
        let target = Self::require(&conn, collection)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![target],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn refresh(&self, collection: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        Self::require(&conn, collection)?;
        Self::checkpoint(&conn)
    }
}
