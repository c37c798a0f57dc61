//! A store wrapper that injects failures

use patent_search::store::{
    BulkWriteResult, CollectionInfo, CollectionSchema, Hit, Record, RecordScan, RefreshPolicy,
    SearchRequest, SqliteStore, StagingStore, StoreError, StoreResult,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Which calls fail, and how
#[derive(Debug, Default)]
pub struct FaultPlan {
    /// Point queries against these collections fail
    pub failing_lookups: HashSet<String>,
    /// Point queries against these collections sleep before answering
    pub slow_lookups: HashSet<String>,
    pub lookup_delay: Duration,
    /// 1-based indexes of bulk writes that fail outright
    pub failing_writes: HashSet<usize>,
    /// Bulk writes commit, then sleep this long before returning
    pub write_delay: Duration,
    /// Scans yield this many records, then an error
    pub fail_scan_after: Option<usize>,
    /// Every search fails
    pub fail_search: bool,
}

/// Delegates to an in-memory `SqliteStore` except where the plan says otherwise
pub struct FlakyStore {
    inner: SqliteStore,
    plan: Mutex<FaultPlan>,
    bulk_writes: AtomicUsize,
    refreshes: Mutex<Vec<(String, RefreshPolicy)>>,
    lookups_in_flight: AtomicUsize,
    peak_lookups: AtomicUsize,
    batch_keys: Mutex<Vec<Vec<String>>>,
}

impl FlakyStore {
    pub fn new(plan: FaultPlan) -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("in-memory store"),
            plan: Mutex::new(plan),
            bulk_writes: AtomicUsize::new(0),
            refreshes: Mutex::new(Vec::new()),
            lookups_in_flight: AtomicUsize::new(0),
            peak_lookups: AtomicUsize::new(0),
            batch_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn reliable() -> Self {
        Self::new(FaultPlan::default())
    }

    pub fn set_plan(&self, plan: FaultPlan) {
        *self.plan.lock().unwrap() = plan;
    }

    /// Bulk writes attempted so far, including failed ones
    pub fn bulk_write_count(&self) -> usize {
        self.bulk_writes.load(Ordering::SeqCst)
    }

    /// `(collection, refresh)` for every bulk write, in call order
    pub fn write_log(&self) -> Vec<(String, RefreshPolicy)> {
        self.refreshes.lock().unwrap().clone()
    }

    /// `patent_id`s of every bulk write, in call order
    pub fn batch_keys(&self) -> Vec<Vec<String>> {
        self.batch_keys.lock().unwrap().clone()
    }

    /// Most point queries ever running at the same time
    pub fn peak_concurrent_lookups(&self) -> usize {
        self.peak_lookups.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.bulk_writes.store(0, Ordering::SeqCst);
        self.peak_lookups.store(0, Ordering::SeqCst);
        self.batch_keys.lock().unwrap().clear();
        self.refreshes.lock().unwrap().clear();
    }
}

impl StagingStore for FlakyStore {
    fn index_exists(&self, name: &str) -> StoreResult<bool> {
        self.inner.index_exists(name)
    }

    fn create_collection(&self, name: &str, schema: &CollectionSchema) -> StoreResult<CollectionInfo> {
        self.inner.create_collection(name, schema)
    }

    fn delete_collection(&self, name: &str) -> StoreResult<bool> {
        self.inner.delete_collection(name)
    }

    fn list_collections(&self, prefix: &str) -> StoreResult<Vec<CollectionInfo>> {
        self.inner.list_collections(prefix)
    }

    fn put_alias(&self, alias: &str, collection: &str) -> StoreResult<()> {
        self.inner.put_alias(alias, collection)
    }

    fn resolve_alias(&self, alias: &str) -> StoreResult<Option<String>> {
        self.inner.resolve_alias(alias)
    }

    fn bulk_write(
        &self,
        collection: &str,
        records: Vec<Record>,
        refresh: RefreshPolicy,
    ) -> StoreResult<BulkWriteResult> {
        let call = self.bulk_writes.fetch_add(1, Ordering::SeqCst) + 1;
        self.refreshes
            .lock()
            .unwrap()
            .push((collection.to_string(), refresh));
        self.batch_keys.lock().unwrap().push(
            records
                .iter()
                .filter_map(|r| r.get("patent_id").and_then(|v| v.as_str()).map(String::from))
                .collect(),
        );
        let delay = {
            let plan = self.plan.lock().unwrap();
            if plan.failing_writes.contains(&call) {
                return Err(StoreError::Connectivity(format!("injected failure on write {}", call)));
            }
            plan.write_delay
        };
        let result = self.inner.bulk_write(collection, records, refresh);
        std::thread::sleep(delay);
        result
    }

    fn point_query(&self, collection: &str, key: &str, limit: usize) -> StoreResult<Vec<Record>> {
        let (fail, delay) = {
            let plan = self.plan.lock().unwrap();
            let delay = plan
                .slow_lookups
                .contains(collection)
                .then_some(plan.lookup_delay);
            (plan.failing_lookups.contains(collection), delay)
        };
        let running = self.lookups_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_lookups.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let result = if fail {
            Err(StoreError::Connectivity(format!("injected lookup failure on {}", collection)))
        } else {
            self.inner.point_query(collection, key, limit)
        };
        self.lookups_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn scan<'a>(&'a self, collection: &str) -> StoreResult<RecordScan<'a>> {
        let scan = self.inner.scan(collection)?;
        let fail_after = self.plan.lock().unwrap().fail_scan_after;
        match fail_after {
            Some(limit) => Ok(Box::new(scan.take(limit).chain(std::iter::once(Err(
                StoreError::Connectivity("injected scan failure".into()),
            ))))),
            None => Ok(scan),
        }
    }

    fn search(&self, collection: &str, request: &SearchRequest) -> StoreResult<Vec<Hit>> {
        if self.plan.lock().unwrap().fail_search {
            return Err(StoreError::Connectivity("injected search failure".into()));
        }
        self.inner.search(collection, request)
    }

    fn count(&self, collection: &str) -> StoreResult<usize> {
        self.inner.count(collection)
    }

    fn refresh(&self, collection: &str) -> StoreResult<()> {
        self.inner.refresh(collection)
    }
}
