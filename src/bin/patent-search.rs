//! Patent Search CLI: staging, denormalization, and faceted queries.
//!
//! Usage:
//!   patent-search ingest --patent patent.csv [--claim claims.csv ...] [--db path]
//!   patent-search denormalize [--db path]
//!   patent-search query "<text>" [--db path]
//!   patent-search direct-query [term] [--db path]
//!   patent-search collections [--db path]

use clap::{Parser, Subcommand};
use patent_search::query::DirectQueryResponse;
use patent_search::{
    run_pipeline, Config, DenormalizationEngine, EntityKind, IngestInputs, QueryService,
    SqliteStore, StagingStore, TARGET_COLLECTION,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "patent-search",
    version,
    about = "Denormalize staged patent datasets and run faceted queries"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage input files in parallel, then denormalize
    Ingest {
        /// Bibliographic records (CSV)
        #[arg(long)]
        patent: Option<PathBuf>,
        /// Granted-patent citations (CSV)
        #[arg(long)]
        us_citation: Option<PathBuf>,
        /// Application citations (CSV)
        #[arg(long)]
        us_app_citation: Option<PathBuf>,
        /// CPC classifications (CSV)
        #[arg(long)]
        classes: Option<PathBuf>,
        /// Applicants, assignees and inventors (CSV)
        #[arg(long)]
        people: Option<PathBuf>,
        /// Brief summaries (TSV)
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Claims (CSV)
        #[arg(long)]
        claim: Option<PathBuf>,
    },
    /// Build composite documents from the current staging collections
    Denormalize,
    /// Run a natural-language query and print the aggregated response
    Query {
        /// Query text, e.g. "patents about hydrocarbon cracking"
        text: String,
    },
    /// Search patent abstracts for a raw term (diagnostics)
    DirectQuery {
        /// Term to match; defaults to "hydrocarbon"
        term: Option<String>,
    },
    /// List collections with their generation and document count
    Collections,
}

/// Get the default database path (~/.local/share/patent-search/patent-search.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("patent-search").join("patent-search.db")
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config, String> {
    match path {
        Some(path) => {
            Config::load(&path).map_err(|e| format!("Failed to load config '{}': {}", path.display(), e))
        }
        None => Ok(Config::default()),
    }
}

fn open_store(db: Option<PathBuf>) -> Result<Arc<dyn StagingStore>, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    let store = SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(Arc::new(store))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_ingest(rt: &Runtime, store: Arc<dyn StagingStore>, config: &Config, inputs: IngestInputs) -> i32 {
    if inputs.selected().is_empty() {
        eprintln!("Error: no input files given (see --help)");
        return 1;
    }
    let report = rt.block_on(run_pipeline(store, &inputs, config));
    let code = print_json(&report);
    if report.is_success() {
        code
    } else {
        1
    }
}

fn cmd_denormalize(rt: &Runtime, store: Arc<dyn StagingStore>, config: &Config) -> i32 {
    let engine = DenormalizationEngine::new(store, config.denormalize.clone());
    match rt.block_on(engine.run()) {
        Ok(report) => {
            let code = print_json(&report);
            if report.is_complete() {
                code
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_query(rt: &Runtime, store: Arc<dyn StagingStore>, config: &Config, text: &str) -> i32 {
    let service = QueryService::new(store, config.query.clone());
    let response = rt.block_on(service.query(text));
    let code = print_json(&response);
    if response.error.is_some() {
        1
    } else {
        code
    }
}

fn cmd_direct_query(rt: &Runtime, store: Arc<dyn StagingStore>, config: &Config, term: Option<&str>) -> i32 {
    let service = QueryService::new(store, config.query.clone());
    let response: DirectQueryResponse = rt.block_on(service.direct_query(term));
    let code = print_json(&response);
    if response.success {
        code
    } else {
        1
    }
}

fn cmd_collections(store: &dyn StagingStore) -> i32 {
    let collections = match store.list_collections("") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if collections.is_empty() {
        println!("No collections.");
        return 0;
    }

    println!("{:<32}  {:>10}  {:>10}  {:<25}", "NAME", "GENERATION", "DOCUMENTS", "CREATED");
    println!("{}", "-".repeat(83));
    for info in collections {
        let count = store
            .count(&info.name)
            .map(|n| n.to_string())
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "{:<32}  {:>10}  {:>10}  {:<25}",
            info.name,
            info.generation,
            count,
            info.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let aliases = EntityKind::ALL
        .iter()
        .map(|k| k.collection())
        .chain([TARGET_COLLECTION]);
    for alias in aliases {
        if let Ok(Some(target)) = store.resolve_alias(alias) {
            println!("alias {} -> {}", alias, target);
        }
    }
    0
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let store = match open_store(cli.db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Ingest {
            patent,
            us_citation,
            us_app_citation,
            classes,
            people,
            summary,
            claim,
        } => {
            let inputs = IngestInputs {
                patent,
                us_citation,
                us_app_citation,
                classes,
                people,
                summary,
                claim,
            };
            cmd_ingest(&rt, store, &config, inputs)
        }
        Commands::Denormalize => cmd_denormalize(&rt, store, &config),
        Commands::Query { text } => cmd_query(&rt, store, &config, &text),
        Commands::DirectQuery { term } => cmd_direct_query(&rt, store, &config, term.as_deref()),
        Commands::Collections => cmd_collections(store.as_ref()),
    };
    std::process::exit(code);
}
