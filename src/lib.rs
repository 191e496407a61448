pub mod analysis;
pub mod cli;
pub mod commands;
pub mod db;
pub mod detectors;
pub mod error;
pub mod migrations;
pub mod orchestrator;
pub mod store;
pub mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging with tracing.
/// Respects RUST_LOG env var; defaults to `info` level for spendwatch crate.
/// Logs go to stderr so command output on stdout stays valid JSON.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spendwatch=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Parse arguments, run one command and return the process exit code:
/// 0 on success, 2 for client errors, 1 for everything else.
pub fn run() -> i32 {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = cli::Cli::parse();
    let db_path = args.db.unwrap_or_else(db::default_db_path);
    let pool = match db::open(&db_path) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "Failed to open database");
            return 1;
        }
    };

    match cli::execute(&pool, args.command) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to render output");
                1
            }
        },
        Err(err) => {
            if let Ok(json) = serde_json::to_string_pretty(&err) {
                println!("{}", json);
            }
            if err.is_client_error() {
                2
            } else {
                1
            }
        }
    }
}
