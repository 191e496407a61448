use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::commands::analyze::{analyze_db, ErrorResponse};
use crate::commands::config::{config_get_db, config_update_db};
use crate::commands::transactions::{
    import_accounts_db, transaction_delete_db, transaction_get_db, transactions_list_db,
};
use crate::db::DbPool;
use crate::error::StoreError;
use crate::orchestrator::AnalysisMode;
use crate::types::transaction::Account;

#[derive(Parser, Debug)]
#[command(name = "spendwatch", version, about = "Transaction anomaly scoring")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "SQLite database path (default: $SPENDWATCH_DB or ~/.spendwatch/state/spendwatch.sqlite)"
    )]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score one transaction against the user's earlier history.
    Analyze {
        #[arg(value_enum)]
        mode: ModeArg,
        user_id: String,
        transaction_id: String,
    },
    /// Load accounts with embedded transactions from a JSON file.
    Import {
        file: PathBuf,
    },
    Transactions {
        #[command(subcommand)]
        command: TransactionCommands,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommands {
    List {
        user_id: String,
    },
    Show {
        user_id: String,
        transaction_id: String,
    },
    Delete {
        user_id: String,
        transaction_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Show,
    /// Merge a JSON patch into the detector thresholds.
    Set {
        patch: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Location,
    Amount,
    Complete,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Location => AnalysisMode::Location,
            ModeArg::Amount => AnalysisMode::Amount,
            ModeArg::Complete => AnalysisMode::Complete,
        }
    }
}

fn server_error(err: StoreError) -> ErrorResponse {
    ErrorResponse {
        status: 500,
        detail: err.to_string(),
    }
}

fn bad_request(detail: String) -> ErrorResponse {
    ErrorResponse { status: 400, detail }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ErrorResponse> {
    serde_json::to_value(value).map_err(|e| server_error(e.into()))
}

/// Run one command against the pool and return its JSON result.
pub fn execute(pool: &DbPool, command: Commands) -> Result<Value, ErrorResponse> {
    match command {
        Commands::Analyze {
            mode,
            user_id,
            transaction_id,
        } => to_json(&analyze_db(pool, &user_id, &transaction_id, mode.into())?),
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| bad_request(format!("Failed to read {}: {}", file.display(), e)))?;
            let accounts: Vec<Account> = serde_json::from_str(&raw)
                .map_err(|e| bad_request(format!("Failed to parse {}: {}", file.display(), e)))?;
            let imported = import_accounts_db(pool, &accounts).map_err(server_error)?;
            Ok(json!({ "accounts": accounts.len(), "transactions": imported }))
        }
        Commands::Transactions { command } => match command {
            TransactionCommands::List { user_id } => {
                to_json(&transactions_list_db(pool, &user_id).map_err(server_error)?)
            }
            TransactionCommands::Show {
                user_id,
                transaction_id,
            } => match transaction_get_db(pool, &user_id, &transaction_id).map_err(server_error)? {
                Some(stored) => to_json(&stored),
                None => Err(ErrorResponse {
                    status: 404,
                    detail: "Transaction not found".to_string(),
                }),
            },
            TransactionCommands::Delete {
                user_id,
                transaction_id,
            } => {
                let deleted =
                    transaction_delete_db(pool, &user_id, &transaction_id).map_err(server_error)?;
                Ok(json!({ "deleted": deleted }))
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => to_json(&config_get_db(pool).map_err(server_error)?),
            ConfigCommands::Set { patch } => match config_update_db(pool, &patch) {
                Ok(config) => to_json(&config),
                Err(e @ (StoreError::Json(_) | StoreError::InvalidConfig(_))) => {
                    Err(bad_request(e.to_string()))
                }
                Err(e) => Err(server_error(e)),
            },
        },
    }
}
