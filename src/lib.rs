pub mod config;
pub mod logging;
pub mod parameters;
pub mod query;
pub mod report;
pub mod result;
pub mod runner_postgresql;
pub mod runner_sqlite;
pub mod str_utils;

// Re-export types for convenience
pub use config::{ConnectionConfig, load_env_file};
pub use parameters::{Parameter, ParameterType, ParameterValue};
pub use query::{FetchMode, QueryDef, ReportPlan, ReportStep};
pub use result::{QueryResult, ReportError, ReportSummary, Result, Row};
pub use runner_postgresql::{connect_postgresql, run_report_postgresql};
pub use runner_sqlite::{open_sqlite, run_report_sqlite};

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
pub use rusqlite::Connection as SqliteConnection;
pub use serde_json::Value as JsonValue;
pub use tokio_postgres::Client as PostgresClient;
