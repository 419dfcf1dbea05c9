use serde::Serialize;
use thiserror::Error;

/// Boxed driver error carried by connection and query failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the restaurant report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Connection error ({target}): {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },
    #[error("Query error in step '{step}': {source}")]
    Query {
        step: String,
        #[source]
        source: BoxError,
    },
    #[error("Query not found: {0}")]
    QueryNotFound(String),
    #[error("Parameter not provided: {0}")]
    ParameterNotProvided(String),
    #[error("Parameter type mismatch: expected {expected}, got {got}")]
    ParameterTypeMismatch { expected: String, got: String },
    #[error("Invalid report plan: {0}")]
    InvalidPlan(String),
}

impl ReportError {
    pub fn new_parameter_type_mismatch(
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        ReportError::ParameterTypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn new_query(step: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ReportError::Query {
            step: step.into(),
            source: source.into(),
        }
    }

    pub fn new_connection(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ReportError::Connection {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Type alias for Results using ReportError
pub type Result<T> = std::result::Result<T, ReportError>;

/// A fetched row, values in the order of the step's returned columns
pub type Row = Vec<serde_json::Value>;

/// Outcome of running one report step
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Step name from the report plan
    pub step: String,
    /// The SQL actually sent to the database, placeholders rewritten
    pub sql_statements: Vec<String>,
    /// Column names in output order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Everything a report run produced, in step order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub steps: Vec<QueryResult>,
}

impl ReportSummary {
    pub fn step(&self, name: &str) -> Option<&QueryResult> {
        self.steps.iter().find(|s| s.step == name)
    }
}
