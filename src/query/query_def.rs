use crate::{
    parameters::{self, Parameter},
    result::{ReportError, Result},
};
use std::str::FromStr;

/// How many rows a step expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Print every row
    #[default]
    All,
    /// Print the first row, if any, behind the step's prefix
    One,
}

impl FromStr for FetchMode {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(FetchMode::All),
            "one" => Ok(FetchMode::One),
            _ => Err(ReportError::new_parameter_type_mismatch("fetch 'all' or 'one'", s)),
        }
    }
}

/// Represents a parsed SQL query with parameters
#[derive(Debug, Clone)]
pub struct QueryDef {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    /// Columns to read back, in output order. Empty means the statement is only executed.
    pub returns: Vec<String>,
}

impl QueryDef {
    /// Create a new QueryDef from SQL string and an optional args object
    pub fn from_sql(
        sql: &str,
        args: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self> {
        Self::check_transaction_keywords(sql)?;

        let parameters = parameters::parse_parameters_with_quotes(sql, args)?;
        if let Some(args_map) = args {
            if let Some(unused) = args_map
                .keys()
                .find(|name| !parameters.iter().any(|p| &p.name == *name))
            {
                return Err(ReportError::InvalidPlan(format!(
                    "argument '{unused}' is not used by the query"
                )));
            }
        }

        Ok(QueryDef {
            sql: sql.trim().trim_end_matches(';').trim_end().to_string(),
            parameters,
            returns: Vec::new(),
        })
    }

    pub fn with_returns(mut self, returns: Vec<String>) -> Self {
        self.returns = returns;
        self
    }

    fn check_transaction_keywords(sql: &str) -> Result<()> {
        if parameters::contains_transaction_keywords(sql) {
            let expected = "SQL without explicit transaction keywords";
            let got = "Query contains BEGIN, COMMIT, ROLLBACK, SAVEPOINT or START/END TRANSACTION";
            Err(ReportError::new_parameter_type_mismatch(expected, got))
        } else {
            Ok(())
        }
    }
}
