use crate::{
    result::{ReportError, Result},
    str_utils::is_in_quotes,
};
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;

// Regex compiled once as a lazy static for performance
pub static PARAMETER_REGEX: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"@(\w+)").unwrap());

static TRANSACTION_KEYWORD_REGEX: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
    Regex::new(r"(?i)\b(?:BEGIN|COMMIT|ROLLBACK|SAVEPOINT|(?:START|END)\s+TRANSACTION)\b").unwrap()
});

/// Parameter type enums for database operations
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    Integer,
    String,
    Float,
    Boolean,
}

impl FromStr for ParameterType {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" => Ok(ParameterType::Integer),
            "string" => Ok(ParameterType::String),
            "float" => Ok(ParameterType::Float),
            "boolean" => Ok(ParameterType::Boolean),
            _ => Err(ReportError::new_parameter_type_mismatch(
                "integer, string, float or boolean",
                s,
            )),
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterType::Integer => "integer",
            ParameterType::String => "string",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
        };
        write!(f, "{s}")
    }
}

/// Parameter definition for SQL queries
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

/// Database-agnostic bound value, converted to driver types by each runner
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ParameterValue {
    /// Validate a JSON value against the declared type and convert it
    pub fn from_json(param_type: &ParameterType, value: &serde_json::Value) -> Result<Self> {
        let converted = match param_type {
            ParameterType::String => value
                .as_str()
                .map(|s| ParameterValue::String(s.to_string())),
            ParameterType::Integer => value.as_i64().map(ParameterValue::Integer),
            ParameterType::Float => value.as_f64().map(ParameterValue::Float),
            ParameterType::Boolean => value.as_bool().map(ParameterValue::Boolean),
        };
        converted.ok_or_else(|| {
            ReportError::new_parameter_type_mismatch(param_type.to_string(), value.to_string())
        })
    }
}

/// SQL with positional placeholders and the values to bind, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub sql: String,
    pub values: Vec<ParameterValue>,
}

/// Parse @parameters from SQL while respecting quote boundaries.
/// Type defaults to String and is overridden by the "args" definitions.
pub fn parse_parameters_with_quotes(
    sql: &str,
    args: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Result<Vec<Parameter>> {
    let mut parameters = Vec::new();
    for name in extract_parameters_in_statement(sql) {
        let param_type = match args
            .and_then(|a| a.get(&name))
            .and_then(|def| def.get("type"))
        {
            Some(serde_json::Value::String(type_str)) => ParameterType::from_str(type_str)?,
            Some(other) => {
                return Err(ReportError::new_parameter_type_mismatch(
                    "string type name",
                    format!("{name}: {other}"),
                ));
            }
            None => ParameterType::String,
        };
        parameters.push(Parameter { name, param_type });
    }
    Ok(parameters)
}

/// Extract unique parameter names in order of first appearance, skipping quoted text
pub fn extract_parameters_in_statement(statement: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for cap in PARAMETER_REGEX.captures_iter(statement) {
        let Some(named_match) = cap.get(0) else {
            continue;
        };
        if is_in_quotes(statement, named_match.start()) {
            continue;
        }
        if let Some(name) = cap.get(1) {
            if seen.insert(name.as_str().to_string()) {
                params.push(name.as_str().to_string());
            }
        }
    }

    params
}

/// Rewrite @name placeholders with the backend's positional form and collect
/// the bound values. A name used twice shares one position.
pub fn prepare_statement(
    sql: &str,
    parameters: &[Parameter],
    request_params: &serde_json::Map<String, serde_json::Value>,
    placeholder_gen: impl Fn(usize) -> String,
) -> Result<PreparedStatement> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut values = Vec::new();
    let mut prepared_sql = String::with_capacity(sql.len());
    let mut last_end = 0;

    for cap in PARAMETER_REGEX.captures_iter(sql) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if is_in_quotes(sql, whole.start()) {
            continue;
        }
        let name = name.as_str();

        let index = match positions.get(name) {
            Some(&index) => index,
            None => {
                let param_def = parameters
                    .iter()
                    .find(|p| p.name == name)
                    .ok_or_else(|| ReportError::ParameterNotProvided(name.to_string()))?;
                let raw = request_params
                    .get(name)
                    .ok_or_else(|| ReportError::ParameterNotProvided(name.to_string()))?;
                values.push(ParameterValue::from_json(&param_def.param_type, raw)?);
                positions.insert(name.to_string(), values.len());
                values.len()
            }
        };

        prepared_sql.push_str(&sql[last_end..whole.start()]);
        prepared_sql.push_str(&placeholder_gen(index));
        last_end = whole.end();
    }
    prepared_sql.push_str(&sql[last_end..]);

    Ok(PreparedStatement {
        sql: prepared_sql,
        values,
    })
}

/// Check if SQL contains transaction control keywords that conflict with the runner's transaction
pub fn contains_transaction_keywords(sql: &str) -> bool {
    // Keywords inside string literals or quoted identifiers are data
    TRANSACTION_KEYWORD_REGEX
        .find_iter(sql)
        .any(|m| !is_in_quotes(sql, m.start()))
}
