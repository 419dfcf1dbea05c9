use crate::query::{FetchMode, QueryDef};
use crate::result::{ReportError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::str::FromStr;

/// The built-in restaurants report
const RESTAURANTS_PLAN: &str = include_str!("../../queries/restaurants.json");

/// One labelled statement of a report
#[derive(Debug, Clone)]
pub struct ReportStep {
    pub name: String,
    /// Header printed before the step's results
    pub label: String,
    pub query: QueryDef,
    /// Values bound to the query's @parameters
    pub params: serde_json::Map<String, serde_json::Value>,
    pub fetch: FetchMode,
    /// Printed before a single fetched row, e.g. "Inserted:"
    pub prefix: Option<String>,
}

/// Ordered list of report steps
#[derive(Debug, Clone)]
pub struct ReportPlan {
    pub steps: Vec<ReportStep>,
}

#[derive(Debug, Deserialize)]
struct PlanDocument {
    steps: Vec<StepDocument>,
}

#[derive(Debug, Deserialize)]
struct StepDocument {
    name: String,
    label: String,
    query: Option<String>,
    #[serde(default)]
    args: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    returns: Option<serde_json::Value>,
    #[serde(default)]
    fetch: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
}

impl ReportPlan {
    /// The fixed ten-step report over the `restaurants` table
    pub fn restaurants() -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(RESTAURANTS_PLAN)?;
        Self::from_json(json)
    }

    /// Load a plan from a JSON file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(json)
    }

    /// Load a plan from a serde_json::Value object
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let document: PlanDocument = serde_json::from_value(json)?;

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(document.steps.len());
        for step_doc in document.steps {
            if !seen.insert(step_doc.name.clone()) {
                return Err(ReportError::InvalidPlan(format!(
                    "duplicate step name '{}'",
                    step_doc.name
                )));
            }
            steps.push(Self::parse_step(step_doc)?);
        }
        Ok(ReportPlan { steps })
    }

    pub fn step(&self, name: &str) -> Result<&ReportStep> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ReportError::QueryNotFound(name.to_string()))
    }

    fn parse_step(doc: StepDocument) -> Result<ReportStep> {
        let sql = doc.query.ok_or_else(|| {
            ReportError::InvalidPlan(format!("step '{}' has no 'query' field", doc.name))
        })?;

        let returns = match doc.returns {
            None => Vec::new(),
            Some(serde_json::Value::Array(items)) => {
                let mut seen = HashSet::new();
                let mut fields = Vec::with_capacity(items.len());
                for item in items {
                    let field = item.as_str().ok_or_else(|| {
                        let got = item.to_string();
                        ReportError::new_parameter_type_mismatch("array of strings", got)
                    })?;
                    // Deduplicate but keep order
                    if seen.insert(field.to_string()) {
                        fields.push(field.to_string());
                    }
                }
                fields
            }
            Some(other) => {
                return Err(ReportError::new_parameter_type_mismatch(
                    "array of strings",
                    other.to_string(),
                ));
            }
        };

        let query = QueryDef::from_sql(&sql, doc.args.as_ref())?.with_returns(returns);
        let fetch = match doc.fetch.as_deref() {
            Some(fetch) => FetchMode::from_str(fetch)?,
            None => FetchMode::default(),
        };
        if fetch == FetchMode::One && query.returns.is_empty() {
            return Err(ReportError::InvalidPlan(format!(
                "step '{}' fetches one row but returns no columns",
                doc.name
            )));
        }

        // Bind values are checked now so a bad plan fails before any SQL runs
        for param in &query.parameters {
            let value = doc
                .params
                .get(&param.name)
                .ok_or_else(|| ReportError::ParameterNotProvided(param.name.clone()))?;
            crate::parameters::ParameterValue::from_json(&param.param_type, value)?;
        }

        Ok(ReportStep {
            name: doc.name,
            label: doc.label,
            query,
            params: doc.params,
            fetch,
            prefix: doc.prefix,
        })
    }
}
