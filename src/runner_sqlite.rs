use crate::{
    parameters::{self, ParameterValue},
    query::{ReportPlan, ReportStep},
    report::ReportPrinter,
    result::{QueryResult, ReportError, ReportSummary, Result, Row},
};
use rusqlite::Connection;
use std::io::Write;
use tracing::{debug, info};

// Implement trait for converting generic ParameterValue to SQLite-specific ToSql
impl From<ParameterValue> for Box<dyn rusqlite::ToSql> {
    fn from(param_value: ParameterValue) -> Self {
        match param_value {
            ParameterValue::String(s) => Box::new(s),
            ParameterValue::Integer(i) => Box::new(i),
            ParameterValue::Float(f) => Box::new(f),
            // SQLite represents booleans as integers
            ParameterValue::Boolean(b) => Box::new(b as i32),
        }
    }
}

/// Open a SQLite database file for the report
pub fn open_sqlite(path: impl AsRef<std::path::Path>) -> Result<Connection> {
    let path = path.as_ref();
    Connection::open(path)
        .map_err(|e| ReportError::new_connection(format!("sqlite:{}", path.display()), e))
}

fn sqlite_value_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    match value {
        rusqlite::types::ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        rusqlite::types::ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        rusqlite::types::ValueRef::Text(s) => {
            serde_json::Value::String(String::from_utf8_lossy(s).to_string())
        }
        rusqlite::types::ValueRef::Blob(b) => serde_json::Value::Array(
            b.iter()
                .map(|&byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        rusqlite::types::ValueRef::Null => serde_json::Value::Null,
    }
}

/// Execute a single report step inside the run's transaction
pub fn execute_step(tx: &rusqlite::Transaction, step: &ReportStep) -> Result<QueryResult> {
    let query = &step.query;
    let prepared =
        parameters::prepare_statement(&query.sql, &query.parameters, &step.params, |idx| {
            format!("?{idx}")
        })?;
    let bound: Vec<Box<dyn rusqlite::ToSql>> =
        prepared.values.into_iter().map(Into::into).collect();

    let to_query_error = |e: rusqlite::Error| ReportError::new_query(&step.name, e);

    let mut stmt = tx.prepare(&prepared.sql).map_err(to_query_error)?;
    let mut rows_out: Vec<Row> = Vec::new();
    if query.returns.is_empty() {
        let affected = stmt
            .execute(rusqlite::params_from_iter(bound.iter()))
            .map_err(to_query_error)?;
        debug!(step = %step.name, affected, "statement executed");
    } else {
        // Column positions are matched by name; a missing column reads as NULL
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();
        let positions: Vec<Option<usize>> = query
            .returns
            .iter()
            .map(|field| column_names.iter().position(|c| c == field))
            .collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(bound.iter()))
            .map_err(to_query_error)?;
        while let Some(row) = rows.next().map_err(to_query_error)? {
            let mut values = Row::with_capacity(positions.len());
            for position in &positions {
                let value = match position {
                    Some(idx) => row
                        .get_ref(*idx)
                        .map(sqlite_value_to_json)
                        .map_err(to_query_error)?,
                    None => serde_json::Value::Null,
                };
                values.push(value);
            }
            rows_out.push(values);
        }
    }

    Ok(QueryResult {
        step: step.name.clone(),
        sql_statements: vec![prepared.sql],
        columns: query.returns.clone(),
        rows: rows_out,
    })
}

/// Run every step of the plan in one transaction, printing as it goes.
/// The transaction is committed only when all steps succeed; on error it is
/// rolled back when dropped.
pub fn run_report_sqlite<W: Write + ?Sized>(
    conn: &mut Connection,
    plan: &ReportPlan,
    out: &mut W,
) -> Result<ReportSummary> {
    let tx = conn
        .transaction()
        .map_err(|e| ReportError::new_query("begin", e))?;
    let mut printer = ReportPrinter::new(out);
    let mut summary = ReportSummary::default();

    for step in &plan.steps {
        info!(step = %step.name, "running step");
        printer.print_label(step)?;
        let result = execute_step(&tx, step)?;
        debug!(step = %step.name, rows = result.rows.len(), "step finished");
        printer.print_result(step, &result)?;
        summary.steps.push(result);
    }

    tx.commit().map_err(|e| ReportError::new_query("commit", e))?;
    info!(steps = summary.steps.len(), "transaction committed");
    Ok(summary)
}
