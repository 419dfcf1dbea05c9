use crate::{
    config::ConnectionConfig,
    parameters::{self, ParameterValue},
    query::{ReportPlan, ReportStep},
    report::ReportPrinter,
    result::{BoxError, QueryResult, ReportError, ReportSummary, Result, Row},
};
use std::io::Write;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

// PostgreSQL type OIDs for all column types
const POSTGRES_TYPE_OID_BOOL: u32 = 16;
const POSTGRES_TYPE_OID_INT2: u32 = 21;
const POSTGRES_TYPE_OID_INT4: u32 = 23;
const POSTGRES_TYPE_OID_INT8: u32 = 20;
const POSTGRES_TYPE_OID_FLOAT4: u32 = 700;
const POSTGRES_TYPE_OID_FLOAT8: u32 = 701;
const POSTGRES_TYPE_OID_TEXT: u32 = 25;
const POSTGRES_TYPE_OID_VARCHAR: u32 = 1043;
const POSTGRES_TYPE_OID_BPCHAR: u32 = 1042;
const POSTGRES_TYPE_OID_NAME: u32 = 19;
const POSTGRES_TYPE_OID_JSON: u32 = 114;
const POSTGRES_TYPE_OID_JSONB: u32 = 3802;

/// Convert a generic ParameterValue directly to PostgreSQL ToSql trait object
fn parameter_value_to_postgresql_tosql(
    param_value: ParameterValue,
) -> Result<Box<dyn tokio_postgres::types::ToSql + Sync>> {
    let boxed: Box<dyn tokio_postgres::types::ToSql + Sync> = match param_value {
        ParameterValue::String(s) => Box::new(s),
        // Integer parameters are cast to INTEGER in SQL, so they bind as int4
        ParameterValue::Integer(i) => {
            let value = i32::try_from(i).map_err(|_| {
                let expected = "integer within the PostgreSQL INTEGER range";
                ReportError::new_parameter_type_mismatch(expected, i.to_string())
            })?;
            Box::new(value)
        }
        ParameterValue::Float(f) => Box::new(f),
        ParameterValue::Boolean(b) => Box::new(b),
    };
    Ok(boxed)
}

/// Open a PostgreSQL connection and drive it on a background task.
/// Dropping the returned client closes the connection and ends the task.
pub async fn connect_postgresql(config: &ConnectionConfig) -> Result<Client> {
    let pg_config = config.to_postgres_config()?;
    let (client, connection) = pg_config
        .connect(NoTls)
        .await
        .map_err(|e| ReportError::new_connection(config.describe(), e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!(error = %e, "postgresql connection error");
        }
    });

    info!(target_db = %config.describe(), "connected to postgresql");
    Ok(client)
}

fn to_json_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(Into::into)
}

/// Convert a PostgreSQL column value based on its type OID.
/// NULLs of any supported type become JSON null.
pub fn postgres_type_to_json_conversion(
    column_type: &tokio_postgres::types::Type,
    row: &tokio_postgres::Row,
    idx: usize,
) -> std::result::Result<serde_json::Value, BoxError> {
    let oid = column_type.oid();
    let value = match oid {
        POSTGRES_TYPE_OID_BOOL => to_json_value(row.try_get::<_, Option<bool>>(idx)?)?,
        POSTGRES_TYPE_OID_INT2 => to_json_value(row.try_get::<_, Option<i16>>(idx)?)?,
        POSTGRES_TYPE_OID_INT4 => to_json_value(row.try_get::<_, Option<i32>>(idx)?)?,
        POSTGRES_TYPE_OID_INT8 => to_json_value(row.try_get::<_, Option<i64>>(idx)?)?,
        POSTGRES_TYPE_OID_FLOAT4 => {
            to_json_value(row.try_get::<_, Option<f32>>(idx)?.map(f64::from))?
        }
        POSTGRES_TYPE_OID_FLOAT8 => to_json_value(row.try_get::<_, Option<f64>>(idx)?)?,
        POSTGRES_TYPE_OID_TEXT
        | POSTGRES_TYPE_OID_VARCHAR
        | POSTGRES_TYPE_OID_BPCHAR
        | POSTGRES_TYPE_OID_NAME => to_json_value(row.try_get::<_, Option<String>>(idx)?)?,
        POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
            row.try_get::<_, Option<serde_json::Value>>(idx)?
                .unwrap_or(serde_json::Value::Null)
        }
        _ => {
            // NUMERIC and friends have no decoder here; plan queries cast them to DOUBLE PRECISION
            return Err(format!(
                "unsupported PostgreSQL type {} (OID {oid}) in column '{}'; \
                 cast it to DOUBLE PRECISION or TEXT",
                column_type.name(),
                row.columns()[idx].name()
            )
            .into());
        }
    };
    Ok(value)
}

// Convert a single PostgreSQL row to values ordered by the returned field names
fn row_to_values(
    row: &tokio_postgres::Row,
    returns: &[String],
) -> std::result::Result<Row, BoxError> {
    let columns = row.columns();
    let mut values = Row::with_capacity(returns.len());

    for field_name in returns {
        // Find the column index by matching the column name
        let value = match columns.iter().position(|col| col.name() == field_name) {
            Some(idx) => postgres_type_to_json_conversion(columns[idx].type_(), row, idx)?,
            None => serde_json::Value::Null,
        };
        values.push(value);
    }

    Ok(values)
}

/// Execute a single report step inside the run's transaction
pub async fn execute_step(
    transaction: &tokio_postgres::Transaction<'_>,
    step: &ReportStep,
) -> Result<QueryResult> {
    let query = &step.query;
    let prepared =
        parameters::prepare_statement(&query.sql, &query.parameters, &step.params, |idx| {
            format!("${idx}")
        })?;
    let boxed: Vec<Box<dyn tokio_postgres::types::ToSql + Sync>> = prepared
        .values
        .into_iter()
        .map(parameter_value_to_postgresql_tosql)
        .collect::<Result<_>>()?;
    let positional_params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        boxed.iter().map(|b| b.as_ref()).collect();

    let mut rows_out: Vec<Row> = Vec::new();
    if query.returns.is_empty() {
        let affected = transaction
            .execute(&prepared.sql, &positional_params)
            .await
            .map_err(|e| ReportError::new_query(&step.name, e))?;
        debug!(step = %step.name, affected, "statement executed");
    } else {
        let rows = transaction
            .query(&prepared.sql, &positional_params)
            .await
            .map_err(|e| ReportError::new_query(&step.name, e))?;
        for row in &rows {
            let values = row_to_values(row, &query.returns)
                .map_err(|e| ReportError::new_query(&step.name, e))?;
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

/// Run every step of the plan in one PostgreSQL transaction, printing as it goes.
/// An uncommitted transaction is rolled back when dropped, so a failing step
/// leaves the database as it was.
pub async fn run_report_postgresql<W: Write + ?Sized>(
    client: &mut Client,
    plan: &ReportPlan,
    out: &mut W,
) -> Result<ReportSummary> {
    let transaction = client
        .transaction()
        .await
        .map_err(|e| ReportError::new_query("begin", e))?;
    let mut printer = ReportPrinter::new(out);
    let mut summary = ReportSummary::default();

    for step in &plan.steps {
        info!(step = %step.name, "running step");
        printer.print_label(step)?;
        let result = execute_step(&transaction, step).await?;
        debug!(step = %step.name, rows = result.rows.len(), "step finished");
        printer.print_result(step, &result)?;
        summary.steps.push(result);
    }

    transaction
        .commit()
        .await
        .map_err(|e| ReportError::new_query("commit", e))?;
    info!(steps = summary.steps.len(), "transaction committed");
    Ok(summary)
}
