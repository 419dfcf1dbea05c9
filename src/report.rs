//! Console rendering of report steps.
//!
//! Every step prints a blank line and its label; `fetch = all` steps then
//! print one tuple per row, `fetch = one` steps print the prefix and the first
//! row if there was one.

use crate::{
    query::{FetchMode, ReportStep},
    result::{QueryResult, Result},
    str_utils::quote_for_display,
};
use std::io::Write;

/// Writes report output to any `Write` sink
pub struct ReportPrinter<'a, W: Write + ?Sized> {
    out: &'a mut W,
}

impl<'a, W: Write + ?Sized> ReportPrinter<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self { out }
    }

    pub fn print_label(&mut self, step: &ReportStep) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", step.label)?;
        Ok(())
    }

    pub fn print_result(&mut self, step: &ReportStep, result: &QueryResult) -> Result<()> {
        match step.fetch {
            FetchMode::All => {
                for row in &result.rows {
                    writeln!(self.out, "{}", format_row(row))?;
                }
            }
            FetchMode::One => {
                // Zero rows (no match) prints nothing
                if let Some(row) = result.rows.first() {
                    match &step.prefix {
                        Some(prefix) => writeln!(self.out, "{prefix} {}", format_row(row))?,
                        None => writeln!(self.out, "{}", format_row(row))?,
                    }
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Render a single value: strings quoted, NULL as `None`
pub fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".to_string(),
        serde_json::Value::String(s) => quote_for_display(s),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.is_finite() => format!("{f:.1}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Render a row as a tuple in column order
pub fn format_row(row: &[serde_json::Value]) -> String {
    let fields: Vec<String> = row.iter().map(format_value).collect();
    if fields.len() == 1 {
        format!("({},)", fields[0])
    } else {
        format!("({})", fields.join(", "))
    }
}
