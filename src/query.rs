mod query_def;
mod report_plan;

pub use query_def::{FetchMode, QueryDef};
pub use report_plan::{ReportPlan, ReportStep};
