use anyhow::Context;
use clap::Parser;
use restaurant_report::{
    ConnectionConfig, ReportPlan, ReportSummary, connect_postgresql, load_env_file,
    logging::init_logging, open_sqlite, run_report_postgresql, run_report_sqlite,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run the restaurants report against PostgreSQL (or a SQLite file)
#[derive(Parser, Debug)]
#[command(name = "restaurant-report", version, about)]
struct Cli {
    /// dotenv file loaded before resolving DB_* / PG* variables; ignored if absent
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Report plan (JSON) to run instead of the built-in one
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Run against this SQLite database file instead of PostgreSQL
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Print the collected results as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // The env file may set RUST_LOG, so it is read before logging starts
    let env_loaded = load_env_file(&cli.env_file)
        .with_context(|| format!("loading env file {}", cli.env_file.display()))?;
    init_logging(&cli.log_level);
    debug!(path = %cli.env_file.display(), loaded = env_loaded, "env file");

    let plan = match &cli.plan {
        Some(path) => ReportPlan::from_file(path)
            .with_context(|| format!("loading report plan {}", path.display()))?,
        None => ReportPlan::restaurants().context("loading built-in report plan")?,
    };

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    let mut sink = std::io::sink();
    let out: &mut dyn Write = if cli.json { &mut sink } else { &mut stdout };

    let summary = match &cli.sqlite {
        Some(path) => run_sqlite(path, &plan, out)?,
        None => run_postgresql(&plan, out).await?,
    };

    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "\nDone.")?;
    }
    Ok(())
}

fn run_sqlite(
    path: &Path,
    plan: &ReportPlan,
    out: &mut dyn Write,
) -> anyhow::Result<ReportSummary> {
    writeln!(out, "Opening SQLite database {} ...", path.display())?;
    let mut conn = open_sqlite(path)?;
    let summary = run_report_sqlite(&mut conn, plan, out).context("report run failed")?;
    info!(steps = summary.steps.len(), "report finished");
    Ok(summary)
}

async fn run_postgresql(plan: &ReportPlan, out: &mut dyn Write) -> anyhow::Result<ReportSummary> {
    let config = ConnectionConfig::from_env();

    writeln!(out, "Connecting to {} ...", config.describe())?;
    let mut client = connect_postgresql(&config).await?;
    let summary = run_report_postgresql(&mut client, plan, out)
        .await
        .context("report run failed")?;
    info!(steps = summary.steps.len(), "report finished");
    Ok(summary)
}
