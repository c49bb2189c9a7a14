use std::path::PathBuf;

use clap::Parser;
use hsvqaly::{Analysis, RunConfig, init_logging, log_report, run_analyses, write_results};

#[derive(Parser, Debug)]
#[command(name = "hsvqaly")]
#[command(about = "QALY losses of genital and neonatal herpes under probabilistic sensitivity analysis")]
struct Args {
    /// Path to a YAML run configuration (default: published parameters)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for results and the log file
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Analyses to run
    #[arg(short, long, value_enum, default_value_t = Analysis::All)]
    analysis: Analysis,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(&args.output_dir, &args.log_level)?;

    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let tables = config.life_tables()?;
    tracing::info!(
        num_psa = config.num_psa,
        analysis = ?args.analysis,
        custom_life_tables = config.life_tables.is_some(),
        "starting run"
    );

    let results = run_analyses(&config, args.analysis, &tables)?;
    let report = results.report(&config);
    log_report(&report);

    let written = write_results(&args.output_dir, &report, &results)?;
    for path in &written {
        tracing::info!("wrote {}", path.display());
    }

    Ok(())
}
