//! Command-line driver for the HSV QALY-loss model
//!
//! Loads a YAML run configuration and life tables, runs the HSV-1, HSV-2 and
//! neonatal PSA analyses from `hsvqaly_core`, and writes JSON results.

pub mod config;
pub mod logging;
pub mod output;
pub mod runner;

pub use config::{Analysis, ConfigError, RunConfig};
pub use logging::init_logging;
pub use output::write_results;
pub use runner::{Report, Results, log_report, run_analyses};
