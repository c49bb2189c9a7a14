use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file written inside the output directory
pub const LOG_FILE: &str = "hsvqaly.log";

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    format!("hsvqaly={level},hsvqaly_core=warn")
}

/// Initialize logging to stderr and to `{output_dir}/hsvqaly.log`.
///
/// The log level can be controlled via the `level` parameter or the `RUST_LOG`
/// environment variable. The returned guard flushes the file writer on drop and
/// must be held for the whole run.
pub fn init_logging(output_dir: &Path, level: &str) -> color_eyre::Result<WorkerGuard> {
    std::fs::create_dir_all(output_dir)?;

    let appender = tracing_appender::rolling::never(output_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;

    tracing::info!(
        "hsvqaly logging initialized (log_path={})",
        output_dir.join(LOG_FILE).display()
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_core() {
        assert_eq!(default_filter("debug"), "hsvqaly=debug,hsvqaly_core=warn");
        assert!(EnvFilter::try_new(default_filter("info")).is_ok());
    }
}
