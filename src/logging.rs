/// Subscriber setup for the binary. The library only emits through
/// `tracing` and never installs a subscriber itself.
use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "combat_ledger_analyzer=info";
const LOG_FILE: &str = "analyzer.log";

fn filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?))
}

/// Log to stderr, or to a daily rolling file under `log_dir` when given.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// life of the process.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter()?)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter()?)
        .with_writer(non_blocking)
        .with_ansi(false) // no colour codes in log files
        .init();

    // Panics would otherwise only reach stderr.
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));

    tracing::info!("Logging to {}", dir.display());
    Ok(Some(guard))
}
