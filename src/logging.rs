use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

// Don't need debug level logging for hyper/reqwest
#[cfg(not(debug_assertions))]
const DEFAULT_FILTER: &str = "teya=INFO,hyper=WARN,reqwest=WARN";
#[cfg(debug_assertions)]
const DEFAULT_FILTER: &str = "teya=DEBUG,hyper=WARN,reqwest=WARN";

/// `RUST_LOG` when set and valid, the built-in levels otherwise.
fn build_filter(rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = rust_log {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!("ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e),
        }
    }
    Ok(EnvFilter::try_new(DEFAULT_FILTER)?)
}

/// Log to a daily rolling file. The terminal belongs to the UI, so nothing
/// is written to stdout/stderr. Keep the guard alive until exit.
pub fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "teya.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref())?;

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_ansi(false).with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_builtin_level() {
        let filter = build_filter(Some("teya=trace")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_builtin_level_without_rust_log() {
        let filter = build_filter(None).unwrap();
        assert_ne!(filter.max_level_hint(), Some(LevelFilter::TRACE));
        assert!(filter.max_level_hint().is_some());
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        let filter = build_filter(Some("teya=verbose")).unwrap();
        assert_ne!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
