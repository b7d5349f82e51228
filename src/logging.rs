//! Logging utilities wrapping `tracing` initialisation

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Library and binary target whose events a bare level applies to
const CRATE_TARGET: &str = "find_webcams";

/// Initialise the global tracing subscriber according to the provided logging options.
///
/// Events go to stderr so stdout stays reserved for discovery output.
/// Subsequent calls are ignored to avoid reinitialisation panics.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let level = std::env::var("FIND_WEBCAMS_LOG_LEVEL").unwrap_or_else(|_| options.level.clone());
    let env_filter = build_filter(&level)?;

    let subscriber = Registry::default().with(env_filter);
    let (installed, guard) = match file_layer::<LayeredEnvFilter>(options)? {
        Some((file, guard)) => (
            subscriber
                .with(file)
                .with(stderr_layer(options.color))
                .try_init(),
            Some(guard),
        ),
        None => (subscriber.with(stderr_layer(options.color)).try_init(), None),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))?;
    if let Some(guard) = guard {
        // Keep the background writer alive for the life of the process.
        let _ = FILE_GUARD.set(guard);
    }
    Ok(())
}

/// Filter directives for a configured level.
///
/// A bare level such as `debug` applies to this crate only and leaves
/// dependencies at `warn`. Anything else is passed through as directives.
fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.parse::<LevelFilter>().is_ok() {
        format!("warn,{CRATE_TARGET}={level}")
    } else {
        level.to_string()
    }
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    let directives = filter_directives(level);
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

type LayeredEnvFilter = Layered<EnvFilter, Registry>;
type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// File sink plus the guard that flushes its background writer.
///
/// Discovery spans are logged when they close so each run records its timing.
fn file_layer<S>(options: &LoggingOptions) -> Result<Option<(BoxedLayer<S>, WorkerGuard)>>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    let path = match options.file.as_ref() {
        Some(path) => path,
        None => return Ok(None),
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create log directory {}: {e}",
            dir.display()
        ))
    })?;

    let (writer, guard) = match options.rotation {
        Some(rotation) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::Config(format!(
                    "Log file path '{}' must include a filename when rotation is enabled",
                    path.display()
                ))
            })?;

            let appender = match rotation {
                LogRotation::Hourly => rolling::hourly(dir, file_name),
                LogRotation::Daily => rolling::daily(dir, file_name),
            };

            non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(appender)
        }
        None => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {e}", path.display()))
                })?;

            non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(file)
        }
    };

    let layer = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::CLOSE)
        .boxed();
    Ok(Some((layer, guard)))
}

fn stderr_layer<S>(color: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stderr)
        .with_ansi(color)
        .with_target(true)
        .with_level(true)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;
    use std::path::PathBuf;

    fn file_options(file: PathBuf, rotation: Option<LogRotation>) -> LoggingOptions {
        LoggingOptions {
            file: Some(file),
            rotation,
            color: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_bare_level_targets_crate() {
        assert_eq!(filter_directives("debug"), "warn,find_webcams=debug");
        assert_eq!(filter_directives(" TRACE "), "warn,find_webcams=TRACE");
        assert_eq!(
            filter_directives("find_webcams=trace,v4l=debug"),
            "find_webcams=trace,v4l=debug"
        );
        assert!(build_filter("info").is_ok());
        assert!(matches!(
            build_filter("find_webcams=loud"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_plain_file_sink_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("find-webcams.log");

        let layer = file_layer::<Registry>(&file_options(path.clone(), None)).unwrap();
        assert!(layer.is_some());
        assert!(path.is_file());
    }

    #[test]
    fn test_rotating_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("rotated");

        for rotation in [LogRotation::Hourly, LogRotation::Daily] {
            let options = file_options(logs.join("find-webcams.log"), Some(rotation));
            assert!(file_layer::<Registry>(&options).unwrap().is_some());
        }
        assert!(logs.is_dir());
    }

    #[test]
    fn test_rotation_needs_file_name() {
        let options = file_options(PathBuf::from(".."), Some(LogRotation::Daily));
        assert!(matches!(
            file_layer::<Registry>(&options),
            Err(Error::Config(_))
        ));
        assert!(file_layer::<Registry>(&LoggingOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_second_init_is_noop() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("find-webcams.log");

        init(&file_options(path.clone(), None)).unwrap();
        assert!(tracing::dispatcher::has_been_set());
        assert!(path.is_file());
        tracing::info!(target: "find_webcams", "logging initialised");

        let broken = LoggingOptions {
            level: "find_webcams=loud".to_string(),
            ..Default::default()
        };
        assert!(init(&broken).is_ok());
    }
}
