//! Logging backends for the kernel counter.
//!
//! Every pipeline stage logs through the `log` facade: sizes and object
//! counts at `debug` (`h-dome`, `watershed`, `bottom edge`, `k-means`), and
//! the batch runner warns once per skipped image. The `kernel-counter`
//! binary installs one of two backends:
//!
//! - `init_with_level`: stderr lines tagged with elapsed time, level and the
//!   pipeline stage (`[  0.412s DEBUG watershed] ...`);
//! - `init_tracing` (feature `tracing`): a `tracing-subscriber` pipeline that
//!   also reports stage spans and receives the `log` records.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            stage_name(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Last path segment of a log target: `kernel_counter_core::watershed` -> `watershed`.
fn stage_name(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG` (default
/// `info`) and forward `log` records into it.
///
/// Stage spans are reported when they close, so per-stage timings show up
/// in the output.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = if json {
        let subscriber = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };
    if installed {
        let _ = tracing_log::LogTracer::init();
    }
}
