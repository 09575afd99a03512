use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing::Span;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FAMILY: &str = "pin";
const LOG_SUFFIX: &str = "log";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Holds the log writer open and the `run` span every subcommand executes in.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
    run_span: Span,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_span(&self) -> &Span {
        &self.run_span
    }
}

/// Installs the subscriber for one invocation of `command`.
///
/// Records go to `<dir>/pin-<command>.<date>.log` as JSON. Every record
/// carries the `run` span with the run id and the subcommand name.
pub fn init_tracing(logging_config: &LoggingConfig, command: &str) -> Result<LoggingGuard> {
    let files = RunLogFiles::for_command(&logging_config.dir, command)?;
    fs::create_dir_all(&files.dir)
        .with_context(|| format!("failed to create logging directory {}", files.dir.display()))?;

    let purged = files.purge_expired(logging_config.retention_days, SystemTime::now());
    let appender = files.appender(&logging_config.rotation)?;
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(parse_filter(&logging_config.filter)?);

    // Warnings only; progress lines share stderr.
    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .compact()
            .without_time()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    let run_span = tracing::info_span!(target: "pin", "run", run_id = %run_id, command);
    run_span.in_scope(|| {
        tracing::info!(
            target: "logging",
            file_prefix = %files.prefix,
            dir = %files.dir.display(),
            rotation = ?logging_config.rotation,
            expired_removed = purged.removed.len(),
            "logging_initialized"
        );
        for warning in &purged.warnings {
            tracing::warn!(target: "logging", warning = %warning, "log_retention_warning");
        }
    });

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
        run_span,
    })
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

/// The rolling files of one subcommand inside the shared log directory.
#[derive(Debug, PartialEq, Eq)]
struct RunLogFiles {
    dir: PathBuf,
    prefix: String,
}

impl RunLogFiles {
    fn for_command(dir: &Path, command: &str) -> Result<Self> {
        if dir.as_os_str().is_empty() {
            return Err(anyhow!("logging.dir cannot be empty"));
        }
        if command.is_empty() || !command.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(anyhow!("invalid log file command name '{command}'"));
        }

        let dir = std::path::absolute(dir)
            .with_context(|| format!("failed to resolve logging.dir {}", dir.display()))?;
        Ok(Self {
            dir,
            prefix: format!("{LOG_FAMILY}-{command}"),
        })
    }

    fn appender(&self, rotation: &LoggingRotation) -> Result<RollingFileAppender> {
        let rotation = match rotation {
            LoggingRotation::Daily => Rotation::DAILY,
            LoggingRotation::Hourly => Rotation::HOURLY,
        };
        RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(&self.prefix)
            .filename_suffix(LOG_SUFFIX)
            .build(&self.dir)
            .with_context(|| format!("failed to open log file in {}", self.dir.display()))
    }

    /// Removes rolled files of any subcommand last written before the window.
    fn purge_expired(&self, retention_days: usize, now: SystemTime) -> PurgeReport {
        let window = Duration::from_secs((retention_days as u64).saturating_mul(SECS_PER_DAY));
        let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);

        let mut report = PurgeReport::default();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                report
                    .warnings
                    .push(format!("failed to scan {}: {err}", self.dir.display()));
                return report;
            }
        };

        for entry in entries.flatten() {
            if !is_family_log(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            let modified = entry
                .metadata()
                .and_then(|metadata| metadata.modified().map(|at| (metadata.is_file(), at)));
            match modified {
                Ok((true, at)) if at <= cutoff => match fs::remove_file(&path) {
                    Ok(()) => report.removed.push(path),
                    Err(err) => report
                        .warnings
                        .push(format!("failed to remove {}: {err}", path.display())),
                },
                Ok(_) => {}
                Err(err) => report
                    .warnings
                    .push(format!("failed to stat {}: {err}", path.display())),
            }
        }
        report
    }
}

fn is_family_log(file_name: &str) -> bool {
    file_name.starts_with(&format!("{LOG_FAMILY}-"))
        && file_name.ends_with(&format!(".{LOG_SUFFIX}"))
}

#[derive(Debug, Default)]
struct PurgeReport {
    removed: Vec<PathBuf>,
    warnings: Vec<String>,
}
