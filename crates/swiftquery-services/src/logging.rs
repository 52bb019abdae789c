//! Tracing subscriber setup
//!
//! Console output goes to stderr; file output is JSON, rolled daily under
//! the log directory so a run's cell executions can be attached to a bug
//! report. `RUST_LOG` replaces the configured directives when set.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Crates whose events are raised above the base level
const WORKBENCH_TARGETS: [&str; 3] = ["swiftquery_core", "swiftquery_query", "swiftquery_services"];

const LOG_FILE_PREFIX: &str = "workbench.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How events are printed to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStyle {
    Off,
    /// Multi-line, with span fields; for interactive debugging
    Pretty,
    /// One line per event
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// JSON file output directory; `None` disables file output
    pub file_dir: Option<PathBuf>,
    pub console: ConsoleStyle,
    /// Emit span close events, which carry `time.busy`/`time.idle` for
    /// each `execute_cell` span
    pub span_timing: bool,
    pub source_location: bool,
    /// Directives used when `RUST_LOG` is unset
    pub directives: String,
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self {
            file_dir: Some(log_directory()),
            console: ConsoleStyle::Pretty,
            span_timing: true,
            source_location: true,
            directives: directives("info", "debug"),
        }
    }

    /// File output only
    pub fn production() -> Self {
        Self {
            file_dir: Some(log_directory()),
            console: ConsoleStyle::Off,
            span_timing: false,
            source_location: false,
            directives: directives("warn", "info"),
        }
    }

    /// Compact console output, nothing on disk
    pub fn testing() -> Self {
        Self {
            file_dir: None,
            console: ConsoleStyle::Compact,
            span_timing: true,
            source_location: true,
            directives: "debug".to_string(),
        }
    }

    pub fn with_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.directives))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// `"<base>,swiftquery_core=<workbench>,..."`
fn directives(base: &str, workbench: &str) -> String {
    WORKBENCH_TARGETS
        .iter()
        .fold(base.to_string(), |mut acc, target| {
            acc.push(',');
            acc.push_str(target);
            acc.push('=');
            acc.push_str(workbench);
            acc
        })
}

fn console_layer(config: &LoggingConfig) -> Option<BoxedLayer> {
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(config.span_events());

    let layer = match config.console {
        ConsoleStyle::Off => return None,
        ConsoleStyle::Pretty => base.pretty().with_filter(config.filter()).boxed(),
        ConsoleStyle::Compact => base.compact().with_filter(config.filter()).boxed(),
    };
    Some(layer)
}

fn file_layer(config: &LoggingConfig, dir: &Path) -> anyhow::Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
    let layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(config.span_events())
        .with_writer(writer)
        .with_filter(config.filter())
        .boxed();
    Ok((layer, guard))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process. Fails if the log directory cannot be created or a
/// subscriber is already installed.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.extend(console_layer(&config));

    let guard = match &config.file_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(&config, dir)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        file_dir = ?config.file_dir,
        console = ?config.console,
        "logging initialized"
    );
    Ok(guard)
}

/// Development setup in debug builds, production otherwise
pub fn init_default() -> anyhow::Result<Option<WorkerGuard>> {
    if cfg!(debug_assertions) {
        init(LoggingConfig::development())
    } else {
        init(LoggingConfig::production())
    }
}

/// `<data_local_dir>/swiftquery/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("swiftquery")
        .join("logs")
}
