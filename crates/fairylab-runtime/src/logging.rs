//! Subscriber setup for the `[logging]` section.
//!
//! When `RUST_LOG` is set it is used verbatim. Otherwise the filter starts at
//! `level`, quiets the HTTP and WebSocket stacks to `warn`, then applies
//! `[logging.filters]`, which win over those defaults.
//!
//! `trace_hooks = true` enables the kernel's `dispatch` spans and logs one
//! line as each closes, carrying the plugin, the hook and the time it took.

use std::ffi::OsStr;
use std::path::Path;

use fairylab_framework::DISPATCH_TARGET;
use tracing::{Subscriber, debug};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig};

/// Dependencies that are chatty below `warn`.
const QUIET_TARGETS: &[&str] = &[
    "hyper_util",
    "reqwest",
    "rustls",
    "tungstenite",
    "tokio_tungstenite",
];

const DEFAULT_LOG_FILE: &str = "fairylab.log";

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed (a test harness, or an embedding
/// binary) is kept. Fails only when the log file cannot be opened.
pub fn init_from_config(config: &LoggingConfig) -> Result<(), InitError> {
    let writer = make_writer(config)?;
    let installed = tracing_subscriber::registry()
        .with(fmt_layer(config, writer))
        .with(build_filter(config))
        .try_init()
        .is_ok();
    if !installed {
        debug!("Tracing subscriber already installed, keeping it");
    }
    Ok(())
}

/// Filter directives applied on top of the base level, lowest precedence
/// first.
fn directives(config: &LoggingConfig) -> Vec<String> {
    let mut directives: Vec<String> = QUIET_TARGETS
        .iter()
        .map(|target| format!("{target}=warn"))
        .collect();
    if config.trace_hooks {
        directives.push(format!("{DISPATCH_TARGET}=debug"));
    }

    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort_by(|a, b| a.0.cmp(b.0));
    directives.extend(
        filters
            .into_iter()
            .map(|(target, level)| format!("{target}={level}")),
    );
    directives
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    directives(config)
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::new(config.level.as_str()), EnvFilter::add_directive)
}

fn span_events(config: &LoggingConfig) -> FmtSpan {
    if config.trace_hooks {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn fmt_layer<S>(config: &LoggingConfig, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events(config))
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        #[cfg(not(feature = "json-log"))]
        LogFormat::Json => layer.compact().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn make_writer(config: &LoggingConfig) -> Result<BoxMakeWriter, InitError> {
    let path = match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => return Ok(BoxMakeWriter::new(std::io::stdout)),
        (LogOutput::Stderr, _) => return Ok(BoxMakeWriter::new(std::io::stderr)),
        // Rejected by validation; kept usable for hand-built configs.
        (LogOutput::File, None) => return Ok(BoxMakeWriter::new(std::io::stderr)),
        (LogOutput::File, Some(path)) => path,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)?;
    Ok(BoxMakeWriter::new(appender))
}
