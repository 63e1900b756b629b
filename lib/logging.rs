use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::build_info;

/// Output format for runtime logs. JSON is the default because both workers run
/// under log collectors; `text` is the local-debugging escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Resolves the format from `LOG_FORMAT`; anything unrecognized stays JSON.
    fn from_env() -> Self {
        Self::resolve(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn resolve(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "text" => Self::Text,
            _ => Self::Json,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// Per-run logging identity, attached to the worker's run span so every event can
/// be correlated back to one process invocation and one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingContext {
    pub service: String,
    pub mode: String,
    pub environment: String,
    pub run_id: String,
    pub build_version: String,
    pub build_commit: String,
    pub format: LogFormat,
}

/// Installs the process-wide subscriber and returns the identity that the caller
/// attaches to its run span.
///
/// The `log` bridge is installed first so SDK-internal `log` records land in the
/// same subscriber. `RUST_LOG` wins over `default_level` when set.
pub fn init_logging(service: &str, mode: &str, default_level: &str) -> LoggingContext {
    let format = LogFormat::from_env();
    install_tracing(format, default_level);

    let context = LoggingContext {
        service: service.to_string(),
        mode: mode.to_string(),
        environment: resolve_environment(),
        run_id: next_run_id(service, mode),
        build_version: build_info::VERSION.to_string(),
        build_commit: build_info::short_commit_hash().to_string(),
        format,
    };

    tracing::info!(
        event = "logging_ready",
        service = %context.service,
        environment = %context.environment,
        mode = %context.mode,
        run_id = %context.run_id,
        build_version = %context.build_version,
        build_commit = %context.build_commit,
        log_format = context.format.as_str(),
        "logging ready"
    );

    context
}

fn install_tracing(format: LogFormat, default_level: &str) {
    let _ = LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Newline-delimited JSON with flattened event fields is what the collectors
    // downstream expect; the text layer is intentionally plain.
    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn resolve_environment() -> String {
    std::env::var("APP_ENV")
        .or_else(|_| std::env::var("ENVIRONMENT"))
        .unwrap_or_else(|_| "dev".to_string())
}

/// Run ids are `{service}-{mode}-{pid}-{epoch_millis}`: unique enough to tell two
/// invocations apart, and readable enough to grep by hand.
fn next_run_id(service: &str, mode: &str) -> String {
    let epoch_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{service}-{mode}-{}-{epoch_millis}", process::id())
}
