//! Tracing setup for hosts that drive signing runs.
//!
//! The library only emits events; installing a subscriber is left to the
//! host, which calls [`init_tracing`] once. Filtering follows `RUST_LOG`
//! and defaults to `info`.

use std::str::FromStr;
use std::sync::Once;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for interactive builds
    #[default]
    Text,
    /// One JSON object per event, for build-log ingestion
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call has an effect. A subscriber installed elsewhere
/// takes precedence and is left alone.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match format {
            LogFormat::Text => registry
                .with(fmt::layer().with_span_events(FmtSpan::CLOSE).with_target(false))
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .try_init(),
        };
        if installed.is_ok() {
            info!(?format, "tracing initialized");
        }
    });
}

/// Span around one unit of signing work
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Log an error with context and hand it back
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "operation failed");
        e
    }};
    ($err:expr, $context:expr) => {{
        let e = $err;
        tracing::error!(error = %e, context = $context, "operation failed");
        e
    }};
}
