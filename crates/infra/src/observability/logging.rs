//! Logging setup powered by `tracing-subscriber`

use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_DIRECTIVES: &str = "info,reqwest=warn,hyper=warn";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// JSON Lines for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to [`LogFormat::Pretty`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Pretty,
        })
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is left in place, so calling this more than once is harmless.
pub fn init_tracing(format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter());

    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(?format, "tracing initialized");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" JSONL ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("whatever".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        init_tracing(LogFormat::Pretty);
        assert!(!init_tracing(LogFormat::Json));
    }
}
