//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; applications embedding the
//! executor call `init_logging` once at startup to print them.

use crate::config::LoggingConfig;

/// Install a global `fmt` subscriber configured from `config`.
///
/// Returns false when a global subscriber was already installed, in which case
/// the existing one is left in place.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_thread_ids(true);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
            format: "json".to_string(),
        };
        init_logging(&config);
        assert!(!init_logging(&LoggingConfig::default()));
    }
}
