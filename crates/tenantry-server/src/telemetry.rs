//! Logging setup

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LoggingConfig;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter: the configured level, with sqlx held at WARN unless
/// SQL query logging is enabled.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(parse_level(&config.level).to_string());

    if !config.log_sql_queries {
        match "sqlx=warn".parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Warning: failed to set sqlx log filter: {}", e),
        }
    }
    filter
}

/// Install the global subscriber
pub fn init_tracing(
    config: &LoggingConfig,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let builder = FmtSubscriber::builder().with_env_filter(env_filter(config));

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_sqlx_quieted_by_default() {
        let filter = env_filter(&LoggingConfig::default());
        assert!(filter.to_string().contains("sqlx=warn"));

        let filter = env_filter(&LoggingConfig {
            log_sql_queries: true,
            ..Default::default()
        });
        assert!(!filter.to_string().contains("sqlx"));
    }
}
