use crate::config::LoggingConfig;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::str::FromStr;

/// Installs the global logger. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), log::SetLoggerError> {
    SimpleLogger::new()
        .with_level(parse_level(&config.level))
        .env()
        .init()?;
    log::debug!("logging initialized at {}", config.level);
    Ok(())
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("loud"), LevelFilter::Info);
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
    }
}
