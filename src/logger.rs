//! Provides configuration of the logger.
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Maps `-v` repetitions to a level. Warnings are always shown.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Configures the log with the specified verbosity.
///
/// `CBP_LOG` overrides the level with the usual `env_logger` filter syntax.
pub fn configure(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level_for(verbosity))
        .parse_env("CBP_LOG");
    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
