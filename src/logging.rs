//! Logging setup (§A ambient stack): `log` + `simplelog`, a terminal logger
//! and a per-run log file combined via `CombinedLogger`, grounded directly
//! on the teacher's `simulation_builder.rs::log_setup`.

use std::fs::{self, File};
use std::path::Path;

use chrono::Local;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelPadding, SharedLogger, TermLogger, TerminalMode, WriteLogger};

/// Maps a `-V`-repeat-count verbosity to a `log` level, the same three-step
/// ladder the teacher's `get_log_level` uses.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initializes the global logger: colored terminal output plus a write-only
/// copy under `output_dir/logs/run_<timestamp>.log`. Call once, before the
/// run driver starts.
pub fn init(output_dir: &Path, verbosity: u8) -> std::io::Result<()> {
    let level = level_for_verbosity(verbosity);
    let log_dir = output_dir.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("run_{}.log", Local::now().format("%Y%m%d_%H%M%S")));

    let config = ConfigBuilder::default().set_level_padding(LevelPadding::Right).build();

    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, config, File::create(log_path)?),
    ];
    CombinedLogger::init(loggers).unwrap_or_else(|e| {
        log::warn!("logger already initialized: {e}");
    });
    Ok(())
}

/// Initializes a terminal-only logger, for tests and benches that never
/// write an output directory.
pub fn init_for_tests(level: LevelFilter) {
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_the_expected_ladder() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Info);
        assert_eq!(level_for_verbosity(1), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(5), LevelFilter::Trace);
    }
}
