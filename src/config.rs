use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "A file-backed record store driven by a small command language",
    long_about = None
)]
pub struct Config {
    /// Directory holding db_meta.json and the data/ table documents
    #[arg(long, env = "PRIMITIVE_DB_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Terminal log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = LevelFilter::Warn)]
    pub log_level: LevelFilter,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Log how long each command takes
    #[arg(long)]
    pub timing: bool,
}

/// Terminal logging only; locations, targets and threads are noise for
/// a single-user shell.
pub fn log(level: LevelFilter) -> anyhow::Result<()> {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["primitive_db"]).unwrap();
        assert_eq!(config.log_level, LevelFilter::Warn);
        assert!(!config.yes);
        assert!(!config.timing);
    }

    #[test]
    fn flags() {
        let config = Config::try_parse_from([
            "primitive_db",
            "--data-dir",
            "/tmp/db",
            "--log-level",
            "debug",
            "-y",
            "--timing",
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/db"));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(config.yes);
        assert!(config.timing);
    }
}
