//! Configuration resolution: paths to the units database and ingestion
//! schema directories are resolved via explicit calls first, then
//! environment variables, then an executable-relative fallback.

use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Config {
    units_database_path: Option<PathBuf>,
    schema_search_path: Option<PathBuf>,
}

const UNITS_DB_ENV: &str = "HARP_UNITS_DATABASE";
const SCHEMA_PATH_ENV: &str = "HARP_SCHEMA_PATH";

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn with_units_database_path(mut self, path: impl Into<PathBuf>) -> Config {
        self.units_database_path = Some(path.into());
        self
    }

    pub fn with_schema_search_path(mut self, path: impl Into<PathBuf>) -> Config {
        self.schema_search_path = Some(path.into());
        self
    }

    /// Resolution order: explicit configuration, then environment
    /// variable, then a path next to the running executable.
    pub fn units_database_path(&self) -> Option<PathBuf> {
        self.units_database_path
            .clone()
            .or_else(|| env::var_os(UNITS_DB_ENV).map(PathBuf::from))
            .or_else(|| executable_relative("units.db"))
    }

    pub fn schema_search_path(&self) -> Option<PathBuf> {
        self.schema_search_path
            .clone()
            .or_else(|| env::var_os(SCHEMA_PATH_ENV).map(PathBuf::from))
            .or_else(|| executable_relative("schemas"))
    }
}

fn executable_relative(name: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir: &Path = exe.parent()?;
    Some(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_wins_over_environment() {
        let cfg = Config::new().with_units_database_path("/explicit/units.db");
        assert_eq!(
            cfg.units_database_path(),
            Some(PathBuf::from("/explicit/units.db"))
        );
    }
}
