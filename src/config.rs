use std::path::PathBuf;

use crate::db::DB_FILE;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Resolved service configuration.
///
/// The binary fills this from command-line flags and their environment
/// fallbacks; everything downstream only sees resolved paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Directory holding the database when `db_path` is not given.
    pub data_dir: PathBuf,

    /// Explicit path to the SQLite database file.
    pub db_path: Option<PathBuf>,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_path: None,
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl ServiceConfig {
    /// The database path, falling back to `{data_dir}/records.sqlite3`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DB_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_defaults_under_data_dir() {
        let config = ServiceConfig {
            data_dir: PathBuf::from("/var/lib/records"),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_db_path(),
            PathBuf::from("/var/lib/records/records.sqlite3")
        );
        assert_eq!(config.listen, "0.0.0.0:3000");
    }

    #[test]
    fn explicit_db_path_wins() {
        let config = ServiceConfig {
            db_path: Some(PathBuf::from("/tmp/other.sqlite3")),
            ..Default::default()
        };
        assert_eq!(config.resolve_db_path(), PathBuf::from("/tmp/other.sqlite3"));
    }
}
