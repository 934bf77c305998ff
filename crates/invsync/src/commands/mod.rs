pub mod config_cmd;
pub mod data_sources;
pub mod events;
pub mod run;

use invsync_config::Config;
use invsync_core::Database;

use crate::error::CliError;

/// Opens the configured store, creating its directory on first use.
pub(crate) fn open_database(config: &Config) -> Result<Database, CliError> {
    let path = config.database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Database::open(&path).map_err(|source| CliError::Database {
        path: path.display().to_string(),
        source,
    })
}
