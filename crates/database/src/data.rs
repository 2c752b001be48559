use std::{fs, path::PathBuf};

use config::file::DatabaseConfig;
use error_stack::{Result, ResultExt};

use crate::diesel_db::{DatabaseLocation, DieselDatabaseError};

pub const SQLITE_DIR_NAME: &str = "sqlite";
pub const REPORT_DATABASE_NAME: &str = "reports";

pub fn create_dirs_and_get_sqlite_database_file_path(
    config: &DatabaseConfig,
) -> Result<PathBuf, DieselDatabaseError> {
    let root = config.dir.clone();
    if !root.exists() {
        fs::create_dir_all(&root).change_context(DieselDatabaseError::File)?;
    }

    let sqlite = root.join(SQLITE_DIR_NAME);
    if !sqlite.exists() {
        fs::create_dir(&sqlite).change_context(DieselDatabaseError::File)?;
    }

    Ok(sqlite.join(format!("{}.db", REPORT_DATABASE_NAME)))
}

/// Database location from config. Directories are created only for
/// file databases.
pub fn database_location(config: &DatabaseConfig) -> Result<DatabaseLocation, DieselDatabaseError> {
    if config.sqlite_in_ram {
        Ok(DatabaseLocation::InRam {
            name: REPORT_DATABASE_NAME.to_string(),
        })
    } else {
        create_dirs_and_get_sqlite_database_file_path(config).map(DatabaseLocation::File)
    }
}
