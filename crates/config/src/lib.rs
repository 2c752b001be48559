#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

pub mod args;
pub mod file;

use std::{path::Path, time::Duration};

use args::{AppMode, ArgsConfig};
use error_stack::{Result, ResultExt};
use file::{
    ConfigFile, DatabaseConfig, GeneralConfig, NotificationConfig, PipelineConfig, QueriesConfig,
};
use utils::ContextExt;

#[derive(thiserror::Error, Debug)]
pub enum GetConfigError {
    #[error("File loading failed")]
    LoadFileError,
    #[error("Environment variable is missing")]
    EnvironmentVariableMissing,
    #[error("Invalid configuration")]
    InvalidConfiguration,
}

#[derive(Debug, Clone)]
pub struct Config {
    file: ConfigFile,
    mode: Option<AppMode>,
}

impl Config {
    /// Config without a command line mode. Used by tests and embedding
    /// code.
    pub fn from_file(file: ConfigFile) -> Result<Self, GetConfigError> {
        file.validate()
            .change_context(GetConfigError::InvalidConfiguration)?;
        Ok(Self { file, mode: None })
    }

    pub fn general(&self) -> &GeneralConfig {
        &self.file.general
    }

    pub fn debug_mode(&self) -> bool {
        self.file.general.debug
    }

    pub fn log_timestamp(&self) -> bool {
        self.file.general.log_timestamp.unwrap_or(true)
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.file.database
    }

    pub fn data_dir(&self) -> &Path {
        &self.file.database.dir
    }

    pub fn sqlite_in_ram(&self) -> bool {
        self.file.database.sqlite_in_ram
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.file.pipeline
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.file.pipeline.validator_timeout_seconds.into())
    }

    pub fn total_deadline(&self) -> Duration {
        Duration::from_secs(self.file.pipeline.total_deadline_seconds.into())
    }

    pub fn notifications(&self) -> &NotificationConfig {
        &self.file.notifications
    }

    pub fn queries(&self) -> &QueriesConfig {
        &self.file.queries
    }

    pub fn current_mode(&self) -> Option<&AppMode> {
        self.mode.as_ref()
    }
}

pub fn get_config(
    args_config: ArgsConfig,
    save_default_config_if_not_found: bool,
) -> Result<Config, GetConfigError> {
    let mut file = ConfigFile::load(&args_config.config_file, save_default_config_if_not_found)
        .change_context(GetConfigError::LoadFileError)?;

    if let Some(dir) = args_config.data_dir {
        file.database.dir = dir;
    }

    if args_config.sqlite_in_ram {
        file.database.sqlite_in_ram = true;
    }

    if let Some(env) = &file.pipeline.ai_validator.api_key_env {
        if std::env::var_os(env).is_none() {
            return Err(GetConfigError::EnvironmentVariableMissing.report())
                .attach_printable(format!("AI validator API key variable {env} is not set"));
        }
    }

    let mut config = Config::from_file(file)?;
    config.mode = Some(args_config.mode);
    Ok(config)
}
