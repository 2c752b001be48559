use std::{
    io::Write,
    num::NonZeroU8,
    path::{Path, PathBuf},
};

use error_stack::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use url::Url;
use utils::ContextExt;

pub const CONFIG_FILE_NAME: &str = "incident_config.toml";

pub const DEFAULT_CONFIG_FILE_TEXT: &str = r#"

# [general]
# debug = false
# log_timestamp = true

[database]
dir = "data"
# sqlite_in_ram = false
# read_connections = 4

[pipeline]
# "fast" runs only the AI text validator. "full" runs also the ML
# disaster classifier and the optional ML spam classifier.
mode = "fast"
# "sequential" or "concurrent"
execution = "sequential"
validator_timeout_seconds = 10
total_deadline_seconds = 20

[pipeline.ai_validator]
openai_api_url = "http://127.0.0.1:11434/v1"
model = "llama3.2"
# api_key_env = "OPENAI_API_KEY"
# expected_response = "yes"
# rejected_response = "no"
# max_tokens = 10
# retry_wait_times_in_seconds = [1]
# debug_log_results = false

# [pipeline.disaster_classifier]
# positive_label = "verified"
# negative_label = "not_verified"
# [pipeline.disaster_classifier.backend]
# type = "subprocess"
# program = "python3"
# args = ["python/disaster_classifier.py"]

# [pipeline.spam_classifier]
# positive_label = "spam"
# negative_label = "not_spam"
# [pipeline.spam_classifier.backend]
# type = "http"
# url = "http://127.0.0.1:5000/spam"

# [notifications]
# enabled = true
# sink = "database"

# [queries]
# urgent_after_hours = 5

"#;

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Save default")]
    SaveDefault,
    #[error("Save")]
    Save,
    #[error("Load config file")]
    LoadConfig,
    #[error("Invalid config")]
    InvalidConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
}

impl ConfigFile {
    /// Load config file. If the file does not exist and `save_default` is
    /// true, the default config file is written first.
    pub fn load(file: impl AsRef<Path>, save_default: bool) -> Result<ConfigFile, ConfigFileError> {
        let file = file.as_ref();
        if !file.exists() && save_default {
            ConfigFileUtils::save_string(file, DEFAULT_CONFIG_FILE_TEXT)
                .change_context(ConfigFileError::SaveDefault)?;
        }
        let config_string =
            std::fs::read_to_string(file).change_context(ConfigFileError::LoadConfig)?;
        Self::parse(&config_string).attach_printable_lazy(|| file.display().to_string())
    }

    pub fn parse(config_string: &str) -> Result<ConfigFile, ConfigFileError> {
        let config: ConfigFile =
            toml::from_str(config_string).change_context(ConfigFileError::LoadConfig)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let pipeline = &self.pipeline;
        match pipeline.mode {
            PipelineMode::Full if pipeline.disaster_classifier.is_none() => {
                return Err(ConfigFileError::InvalidConfig.report())
                    .attach_printable("Full pipeline mode requires disaster_classifier config");
            }
            PipelineMode::Fast
                if pipeline.disaster_classifier.is_some() || pipeline.spam_classifier.is_some() =>
            {
                return Err(ConfigFileError::InvalidConfig.report()).attach_printable(
                    "ML classifiers are configured but fast pipeline mode does not use them",
                );
            }
            _ => (),
        }

        if pipeline.validator_timeout_seconds == 0 {
            return Err(ConfigFileError::InvalidConfig.report())
                .attach_printable("validator_timeout_seconds must be larger than zero");
        }

        if pipeline.total_deadline_seconds < pipeline.validator_timeout_seconds {
            return Err(ConfigFileError::InvalidConfig.report()).attach_printable(
                "total_deadline_seconds must not be smaller than validator_timeout_seconds",
            );
        }

        pipeline.ai_validator.validate()?;
        for classifier in [&pipeline.disaster_classifier, &pipeline.spam_classifier]
            .into_iter()
            .flatten()
        {
            classifier.validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub debug: bool,
    /// Write timestamp to log messages. Enabled by default.
    pub log_timestamp: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Data directory for the SQLite database.
    pub dir: PathBuf,
    #[serde(default)]
    pub sqlite_in_ram: bool,
    /// Defaults to CPU count.
    pub read_connections: Option<NonZeroU8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    Fast,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    #[serde(default)]
    pub execution: ExecutionMode,
    #[serde(default = "default_validator_timeout_seconds")]
    pub validator_timeout_seconds: u16,
    #[serde(default = "default_total_deadline_seconds")]
    pub total_deadline_seconds: u16,
    pub ai_validator: LlmValidatorConfig,
    pub disaster_classifier: Option<ClassifierConfig>,
    pub spam_classifier: Option<ClassifierConfig>,
}

fn default_validator_timeout_seconds() -> u16 {
    10
}

fn default_total_deadline_seconds() -> u16 {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmValidatorConfig {
    pub openai_api_url: Url,
    /// Environment variable which contains the API key. Empty key is used
    /// when this is not set.
    pub api_key_env: Option<String>,
    pub model: String,
    #[serde(default = "default_system_text")]
    pub system_text: String,
    /// Placeholder "{text}" is replaced with the report text and
    /// "{category}" with the report category.
    #[serde(default = "default_user_text_template")]
    pub user_text_template: String,
    /// Response which verifies the report. Case insensitive.
    #[serde(default = "default_expected_response")]
    pub expected_response: String,
    /// Response which rejects the report. Case insensitive.
    #[serde(default = "default_rejected_response")]
    pub rejected_response: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub retry_wait_times_in_seconds: Vec<u16>,
    #[serde(default)]
    pub debug_log_results: bool,
}

impl LlmValidatorConfig {
    pub const TEMPLATE_PLACEHOLDER_TEXT: &'static str = "{text}";
    pub const TEMPLATE_PLACEHOLDER_CATEGORY: &'static str = "{category}";

    fn validate(&self) -> Result<(), ConfigFileError> {
        if !self
            .user_text_template
            .contains(Self::TEMPLATE_PLACEHOLDER_TEXT)
        {
            return Err(ConfigFileError::InvalidConfig.report()).attach_printable(format!(
                "user_text_template does not contain {}",
                Self::TEMPLATE_PLACEHOLDER_TEXT
            ));
        }
        let expected = self.expected_response.trim().to_lowercase();
        let rejected = self.rejected_response.trim().to_lowercase();
        if expected.is_empty() || rejected.is_empty() {
            return Err(ConfigFileError::InvalidConfig.report())
                .attach_printable("expected_response and rejected_response must not be empty");
        }
        if expected == rejected {
            return Err(ConfigFileError::InvalidConfig.report())
                .attach_printable("expected_response and rejected_response must differ");
        }
        Ok(())
    }
}

fn default_system_text() -> String {
    "You are an emergency report validator. Decide if the report describes a real emergency situation which matches the given category. Answer with a single word: YES or NO.".to_string()
}

fn default_user_text_template() -> String {
    "Category: {category}\nReport: {text}".to_string()
}

fn default_expected_response() -> String {
    "yes".to_string()
}

fn default_rejected_response() -> String {
    "no".to_string()
}

fn default_max_tokens() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Label for a positive result. Default depends on the classifier.
    pub positive_label: Option<String>,
    /// Label for a negative result. Default depends on the classifier.
    pub negative_label: Option<String>,
}

impl ClassifierConfig {
    fn validate(&self) -> Result<(), ConfigFileError> {
        let positive = self.positive_label.as_deref().map(|l| l.trim().to_lowercase());
        let negative = self.negative_label.as_deref().map(|l| l.trim().to_lowercase());
        if positive.as_deref() == Some("") || negative.as_deref() == Some("") {
            return Err(ConfigFileError::InvalidConfig.report())
                .attach_printable("Classifier labels must not be empty");
        }
        if positive.is_some() && positive == negative {
            return Err(ConfigFileError::InvalidConfig.report())
                .attach_printable("Classifier labels must differ");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ClassifierBackend {
    /// Run a program with the report text as the last argument. The last
    /// non-empty line of standard output is the label.
    Subprocess {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        working_dir: Option<PathBuf>,
    },
    /// POST `{"text": "..."}` and read `{"label": "..."}` from the response.
    Http { url: Url },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSinkKind {
    #[default]
    Database,
    Log,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    #[serde(default)]
    pub sink: NotificationSinkKind,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: NotificationSinkKind::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueriesConfig {
    /// Verified reports which are still pending after this many hours
    /// are listed as urgent.
    pub urgent_after_hours: u32,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            urgent_after_hours: 5,
        }
    }
}

pub struct ConfigFileUtils;

impl ConfigFileUtils {
    pub fn save_string(file_path: impl AsRef<Path>, text: &str) -> Result<(), ConfigFileError> {
        let mut file = std::fs::File::create(file_path).change_context(ConfigFileError::Save)?;
        file.write_all(text.as_bytes())
            .change_context(ConfigFileError::Save)?;
        Ok(())
    }
}
