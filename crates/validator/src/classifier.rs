//! ML classifiers running as a subprocess or as an HTTP service.

use std::{path::PathBuf, process::Stdio, sync::Arc};

use async_trait::async_trait;
use config::file::{ClassifierBackend, ClassifierConfig};
use error_stack::{Result, ResultExt};
use model::{Category, VerdictSource};
use serde::{Deserialize, Serialize};
use utils::ContextExt;

use crate::{TextValidator, ValidatorError, ValidatorOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierLabels {
    positive: String,
    negative: String,
}

impl ClassifierLabels {
    pub fn new(positive: &str, negative: &str) -> Self {
        Self {
            positive: positive.trim().to_lowercase(),
            negative: negative.trim().to_lowercase(),
        }
    }

    /// Labels from config or the default labels of the classifier.
    pub fn from_config(source: VerdictSource, config: &ClassifierConfig) -> Self {
        let (positive, negative) = match source {
            VerdictSource::MlSpamClassifier => ("spam", "not_spam"),
            VerdictSource::MlDisasterClassifier | VerdictSource::AiTextValidator => {
                ("verified", "not_verified")
            }
        };
        Self::new(
            config.positive_label.as_deref().unwrap_or(positive),
            config.negative_label.as_deref().unwrap_or(negative),
        )
    }

    pub fn parse(&self, label: &str) -> Result<ValidatorOutput, ValidatorError> {
        let normalized = label.trim().to_lowercase();
        if normalized == self.positive {
            Ok(ValidatorOutput::yes(label.trim()))
        } else if normalized == self.negative {
            Ok(ValidatorOutput::no(label.trim()))
        } else {
            Err(ValidatorError::UnrecognizedAnswer.report())
                .attach_printable(format!("Classifier label: '{}'", label.trim()))
        }
    }
}

/// Runs a program for every report. The report text is the last argument.
#[derive(Debug)]
pub struct SubprocessClassifier {
    source: VerdictSource,
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    labels: ClassifierLabels,
}

impl SubprocessClassifier {
    pub fn new(
        source: VerdictSource,
        program: PathBuf,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
        labels: ClassifierLabels,
    ) -> Self {
        Self {
            source,
            program,
            args,
            working_dir,
            labels,
        }
    }
}

#[async_trait]
impl TextValidator for SubprocessClassifier {
    fn source(&self) -> VerdictSource {
        self.source
    }

    async fn validate(
        &self,
        _category: Category,
        text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Abandoned calls must not leave processes running
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .change_context(ValidatorError::Process)
            .attach_printable_lazy(|| self.program.display().to_string())?;

        if !output.status.success() {
            return Err(ValidatorError::Process.report()).attach_printable(format!(
                "{}: {}, stderr: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let label = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .ok_or(ValidatorError::EmptyAnswer.report())?;

        self.labels.parse(label)
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
}

/// Classifier behind an HTTP API.
#[derive(Debug)]
pub struct HttpClassifier {
    source: VerdictSource,
    url: url::Url,
    client: reqwest::Client,
    labels: ClassifierLabels,
}

impl HttpClassifier {
    pub fn new(
        source: VerdictSource,
        url: url::Url,
        client: reqwest::Client,
        labels: ClassifierLabels,
    ) -> Self {
        Self {
            source,
            url,
            client,
            labels,
        }
    }
}

#[async_trait]
impl TextValidator for HttpClassifier {
    fn source(&self) -> VerdictSource {
        self.source
    }

    async fn validate(
        &self,
        _category: Category,
        text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&ClassifyRequest { text })
            .send()
            .await
            .change_context(ValidatorError::Request)
            .attach_printable_lazy(|| self.url.to_string())?;

        let response = response
            .error_for_status()
            .change_context(ValidatorError::HttpStatus)?;

        let body: ClassifyResponse = response
            .json()
            .await
            .change_context(ValidatorError::UnrecognizedAnswer)?;

        self.labels.parse(&body.label)
    }
}

pub fn classifier_from_config(
    source: VerdictSource,
    config: &ClassifierConfig,
    reqwest_client: reqwest::Client,
) -> Arc<dyn TextValidator> {
    let labels = ClassifierLabels::from_config(source, config);
    match &config.backend {
        ClassifierBackend::Subprocess {
            program,
            args,
            working_dir,
        } => Arc::new(SubprocessClassifier::new(
            source,
            program.clone(),
            args.clone(),
            working_dir.clone(),
            labels,
        )),
        ClassifierBackend::Http { url } => Arc::new(HttpClassifier::new(
            source,
            url.clone(),
            reqwest_client,
            labels,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> SubprocessClassifier {
        SubprocessClassifier::new(
            VerdictSource::MlDisasterClassifier,
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), script.to_string(), "classifier".to_string()],
            None,
            ClassifierLabels::new("verified", "not_verified"),
        )
    }

    #[tokio::test]
    async fn last_stdout_line_is_the_label() {
        let classifier = shell("echo 'loading model'; echo \"$1\"; echo");
        let output = classifier
            .validate(Category::Flood, "NOT_VERIFIED")
            .await
            .unwrap();
        assert!(!output.positive);
        assert_eq!(output.raw_response, "NOT_VERIFIED");

        let output = classifier
            .validate(Category::Flood, "verified")
            .await
            .unwrap();
        assert!(output.positive);
    }

    #[tokio::test]
    async fn non_zero_exit_is_process_error() {
        let error = shell("echo verified; exit 3")
            .validate(Category::Flood, "text")
            .await
            .unwrap_err();
        assert!(matches!(error.current_context(), ValidatorError::Process));
    }

    #[tokio::test]
    async fn unknown_label_is_not_recognized() {
        let error = shell("echo maybe")
            .validate(Category::Flood, "text")
            .await
            .unwrap_err();
        assert!(matches!(
            error.current_context(),
            ValidatorError::UnrecognizedAnswer
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_request_error() {
        let classifier = HttpClassifier::new(
            VerdictSource::MlSpamClassifier,
            "http://127.0.0.1:9/spam".parse().unwrap(),
            reqwest::Client::new(),
            ClassifierLabels::new("spam", "not_spam"),
        );
        let error = classifier
            .validate(Category::Other, "text")
            .await
            .unwrap_err();
        assert!(matches!(error.current_context(), ValidatorError::Request));
    }

    #[test]
    fn default_labels_depend_on_classifier() {
        let config = ClassifierConfig {
            backend: ClassifierBackend::Http {
                url: "http://127.0.0.1:5000".parse().unwrap(),
            },
            positive_label: None,
            negative_label: Some("Ham".to_string()),
        };
        assert_eq!(
            ClassifierLabels::from_config(VerdictSource::MlSpamClassifier, &config),
            ClassifierLabels::new("spam", "ham")
        );
    }
}
