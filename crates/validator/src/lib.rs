#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! External report classification capabilities and the orchestrator which
//! turns their results into verdicts.

pub mod classifier;
pub mod fake;
pub mod llm;
pub mod orchestrator;

use async_trait::async_trait;
use error_stack::Result;
use model::{Category, VerdictOutcome, VerdictSource};
use utils::ComponentError;

#[derive(thiserror::Error, Debug)]
pub enum ValidatorError {
    #[error("Validator request failed")]
    Request,
    #[error("Validator returned an empty answer")]
    EmptyAnswer,
    #[error("Validator answer was not recognized")]
    UnrecognizedAnswer,
    #[error("Classifier process failed")]
    Process,
    #[error("Validator HTTP response had an error status")]
    HttpStatus,
}

impl ComponentError for ValidatorError {
    const COMPONENT_NAME: &'static str = "Validator";
}

/// Successful yes or no answer. Unavailability is expressed with
/// [ValidatorError].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorOutput {
    pub positive: bool,
    pub raw_response: String,
}

impl ValidatorOutput {
    pub fn yes(raw_response: impl Into<String>) -> Self {
        Self {
            positive: true,
            raw_response: raw_response.into(),
        }
    }

    pub fn no(raw_response: impl Into<String>) -> Self {
        Self {
            positive: false,
            raw_response: raw_response.into(),
        }
    }

    pub fn outcome(&self) -> VerdictOutcome {
        if self.positive {
            VerdictOutcome::Yes
        } else {
            VerdictOutcome::No
        }
    }
}

/// Capability which classifies report text.
///
/// For the spam classifier a positive answer means that the text is spam.
#[async_trait]
pub trait TextValidator: Send + Sync {
    fn source(&self) -> VerdictSource;

    async fn validate(
        &self,
        category: Category,
        text: &str,
    ) -> Result<ValidatorOutput, ValidatorError>;
}

/// Match a model or classifier answer against the configured labels.
///
/// The answer is compared in lower case. The first word decides. If that
/// does not match, the words of the first line are checked. Answers which
/// contain both labels or neither label are not recognized.
pub fn parse_answer(answer: &str, positive: &str, negative: &str) -> Option<bool> {
    let answer = answer.trim().to_lowercase();
    let positive = positive.trim().to_lowercase();
    let negative = negative.trim().to_lowercase();

    let split_words = |line: &str| -> Vec<String> {
        line.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .filter(|w| !w.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    let first_line = answer.lines().next().unwrap_or_default();
    let words = split_words(first_line);

    match words.first() {
        Some(w) if *w == positive => return Some(true),
        Some(w) if *w == negative => return Some(false),
        _ => (),
    }

    let has_positive = words.iter().any(|w| *w == positive);
    let has_negative = words.iter().any(|w| *w == negative);
    match (has_positive, has_negative) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}
