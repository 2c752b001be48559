//! Verification pipeline strategies.
//!
//! The fast pipeline asks only the AI text validator. The full pipeline
//! also asks the ML disaster classifier and optionally the spam
//! classifier. Both use the same decision policy.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use config::{
    Config,
    file::{ExecutionMode, PipelineMode},
};
use error_stack::Result;
use model::{Category, MediaAttachments, Verdict, VerdictSource, VerificationDecision};
use tracing::info;
use utils::ContextExt;
use validator::{
    TextValidator, classifier::classifier_from_config, llm::LlmTextValidator,
    orchestrator::ValidatorOrchestrator,
};

use crate::policy::{decide, media_decision};

/// [Config] validation already rejects these when the config file is
/// loaded. The check is repeated here for configs built in code.
#[derive(thiserror::Error, Debug)]
pub enum PipelineConfigError {
    #[error("Full pipeline mode requires a disaster classifier")]
    MissingDisasterClassifier,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    pub validator_timeout: Duration,
    pub total_deadline: Duration,
    pub execution: ExecutionMode,
}

impl PipelineLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            validator_timeout: config.validator_timeout(),
            total_deadline: config.total_deadline(),
            execution: config.pipeline().execution,
        }
    }

    fn orchestrator(&self, validators: Vec<Arc<dyn TextValidator>>) -> ValidatorOrchestrator {
        ValidatorOrchestrator::new(
            validators,
            self.validator_timeout,
            self.total_deadline,
            self.execution,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub verdicts: Vec<Verdict>,
    pub decision: VerificationDecision,
}

#[async_trait]
pub trait PipelineStrategy: Send + Sync {
    fn mode(&self) -> PipelineMode;

    /// One verdict per configured validator. This does not check media
    /// attachments, so report handling must use [Self::evaluate].
    async fn collect_verdicts(&self, category: Category, text: &str) -> Vec<Verdict>;

    /// Run validators and the decision policy. Validators are not called
    /// when the report has media attachments.
    async fn evaluate(
        &self,
        category: Category,
        text: &str,
        media: MediaAttachments,
    ) -> PipelineResult {
        if media.any() {
            info!("Report has media attachments, skipping validators");
            return PipelineResult {
                verdicts: vec![],
                decision: media_decision(),
            };
        }

        let verdicts = self.collect_verdicts(category, text).await;
        let decision = decide(&verdicts, false);
        PipelineResult { verdicts, decision }
    }
}

pub struct FastPipeline {
    orchestrator: ValidatorOrchestrator,
}

impl FastPipeline {
    pub fn new(ai_validator: Arc<dyn TextValidator>, limits: PipelineLimits) -> Self {
        Self {
            orchestrator: limits.orchestrator(vec![ai_validator]),
        }
    }
}

#[async_trait]
impl PipelineStrategy for FastPipeline {
    fn mode(&self) -> PipelineMode {
        PipelineMode::Fast
    }

    async fn collect_verdicts(&self, category: Category, text: &str) -> Vec<Verdict> {
        self.orchestrator.run(category, text).await
    }
}

pub struct FullPipeline {
    orchestrator: ValidatorOrchestrator,
}

impl FullPipeline {
    pub fn new(
        ai_validator: Arc<dyn TextValidator>,
        disaster_classifier: Arc<dyn TextValidator>,
        spam_classifier: Option<Arc<dyn TextValidator>>,
        limits: PipelineLimits,
    ) -> Self {
        let mut validators = vec![ai_validator, disaster_classifier];
        validators.extend(spam_classifier);
        Self {
            orchestrator: limits.orchestrator(validators),
        }
    }

    pub fn sources(&self) -> Vec<VerdictSource> {
        self.orchestrator.sources()
    }
}

#[async_trait]
impl PipelineStrategy for FullPipeline {
    fn mode(&self) -> PipelineMode {
        PipelineMode::Full
    }

    async fn collect_verdicts(&self, category: Category, text: &str) -> Vec<Verdict> {
        self.orchestrator.run(category, text).await
    }
}

/// Pipeline for the configured mode.
pub fn pipeline_from_config(
    config: &Config,
    reqwest_client: reqwest::Client,
) -> Result<Arc<dyn PipelineStrategy>, PipelineConfigError> {
    let pipeline = config.pipeline();
    let limits = PipelineLimits::from_config(config);
    let ai: Arc<dyn TextValidator> = Arc::new(LlmTextValidator::new(
        pipeline.ai_validator.clone(),
        reqwest_client.clone(),
    ));

    let strategy: Arc<dyn PipelineStrategy> = match pipeline.mode {
        PipelineMode::Fast => Arc::new(FastPipeline::new(ai, limits)),
        PipelineMode::Full => {
            let Some(disaster) = &pipeline.disaster_classifier else {
                return Err(PipelineConfigError::MissingDisasterClassifier.report());
            };
            let disaster = classifier_from_config(
                VerdictSource::MlDisasterClassifier,
                disaster,
                reqwest_client.clone(),
            );
            let spam = pipeline.spam_classifier.as_ref().map(|spam| {
                classifier_from_config(VerdictSource::MlSpamClassifier, spam, reqwest_client)
            });
            Arc::new(FullPipeline::new(ai, disaster, spam, limits))
        }
    };

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use config::file::{ConfigFile, DEFAULT_CONFIG_FILE_TEXT};
    use model::VerdictOutcome;
    use validator::fake::{FailingValidator, FixedValidator};

    use super::*;

    fn limits() -> PipelineLimits {
        PipelineLimits {
            validator_timeout: Duration::from_secs(1),
            total_deadline: Duration::from_secs(2),
            execution: ExecutionMode::Sequential,
        }
    }

    #[tokio::test]
    async fn media_skips_validators() {
        let ai = FixedValidator::yes(VerdictSource::AiTextValidator);
        let calls = ai.calls();
        let pipeline = FastPipeline::new(Arc::new(ai), limits());
        let media = MediaAttachments {
            has_image: true,
            has_audio: false,
        };
        let result = pipeline.evaluate(Category::Flood, "water", media).await;
        assert_eq!(calls.count(), 0);
        assert!(result.verdicts.is_empty());
        assert_eq!(result.decision, media_decision());
    }

    #[tokio::test]
    async fn full_pipeline_asks_every_classifier() {
        let pipeline = FullPipeline::new(
            Arc::new(FailingValidator::new(VerdictSource::AiTextValidator)),
            Arc::new(FixedValidator::yes(VerdictSource::MlDisasterClassifier)),
            Some(Arc::new(FixedValidator::no(VerdictSource::MlSpamClassifier))),
            limits(),
        );
        assert_eq!(
            pipeline.sources(),
            vec![
                VerdictSource::AiTextValidator,
                VerdictSource::MlDisasterClassifier,
                VerdictSource::MlSpamClassifier,
            ]
        );
        let result = pipeline
            .evaluate(Category::Earthquake, "building collapsed", MediaAttachments::default())
            .await;
        assert_eq!(result.verdicts[0].outcome, VerdictOutcome::Unavailable);
        assert!(result.decision.verified);
        assert!(result.decision.auto_verified);
        assert_eq!(result.decision.reason, "verified by ML classifier");
    }

    const FULL_MODE_CONFIG: &str = r#"
[database]
dir = "data"

[pipeline]
mode = "full"
execution = "concurrent"

[pipeline.ai_validator]
openai_api_url = "http://127.0.0.1:11434/v1"
model = "test"

[pipeline.disaster_classifier]
[pipeline.disaster_classifier.backend]
type = "subprocess"
program = "python3"
args = ["disaster_classifier.py"]

[pipeline.spam_classifier]
[pipeline.spam_classifier.backend]
type = "http"
url = "http://127.0.0.1:5000/spam"
"#;

    #[test]
    fn full_mode_config_selects_full_pipeline() {
        let file = ConfigFile::parse(FULL_MODE_CONFIG).unwrap();
        let config = Config::from_file(file).unwrap();
        let pipeline = pipeline_from_config(&config, reqwest::Client::new()).unwrap();
        assert_eq!(pipeline.mode(), PipelineMode::Full);
    }

    #[test]
    fn full_mode_without_disaster_classifier_is_rejected() {
        let mut file = ConfigFile::parse(FULL_MODE_CONFIG).unwrap();
        file.pipeline.disaster_classifier = None;
        assert!(Config::from_file(file).is_err());
    }

    #[test]
    fn default_config_selects_fast_pipeline() {
        let file = ConfigFile::parse(DEFAULT_CONFIG_FILE_TEXT).unwrap();
        let config = Config::from_file(file).unwrap();
        let pipeline = pipeline_from_config(&config, reqwest::Client::new()).unwrap();
        assert_eq!(pipeline.mode(), PipelineMode::Fast);
    }
}
