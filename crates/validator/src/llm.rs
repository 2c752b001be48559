use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequest},
};
use async_trait::async_trait;
use config::file::LlmValidatorConfig;
use error_stack::{Result, ResultExt};
use model::{Category, VerdictSource};
use tracing::{info, warn};
use utils::ContextExt;

use crate::{TextValidator, ValidatorError, ValidatorOutput, parse_answer};

/// Report validation using an OpenAI compatible chat completion API.
#[derive(Debug)]
pub struct LlmTextValidator {
    client: Client<OpenAIConfig>,
    config: LlmValidatorConfig,
}

impl LlmTextValidator {
    pub fn new(config: LlmValidatorConfig, reqwest_client: reqwest::Client) -> Self {
        let api_key = config
            .api_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok())
            .unwrap_or_default();
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(config.openai_api_url.to_string())
                .with_api_key(api_key),
        )
        .with_http_client(reqwest_client);
        Self { client, config }
    }

    fn user_text(&self, category: Category, text: &str) -> String {
        let text_paragraph = text.lines().collect::<Vec<&str>>().join(" ");
        self.config
            .user_text_template
            .replace(
                LlmValidatorConfig::TEMPLATE_PLACEHOLDER_CATEGORY,
                category.as_str(),
            )
            .replace(LlmValidatorConfig::TEMPLATE_PLACEHOLDER_TEXT, &text_paragraph)
    }

    async fn request_answer(&self, user_text: &str) -> Result<String, ValidatorError> {
        // Hide warning about max_tokens as Ollama does not yet
        // support max_completion_tokens.
        #[allow(deprecated)]
        let r = self
            .client
            .chat()
            .create(CreateChatCompletionRequest {
                messages: vec![
                    ChatCompletionRequestMessage::System(self.config.system_text.clone().into()),
                    ChatCompletionRequestMessage::User(user_text.to_string().into()),
                ],
                model: self.config.model.clone(),
                temperature: Some(0.0),
                seed: Some(0),
                max_completion_tokens: Some(self.config.max_tokens),
                max_tokens: Some(self.config.max_tokens),
                ..Default::default()
            })
            .await;

        match r.map(|r| r.choices.into_iter().next()) {
            Ok(Some(r)) => r
                .message
                .content
                .ok_or(ValidatorError::EmptyAnswer.report())
                .attach_printable("No response content from LLM"),
            Ok(None) => Err(ValidatorError::EmptyAnswer.report())
                .attach_printable("No response from LLM"),
            Err(e) => Err(e).change_context(ValidatorError::Request),
        }
    }
}

#[async_trait]
impl TextValidator for LlmTextValidator {
    fn source(&self) -> VerdictSource {
        VerdictSource::AiTextValidator
    }

    async fn validate(
        &self,
        category: Category,
        text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        let user_text = self.user_text(category, text);

        let mut wait_times = self.config.retry_wait_times_in_seconds.iter();
        let response = loop {
            match self.request_answer(&user_text).await {
                Ok(response) => break response,
                Err(e) => match wait_times.next() {
                    Some(wait) => {
                        warn!("LLM request failed, retrying after {wait} seconds: {:?}", e);
                        tokio::time::sleep(Duration::from_secs((*wait).into())).await;
                    }
                    None => return Err(e),
                },
            }
        };

        if self.config.debug_log_results {
            info!("LLM validation result: '{}'", response);
        }

        match parse_answer(
            &response,
            &self.config.expected_response,
            &self.config.rejected_response,
        ) {
            Some(true) => Ok(ValidatorOutput::yes(response)),
            Some(false) => Ok(ValidatorOutput::no(response)),
            None => Err(ValidatorError::UnrecognizedAnswer.report())
                .attach_printable(format!("LLM answer: '{}'", response)),
        }
    }
}
