use std::{sync::Arc, time::Duration};

use config::file::ExecutionMode;
use model::{Category, UnixTime, Verdict, VerdictSource};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::TextValidator;

/// Calls the configured validators and converts every result to a
/// [Verdict]. Errors and timeouts become
/// [model::VerdictOutcome::Unavailable].
pub struct ValidatorOrchestrator {
    validators: Vec<Arc<dyn TextValidator>>,
    validator_timeout: Duration,
    total_deadline: Duration,
    execution: ExecutionMode,
}

impl std::fmt::Debug for ValidatorOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorOrchestrator")
            .field("sources", &self.sources())
            .field("validator_timeout", &self.validator_timeout)
            .field("total_deadline", &self.total_deadline)
            .field("execution", &self.execution)
            .finish()
    }
}

impl ValidatorOrchestrator {
    pub fn new(
        validators: Vec<Arc<dyn TextValidator>>,
        validator_timeout: Duration,
        total_deadline: Duration,
        execution: ExecutionMode,
    ) -> Self {
        Self {
            validators,
            validator_timeout,
            total_deadline,
            execution,
        }
    }

    pub fn sources(&self) -> Vec<VerdictSource> {
        self.validators.iter().map(|v| v.source()).collect()
    }

    /// One verdict per validator in validator order. Returns within the
    /// total deadline.
    pub async fn run(&self, category: Category, text: &str) -> Vec<Verdict> {
        let deadline = Instant::now() + self.total_deadline;

        match self.execution {
            ExecutionMode::Sequential => {
                let mut verdicts = Vec::with_capacity(self.validators.len());
                for validator in &self.validators {
                    verdicts.push(
                        self.run_validator(validator.as_ref(), category, text, deadline)
                            .await,
                    );
                }
                verdicts
            }
            ExecutionMode::Concurrent => {
                futures::future::join_all(
                    self.validators
                        .iter()
                        .map(|v| self.run_validator(v.as_ref(), category, text, deadline)),
                )
                .await
            }
        }
    }

    async fn run_validator(
        &self,
        validator: &dyn TextValidator,
        category: Category,
        text: &str,
        deadline: Instant,
    ) -> Verdict {
        let source = validator.source();
        let started = Instant::now();
        if started >= deadline {
            warn!("Validator {} skipped, pipeline deadline reached", source);
            return Verdict::unavailable(source, 0);
        }

        let call_deadline = std::cmp::min(started + self.validator_timeout, deadline);
        let result = tokio::time::timeout_at(call_deadline, validator.validate(category, text)).await;
        let latency_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let verdict = match result {
            Ok(Ok(output)) => Verdict {
                source,
                outcome: output.outcome(),
                raw_response: Some(output.raw_response),
                latency_millis,
                responded_at: UnixTime::current_time(),
            },
            Ok(Err(e)) => {
                warn!("Validator {} unavailable: {:?}", source, e);
                Verdict::unavailable(source, latency_millis)
            }
            Err(_) => {
                warn!("Validator {} timed out after {} ms", source, latency_millis);
                Verdict::unavailable(source, latency_millis)
            }
        };

        info!(
            "Verdict: source {}, outcome {}, latency {} ms",
            verdict.source, verdict.outcome, verdict.latency_millis
        );

        verdict
    }
}
