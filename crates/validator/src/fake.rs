//! Deterministic validators for tests and local development.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_stack::Result;
use model::{Category, VerdictSource};
use utils::ContextExt;

use crate::{TextValidator, ValidatorError, ValidatorOutput};

/// Shared invocation counter. Clones count the same calls.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Always gives the same answer.
#[derive(Debug, Clone)]
pub struct FixedValidator {
    source: VerdictSource,
    positive: bool,
    calls: CallCounter,
}

impl FixedValidator {
    pub fn yes(source: VerdictSource) -> Self {
        Self {
            source,
            positive: true,
            calls: CallCounter::default(),
        }
    }

    pub fn no(source: VerdictSource) -> Self {
        Self {
            source,
            positive: false,
            calls: CallCounter::default(),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl TextValidator for FixedValidator {
    fn source(&self) -> VerdictSource {
        self.source
    }

    async fn validate(
        &self,
        _category: Category,
        _text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        self.calls.increment();
        if self.positive {
            Ok(ValidatorOutput::yes("yes"))
        } else {
            Ok(ValidatorOutput::no("no"))
        }
    }
}

/// Answers yes after a delay.
#[derive(Debug, Clone)]
pub struct SlowValidator {
    source: VerdictSource,
    delay: Duration,
    calls: CallCounter,
}

impl SlowValidator {
    pub fn new(source: VerdictSource, delay: Duration) -> Self {
        Self {
            source,
            delay,
            calls: CallCounter::default(),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl TextValidator for SlowValidator {
    fn source(&self) -> VerdictSource {
        self.source
    }

    async fn validate(
        &self,
        _category: Category,
        _text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        self.calls.increment();
        tokio::time::sleep(self.delay).await;
        Ok(ValidatorOutput::yes("yes"))
    }
}

/// Always fails like an unreachable service.
#[derive(Debug, Clone)]
pub struct FailingValidator {
    source: VerdictSource,
    calls: CallCounter,
}

impl FailingValidator {
    pub fn new(source: VerdictSource) -> Self {
        Self {
            source,
            calls: CallCounter::default(),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl TextValidator for FailingValidator {
    fn source(&self) -> VerdictSource {
        self.source
    }

    async fn validate(
        &self,
        _category: Category,
        _text: &str,
    ) -> Result<ValidatorOutput, ValidatorError> {
        self.calls.increment();
        Err(ValidatorError::Request.report())
    }
}
