use std::fmt;

use diesel::{AsExpression, FromSqlRow, sql_types::BigInt};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::{UnixTime, macros::diesel_i64_try_from};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[repr(i64)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    AiTextValidator = 0,
    MlDisasterClassifier = 1,
    MlSpamClassifier = 2,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiTextValidator => "ai-text-validator",
            Self::MlDisasterClassifier => "ml-disaster-classifier",
            Self::MlSpamClassifier => "ml-spam-classifier",
        }
    }
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

diesel_i64_try_from!(VerdictSource);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[repr(i64)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictOutcome {
    Yes = 0,
    No = 1,
    /// Timeout, transport error or malformed output. Never means no.
    Unavailable = 2,
}

impl fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Unavailable => "UNAVAILABLE",
        };
        f.write_str(text)
    }
}

diesel_i64_try_from!(VerdictOutcome);

/// Normalized output of a single validator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub source: VerdictSource,
    pub outcome: VerdictOutcome,
    pub raw_response: Option<String>,
    pub latency_millis: u64,
    pub responded_at: UnixTime,
}

impl Verdict {
    pub fn unavailable(source: VerdictSource, latency_millis: u64) -> Self {
        Self {
            source,
            outcome: VerdictOutcome::Unavailable,
            raw_response: None,
            latency_millis,
            responded_at: UnixTime::current_time(),
        }
    }
}

pub trait VerdictListExt {
    /// Outcome of the first verdict from `source`.
    fn outcome_of(&self, source: VerdictSource) -> Option<VerdictOutcome>;
}

impl VerdictListExt for [Verdict] {
    fn outcome_of(&self, source: VerdictSource) -> Option<VerdictOutcome> {
        self.iter().find(|v| v.source == source).map(|v| v.outcome)
    }
}
