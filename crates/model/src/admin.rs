use std::fmt;

use serde::{Deserialize, Serialize};

/// Human decision on the verification state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum AdminAction {
    /// Decide a report waiting in the Manual-Pending queue.
    ManualVerify { verified: bool },
    /// Reconsider a report which an admin rejected earlier.
    ReVerify { verified: bool },
    /// Overrule a classifier rejection.
    OverrideAi { verified: bool },
    /// Mark report as spam or not spam. Allowed in every state.
    OverrideSpam { is_spam: bool },
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ManualVerify { .. } => "manual_verify",
            Self::ReVerify { .. } => "re_verify",
            Self::OverrideAi { .. } => "override_ai",
            Self::OverrideSpam { .. } => "override_spam",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualVerify { verified }
            | Self::ReVerify { verified }
            | Self::OverrideAi { verified } => write!(f, "{}(verified={})", self.name(), verified),
            Self::OverrideSpam { is_spam } => write!(f, "{}(is_spam={})", self.name(), is_spam),
        }
    }
}
