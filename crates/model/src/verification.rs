//! Verification sub-state of a report.
//!
//! The state is stored as four boolean columns so that existing queries and
//! tools keep working. All writes go through [VerificationState], which
//! only produces the flag combinations listed in
//! [VerificationState::flags]. Reads convert back with
//! [VerificationFlags::to_state], which rejects other combinations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifiedBy {
    Classifier,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SpamOrigin {
    /// Spam classifier flagged a report which the pipeline did not verify.
    /// `auto_verified` is the value which the underlying decision had.
    Classifier { auto_verified: bool },
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum VerificationState {
    /// Submitted but the pipeline has not decided yet. Not persisted.
    PendingPipeline,
    /// Waits for a human decision.
    ManualPending,
    /// A classifier rejected the report. Admin can override.
    AiRejected,
    Spam {
        origin: SpamOrigin,
    },
    Verified {
        by: VerifiedBy,
    },
    /// Admin rejected the report. Admin can re-verify it.
    RejectedFinal,
}

impl VerificationState {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Legacy flag view of the state. None for
    /// [VerificationState::PendingPipeline].
    pub fn flags(&self) -> Option<VerificationFlags> {
        let flags = match *self {
            Self::PendingPipeline => return None,
            Self::ManualPending => VerificationFlags::new(false, true, false, false),
            Self::AiRejected => VerificationFlags::new(false, true, true, false),
            Self::Spam {
                origin: SpamOrigin::Classifier { auto_verified },
            } => VerificationFlags::new(false, true, auto_verified, true),
            Self::Spam {
                origin: SpamOrigin::Admin,
            } => VerificationFlags::new(false, false, false, true),
            Self::Verified {
                by: VerifiedBy::Classifier,
            } => VerificationFlags::new(true, false, true, false),
            Self::Verified {
                by: VerifiedBy::Admin,
            } => VerificationFlags::new(true, false, false, false),
            Self::RejectedFinal => VerificationFlags::new(false, false, false, false),
        };
        Some(flags)
    }

    /// Admin review queue of the state. Spam takes precedence so that every
    /// report is in at most one queue.
    pub fn admin_queue(&self) -> Option<AdminQueue> {
        match self {
            Self::PendingPipeline | Self::Verified { .. } => None,
            Self::ManualPending => Some(AdminQueue::ManualPending),
            Self::AiRejected => Some(AdminQueue::AiRejected),
            Self::Spam { .. } => Some(AdminQueue::Spam),
            Self::RejectedFinal => Some(AdminQueue::PreviouslyRejected),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingPipeline => "pending_pipeline",
            Self::ManualPending => "manual_pending",
            Self::AiRejected => "ai_rejected",
            Self::Spam { .. } => "spam",
            Self::Verified { .. } => "verified",
            Self::RejectedFinal => "rejected_final",
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Inconsistent verification flags: {0:?}")]
pub struct InconsistentFlags(pub VerificationFlags);

/// The four persisted verification booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFlags {
    pub verified: bool,
    pub requires_manual_verification: bool,
    pub auto_verified: bool,
    pub is_spam: bool,
}

impl VerificationFlags {
    pub const fn new(
        verified: bool,
        requires_manual_verification: bool,
        auto_verified: bool,
        is_spam: bool,
    ) -> Self {
        Self {
            verified,
            requires_manual_verification,
            auto_verified,
            is_spam,
        }
    }

    pub fn to_state(self) -> Result<VerificationState, InconsistentFlags> {
        let state = match (
            self.verified,
            self.requires_manual_verification,
            self.auto_verified,
            self.is_spam,
        ) {
            (true, false, auto_verified, false) => VerificationState::Verified {
                by: if auto_verified {
                    VerifiedBy::Classifier
                } else {
                    VerifiedBy::Admin
                },
            },
            (false, true, false, false) => VerificationState::ManualPending,
            (false, true, true, false) => VerificationState::AiRejected,
            (false, true, auto_verified, true) => VerificationState::Spam {
                origin: SpamOrigin::Classifier { auto_verified },
            },
            (false, false, false, true) => VerificationState::Spam {
                origin: SpamOrigin::Admin,
            },
            (false, false, false, false) => VerificationState::RejectedFinal,
            _ => return Err(InconsistentFlags(self)),
        };
        Ok(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminQueue {
    ManualPending,
    AiRejected,
    Spam,
    PreviouslyRejected,
}

impl AdminQueue {
    pub const ALL: [AdminQueue; 4] = [
        Self::ManualPending,
        Self::AiRejected,
        Self::Spam,
        Self::PreviouslyRejected,
    ];

    /// Queue membership computed from the legacy flags. Matches
    /// [VerificationState::admin_queue] for every consistent combination.
    pub fn contains(&self, flags: VerificationFlags) -> bool {
        let VerificationFlags {
            verified,
            requires_manual_verification: manual,
            auto_verified: auto,
            is_spam: spam,
        } = flags;
        match self {
            Self::ManualPending => !verified && manual && !auto && !spam,
            Self::AiRejected => !verified && manual && auto && !spam,
            Self::Spam => spam,
            Self::PreviouslyRejected => !verified && !manual && !auto && !spam,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManualPending => "manual_pending",
            Self::AiRejected => "ai_rejected",
            Self::Spam => "spam",
            Self::PreviouslyRejected => "previously_rejected",
        }
    }
}

impl fmt::Display for AdminQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminQueue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == value)
            .ok_or_else(|| format!("Unknown queue: {s}"))
    }
}

/// Output of the decision policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDecision {
    pub verified: bool,
    pub requires_manual_verification: bool,
    pub auto_verified: bool,
    pub is_spam: bool,
    pub reason: String,
}

impl VerificationDecision {
    pub fn flags(&self) -> VerificationFlags {
        VerificationFlags::new(
            self.verified,
            self.requires_manual_verification,
            self.auto_verified,
            self.is_spam,
        )
    }

    pub fn to_state(&self) -> Result<VerificationState, InconsistentFlags> {
        self.flags().to_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSISTED_STATES: [VerificationState; 8] = [
        VerificationState::ManualPending,
        VerificationState::AiRejected,
        VerificationState::Spam {
            origin: SpamOrigin::Classifier {
                auto_verified: true,
            },
        },
        VerificationState::Spam {
            origin: SpamOrigin::Classifier {
                auto_verified: false,
            },
        },
        VerificationState::Spam {
            origin: SpamOrigin::Admin,
        },
        VerificationState::Verified {
            by: VerifiedBy::Classifier,
        },
        VerificationState::Verified {
            by: VerifiedBy::Admin,
        },
        VerificationState::RejectedFinal,
    ];

    fn all_flag_combinations() -> impl Iterator<Item = VerificationFlags> {
        (0..16u8).map(|bits| {
            VerificationFlags::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0)
        })
    }

    #[test]
    fn flags_convert_back_to_same_state() {
        for state in PERSISTED_STATES {
            let flags = state.flags().unwrap();
            assert_eq!(flags.to_state(), Ok(state));
        }
    }

    #[test]
    fn pending_pipeline_has_no_flags() {
        assert_eq!(VerificationState::PendingPipeline.flags(), None);
    }

    #[test]
    fn verified_and_manual_are_never_both_set() {
        for state in PERSISTED_STATES {
            let flags = state.flags().unwrap();
            assert!(!(flags.verified && flags.requires_manual_verification));
        }
        for flags in all_flag_combinations() {
            if flags.verified && flags.requires_manual_verification {
                assert!(flags.to_state().is_err());
            }
        }
    }

    #[test]
    fn only_eight_combinations_are_consistent() {
        let consistent = all_flag_combinations()
            .filter(|f| f.to_state().is_ok())
            .count();
        assert_eq!(consistent, PERSISTED_STATES.len());
    }

    #[test]
    fn every_state_is_in_at_most_one_queue() {
        for state in PERSISTED_STATES {
            let flags = state.flags().unwrap();
            let queues: Vec<AdminQueue> = AdminQueue::ALL
                .into_iter()
                .filter(|q| q.contains(flags))
                .collect();
            assert!(queues.len() <= 1, "{state:?} is in {queues:?}");
            assert_eq!(queues.first().copied(), state.admin_queue());
        }
    }

    #[test]
    fn verified_states_are_not_in_admin_queues() {
        let state = VerificationState::Verified {
            by: VerifiedBy::Classifier,
        };
        assert_eq!(state.admin_queue(), None);
        assert!(state.is_verified());
    }

    #[test]
    fn queue_parsing() {
        assert_eq!(
            "ai-rejected".parse::<AdminQueue>(),
            Ok(AdminQueue::AiRejected)
        );
        assert_eq!(
            "previously_rejected".parse::<AdminQueue>(),
            Ok(AdminQueue::PreviouslyRejected)
        );
        assert!("verified".parse::<AdminQueue>().is_err());
    }

    #[test]
    fn state_serializes_as_tagged_object() {
        let json = serde_json::to_value(VerificationState::Spam {
            origin: SpamOrigin::Admin,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "spam", "origin": {"kind": "admin"}})
        );
    }
}
