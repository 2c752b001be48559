//! Admin transitions of the verification state.

use model::{AdminAction, OperationalStatus, SpamOrigin, VerificationState, VerifiedBy};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Action {action} is not allowed in verification state {state}")]
pub struct InvalidTransition {
    pub action: &'static str,
    pub state: &'static str,
}

/// Result of a valid admin transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminTransition {
    pub state: VerificationState,
    pub status: OperationalStatus,
    /// Stored as the manual verification reason.
    pub reason: String,
}

fn admin_decision(verified: bool) -> VerificationState {
    if verified {
        VerificationState::Verified {
            by: VerifiedBy::Admin,
        }
    } else {
        VerificationState::RejectedFinal
    }
}

/// Next verification state or [InvalidTransition] when `action` is not
/// allowed in `current` state.
pub fn next_state(
    current: &VerificationState,
    action: AdminAction,
) -> Result<VerificationState, InvalidTransition> {
    let next = match (action, current) {
        (_, VerificationState::PendingPipeline) => None,
        (AdminAction::ManualVerify { verified }, VerificationState::ManualPending)
        | (AdminAction::ReVerify { verified }, VerificationState::RejectedFinal)
        | (AdminAction::OverrideAi { verified }, VerificationState::AiRejected) => {
            Some(admin_decision(verified))
        }
        // Clearing the spam flag also verifies the report.
        (AdminAction::OverrideSpam { is_spam: false }, _) => Some(VerificationState::Verified {
            by: VerifiedBy::Admin,
        }),
        (AdminAction::OverrideSpam { is_spam: true }, _) => Some(VerificationState::Spam {
            origin: SpamOrigin::Admin,
        }),
        _ => None,
    };

    next.ok_or(InvalidTransition {
        action: action.name(),
        state: current.name(),
    })
}

/// Operational status after a verification decision. Verifying reopens a
/// rejected report and keeps other statuses.
pub fn status_after_decision(
    current: OperationalStatus,
    next_state: &VerificationState,
) -> OperationalStatus {
    if next_state.is_verified() {
        match current {
            OperationalStatus::Rejected => OperationalStatus::Pending,
            other => other,
        }
    } else {
        OperationalStatus::Rejected
    }
}

/// Validate and compute the complete admin transition. `reason` must be
/// already checked to be non-empty.
pub fn apply_admin_action(
    current_state: &VerificationState,
    current_status: OperationalStatus,
    action: AdminAction,
    reason: &str,
) -> Result<AdminTransition, InvalidTransition> {
    let state = next_state(current_state, action)?;
    let status = status_after_decision(current_status, &state);
    let reason = match action {
        AdminAction::ReVerify { .. } => format!("Re-verified: {}", reason),
        _ => reason.to_string(),
    };
    Ok(AdminTransition {
        state,
        status,
        reason,
    })
}
