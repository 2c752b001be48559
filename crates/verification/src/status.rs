use model::{NoteAuthor, NotificationEvent, OperationalStatus, Report, UserId};

/// Who requests an operational status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    Admin,
    Submitter(UserId),
}

impl StatusActor {
    pub fn note_author(&self) -> NoteAuthor {
        match self {
            Self::Admin => NoteAuthor::Admin,
            Self::Submitter(_) => NoteAuthor::Submitter,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransitionError {
    #[error("Only the submitter or an admin can change the status")]
    NotAllowed,
    #[error("Report is not verified")]
    NotVerified,
    #[error("Status can not change from {from} to {to}")]
    InvalidStatusTransition {
        from: OperationalStatus,
        to: OperationalStatus,
    },
}

/// Status can only move forward and only for verified reports. Skipping
/// in_progress is allowed.
pub fn check_status_transition(
    report: &Report,
    actor: StatusActor,
    new_status: OperationalStatus,
) -> Result<(), StatusTransitionError> {
    if let StatusActor::Submitter(user) = actor {
        if user != report.submitter {
            return Err(StatusTransitionError::NotAllowed);
        }
    }

    if !report.is_verified() {
        return Err(StatusTransitionError::NotVerified);
    }

    match (report.status.rank(), new_status.rank()) {
        (Some(current), Some(new)) if new > current => Ok(()),
        _ => Err(StatusTransitionError::InvalidStatusTransition {
            from: report.status,
            to: new_status,
        }),
    }
}

pub fn status_event(status: OperationalStatus) -> Option<NotificationEvent> {
    match status {
        OperationalStatus::InProgress => Some(NotificationEvent::InProgress),
        OperationalStatus::Resolved => Some(NotificationEvent::Resolved),
        OperationalStatus::Pending | OperationalStatus::Rejected => None,
    }
}
