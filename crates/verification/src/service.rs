use std::sync::Arc;

use config::file::QueriesConfig;
use database::{NotificationStore, ReportStore, StoreError};
use error_stack::{Report as ErrorReport, Result, ResultExt};
use model::{
    AdminAction, AdminQueue, NewReport, NonEmptyString, NoteAuthor, Notification, NotificationEvent,
    NotificationId, OperationalStatus, Report, ReportId, ReportNote, ReportStatistics,
    ReportVersion, UnixTime, UserId,
};
use tracing::info;
use utils::ContextExt;

use crate::{
    VerificationError,
    notification::Notifier,
    pipeline::PipelineStrategy,
    state_machine::apply_admin_action,
    status::{StatusActor, StatusTransitionError, check_status_transition, status_event},
};

fn store_error(e: ErrorReport<StoreError>) -> ErrorReport<VerificationError> {
    let context = match e.current_context() {
        StoreError::Conflict => VerificationError::Conflict,
        StoreError::NotFound => VerificationError::NotFound,
        _ => VerificationError::Persistence,
    };
    e.change_context(context)
}

trait StoreResultExt<T> {
    fn into_verification_error(self) -> Result<T, VerificationError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn into_verification_error(self) -> Result<T, VerificationError> {
        self.map_err(store_error)
    }
}

fn check_expected_version(
    report: &Report,
    expected: Option<ReportVersion>,
) -> Result<(), VerificationError> {
    match expected {
        Some(expected) if expected != report.version => Err(VerificationError::Conflict.report())
            .attach_printable(format!(
                "expected version {}, current version {}",
                expected, report.version
            )),
        _ => Ok(()),
    }
}

/// Report submission, admin decisions and operational status changes.
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    notifications: Arc<dyn NotificationStore>,
    pipeline: Arc<dyn PipelineStrategy>,
    notifier: Notifier,
    urgent_after_hours: u32,
}

impl ReportService {
    pub fn new<S: ReportStore + NotificationStore + 'static>(
        store: Arc<S>,
        pipeline: Arc<dyn PipelineStrategy>,
        notifier: Notifier,
        queries: &QueriesConfig,
    ) -> Self {
        Self {
            reports: store.clone(),
            notifications: store,
            pipeline,
            notifier,
            urgent_after_hours: queries.urgent_after_hours,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Validate, verify and store a new report. The report is stored only
    /// after the pipeline has decided its verification state.
    pub async fn submit_report(&self, new: NewReport) -> Result<Report, VerificationError> {
        new.validate()
            .change_context(VerificationError::MalformedInput)?;

        let mut report = Report::from_submission(new, ReportId::new_random(), UnixTime::current_time());
        let result = self
            .pipeline
            .evaluate(report.category, &report.description, report.media)
            .await;

        report.verification = result
            .decision
            .to_state()
            .change_context(VerificationError::Persistence)?;
        report.validation_reason = result.decision.reason;
        report.verdicts = result.verdicts;
        report.updated_at = UnixTime::current_time();

        self.reports
            .insert_report(&report)
            .await
            .into_verification_error()?;

        info!(
            "Report {} submitted, verification state {}, reason: {}",
            report.id,
            report.verification.name(),
            report.validation_reason
        );

        let event = if report.is_verified() {
            NotificationEvent::Verified
        } else {
            NotificationEvent::ManualReview
        };
        self.notifier.notify(&report, event);

        Ok(report)
    }

    pub async fn get_report(&self, id: ReportId) -> Result<Report, VerificationError> {
        self.reports
            .report(id)
            .await
            .into_verification_error()?
            .ok_or_else(|| VerificationError::NotFound.report())
            .attach_printable_lazy(|| format!("report {}", id))
    }

    pub async fn list_queue(&self, queue: AdminQueue) -> Result<Vec<Report>, VerificationError> {
        self.reports
            .reports_in_queue(queue)
            .await
            .into_verification_error()
    }

    pub async fn list_by_status(
        &self,
        status: OperationalStatus,
    ) -> Result<Vec<Report>, VerificationError> {
        self.reports
            .reports_with_status(status)
            .await
            .into_verification_error()
    }

    pub async fn list_submitter_reports(
        &self,
        submitter: UserId,
    ) -> Result<Vec<Report>, VerificationError> {
        self.reports
            .reports_by_submitter(submitter)
            .await
            .into_verification_error()
    }

    /// Verified reports which have been pending too long. Oldest first.
    pub async fn urgent_reports(&self) -> Result<Vec<Report>, VerificationError> {
        self.reports
            .urgent_reports(UnixTime::hours_ago(self.urgent_after_hours))
            .await
            .into_verification_error()
    }

    pub async fn statistics(
        &self,
        since: Option<UnixTime>,
    ) -> Result<ReportStatistics, VerificationError> {
        self.reports.statistics(since).await.into_verification_error()
    }

    /// Apply an admin decision.
    ///
    /// Nothing is written if the action is not allowed in the current
    /// verification state or if the report changed after
    /// `expected_version`.
    pub async fn apply_admin_decision(
        &self,
        id: ReportId,
        action: AdminAction,
        reason: String,
        expected_version: Option<ReportVersion>,
    ) -> Result<Report, VerificationError> {
        let reason = NonEmptyString::from_string(reason)
            .ok_or_else(|| VerificationError::MalformedInput.report())
            .attach_printable("Admin decision reason is empty")?;

        let current = self.get_report(id).await?;
        check_expected_version(&current, expected_version)?;

        let transition = apply_admin_action(
            &current.verification,
            current.status,
            action,
            reason.as_str(),
        )
        .change_context(VerificationError::InvalidTransition)?;

        let now = UnixTime::current_time();
        let mut updated = current.clone();
        updated.verification = transition.state;
        updated.status = transition.status;
        updated.manual_verification_reason = Some(transition.reason);
        updated.version = current.version.next();
        updated.updated_at = now;

        let note = ReportNote::new(
            format!("Admin decision {}: {}", action, reason.as_str()),
            NoteAuthor::Admin,
            now,
        );

        self.reports
            .update_report(current.version, &updated, &note)
            .await
            .into_verification_error()?;
        updated.notes.push(note);

        info!(
            "Report {} admin decision {}, verification state {} -> {}",
            id,
            action,
            current.verification.name(),
            updated.verification.name()
        );

        let event = if updated.is_verified() {
            NotificationEvent::Verified
        } else {
            NotificationEvent::Rejected
        };
        self.notifier.notify(&updated, event);

        Ok(updated)
    }

    /// Move a verified report forward in the operational workflow.
    pub async fn update_operational_status(
        &self,
        id: ReportId,
        actor: StatusActor,
        new_status: OperationalStatus,
        expected_version: Option<ReportVersion>,
    ) -> Result<Report, VerificationError> {
        let current = self.get_report(id).await?;
        check_expected_version(&current, expected_version)?;

        if let Err(e) = check_status_transition(&current, actor, new_status) {
            let context = match e {
                StatusTransitionError::NotAllowed => VerificationError::NotAllowed,
                StatusTransitionError::NotVerified => VerificationError::NotVerified,
                StatusTransitionError::InvalidStatusTransition { .. } => {
                    VerificationError::InvalidStatusTransition
                }
            };
            return Err(context.report()).attach_printable(e.to_string());
        }

        let now = UnixTime::current_time();
        let mut updated = current.clone();
        updated.status = new_status;
        updated.version = current.version.next();
        updated.updated_at = now;
        if new_status == OperationalStatus::Resolved {
            updated.resolved_at = Some(now);
        }

        let note = ReportNote::status_change(new_status, actor.note_author(), now);
        self.reports
            .update_report(current.version, &updated, &note)
            .await
            .into_verification_error()?;
        updated.notes.push(note);

        info!(
            "Report {} status {} -> {}",
            id,
            current.status.as_str(),
            new_status.as_str()
        );

        if let Some(event) = status_event(new_status) {
            self.notifier.notify(&updated, event);
        }

        Ok(updated)
    }

    pub async fn notifications(&self, user: UserId) -> Result<Vec<Notification>, VerificationError> {
        self.notifications
            .notifications(user)
            .await
            .into_verification_error()
    }

    pub async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<(), VerificationError> {
        self.notifications
            .mark_notification_read(user, id)
            .await
            .into_verification_error()
    }
}
