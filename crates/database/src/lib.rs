#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! Report and notification storage.
//!
//! [ReportStore] and [NotificationStore] are the seams used by the
//! verification service. [sqlite::DieselReportStore] is the production
//! implementation and [memory::InMemoryReportStore] is used in tests.

pub mod data;
pub mod diesel_db;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use error_stack::Result;
use model::{
    AdminQueue, Notification, NotificationId, OperationalStatus, Report, ReportId, ReportNote,
    ReportStatistics, ReportVersion, UnixTime, UserId,
};
use utils::ComponentError;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("Report not found")]
    NotFound,
    #[error("Report version did not match")]
    Conflict,
    #[error("Report already exists")]
    AlreadyExists,
    #[error("Report has not been through the verification pipeline")]
    NotPersistable,
    #[error("Stored report data is inconsistent")]
    DataIntegrity,
    #[error("Database error")]
    Database,
}

impl ComponentError for StoreError {
    const COMPONENT_NAME: &'static str = "Store";
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a report together with its verdicts and notes.
    ///
    /// Reports in [model::VerificationState::PendingPipeline] state
    /// are rejected with [StoreError::NotPersistable].
    async fn insert_report(&self, report: &Report) -> Result<(), StoreError>;

    async fn report(&self, id: ReportId) -> Result<Option<Report>, StoreError>;

    /// Reports in an admin queue, newest first.
    async fn reports_in_queue(&self, queue: AdminQueue) -> Result<Vec<Report>, StoreError>;

    /// Newest first.
    async fn reports_with_status(
        &self,
        status: OperationalStatus,
    ) -> Result<Vec<Report>, StoreError>;

    /// Newest first.
    async fn reports_by_submitter(&self, submitter: UserId) -> Result<Vec<Report>, StoreError>;

    /// Verified, non-spam reports still in the pending status which were
    /// created before `created_before`. Oldest first.
    async fn urgent_reports(&self, created_before: UnixTime) -> Result<Vec<Report>, StoreError>;

    /// Statistics over all reports or over reports created at or after
    /// `created_since`.
    async fn statistics(
        &self,
        created_since: Option<UnixTime>,
    ) -> Result<ReportStatistics, StoreError>;

    /// Compare and swap update.
    ///
    /// Writes status, verification state, reasons, version and the
    /// timestamps from `report` and appends `note` if the stored version
    /// equals `expected_version`. Returns [StoreError::Conflict] if the
    /// version has changed and [StoreError::NotFound] if the report
    /// does not exist.
    async fn update_report(
        &self,
        expected_version: ReportVersion,
        report: &Report,
        note: &ReportNote,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Newest first.
    async fn notifications(&self, user: UserId) -> Result<Vec<Notification>, StoreError>;

    /// Returns [StoreError::NotFound] if the notification does not exist
    /// or it belongs to another user.
    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<(), StoreError>;
}

/// Sort order used by all report listings except urgent reports.
pub(crate) fn sort_newest_first(reports: &mut [Report]) {
    reports.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Fields which can change after the report is created.
pub(crate) fn apply_mutable_fields(stored: &mut Report, update: &Report, note: &ReportNote) {
    stored.status = update.status;
    stored.verification = update.verification.clone();
    stored.validation_reason = update.validation_reason.clone();
    stored.manual_verification_reason = update.manual_verification_reason.clone();
    stored.version = update.version;
    stored.updated_at = update.updated_at;
    stored.resolved_at = update.resolved_at;
    stored.notes.push(note.clone());
}

#[cfg(test)]
pub(crate) mod test_util {
    use model::{
        Category, Location, MediaAttachments, NewReport, Report, ReportId, UnixTime,
        UrgencyLevel, UserId, VerificationState, VerifiedBy,
    };

    pub fn submitter() -> UserId {
        UserId::new(uuid::Uuid::new_v4())
    }

    /// Report which has been through the pipeline.
    pub fn report(submitter: UserId, state: VerificationState, created_at: i64) -> Report {
        let new = NewReport {
            submitter,
            description: "Water level rising near the bridge".to_string(),
            category: Category::Flood,
            urgency: UrgencyLevel::High,
            location: Location::new(12.97, 77.59, Some("MG Road".to_string())).unwrap(),
            affected_people: 12,
            media: MediaAttachments::default(),
        };
        let mut report =
            Report::from_submission(new, ReportId::new_random(), UnixTime::new(created_at));
        report.verification = state;
        report.validation_reason = "verified by AI".to_string();
        report
    }

    pub fn verified_report(submitter: UserId, created_at: i64) -> Report {
        report(
            submitter,
            VerificationState::Verified {
                by: VerifiedBy::Classifier,
            },
            created_at,
        )
    }
}
