//! SQLite implementation of the stores.

use std::{collections::HashMap, fmt::Debug};

use async_trait::async_trait;
use config::file::DatabaseConfig;
use diesel::{insert_into, prelude::*, result::DatabaseErrorKind, update};
use error_stack::{Result, ResultExt};
use model::{
    AdminQueue, Category, Location, MediaAttachments, NoteAuthor, Notification, NotificationEvent,
    NotificationId, OperationalStatus, Report, ReportId, ReportNote, ReportStatistics,
    ReportVersion, UnixTime, UrgencyLevel, UserId, Verdict, VerdictOutcome, VerdictSource,
    VerificationFlags,
    schema::{notification, report, report_note, report_verdict},
};
use tracing::info;
use utils::ContextExt;

use crate::{
    NotificationStore, ReportStore, StoreError, data,
    diesel_db::{
        DatabaseLocation, DieselCloseHandle, DieselConnection, DieselDatabaseError,
        DieselReadHandle, DieselWriteHandle, ObjectExtensions,
    },
};

trait IntoDatabaseError: Sized {
    type Ok;

    #[track_caller]
    fn into_db_error<T: Debug>(self, e: StoreError, context: T) -> Result<Self::Ok, StoreError>;
}

impl<Ok> IntoDatabaseError for std::result::Result<Ok, diesel::result::Error> {
    type Ok = Ok;

    fn into_db_error<T: Debug>(self, e: StoreError, context: T) -> Result<Ok, StoreError> {
        self.change_context(e)
            .attach_printable_lazy(move || format!("{:#?}", context))
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = report)]
#[diesel(check_for_backend(model::Db))]
struct ReportRow {
    id: ReportId,
    submitter: UserId,
    description: String,
    category: Category,
    urgency: UrgencyLevel,
    latitude: f64,
    longitude: f64,
    address: Option<String>,
    affected_people: i64,
    has_image: bool,
    has_audio: bool,
    status: OperationalStatus,
    verified: bool,
    requires_manual_verification: bool,
    auto_verified: bool,
    is_spam: bool,
    validation_reason: String,
    manual_verification_reason: Option<String>,
    version: ReportVersion,
    created_at: UnixTime,
    updated_at: UnixTime,
    resolved_at: Option<UnixTime>,
}

impl ReportRow {
    fn from_report(report: &Report) -> Result<Self, StoreError> {
        let flags = report
            .flags()
            .ok_or(StoreError::NotPersistable.report())
            .attach_printable_lazy(|| report.id.to_string())?;
        Ok(Self {
            id: report.id,
            submitter: report.submitter,
            description: report.description.clone(),
            category: report.category,
            urgency: report.urgency,
            latitude: report.location.latitude(),
            longitude: report.location.longitude(),
            address: report.location.address().map(ToString::to_string),
            affected_people: report.affected_people.into(),
            has_image: report.media.has_image,
            has_audio: report.media.has_audio,
            status: report.status,
            verified: flags.verified,
            requires_manual_verification: flags.requires_manual_verification,
            auto_verified: flags.auto_verified,
            is_spam: flags.is_spam,
            validation_reason: report.validation_reason.clone(),
            manual_verification_reason: report.manual_verification_reason.clone(),
            version: report.version,
            created_at: report.created_at,
            updated_at: report.updated_at,
            resolved_at: report.resolved_at,
        })
    }

    fn flags(&self) -> VerificationFlags {
        VerificationFlags::new(
            self.verified,
            self.requires_manual_verification,
            self.auto_verified,
            self.is_spam,
        )
    }

    fn into_report(
        self,
        verdicts: Vec<Verdict>,
        notes: Vec<ReportNote>,
    ) -> Result<Report, StoreError> {
        let id = self.id;
        let verification = self
            .flags()
            .to_state()
            .change_context(StoreError::DataIntegrity)
            .attach_printable_lazy(|| id.to_string())?;
        let location = Location::new(self.latitude, self.longitude, self.address)
            .change_context(StoreError::DataIntegrity)
            .attach_printable_lazy(|| id.to_string())?;
        let affected_people = u32::try_from(self.affected_people)
            .change_context(StoreError::DataIntegrity)
            .attach_printable_lazy(|| id.to_string())?;

        Ok(Report {
            id,
            submitter: self.submitter,
            description: self.description,
            category: self.category,
            urgency: self.urgency,
            location,
            affected_people,
            media: MediaAttachments {
                has_image: self.has_image,
                has_audio: self.has_audio,
            },
            status: self.status,
            verification,
            validation_reason: self.validation_reason,
            manual_verification_reason: self.manual_verification_reason,
            verdicts,
            notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = report_verdict)]
#[diesel(check_for_backend(model::Db))]
struct VerdictRow {
    report_id: ReportId,
    source: VerdictSource,
    outcome: VerdictOutcome,
    raw_response: Option<String>,
    latency_millis: i64,
    responded_at: UnixTime,
}

impl VerdictRow {
    fn new(report_id: ReportId, verdict: &Verdict) -> Self {
        Self {
            report_id,
            source: verdict.source,
            outcome: verdict.outcome,
            raw_response: verdict.raw_response.clone(),
            latency_millis: i64::try_from(verdict.latency_millis).unwrap_or(i64::MAX),
            responded_at: verdict.responded_at,
        }
    }

    fn into_verdict(self) -> Result<Verdict, StoreError> {
        let latency_millis = u64::try_from(self.latency_millis)
            .change_context(StoreError::DataIntegrity)
            .attach_printable_lazy(|| self.report_id.to_string())?;
        Ok(Verdict {
            source: self.source,
            outcome: self.outcome,
            raw_response: self.raw_response,
            latency_millis,
            responded_at: self.responded_at,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = report_note)]
#[diesel(check_for_backend(model::Db))]
struct NoteRow {
    report_id: ReportId,
    content: String,
    author: NoteAuthor,
    added_at: UnixTime,
}

impl NoteRow {
    fn new(report_id: ReportId, note: &ReportNote) -> Self {
        Self {
            report_id,
            content: note.content.clone(),
            author: note.author,
            added_at: note.added_at,
        }
    }

    fn into_note(self) -> ReportNote {
        ReportNote::new(self.content, self.author, self.added_at)
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = notification)]
#[diesel(check_for_backend(model::Db))]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    report_id: ReportId,
    event: NotificationEvent,
    message: String,
    is_read: bool,
    created_at: UnixTime,
}

impl From<&Notification> for NotificationRow {
    fn from(value: &Notification) -> Self {
        Self {
            id: value.id,
            user_id: value.user,
            report_id: value.report,
            event: value.event,
            message: value.message.clone(),
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

impl From<NotificationRow> for Notification {
    fn from(value: NotificationRow) -> Self {
        Self {
            id: value.id,
            user: value.user_id,
            report: value.report_id,
            event: value.event,
            message: value.message,
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

/// Load verdicts and notes for report rows.
fn complete_reports(
    conn: &mut DieselConnection,
    rows: Vec<ReportRow>,
) -> Result<Vec<Report>, StoreError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<ReportId> = rows.iter().map(|r| r.id).collect();

    let verdict_rows: Vec<VerdictRow> = report_verdict::table
        .filter(report_verdict::report_id.eq_any(ids.clone()))
        .order(report_verdict::id.asc())
        .select(VerdictRow::as_select())
        .load(conn)
        .into_db_error(StoreError::Database, ids.len())?;
    let mut verdicts: HashMap<ReportId, Vec<Verdict>> = HashMap::new();
    for row in verdict_rows {
        let id = row.report_id;
        verdicts.entry(id).or_default().push(row.into_verdict()?);
    }

    let note_rows: Vec<NoteRow> = report_note::table
        .filter(report_note::report_id.eq_any(ids.clone()))
        .order(report_note::id.asc())
        .select(NoteRow::as_select())
        .load(conn)
        .into_db_error(StoreError::Database, ids.len())?;
    let mut notes: HashMap<ReportId, Vec<ReportNote>> = HashMap::new();
    for row in note_rows {
        notes.entry(row.report_id).or_default().push(row.into_note());
    }

    rows.into_iter()
        .map(|row| {
            let verdicts = verdicts.remove(&row.id).unwrap_or_default();
            let notes = notes.remove(&row.id).unwrap_or_default();
            row.into_report(verdicts, notes)
        })
        .collect()
}

fn load_reports(
    conn: &mut DieselConnection,
    query: report::BoxedQuery<'static, model::Db>,
) -> Result<Vec<Report>, StoreError> {
    let rows: Vec<ReportRow> = query
        .select(ReportRow::as_select())
        .load(conn)
        .into_db_error(StoreError::Database, ())?;
    complete_reports(conn, rows)
}

fn newest_first(query: report::BoxedQuery<'static, model::Db>) -> report::BoxedQuery<'static, model::Db> {
    query.order((report::created_at.desc(), report::id.desc()))
}

fn queue_query(queue: AdminQueue) -> report::BoxedQuery<'static, model::Db> {
    let query = report::table.into_boxed();
    match queue {
        AdminQueue::ManualPending => query
            .filter(report::verified.eq(false))
            .filter(report::requires_manual_verification.eq(true))
            .filter(report::auto_verified.eq(false))
            .filter(report::is_spam.eq(false)),
        AdminQueue::AiRejected => query
            .filter(report::verified.eq(false))
            .filter(report::requires_manual_verification.eq(true))
            .filter(report::auto_verified.eq(true))
            .filter(report::is_spam.eq(false)),
        AdminQueue::Spam => query.filter(report::is_spam.eq(true)),
        AdminQueue::PreviouslyRejected => query
            .filter(report::verified.eq(false))
            .filter(report::requires_manual_verification.eq(false))
            .filter(report::auto_verified.eq(false))
            .filter(report::is_spam.eq(false)),
    }
}

fn insert_report_rows(
    conn: &mut DieselConnection,
    row: ReportRow,
    verdicts: Vec<VerdictRow>,
    notes: Vec<NoteRow>,
) -> std::result::Result<(), diesel::result::Error> {
    conn.transaction(|conn| {
        insert_into(report::table).values(&row).execute(conn)?;
        if !verdicts.is_empty() {
            insert_into(report_verdict::table)
                .values(&verdicts)
                .execute(conn)?;
        }
        if !notes.is_empty() {
            insert_into(report_note::table).values(&notes).execute(conn)?;
        }
        Ok(())
    })
}

enum UpdateResult {
    Updated,
    VersionChanged,
    Missing,
}

fn update_report_row(
    conn: &mut DieselConnection,
    expected_version: ReportVersion,
    row: ReportRow,
    note: NoteRow,
) -> std::result::Result<UpdateResult, diesel::result::Error> {
    conn.transaction(|conn| {
        let updated = update(
            report::table
                .filter(report::id.eq(row.id))
                .filter(report::version.eq(expected_version)),
        )
        .set((
            report::status.eq(row.status),
            report::verified.eq(row.verified),
            report::requires_manual_verification.eq(row.requires_manual_verification),
            report::auto_verified.eq(row.auto_verified),
            report::is_spam.eq(row.is_spam),
            report::validation_reason.eq(&row.validation_reason),
            report::manual_verification_reason.eq(&row.manual_verification_reason),
            report::version.eq(row.version),
            report::updated_at.eq(row.updated_at),
            report::resolved_at.eq(row.resolved_at),
        ))
        .execute(conn)?;

        if updated == 0 {
            let exists: i64 = report::table
                .filter(report::id.eq(row.id))
                .count()
                .get_result(conn)?;
            return Ok(if exists == 0 {
                UpdateResult::Missing
            } else {
                UpdateResult::VersionChanged
            });
        }

        insert_into(report_note::table).values(&note).execute(conn)?;
        Ok(UpdateResult::Updated)
    })
}

pub struct StoreCloseHandle {
    write: DieselCloseHandle,
    read: Option<DieselCloseHandle>,
}

impl StoreCloseHandle {
    /// Call this before closing the program.
    pub async fn close(self) {
        if let Some(read) = self.read {
            read.close().await;
        }
        self.write.close().await;
    }
}

/// Report and notification store using SQLite.
///
/// All writes go through a single connection. In RAM databases share
/// that connection also for reads.
#[derive(Debug, Clone)]
pub struct DieselReportStore {
    write: DieselWriteHandle,
    read: DieselReadHandle,
}

impl DieselReportStore {
    pub async fn new(
        config: &DatabaseConfig,
    ) -> Result<(Self, StoreCloseHandle), DieselDatabaseError> {
        let location = data::database_location(config)?;
        let (write, write_close) = DieselWriteHandle::new(&location).await?;

        let sqlite_version = write.sqlite_version().await?;
        info!("SQLite version: {}", sqlite_version);

        if config.sqlite_in_ram {
            let read = write.to_read_handle();
            let close = StoreCloseHandle {
                write: write_close,
                read: None,
            };
            return Ok((Self { write, read }, close));
        }

        let connections = config
            .read_connections
            .map(|c| c.get().into())
            .unwrap_or_else(num_cpus::get);
        let (read, read_close) = DieselReadHandle::new(&location, connections).await?;
        let close = StoreCloseHandle {
            write: write_close,
            read: Some(read_close),
        };
        Ok((Self { write, read }, close))
    }

    /// Named in RAM database with a single connection.
    pub async fn new_in_ram(
        name: &str,
    ) -> Result<(Self, StoreCloseHandle), DieselDatabaseError> {
        let location = DatabaseLocation::InRam {
            name: name.to_string(),
        };
        let (write, write_close) = DieselWriteHandle::new(&location).await?;
        let read = write.to_read_handle();
        let close = StoreCloseHandle {
            write: write_close,
            read: None,
        };
        Ok((Self { write, read }, close))
    }

    async fn read<
        T: Send + 'static,
        F: FnOnce(&mut DieselConnection) -> Result<T, StoreError> + Send + 'static,
    >(
        &self,
        action: F,
    ) -> Result<T, StoreError> {
        let conn = self
            .read
            .pool()
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)
            .change_context(StoreError::Database)?;
        conn.interact(action)
            .await
            .change_context(StoreError::Database)?
    }

    async fn write<
        T: Send + 'static,
        F: FnOnce(&mut DieselConnection) -> Result<T, StoreError> + Send + 'static,
    >(
        &self,
        action: F,
    ) -> Result<T, StoreError> {
        let conn = self
            .write
            .pool()
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)
            .change_context(StoreError::Database)?;
        conn.interact(action)
            .await
            .change_context(StoreError::Database)?
    }
}

#[async_trait]
impl ReportStore for DieselReportStore {
    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        let id = report.id;
        let row = ReportRow::from_report(report)?;
        let verdicts = report
            .verdicts
            .iter()
            .map(|v| VerdictRow::new(id, v))
            .collect();
        let notes = report.notes.iter().map(|n| NoteRow::new(id, n)).collect();

        self.write(move |conn| match insert_report_rows(conn, row, verdicts, notes) {
            Ok(()) => Ok(()),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StoreError::AlreadyExists.report()).attach_printable(id.to_string())
            }
            Err(e) => Err(e).into_db_error(StoreError::Database, id),
        })
        .await
    }

    async fn report(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        self.read(move |conn| {
            let query = report::table.filter(report::id.eq(id)).into_boxed();
            let reports = load_reports(conn, query)?;
            Ok(reports.into_iter().next())
        })
        .await
    }

    async fn reports_in_queue(&self, queue: AdminQueue) -> Result<Vec<Report>, StoreError> {
        self.read(move |conn| load_reports(conn, newest_first(queue_query(queue))))
            .await
    }

    async fn reports_with_status(
        &self,
        status: OperationalStatus,
    ) -> Result<Vec<Report>, StoreError> {
        self.read(move |conn| {
            let query = report::table.filter(report::status.eq(status)).into_boxed();
            load_reports(conn, newest_first(query))
        })
        .await
    }

    async fn reports_by_submitter(&self, submitter: UserId) -> Result<Vec<Report>, StoreError> {
        self.read(move |conn| {
            let query = report::table
                .filter(report::submitter.eq(submitter))
                .into_boxed();
            load_reports(conn, newest_first(query))
        })
        .await
    }

    async fn urgent_reports(&self, created_before: UnixTime) -> Result<Vec<Report>, StoreError> {
        self.read(move |conn| {
            let query = report::table
                .filter(report::verified.eq(true))
                .filter(report::is_spam.eq(false))
                .filter(report::status.eq(OperationalStatus::Pending))
                .filter(report::created_at.lt(created_before))
                .order((report::created_at.asc(), report::id.asc()))
                .into_boxed();
            load_reports(conn, query)
        })
        .await
    }

    async fn statistics(
        &self,
        created_since: Option<UnixTime>,
    ) -> Result<ReportStatistics, StoreError> {
        self.read(move |conn| {
            let mut query = report::table
                .select((
                    report::verified,
                    report::requires_manual_verification,
                    report::auto_verified,
                    report::is_spam,
                    report::status,
                ))
                .into_boxed();
            if let Some(since) = created_since {
                query = query.filter(report::created_at.ge(since));
            }
            let rows: Vec<(bool, bool, bool, bool, OperationalStatus)> = query
                .load(conn)
                .into_db_error(StoreError::Database, created_since)?;

            let mut statistics = ReportStatistics::default();
            for (verified, manual, auto, spam, status) in rows {
                let flags = VerificationFlags::new(verified, manual, auto, spam);
                flags
                    .to_state()
                    .change_context(StoreError::DataIntegrity)?;
                statistics.add(flags, status);
            }
            Ok(statistics)
        })
        .await
    }

    async fn update_report(
        &self,
        expected_version: ReportVersion,
        report: &Report,
        note: &ReportNote,
    ) -> Result<(), StoreError> {
        let id = report.id;
        let row = ReportRow::from_report(report)?;
        let note = NoteRow::new(id, note);

        self.write(move |conn| {
            match update_report_row(conn, expected_version, row, note)
                .into_db_error(StoreError::Database, id)?
            {
                UpdateResult::Updated => Ok(()),
                UpdateResult::VersionChanged => Err(StoreError::Conflict.report())
                    .attach_printable(format!("{id}, expected version {expected_version}")),
                UpdateResult::Missing => {
                    Err(StoreError::NotFound.report()).attach_printable(id.to_string())
                }
            }
        })
        .await
    }
}

#[async_trait]
impl NotificationStore for DieselReportStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let row = NotificationRow::from(notification);
        self.write(move |conn| {
            insert_into(notification::table)
                .values(&row)
                .execute(conn)
                .into_db_error(StoreError::Database, row.id)?;
            Ok(())
        })
        .await
    }

    async fn notifications(&self, user: UserId) -> Result<Vec<Notification>, StoreError> {
        self.read(move |conn| {
            let rows: Vec<NotificationRow> = notification::table
                .filter(notification::user_id.eq(user))
                .order((notification::created_at.desc(), notification::id.desc()))
                .select(NotificationRow::as_select())
                .load(conn)
                .into_db_error(StoreError::Database, user)?;
            Ok(rows.into_iter().map(Notification::from).collect())
        })
        .await
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<(), StoreError> {
        self.write(move |conn| {
            let updated = update(
                notification::table
                    .filter(notification::id.eq(id))
                    .filter(notification::user_id.eq(user)),
            )
            .set(notification::is_read.eq(true))
            .execute(conn)
            .into_db_error(StoreError::Database, (user, id))?;
            if updated == 0 {
                Err(StoreError::NotFound.report()).attach_printable(id.to_string())
            } else {
                Ok(())
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use model::{SpamOrigin, VerificationState, VerifiedBy};

    use super::*;
    use crate::test_util::{report as test_report, submitter, verified_report};

    async fn store() -> (DieselReportStore, StoreCloseHandle) {
        let name = format!("test_{}", uuid::Uuid::new_v4().simple());
        DieselReportStore::new_in_ram(&name).await.unwrap()
    }

    fn verdict(source: VerdictSource, outcome: VerdictOutcome) -> Verdict {
        Verdict {
            source,
            outcome,
            raw_response: Some("yes".to_string()),
            latency_millis: 120,
            responded_at: UnixTime::new(1000),
        }
    }

    #[tokio::test]
    async fn report_is_loaded_with_verdicts_and_notes() {
        let (store, close) = store().await;
        let mut report = verified_report(submitter(), 1000);
        report.verdicts = vec![
            verdict(VerdictSource::AiTextValidator, VerdictOutcome::Yes),
            verdict(VerdictSource::MlDisasterClassifier, VerdictOutcome::Unavailable),
        ];
        store.insert_report(&report).await.unwrap();

        let loaded = store.report(report.id).await.unwrap().unwrap();
        assert_eq!(loaded, report);
        close.close().await;
    }

    #[tokio::test]
    async fn missing_report_is_none() {
        let (store, close) = store().await;
        assert!(store.report(ReportId::new_random()).await.unwrap().is_none());
        close.close().await;
    }

    #[tokio::test]
    async fn pending_pipeline_report_is_not_persisted() {
        let (store, close) = store().await;
        let report = test_report(submitter(), VerificationState::PendingPipeline, 1000);
        let error = store.insert_report(&report).await.unwrap_err();
        assert_eq!(*error.current_context(), StoreError::NotPersistable);
        close.close().await;
    }

    #[tokio::test]
    async fn queues_select_by_state() {
        let (store, close) = store().await;
        let user = submitter();
        let manual = test_report(user, VerificationState::ManualPending, 1000);
        let ai_rejected = test_report(user, VerificationState::AiRejected, 1001);
        let spam = test_report(
            user,
            VerificationState::Spam {
                origin: SpamOrigin::Classifier {
                    auto_verified: true,
                },
            },
            1002,
        );
        let rejected = test_report(user, VerificationState::RejectedFinal, 1003);
        let verified = verified_report(user, 1004);
        for r in [&manual, &ai_rejected, &spam, &rejected, &verified] {
            store.insert_report(r).await.unwrap();
        }

        let ids = |reports: Vec<Report>| reports.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(
            ids(store.reports_in_queue(AdminQueue::ManualPending).await.unwrap()),
            vec![manual.id]
        );
        assert_eq!(
            ids(store.reports_in_queue(AdminQueue::AiRejected).await.unwrap()),
            vec![ai_rejected.id]
        );
        assert_eq!(
            ids(store.reports_in_queue(AdminQueue::Spam).await.unwrap()),
            vec![spam.id]
        );
        assert_eq!(
            ids(store
                .reports_in_queue(AdminQueue::PreviouslyRejected)
                .await
                .unwrap()),
            vec![rejected.id]
        );
        assert_eq!(
            ids(store.reports_by_submitter(user).await.unwrap()),
            vec![verified.id, rejected.id, spam.id, ai_rejected.id, manual.id]
        );
        close.close().await;
    }

    #[tokio::test]
    async fn update_checks_version() {
        let (store, close) = store().await;
        let report = test_report(submitter(), VerificationState::ManualPending, 1000);
        store.insert_report(&report).await.unwrap();

        let mut updated = report.clone();
        updated.verification = VerificationState::Verified {
            by: VerifiedBy::Admin,
        };
        updated.manual_verification_reason = Some("confirmed by phone".to_string());
        updated.version = report.version.next();
        let note = ReportNote::new("Verified by admin", NoteAuthor::Admin, UnixTime::new(1100));

        store
            .update_report(report.version, &updated, &note)
            .await
            .unwrap();

        let error = store
            .update_report(report.version, &updated, &note)
            .await
            .unwrap_err();
        assert_eq!(*error.current_context(), StoreError::Conflict);

        let loaded = store.report(report.id).await.unwrap().unwrap();
        assert!(loaded.is_verified());
        assert_eq!(loaded.version, report.version.next());
        assert_eq!(loaded.notes.len(), 2);
        assert_eq!(loaded.notes[1], note);
        close.close().await;
    }

    #[tokio::test]
    async fn update_of_missing_report_is_not_found() {
        let (store, close) = store().await;
        let report = verified_report(submitter(), 1000);
        let note = ReportNote::new("x", NoteAuthor::Admin, UnixTime::new(1100));
        let error = store
            .update_report(report.version, &report, &note)
            .await
            .unwrap_err();
        assert_eq!(*error.current_context(), StoreError::NotFound);
        close.close().await;
    }

    #[tokio::test]
    async fn urgent_reports_are_old_verified_and_pending() {
        let (store, close) = store().await;
        let user = submitter();
        let old = verified_report(user, 1000);
        let new = verified_report(user, 5000);
        let mut in_progress = verified_report(user, 900);
        in_progress.status = OperationalStatus::InProgress;
        let manual = test_report(user, VerificationState::ManualPending, 800);
        for r in [&old, &new, &in_progress, &manual] {
            store.insert_report(r).await.unwrap();
        }

        let urgent = store.urgent_reports(UnixTime::new(2000)).await.unwrap();
        assert_eq!(urgent.len(), 1);
        assert_eq!(urgent[0].id, old.id);
        close.close().await;
    }

    #[tokio::test]
    async fn statistics_count_states() {
        let (store, close) = store().await;
        let user = submitter();
        let mut resolved = verified_report(user, 1000);
        resolved.status = OperationalStatus::Resolved;
        let manual = test_report(user, VerificationState::ManualPending, 3000);
        for r in [&resolved, &manual] {
            store.insert_report(r).await.unwrap();
        }

        let all = store.statistics(None).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.verified, 1);
        assert_eq!(all.auto_verified, 1);
        assert_eq!(all.manual_verification_pending, 1);
        assert_eq!(all.resolution_rate, 50.0);

        let recent = store.statistics(Some(UnixTime::new(2000))).await.unwrap();
        assert_eq!(recent.total, 1);
        assert_eq!(recent.resolved, 0);
        close.close().await;
    }

    #[tokio::test]
    async fn notifications_are_per_user() {
        let (store, close) = store().await;
        let user = submitter();
        let report = verified_report(user, 1000);
        store.insert_report(&report).await.unwrap();
        let notification = Notification::new(
            user,
            report.id,
            report.category,
            NotificationEvent::Verified,
            UnixTime::new(1000),
        );
        store.insert_notification(&notification).await.unwrap();

        let error = store
            .mark_notification_read(submitter(), notification.id)
            .await
            .unwrap_err();
        assert_eq!(*error.current_context(), StoreError::NotFound);

        store
            .mark_notification_read(user, notification.id)
            .await
            .unwrap();
        let loaded = store.notifications(user).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_read);
        assert!(store.notifications(submitter()).await.unwrap().is_empty());
        close.close().await;
    }
}
