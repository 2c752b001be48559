//! Store which keeps everything in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use error_stack::{Result, ResultExt};
use model::{
    AdminQueue, Notification, NotificationId, OperationalStatus, Report, ReportId, ReportNote,
    ReportStatistics, ReportVersion, UnixTime, UserId,
};
use tokio::sync::RwLock;
use utils::ContextExt;

use crate::{
    NotificationStore, ReportStore, StoreError, apply_mutable_fields, sort_newest_first,
};

#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<ReportId, Report>>,
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filter_reports(&self, filter: impl Fn(&Report) -> bool) -> Vec<Report> {
        let mut reports: Vec<Report> = self
            .reports
            .read()
            .await
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect();
        sort_newest_first(&mut reports);
        reports
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        if report.flags().is_none() {
            return Err(StoreError::NotPersistable.report()).attach_printable(report.id.to_string());
        }
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.id) {
            return Err(StoreError::AlreadyExists.report()).attach_printable(report.id.to_string());
        }
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn report(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn reports_in_queue(&self, queue: AdminQueue) -> Result<Vec<Report>, StoreError> {
        Ok(self
            .filter_reports(|r| r.admin_queue() == Some(queue))
            .await)
    }

    async fn reports_with_status(
        &self,
        status: OperationalStatus,
    ) -> Result<Vec<Report>, StoreError> {
        Ok(self.filter_reports(|r| r.status == status).await)
    }

    async fn reports_by_submitter(&self, submitter: UserId) -> Result<Vec<Report>, StoreError> {
        Ok(self.filter_reports(|r| r.submitter == submitter).await)
    }

    async fn urgent_reports(&self, created_before: UnixTime) -> Result<Vec<Report>, StoreError> {
        let mut reports = self
            .filter_reports(|r| {
                r.is_verified()
                    && r.status == OperationalStatus::Pending
                    && r.created_at < created_before
            })
            .await;
        reports.reverse();
        Ok(reports)
    }

    async fn statistics(
        &self,
        created_since: Option<UnixTime>,
    ) -> Result<ReportStatistics, StoreError> {
        let mut statistics = ReportStatistics::default();
        for report in self.reports.read().await.values() {
            if created_since.is_some_and(|since| report.created_at < since) {
                continue;
            }
            let flags = report
                .flags()
                .ok_or(StoreError::DataIntegrity.report())
                .attach_printable_lazy(|| report.id.to_string())?;
            statistics.add(flags, report.status);
        }
        Ok(statistics)
    }

    async fn update_report(
        &self,
        expected_version: ReportVersion,
        report: &Report,
        note: &ReportNote,
    ) -> Result<(), StoreError> {
        if report.flags().is_none() {
            return Err(StoreError::NotPersistable.report()).attach_printable(report.id.to_string());
        }
        let mut reports = self.reports.write().await;
        let Some(stored) = reports.get_mut(&report.id) else {
            return Err(StoreError::NotFound.report()).attach_printable(report.id.to_string());
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict.report()).attach_printable(format!(
                "{}, expected version {}, current version {}",
                report.id, expected_version, stored.version
            ));
        }
        apply_mutable_fields(stored, report, note);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryReportStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn notifications(&self, user: UserId) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user == user)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().await;
        match notifications
            .iter_mut()
            .find(|n| n.id == id && n.user == user)
        {
            Some(n) => {
                n.is_read = true;
                Ok(())
            }
            None => Err(StoreError::NotFound.report()).attach_printable(id.to_string()),
        }
    }
}
