//! Fire and forget user notifications.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use config::file::{NotificationConfig, NotificationSinkKind};
use database::NotificationStore;
use error_stack::{Result, ResultExt};
use model::{Notification, NotificationEvent, Report, UnixTime};
use tokio::task::JoinSet;
use tracing::{error, info};
use utils::ContextExt;

#[derive(thiserror::Error, Debug)]
pub enum NotificationError {
    #[error("Notification delivery failed")]
    Delivery,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Saves notifications so that users can list them later.
pub struct StoreNotificationSink {
    store: Arc<dyn NotificationStore>,
}

impl StoreNotificationSink {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationSink for StoreNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.store
            .insert_notification(notification)
            .await
            .change_context(NotificationError::Delivery)
    }
}

pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            "Notification to user {}: {}",
            notification.user, notification.message
        );
        Ok(())
    }
}

/// Keeps sent notifications in memory.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    notifications: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotificationSink {
    /// Sink which records the notification and then reports a delivery
    /// error.
    pub fn failing() -> Self {
        Self {
            notifications: Mutex::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.notifications().iter().map(|n| n.event).collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        match self.notifications.lock() {
            Ok(mut n) => n.push(notification.clone()),
            Err(e) => e.into_inner().push(notification.clone()),
        }
        if self.fail {
            Err(NotificationError::Delivery.report())
        } else {
            Ok(())
        }
    }
}

/// Sends notifications in background tasks. Delivery errors are logged
/// and never returned to the caller.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink: Some(sink),
            tasks: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NotificationConfig, store: Arc<dyn NotificationStore>) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match config.sink {
            NotificationSinkKind::Database => Self::new(Arc::new(StoreNotificationSink::new(store))),
            NotificationSinkKind::Log => Self::new(Arc::new(LogNotificationSink)),
        }
    }

    /// Notify the submitter of `report`. Must be called from a Tokio
    /// runtime.
    pub fn notify(&self, report: &Report, event: NotificationEvent) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let notification = Notification::new(
            report.submitter,
            report.id,
            report.category,
            event,
            UnixTime::current_time(),
        );

        let task = async move {
            if let Err(e) = sink.notify(&notification).await {
                error!(
                    "Notification {:?} for report {} failed: {:?}",
                    notification.event, notification.report, e
                );
            }
        };

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(e) => e.into_inner(),
        };
        remove_finished_tasks(&mut tasks);
        tasks.spawn(task);
    }

    /// Wait until all notifications sent so far are handled.
    pub async fn wait_pending(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(e) => std::mem::take(&mut *e.into_inner()),
        };
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Notification task failed: {}", e);
            }
        }
    }
}

fn remove_finished_tasks(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            error!("Notification task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use database::memory::InMemoryReportStore;
    use model::{
        Category, Location, MediaAttachments, NewReport, ReportId, UrgencyLevel, UserId,
    };

    use super::*;

    fn report() -> Report {
        let new = NewReport {
            submitter: UserId::new(uuid::Uuid::new_v4()),
            description: "Fire in the market".to_string(),
            category: Category::Fire,
            urgency: UrgencyLevel::High,
            location: Location::new(1.0, 2.0, None).unwrap(),
            affected_people: 0,
            media: MediaAttachments::default(),
        };
        Report::from_submission(new, ReportId::new_random(), UnixTime::new(0))
    }

    #[tokio::test]
    async fn store_sink_saves_notification_for_submitter() {
        let store = Arc::new(InMemoryReportStore::new());
        let notifier = Notifier::new(Arc::new(StoreNotificationSink::new(store.clone())));
        let report = report();
        notifier.notify(&report, NotificationEvent::Verified);
        notifier.wait_pending().await;

        let saved = store.notifications(report.submitter).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].event, NotificationEvent::Verified);
        assert!(!saved[0].is_read);
        assert!(saved[0].message.ends_with("Help is on the way!"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_panic() {
        let sink = Arc::new(RecordingNotificationSink::failing());
        let notifier = Notifier::new(sink.clone());
        notifier.notify(&report(), NotificationEvent::Resolved);
        notifier.wait_pending().await;
        assert_eq!(sink.events(), vec![NotificationEvent::Resolved]);
    }

    #[tokio::test]
    async fn finished_tasks_are_removed_when_notifying() {
        let sink = Arc::new(RecordingNotificationSink::default());
        let notifier = Notifier::new(sink.clone());
        let report = report();
        for _ in 0..1000 {
            notifier.notify(&report, NotificationEvent::InProgress);
        }
        while sink.notifications().len() < 1000 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        // Let the finished tasks complete their JoinSet bookkeeping.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        notifier.notify(&report, NotificationEvent::Resolved);
        assert_eq!(notifier.tasks.lock().unwrap().len(), 1);

        notifier.wait_pending().await;
        assert!(notifier.tasks.lock().unwrap().is_empty());
        assert_eq!(sink.notifications().len(), 1001);
    }

    #[tokio::test]
    async fn disabled_notifier_sends_nothing() {
        let notifier = Notifier::disabled();
        notifier.notify(&report(), NotificationEvent::Verified);
        notifier.wait_pending().await;
    }
}
