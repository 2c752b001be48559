use diesel::{AsExpression, FromSqlRow, sql_types::BigInt};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::{Category, NotificationId, ReportId, UnixTime, UserId, macros::diesel_i64_try_from};

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
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Verified = 0,
    ManualReview = 1,
    Rejected = 2,
    InProgress = 3,
    Resolved = 4,
}

impl NotificationEvent {
    pub fn message(&self, report: ReportId, category: Category) -> String {
        let id = report.short_id();
        match self {
            Self::Verified => format!(
                "Report #{id}: Your {category} report has been verified. Help is on the way!"
            ),
            Self::ManualReview => format!(
                "Report #{id}: Your {category} report requires manual verification by our team."
            ),
            Self::Rejected => format!(
                "Report #{id}: Your {category} report could not be verified and has been rejected."
            ),
            Self::InProgress => {
                format!("Report #{id}: Your {category} report is being addressed by our team.")
            }
            Self::Resolved => {
                format!("Report #{id}: Your {category} report has been resolved. Thank you!")
            }
        }
    }
}

diesel_i64_try_from!(NotificationEvent);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user: UserId,
    pub report: ReportId,
    pub event: NotificationEvent,
    pub message: String,
    pub is_read: bool,
    pub created_at: UnixTime,
}

impl Notification {
    pub fn new(
        user: UserId,
        report: ReportId,
        category: Category,
        event: NotificationEvent,
        created_at: UnixTime,
    ) -> Self {
        Self {
            id: NotificationId::new_random(),
            user,
            report,
            event,
            message: event.message(report, category),
            is_read: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_short_id_and_category() {
        let id: ReportId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            NotificationEvent::Verified.message(id, Category::Flood),
            "Report #5FE0C8: Your flood report has been verified. Help is on the way!"
        );
        assert_eq!(
            NotificationEvent::Resolved.message(id, Category::Fire),
            "Report #5FE0C8: Your fire report has been resolved. Thank you!"
        );
    }

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(
            UserId::new(uuid::Uuid::new_v4()),
            ReportId::new_random(),
            Category::Medical,
            NotificationEvent::InProgress,
            UnixTime::new(1),
        );
        assert!(!n.is_read);
        assert!(n.message.contains("medical report is being addressed"));
    }
}
