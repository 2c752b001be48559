use std::fmt;

use diesel::{
    AsExpression, FromSqlRow,
    sql_types::{BigInt, Binary},
};
use serde::{Deserialize, Serialize};

use crate::macros::{diesel_i64_wrapper, diesel_uuid_wrapper};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = Binary)]
#[serde(transparent)]
pub struct ReportId {
    id: uuid::Uuid,
}

impl ReportId {
    pub fn new(id: uuid::Uuid) -> Self {
        Self { id }
    }

    pub fn new_random() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
        }
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.id
    }

    /// Last six characters of the ID in upper case. Used in
    /// user visible messages.
    pub fn short_id(&self) -> String {
        let simple = self.id.simple().to_string();
        let start = simple.len().saturating_sub(6);
        simple[start..].to_uppercase()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id.hyphenated())
    }
}

impl std::str::FromStr for ReportId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self::new)
    }
}

diesel_uuid_wrapper!(ReportId);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression,
)]
#[diesel(sql_type = Binary)]
#[serde(transparent)]
pub struct UserId {
    id: uuid::Uuid,
}

impl UserId {
    pub fn new(id: uuid::Uuid) -> Self {
        Self { id }
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.id
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id.hyphenated())
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self::new)
    }
}

diesel_uuid_wrapper!(UserId);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression,
)]
#[diesel(sql_type = Binary)]
#[serde(transparent)]
pub struct NotificationId {
    id: uuid::Uuid,
}

impl NotificationId {
    pub fn new(id: uuid::Uuid) -> Self {
        Self { id }
    }

    pub fn new_random() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
        }
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.id
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id.hyphenated())
    }
}

impl std::str::FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self::new)
    }
}

diesel_uuid_wrapper!(NotificationId);

/// Optimistic concurrency token of a report. Every committed write
/// increments it by one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[serde(transparent)]
pub struct ReportVersion {
    version: i64,
}

impl ReportVersion {
    pub fn new(version: i64) -> Self {
        Self { version }
    }

    pub fn as_i64(&self) -> &i64 {
        &self.version
    }

    pub fn next(self) -> Self {
        Self {
            version: self.version.wrapping_add(1),
        }
    }
}

impl fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

diesel_i64_wrapper!(ReportVersion);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[serde(transparent)]
pub struct UnixTime {
    pub ut: i64,
}

impl UnixTime {
    pub fn new(value: i64) -> Self {
        Self { ut: value }
    }

    pub fn as_i64(&self) -> &i64 {
        &self.ut
    }

    pub fn current_time() -> Self {
        Self {
            ut: utils::current_unix_time(),
        }
    }

    pub fn hours_ago(hours: u32) -> Self {
        Self {
            ut: utils::time::unix_time_hours_ago(hours),
        }
    }

    pub fn to_chrono_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.ut, 0)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for UnixTime {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            ut: value.timestamp(),
        }
    }
}

diesel_i64_wrapper!(UnixTime);
