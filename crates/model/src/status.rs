use std::{fmt, str::FromStr};

use diesel::{AsExpression, FromSqlRow, sql_types::BigInt};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::macros::diesel_i64_try_from;

/// Operational lifecycle of a report. Independent from the verification
/// state, but only verified reports can move forward.
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
pub enum OperationalStatus {
    Pending = 0,
    InProgress = 1,
    Resolved = 2,
    /// Set when an admin decides that the report is not genuine.
    Rejected = 3,
}

impl Default for OperationalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl OperationalStatus {
    /// Position in the forward-only lifecycle. Rejected is outside of it.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::InProgress => Some(1),
            Self::Resolved => Some(2),
            Self::Rejected => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown status: {s}")),
        }
    }
}

diesel_i64_try_from!(OperationalStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_ranks_are_ordered() {
        assert!(OperationalStatus::Pending.rank() < OperationalStatus::InProgress.rank());
        assert!(OperationalStatus::InProgress.rank() < OperationalStatus::Resolved.rank());
        assert_eq!(OperationalStatus::Rejected.rank(), None);
    }

    #[test]
    fn parsing_accepts_both_separators() {
        assert_eq!(
            "in-progress".parse::<OperationalStatus>(),
            Ok(OperationalStatus::InProgress)
        );
        assert_eq!(
            "IN_PROGRESS".parse::<OperationalStatus>(),
            Ok(OperationalStatus::InProgress)
        );
        assert!("done".parse::<OperationalStatus>().is_err());
    }
}
