use serde::{Deserialize, Serialize};

use crate::{AdminQueue, OperationalStatus, VerificationFlags};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub verified: u64,
    pub auto_verified: u64,
    pub manually_verified: u64,
    pub manual_verification_pending: u64,
    pub spam: u64,
    /// Resolved reports / all reports, in percent.
    pub resolution_rate: f64,
}

impl ReportStatistics {
    pub fn add(&mut self, flags: VerificationFlags, status: OperationalStatus) {
        self.total += 1;
        match status {
            OperationalStatus::Pending => self.pending += 1,
            OperationalStatus::InProgress => self.in_progress += 1,
            OperationalStatus::Resolved => self.resolved += 1,
            OperationalStatus::Rejected => self.rejected += 1,
        }
        if flags.verified {
            self.verified += 1;
            if flags.auto_verified {
                self.auto_verified += 1;
            } else {
                self.manually_verified += 1;
            }
        }
        if AdminQueue::ManualPending.contains(flags) {
            self.manual_verification_pending += 1;
        }
        if flags.is_spam {
            self.spam += 1;
        }
        self.resolution_rate = if self.total == 0 {
            0.0
        } else {
            (self.resolved as f64 / self.total as f64) * 100.0
        };
    }
}
