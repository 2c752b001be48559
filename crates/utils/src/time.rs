use chrono::Utc;

pub const SECONDS_IN_HOUR: i64 = 60 * 60;

pub fn current_unix_time() -> i64 {
    Utc::now().timestamp()
}

/// Unix time `hours` before now. Saturates instead of overflowing.
pub fn unix_time_hours_ago(hours: u32) -> i64 {
    current_unix_time().saturating_sub(i64::from(hours).saturating_mul(SECONDS_IN_HOUR))
}
