use chrono::Utc;

/// Returns the current UNIX timestamp in milliseconds.
///
/// Decision notifications and the collector's latency figures are all
/// expressed in this unit.
pub fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}
