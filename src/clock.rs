//! Wall-clock source used for connection expiry.
use std::sync::Arc;

use chrono::Utc;

/// Returns the current time in whole seconds since the UNIX epoch.
pub type TimeProvider = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Returns the current time in seconds since the UNIX epoch.
///
/// Returns 0 if the system clock is before the UNIX epoch.
pub fn system_time_provider() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Time provider backed by the system clock.
pub fn system_clock() -> TimeProvider {
    Arc::new(system_time_provider)
}

/// Current time in nanoseconds since the UNIX epoch, or 0 when unavailable.
pub(crate) fn unix_nanos() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or(0)
}
