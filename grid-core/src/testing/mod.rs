//! Shared test fixtures used across this crate's unit tests.
//!
//! Kept deliberately small: most modules build their own fixtures inline;
//! this only holds the handful reused across three or more test modules.

#![cfg(test)]

use chrono::{DateTime, TimeZone, Utc};

/// A fixed instant for tests that need a `DateTime<Utc>` but don't care
/// which one, so assertions don't depend on wall-clock time.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}
