//! Foundational low-level utilities shared across Warden crates.
//!
//! Provides time helpers, size-rotated append-only files, and the background
//! task helpers used by the log dispatch workers.

pub mod background;
pub mod log_rotation;
pub mod time_utils;

pub use background::{lock_unpoisoned, spawn_background_future};
pub use log_rotation::{RotatingAppender, RotationPolicy};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, elapsed_since_unix_ms};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_time_utils_seconds_and_millis_agree() {
        let now_s = current_unix_timestamp();
        let now_ms_s = current_unix_timestamp_ms() / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn unit_elapsed_since_saturates_for_future_start() {
        let future = current_unix_timestamp_ms().saturating_add(60_000);
        assert_eq!(elapsed_since_unix_ms(future), 0);
    }
}
