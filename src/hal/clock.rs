//! Real-time dwell.

use std::time::Duration;

use crate::traits::Dwell;

/// Dwell that blocks the current thread with [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SleepDwell;

impl Dwell for SleepDwell {
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
