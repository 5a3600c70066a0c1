//! Dwell timing.

use std::time::Duration;

/// Holds the current symbol on screen.
///
/// `wait` must block the calling thread for the full duration; the display
/// cycle relies on it returning only once the dwell time has elapsed.
pub trait Dwell {
    /// Blocks for `duration`.
    fn wait(&mut self, duration: Duration);
}
