//! Display backend with no physical output.
//!
//! Useful for bench runs and soak tests on machines without a panel: the full
//! cycle runs and every flush is logged, but nothing leaves the process.

use tracing::{debug, info};

use crate::surface::Surface;
use crate::traits::{DisplayInitError, Renderer};

/// Renderer that keeps the frame in memory only.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    surface: Surface,
    flushes: u64,
}

impl HeadlessRenderer {
    /// Creates a headless renderer with the kiosk surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}

impl Renderer for HeadlessRenderer {
    fn init(&mut self) -> Result<(), DisplayInitError> {
        info!(
            "Headless display {}x{}",
            self.surface.width(),
            self.surface.height()
        );
        self.surface.fill_background();
        self.flush();
        Ok(())
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn flush(&mut self) {
        self.flushes += 1;
        debug!(
            flush = self.flushes,
            blank = self.surface.is_blank(),
            "headless flush"
        );
    }
}
