//! Display cycle controller.
//!
//! This module provides [`DisplayController`], the state machine that turns
//! one payload into one visible symbol:
//!
//! ```text
//!            payload
//!   Idle ───────────────► encode ──ok──► Displaying: show ► dwell ► clear ──► Idle
//!     ▲                     │
//!     └────── err (logged) ─┘
//! ```
//!
//! A cycle that shows a symbol always runs dwell and clear to completion, so
//! at most one symbol is ever on screen and the surface is blank between
//! cycles. Taking `&mut self` keeps cycles from overlapping.
//!
//! # Example
//!
//! ```rust
//! use mtb_display::config::DisplayConfig;
//! use mtb_display::controller::{CycleOutcome, DisplayController};
//! use mtb_display::hal::{MockDwell, MockRenderer};
//! use mtb_display::source::{Payload, PayloadOrigin};
//! use mtb_display::traits::Renderer;
//!
//! let config = DisplayConfig::default().with_delay_secs(0.1);
//! let mut controller = DisplayController::new(MockRenderer::new(), MockDwell::new(), &config);
//! controller.init().unwrap();
//!
//! let payload = Payload::new(PayloadOrigin::Topic("demo".into()), b"TICKET-0001".to_vec()).unwrap();
//! let outcome = controller.process(&payload).unwrap();
//!
//! assert!(matches!(outcome, CycleOutcome::Displayed(_)));
//! assert!(controller.renderer().surface().is_blank());
//! assert_eq!(controller.stats().displayed, 1);
//! ```

use std::time::Duration;

use embedded_graphics::prelude::Point;
use tracing::{debug, error, info, warn};

use crate::config::{DisplayConfig, EncodeFailurePolicy};
use crate::encoder::{encode, EncodeError};
use crate::source::Payload;
use crate::traits::{DisplayInitError, Dwell, Renderer};

/// Controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CycleState {
    /// Nothing on screen; waiting for a payload.
    #[default]
    Idle,
    /// A symbol is on screen.
    Displaying,
}

/// Geometry of a displayed symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Payload size in bytes.
    pub payload_len: usize,
    /// Top-left corner of the symbol on the surface.
    pub origin: Point,
    /// Symbol width in pixels.
    pub width: u32,
    /// Symbol height in pixels.
    pub height: u32,
}

/// Result of one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The symbol was shown, held, and cleared.
    Displayed(CycleReport),
    /// Encoding failed; nothing was drawn.
    Skipped(EncodeError),
}

/// Running totals since startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles that showed a symbol.
    pub displayed: u64,
    /// Payloads that could not be encoded.
    pub skipped: u64,
}

/// Runs display cycles against a renderer.
///
/// # Type Parameters
///
/// - `R`: display backend ([`Renderer`])
/// - `D`: dwell timer ([`Dwell`])
pub struct DisplayController<R: Renderer, D: Dwell> {
    renderer: R,
    dwell: D,
    delay: Duration,
    module_size: u32,
    on_encode_failure: EncodeFailurePolicy,
    state: CycleState,
    stats: CycleStats,
}

impl<R: Renderer, D: Dwell> DisplayController<R, D> {
    /// Creates a controller using the cycle settings from `config`.
    pub fn new(renderer: R, dwell: D, config: &DisplayConfig) -> Self {
        Self {
            renderer,
            dwell,
            delay: config.delay(),
            module_size: config.module_size,
            on_encode_failure: config.on_encode_failure,
            state: CycleState::Idle,
            stats: CycleStats::default(),
        }
    }

    /// Initializes the display. Must succeed before the first cycle.
    pub fn init(&mut self) -> Result<(), DisplayInitError> {
        self.renderer.init()
    }

    /// Current state.
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Totals since startup.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Dwell per cycle.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The display backend.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The dwell timer.
    pub fn dwell(&self) -> &D {
        &self.dwell
    }

    /// Splits the controller back into its parts.
    pub fn into_parts(self) -> (R, D) {
        (self.renderer, self.dwell)
    }

    /// Runs one full cycle for `payload`.
    ///
    /// Returns `Err` only when encoding fails under
    /// [`EncodeFailurePolicy::Abort`]; otherwise a failed encode is logged and
    /// reported as [`CycleOutcome::Skipped`]. Either way the display is left
    /// untouched by a failed cycle.
    pub fn process(&mut self, payload: &Payload) -> Result<CycleOutcome, EncodeError> {
        info!(
            "Display {} bytes from {} for {:.1} seconds",
            payload.len(),
            payload.origin(),
            self.delay.as_secs_f32()
        );

        let symbol = match encode(payload.bytes(), self.module_size) {
            Ok(symbol) => symbol,
            Err(e) => {
                self.stats.skipped += 1;
                return match self.on_encode_failure {
                    EncodeFailurePolicy::Skip => {
                        warn!("Skipping payload from {}: {}", payload.origin(), e);
                        Ok(CycleOutcome::Skipped(e))
                    }
                    EncodeFailurePolicy::Abort => {
                        error!("Cannot encode payload from {}: {}", payload.origin(), e);
                        Err(e)
                    }
                };
            }
        };

        self.state = CycleState::Displaying;
        let origin = self.renderer.show(&symbol);
        debug!(
            x = origin.x,
            y = origin.y,
            width = symbol.width(),
            height = symbol.height(),
            "symbol shown"
        );

        self.dwell.wait(self.delay);

        self.renderer.clear();
        self.state = CycleState::Idle;
        self.stats.displayed += 1;

        Ok(CycleOutcome::Displayed(CycleReport {
            payload_len: payload.len(),
            origin,
            width: symbol.width(),
            height: symbol.height(),
        }))
    }

    /// Runs one cycle per payload, in order.
    ///
    /// Stops at the first error (only possible under
    /// [`EncodeFailurePolicy::Abort`]).
    pub fn process_all<'a, I>(&mut self, payloads: I) -> Result<CycleStats, EncodeError>
    where
        I: IntoIterator<Item = &'a Payload>,
    {
        for payload in payloads {
            self.process(payload)?;
        }
        Ok(self.stats)
    }
}
