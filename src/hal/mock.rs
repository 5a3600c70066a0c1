//! Mock implementations for testing without a display or broker.
//!
//! This module provides test doubles for every trait in [`crate::traits`].
//! All three can share one [`EventLog`], so a test can assert the exact
//! interleaving of message receipt, drawing, dwell, and clearing.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockRenderer`] | [`Renderer`] | In-memory surface, records draw calls |
//! | [`MockDwell`] | [`Dwell`] | Records dwell durations without sleeping |
//! | [`MockFeed`] | [`MessageFeed`] | Queued broker messages |
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use mtb_display::hal::{MockDwell, MockEvent, MockRenderer};
//! use mtb_display::traits::{Dwell, Renderer};
//!
//! let mut renderer = MockRenderer::new();
//! let mut dwell = MockDwell::sharing(&renderer);
//!
//! renderer.init().unwrap();
//! dwell.wait(Duration::from_millis(100));
//! renderer.clear();
//!
//! assert_eq!(
//!     renderer.events(),
//!     vec![
//!         MockEvent::Init,
//!         MockEvent::Dwell(Duration::from_millis(100)),
//!         MockEvent::Clear,
//!     ]
//! );
//! ```
//!
//! [`Renderer`]: crate::traits::Renderer
//! [`Dwell`]: crate::traits::Dwell
//! [`MessageFeed`]: crate::traits::MessageFeed

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_graphics::prelude::Point;

use crate::encoder::Symbol;
use crate::surface::Surface;
use crate::traits::{
    ConnectionError, DisplayInitError, Dwell, FeedMessage, MessageFeed, Renderer,
};

/// Something a mock observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    /// `Renderer::init` succeeded.
    Init,
    /// A symbol was drawn.
    Show {
        /// Top-left corner on the surface.
        origin: Point,
        /// Symbol width.
        width: u32,
        /// Symbol height.
        height: u32,
    },
    /// `Dwell::wait` was called.
    Dwell(Duration),
    /// The surface was cleared.
    Clear,
    /// A message was handed out on this topic.
    Recv(String),
}

impl MockEvent {
    /// Short lowercase name, handy for comparing sequences.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Show { .. } => "show",
            Self::Dwell(_) => "dwell",
            Self::Clear => "clear",
            Self::Recv(_) => "recv",
        }
    }
}

/// Event log shared between mocks.
pub type EventLog = Arc<Mutex<Vec<MockEvent>>>;

fn push(log: &EventLog, event: MockEvent) {
    log.lock().unwrap_or_else(|e| e.into_inner()).push(event);
}

// ============================================================================
// Display Mocks
// ============================================================================

/// Mock renderer for testing display cycles.
///
/// Draws into a real [`Surface`] so pixel-level assertions work, and keeps a
/// copy of the frame after each `show`.
#[derive(Debug)]
pub struct MockRenderer {
    surface: Surface,
    log: EventLog,
    shown: Vec<Surface>,
    flush_count: usize,
    fail_init: bool,
}

impl MockRenderer {
    /// Creates a mock with the 480x320 kiosk surface.
    pub fn new() -> Self {
        Self::with_surface(Surface::kiosk())
    }

    /// Creates a mock around a custom surface.
    pub fn with_surface(surface: Surface) -> Self {
        Self {
            surface,
            log: EventLog::default(),
            shown: Vec::new(),
            flush_count: 0,
            fail_init: false,
        }
    }

    /// Creates a mock whose `init` fails, as if no display were attached.
    pub fn unavailable() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }

    /// Handle to the event log, for sharing with other mocks.
    pub fn log(&self) -> EventLog {
        Arc::clone(&self.log)
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<MockEvent> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Frames as they looked right after each `show`.
    pub fn shown_frames(&self) -> &[Surface] {
        &self.shown
    }

    /// Number of `show` calls.
    pub fn show_count(&self) -> usize {
        self.shown.len()
    }

    /// Number of `clear` calls.
    pub fn clear_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MockEvent::Clear))
            .count()
    }

    /// Number of flushes, including the one in `init`.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MockRenderer {
    fn init(&mut self) -> Result<(), DisplayInitError> {
        if self.fail_init {
            return Err(DisplayInitError::Open {
                device: "mock".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no display attached"),
            });
        }
        self.surface.fill_background();
        self.flush();
        push(&self.log, MockEvent::Init);
        Ok(())
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn flush(&mut self) {
        self.flush_count += 1;
    }

    fn show(&mut self, symbol: &Symbol) -> Point {
        let origin = self.surface.blit_centered(symbol);
        self.flush();
        self.shown.push(self.surface.clone());
        push(
            &self.log,
            MockEvent::Show {
                origin,
                width: symbol.width(),
                height: symbol.height(),
            },
        );
        origin
    }

    fn clear(&mut self) {
        self.surface.fill_background();
        self.flush();
        push(&self.log, MockEvent::Clear);
    }
}

// ============================================================================
// Timing Mocks
// ============================================================================

/// Mock dwell that returns immediately.
#[derive(Debug, Default)]
pub struct MockDwell {
    log: EventLog,
    /// Every duration passed to `wait`, in order.
    pub waited: Vec<Duration>,
}

impl MockDwell {
    /// Creates a mock with its own event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock recording into `renderer`'s event log.
    pub fn sharing(renderer: &MockRenderer) -> Self {
        Self {
            log: renderer.log(),
            waited: Vec::new(),
        }
    }

    /// Sum of all dwell durations.
    pub fn total(&self) -> Duration {
        self.waited.iter().sum()
    }
}

impl Dwell for MockDwell {
    fn wait(&mut self, duration: Duration) {
        self.waited.push(duration);
        push(&self.log, MockEvent::Dwell(duration));
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock message feed for testing the subscription loop.
///
/// Hands out queued messages in FIFO order, then reports the feed as ended.
///
/// # Example
///
/// ```rust
/// use mtb_display::hal::MockFeed;
///
/// let mut feed = MockFeed::new();
/// feed.queue_message("service/v1/Validate/reader", b"TICKET".to_vec());
/// assert_eq!(feed.pending(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockFeed {
    log: EventLog,
    messages: VecDeque<FeedMessage>,
    connect_error: Option<String>,
    /// Whether `connect` succeeded.
    pub connected: bool,
    /// Topics passed to `subscribe`.
    pub subscriptions: Vec<String>,
}

impl MockFeed {
    /// Creates an empty feed with its own event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty feed recording into `renderer`'s event log.
    pub fn sharing(renderer: &MockRenderer) -> Self {
        Self {
            log: renderer.log(),
            ..Self::default()
        }
    }

    /// Creates a feed whose `connect` fails with `reason`.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            connect_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Queues an incoming message.
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.messages.push_back(FeedMessage::new(topic, payload));
    }

    /// Messages not yet handed out.
    pub fn pending(&self) -> usize {
        self.messages.len()
    }
}

impl MessageFeed for MockFeed {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        if let Some(reason) = &self.connect_error {
            return Err(ConnectionError::Connect {
                broker: "mock".into(),
                reason: reason.clone(),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectionError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<FeedMessage>, ConnectionError> {
        let message = self.messages.pop_front();
        if let Some(message) = &message {
            push(&self.log, MockEvent::Recv(message.topic.clone()));
        }
        Ok(message)
    }
}
