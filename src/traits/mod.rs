//! Trait definitions for the display backend, dwell timing, and message feed.
//!
//! These seams let the display cycle run on real hardware or entirely in
//! memory:
//!
//! - [`Renderer`]: owns the [`Surface`](crate::surface::Surface) and pushes it to an output
//! - [`Dwell`]: blocking wait while a symbol is on screen
//! - [`MessageFeed`]: ordered source of broker messages
//!
//! Concrete implementations live in [`crate::hal`] (display, timing, mocks)
//! and [`crate::services`] (MQTT).

pub mod display;
pub mod dwell;
pub mod feed;

pub use display::*;
pub use dwell::*;
pub use feed::*;
