//! # mtb-display
//!
//! A kiosk daemon that shows Mobile Ticket Barcode (MTB) payloads as Aztec
//! symbols on a 480x320 display.
//!
//! ## Features
//!
//! - **One symbol at a time**: each payload is compressed, encoded, centered,
//!   held for a configurable dwell, then cleared
//! - **File and broker sources**: payload files are shown first, then the
//!   daemon can follow an MQTT topic
//! - **Hardware abstraction**: traits for the display and dwell timer, with a
//!   Linux framebuffer backend and mocks for testing
//! - **Recoverable encode failures**: oversized payloads are logged and
//!   skipped unless strict mode is on
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Display, dwell and message feed abstractions
//! - `source` - Payloads and the file reader
//! - `encoder` - zlib + Aztec, scaled to a bitmap
//! - `surface` - The 480x320 frame every backend draws into
//! - `controller` - The show/dwell/clear cycle
//! - `hal` - Concrete implementations (framebuffer, headless, mock)
//! - `services` - MQTT feed and subscription loop (`mqtt` feature)
//!
//! ## Example
//!
//! ```rust
//! use mtb_display::{
//!     DisplayConfig, DisplayController, Payload, PayloadOrigin, Renderer,
//!     hal::{MockDwell, MockRenderer},
//! };
//!
//! let config = DisplayConfig::default().with_delay_secs(0.1).with_module_size(2);
//! let mut controller = DisplayController::new(MockRenderer::new(), MockDwell::new(), &config);
//! controller.init().unwrap();
//!
//! let ticket = Payload::new(PayloadOrigin::File("ticket.mtb".into()), b"TICKET-0001".to_vec()).unwrap();
//! controller.process(&ticket).unwrap();
//!
//! assert_eq!(controller.renderer().show_count(), 1);
//! assert!(controller.renderer().surface().is_blank());
//! ```

#![warn(missing_docs)]

/// Display cycle controller.
pub mod controller;
/// Payload compression and Aztec encoding.
pub mod encoder;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Payloads and where they come from.
pub mod source;
/// In-memory display surface.
pub mod surface;
/// Core traits for display, timing and message feeds.
pub mod traits;

/// Configuration system with validated fixed-size strings.
pub mod config;

/// Network services for MQTT (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use controller::{CycleOutcome, CycleReport, CycleState, CycleStats, DisplayController};
pub use encoder::{compress, encode, EncodeError, Symbol};
pub use source::{FileSource, Payload, PayloadOrigin, SourceError};
pub use surface::{Surface, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use traits::{
    // Display
    DisplayInitError,
    Dwell,
    Renderer,
    // Network
    ConnectionError,
    FeedMessage,
    MessageFeed,
};

// Config re-exports
pub use config::{ConfigError, DisplayBackend, DisplayConfig, EncodeFailurePolicy, MqttConfig};
