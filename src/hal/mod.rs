//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `framebuffer`: Linux `/dev/fbN` output
//! - `headless`: in-memory output with logging only
//! - `clock`: real-time dwell
//! - `mock`: Test implementations for desktop development

pub mod clock;
pub mod framebuffer;
pub mod headless;
pub mod mock;

pub use clock::SleepDwell;
pub use framebuffer::{FbGeometry, FramebufferRenderer};
pub use headless::HeadlessRenderer;
pub use mock::*;
