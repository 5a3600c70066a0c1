//! Display abstraction for showing symbols.
//!
//! This module defines the [`Renderer`] trait. A renderer owns exactly one
//! [`Surface`] for its whole life; `show` and `clear` mutate that surface and
//! then push it to whatever output the backend drives (a framebuffer device,
//! nothing at all, or a test recorder).

use std::path::PathBuf;

use embedded_graphics::prelude::Point;
use thiserror::Error;

use crate::encoder::Symbol;
use crate::surface::Surface;

/// The output device could not be acquired.
///
/// Always fatal: the daemon exits before reading any payload.
#[derive(Debug, Error)]
pub enum DisplayInitError {
    /// The device node could not be opened.
    #[error("cannot open display device {device}: {source}")]
    Open {
        /// Device path.
        device: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Device geometry could not be determined.
    #[error("cannot read geometry of {device}: {reason}")]
    Geometry {
        /// Device path.
        device: PathBuf,
        /// What was missing or malformed.
        reason: String,
    },
    /// The device uses a pixel depth this crate cannot write.
    #[error("{device} uses unsupported depth of {bits_per_pixel} bits per pixel")]
    UnsupportedDepth {
        /// Device path.
        device: PathBuf,
        /// Reported bits per pixel.
        bits_per_pixel: u32,
    },
    /// The device is smaller than the surface.
    #[error("{device} is {width}x{height}, smaller than the {needed_width}x{needed_height} surface")]
    TooSmall {
        /// Device path.
        device: PathBuf,
        /// Device width.
        width: u32,
        /// Device height.
        height: u32,
        /// Surface width.
        needed_width: u32,
        /// Surface height.
        needed_height: u32,
    },
    /// The initial blank frame could not be written.
    #[error("cannot write initial frame to {device}: {source}")]
    Write {
        /// Device path.
        device: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Display backend that owns the kiosk surface.
///
/// Implementors provide [`surface_mut`](Renderer::surface_mut) and
/// [`flush`](Renderer::flush); `show` and `clear` are built on those.
///
/// After a successful [`init`](Renderer::init) rendering cannot fail from the
/// caller's point of view. Backends log output errors and carry on, since the
/// next flush rewrites the whole frame anyway.
///
/// # Example
///
/// ```rust
/// use mtb_display::encoder::encode;
/// use mtb_display::hal::MockRenderer;
/// use mtb_display::traits::Renderer;
///
/// let mut renderer = MockRenderer::new();
/// renderer.init().unwrap();
///
/// let symbol = encode(b"TICKET-0001", 2).unwrap();
/// renderer.show(&symbol);
/// assert!(!renderer.surface().is_blank());
///
/// renderer.clear();
/// assert!(renderer.surface().is_blank());
/// ```
pub trait Renderer {
    /// Acquires the output device and shows the blank background.
    ///
    /// Called once, before any payload is processed.
    fn init(&mut self) -> Result<(), DisplayInitError>;

    /// The current frame.
    fn surface(&self) -> &Surface;

    /// Mutable access to the current frame.
    fn surface_mut(&mut self) -> &mut Surface;

    /// Pushes the current frame to the output.
    fn flush(&mut self);

    /// Draws `symbol` centered, flushes, and returns the symbol's origin.
    fn show(&mut self, symbol: &Symbol) -> Point {
        let origin = self.surface_mut().blit_centered(symbol);
        self.flush();
        origin
    }

    /// Fills the frame with the background color and flushes.
    fn clear(&mut self) {
        self.surface_mut().fill_background();
        self.flush();
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn init(&mut self) -> Result<(), DisplayInitError> {
        (**self).init()
    }

    fn surface(&self) -> &Surface {
        (**self).surface()
    }

    fn surface_mut(&mut self) -> &mut Surface {
        (**self).surface_mut()
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn show(&mut self, symbol: &Symbol) -> Point {
        (**self).show(symbol)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}
