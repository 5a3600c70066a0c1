//! In-memory display surface.
//!
//! The [`Surface`] is the single frame every renderer draws into. It is a
//! packed RGB888 buffer sized to the kiosk display and implements
//! `embedded-graphics`' [`DrawTarget`], so symbols are blitted with the usual
//! [`Image`]/[`ImageRaw`] pair.
//!
//! Backends decide how (and whether) the surface reaches physical output; see
//! [`crate::hal`].

use embedded_graphics::{
    image::{Image, ImageRaw},
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
};

use crate::encoder::Symbol;

/// Display width in pixels.
pub const DISPLAY_WIDTH: u32 = 480;

/// Display height in pixels.
pub const DISPLAY_HEIGHT: u32 = 320;

/// Background color of the idle display.
pub const BACKGROUND: Rgb888 = Rgb888::WHITE;

/// Bytes per packed RGB888 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// A fixed-size RGB888 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    background: Rgb888,
    pixels: Vec<u8>,
}

impl Surface {
    /// Creates a surface filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgb888) -> Self {
        let mut surface = Self {
            width,
            height,
            background,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        };
        surface.fill_background();
        surface
    }

    /// Creates the 480x320 white kiosk surface.
    pub fn kiosk() -> Self {
        Self::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, BACKGROUND)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Background color used by [`Surface::fill_background`].
    pub fn background(&self) -> Rgb888 {
        self.background
    }

    /// Raw packed RGB888 rows, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the color at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        let offset = self.offset(x, y)?;
        Some(Rgb888::new(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ))
    }

    /// Fills the whole surface with `color`.
    pub fn fill(&mut self, color: Rgb888) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[0] = color.r();
            px[1] = color.g();
            px[2] = color.b();
        }
    }

    /// Fills the whole surface with its background color.
    pub fn fill_background(&mut self) {
        self.fill(self.background);
    }

    /// Returns `true` if every pixel equals `color`.
    pub fn is_filled_with(&self, color: Rgb888) -> bool {
        self.pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .all(|px| px == [color.r(), color.g(), color.b()])
    }

    /// Returns `true` if the surface shows only its background.
    pub fn is_blank(&self) -> bool {
        self.is_filled_with(self.background)
    }

    /// Top-left corner that centers a `width` x `height` bitmap.
    ///
    /// Uses integer division, so odd remainders round toward the top-left.
    pub fn centered_origin(&self, width: u32, height: u32) -> Point {
        Point::new(
            (self.width as i32 - width as i32) / 2,
            (self.height as i32 - height as i32) / 2,
        )
    }

    /// Draws `symbol` centered on the surface and returns its origin.
    ///
    /// Parts of an oversized symbol that fall outside the surface are dropped.
    pub fn blit_centered(&mut self, symbol: &Symbol) -> Point {
        let origin = self.centered_origin(symbol.width(), symbol.height());
        let raw = ImageRaw::<Rgb888>::new(symbol.pixels(), symbol.width());
        Image::new(&raw, origin)
            .draw(self)
            .unwrap_or_else(|never| match never {});
        origin
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::kiosk()
    }
}

impl OriginDimensions for Surface {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Surface {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            if let Some(offset) = self.offset(point.x as u32, point.y as u32) {
                self.pixels[offset] = color.r();
                self.pixels[offset + 1] = color.g();
                self.pixels[offset + 2] = color.b();
            }
        }
        Ok(())
    }
}
