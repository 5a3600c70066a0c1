//! Payload to Aztec bitmap encoding.
//!
//! Every payload goes through the same three steps:
//!
//! 1. zlib compression (RFC 1950 stream, default level). Scanners inflate the
//!    symbol contents with a zlib decoder, so the codec is fixed.
//! 2. Aztec Code generation with default error correction and automatic
//!    layer selection.
//! 3. Scaling each module to `module_size` x `module_size` pixels of packed
//!    RGB888.
//!
//! The result is a pure function of `(payload, module_size)`.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
use thiserror::Error;

use crate::surface::{BYTES_PER_PIXEL, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Default module size in pixels.
pub const DEFAULT_MODULE_SIZE: u32 = 2;

/// Largest byte count a 32-layer Aztec symbol can hold, at minimum error
/// correction. Anything larger is rejected before the generator runs.
pub const AZTEC_MAX_BYTES: usize = 1914;

const DARK: [u8; 3] = [0x00, 0x00, 0x00];
const LIGHT: [u8; 3] = [0xff, 0xff, 0xff];

/// Reasons a payload cannot be turned into a symbol.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Module size must be at least one pixel.
    #[error("invalid module size {0}")]
    InvalidModuleSize(u32),
    /// The compressor failed.
    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
    /// The compressed payload exceeds Aztec capacity.
    #[error("{compressed_len} compressed bytes exceed Aztec capacity: {reason}")]
    Capacity {
        /// Length of the zlib stream.
        compressed_len: usize,
        /// Generator message.
        reason: String,
    },
    /// The scaled symbol does not fit the display.
    #[error("symbol of {width}x{height} px does not fit the {max_width}x{max_height} display")]
    TooLarge {
        /// Symbol width in pixels.
        width: u32,
        /// Symbol height in pixels.
        height: u32,
        /// Display width in pixels.
        max_width: u32,
        /// Display height in pixels.
        max_height: u32,
    },
}

/// A rendered Aztec symbol as packed RGB888.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Symbol {
    /// Wraps an existing RGB888 buffer.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is not exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * BYTES_PER_PIXEL,
            "pixel buffer does not match {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB888 rows.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns `true` if the pixel at `(x, y)` is a dark module.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        self.pixels[offset..offset + BYTES_PER_PIXEL] == DARK
    }
}

/// Compresses `payload` into a zlib stream.
pub fn compress(payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len() / 2 + 16), Compression::default());
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

/// Encodes `payload` as an Aztec symbol scaled by `module_size`.
pub fn encode(payload: &[u8], module_size: u32) -> Result<Symbol, EncodeError> {
    if module_size == 0 {
        return Err(EncodeError::InvalidModuleSize(module_size));
    }

    let compressed = compress(payload)?;
    if compressed.len() > AZTEC_MAX_BYTES {
        return Err(EncodeError::Capacity {
            compressed_len: compressed.len(),
            reason: format!("limit is {} bytes", AZTEC_MAX_BYTES),
        });
    }

    // ISO-8859-1 maps each byte to the char with the same code point, which
    // the generator writes back out as the original byte.
    let contents: String = compressed.iter().map(|&b| char::from(b)).collect();
    let matrix = MultiFormatWriter::default()
        .encode(&contents, &BarcodeFormat::AZTEC, 0, 0)
        .map_err(|e| EncodeError::Capacity {
            compressed_len: compressed.len(),
            reason: e.to_string(),
        })?;

    let modules_wide = matrix.getWidth();
    let modules_high = matrix.getHeight();
    let width = modules_wide * module_size;
    let height = modules_high * module_size;
    if width > DISPLAY_WIDTH || height > DISPLAY_HEIGHT {
        return Err(EncodeError::TooLarge {
            width,
            height,
            max_width: DISPLAY_WIDTH,
            max_height: DISPLAY_HEIGHT,
        });
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for my in 0..modules_high {
        let mut row = Vec::with_capacity(width as usize * BYTES_PER_PIXEL);
        for mx in 0..modules_wide {
            let color = if matrix.get(mx, my) { DARK } else { LIGHT };
            for _ in 0..module_size {
                row.extend_from_slice(&color);
            }
        }
        for _ in 0..module_size {
            pixels.extend_from_slice(&row);
        }
    }

    tracing::debug!(
        payload_len = payload.len(),
        compressed_len = compressed.len(),
        modules = modules_wide,
        width,
        height,
        "encoded Aztec symbol"
    );

    Ok(Symbol::from_rgb(width, height, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    // ========================================================================
    // Compression
    // ========================================================================

    #[test]
    fn test_compress_is_zlib_stream() {
        let compressed = compress(b"TICKET-0001").unwrap();
        // CMF byte for deflate with 32K window
        assert_eq!(compressed[0], 0x78);

        let mut inflated = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, b"TICKET-0001");
    }

    #[test]
    fn test_compress_is_deterministic() {
        assert_eq!(compress(b"abcabcabc").unwrap(), compress(b"abcabcabc").unwrap());
    }

    // ========================================================================
    // Symbol generation
    // ========================================================================

    #[test]
    fn test_encode_small_payload() {
        let symbol = encode(b"TICKET-0001", 2).unwrap();
        assert_eq!(symbol.width(), symbol.height());
        assert_eq!(symbol.width() % 2, 0);
        assert_eq!(symbol.pixels().len(), (symbol.width() * symbol.height() * 3) as usize);
        // The bullseye center module is always dark.
        let center = symbol.width() / 2;
        assert!(symbol.is_dark(center, center));
    }

    #[test]
    fn test_encode_module_size_scales_dimensions() {
        let one = encode(b"TICKET-0001", 1).unwrap();
        let three = encode(b"TICKET-0001", 3).unwrap();
        assert_eq!(three.width(), one.width() * 3);
        assert_eq!(three.height(), one.height() * 3);
        for y in 0..one.height() {
            for x in 0..one.width() {
                assert_eq!(one.is_dark(x, y), three.is_dark(x * 3 + 2, y * 3 + 1));
            }
        }
    }

    #[test]
    fn test_encode_rejects_zero_module_size() {
        assert!(matches!(
            encode(b"TICKET-0001", 0),
            Err(EncodeError::InvalidModuleSize(0))
        ));
    }

    #[test]
    fn test_encode_only_black_and_white() {
        let symbol = encode(b"\x00\x01\x02\xff binary", 2).unwrap();
        for px in symbol.pixels().chunks_exact(3) {
            assert!(px == DARK || px == LIGHT);
        }
    }

    #[test]
    fn test_symbol_is_dark_out_of_bounds() {
        let symbol = Symbol::from_rgb(1, 1, DARK.to_vec());
        assert!(symbol.is_dark(0, 0));
        assert!(!symbol.is_dark(1, 0));
    }

    #[test]
    #[should_panic]
    fn test_symbol_from_rgb_checks_length() {
        let _ = Symbol::from_rgb(2, 2, vec![0; 5]);
    }
}
