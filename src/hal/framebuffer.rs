//! Linux framebuffer backend.
//!
//! Writes the kiosk surface to a `/dev/fbN` device. Geometry comes from
//! `/sys/class/graphics/fbN/`:
//!
//! | File | Format | Required |
//! |------|--------|----------|
//! | `virtual_size` | `width,height` | yes |
//! | `bits_per_pixel` | `16`, `24` or `32` | yes |
//! | `stride` | bytes per line | no, derived from width and depth |
//!
//! The surface is centered on the device. Devices smaller than the surface
//! are rejected at init. Init also turns off the console cursor blink
//! (`/sys/class/graphics/fbcon/cursor_blink`) so it does not draw over the
//! symbol; failing to do so is only logged.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::surface::{Surface, BYTES_PER_PIXEL};
use crate::traits::{DisplayInitError, Renderer};

const SYSFS_GRAPHICS: &str = "/sys/class/graphics";
const CURSOR_BLINK: &str = "fbcon/cursor_blink";

/// Framebuffer layout as reported by sysfs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FbGeometry {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Pixel depth.
    pub bits_per_pixel: u32,
    /// Bytes per line, including padding.
    pub stride: usize,
}

impl FbGeometry {
    /// Reads the geometry files in `sysfs_dir`.
    pub fn read(device: &Path, sysfs_dir: &Path) -> Result<Self, DisplayInitError> {
        let geometry_err = |reason: String| DisplayInitError::Geometry {
            device: device.to_path_buf(),
            reason,
        };
        let read = |name: &str| {
            let path = sysfs_dir.join(name);
            fs::read_to_string(&path).map_err(|e| geometry_err(format!("{}: {}", path.display(), e)))
        };

        let size = read("virtual_size")?;
        let (width, height) = parse_virtual_size(&size)
            .ok_or_else(|| geometry_err(format!("malformed virtual_size {:?}", size.trim())))?;

        let bpp = read("bits_per_pixel")?;
        let bits_per_pixel = bpp
            .trim()
            .parse::<u32>()
            .map_err(|_| geometry_err(format!("malformed bits_per_pixel {:?}", bpp.trim())))?;
        if !matches!(bits_per_pixel, 16 | 24 | 32) {
            return Err(DisplayInitError::UnsupportedDepth {
                device: device.to_path_buf(),
                bits_per_pixel,
            });
        }

        let packed = width as usize * (bits_per_pixel as usize / 8);
        let stride = fs::read_to_string(sysfs_dir.join("stride"))
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&s| s >= packed)
            .unwrap_or(packed);

        Ok(Self {
            width,
            height,
            bits_per_pixel,
            stride,
        })
    }

    /// Bytes per device pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    /// Byte offset of the top-left pixel of a `width` x `height` area
    /// centered on the device.
    pub fn centered_offset(&self, width: u32, height: u32) -> usize {
        let x = self.width.saturating_sub(width) as usize / 2;
        let y = self.height.saturating_sub(height) as usize / 2;
        y * self.stride + x * self.bytes_per_pixel()
    }
}

/// Parses a sysfs `virtual_size` value such as `"480,320\n"`.
pub fn parse_virtual_size(input: &str) -> Option<(u32, u32)> {
    let mut parts = input.trim().split(',');
    let w = parts.next()?.trim().parse::<u32>().ok()?;
    let h = parts.next()?.trim().parse::<u32>().ok()?;
    Some((w, h))
}

/// Converts one row of packed RGB888 into the device's pixel format.
///
/// `out` is cleared first. Unsupported depths leave it empty.
pub fn pack_row(bits_per_pixel: u32, rgb: &[u8], out: &mut Vec<u8>) {
    out.clear();
    for px in rgb.chunks_exact(BYTES_PER_PIXEL) {
        let (r, g, b) = (px[0], px[1], px[2]);
        match bits_per_pixel {
            16 => {
                let mut rgb565: u16 = (r as u16 & 0b11111000) << 8;
                rgb565 |= (g as u16 & 0b11111100) << 3;
                rgb565 |= (b as u16) >> 3;
                out.extend(rgb565.to_le_bytes());
            }
            24 => out.extend([b, g, r]),
            32 => out.extend([b, g, r, 0xFF]),
            _ => return,
        }
    }
}

/// Renderer backed by a Linux framebuffer device.
#[derive(Debug)]
pub struct FramebufferRenderer {
    device: PathBuf,
    sysfs_dir: PathBuf,
    cursor_blink: PathBuf,
    file: Option<File>,
    geometry: Option<FbGeometry>,
    surface: Surface,
    scratch: Vec<u8>,
}

impl FramebufferRenderer {
    /// Creates a renderer for `device`, e.g. `/dev/fb0`.
    ///
    /// Nothing is opened until [`Renderer::init`].
    pub fn new(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        let name = device
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "fb0".into());
        let sysfs_dir = Path::new(SYSFS_GRAPHICS).join(name);
        Self {
            device,
            sysfs_dir,
            cursor_blink: Path::new(SYSFS_GRAPHICS).join(CURSOR_BLINK),
            file: None,
            geometry: None,
            surface: Surface::kiosk(),
            scratch: Vec::new(),
        }
    }

    /// Reads geometry from `dir` instead of `/sys/class/graphics/fbN`.
    ///
    /// The cursor blink switch is looked up next to it, in
    /// `<dir>/../fbcon/cursor_blink`.
    pub fn with_sysfs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysfs_dir = dir.into();
        if let Some(parent) = self.sysfs_dir.parent() {
            self.cursor_blink = parent.join(CURSOR_BLINK);
        }
        self
    }

    /// Device path.
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Geometry read at init, if initialized.
    pub fn geometry(&self) -> Option<FbGeometry> {
        self.geometry
    }

    fn disable_cursor_blink(&self) {
        let result = OpenOptions::new()
            .write(true)
            .open(&self.cursor_blink)
            .and_then(|mut file| file.write_all(b"0"));
        if let Err(e) = result {
            warn!(
                "Cannot disable cursor blink via {}: {}",
                self.cursor_blink.display(),
                e
            );
        }
    }

    fn write_frame(&mut self) -> std::io::Result<()> {
        let (Some(file), Some(geometry)) = (self.file.as_mut(), self.geometry) else {
            return Ok(());
        };
        let origin = geometry.centered_offset(self.surface.width(), self.surface.height());
        let row_len = self.surface.width() as usize * BYTES_PER_PIXEL;
        for (y, row) in self.surface.pixels().chunks_exact(row_len).enumerate() {
            pack_row(geometry.bits_per_pixel, row, &mut self.scratch);
            file.seek(SeekFrom::Start((origin + y * geometry.stride) as u64))?;
            file.write_all(&self.scratch)?;
        }
        file.flush()
    }
}

impl Renderer for FramebufferRenderer {
    fn init(&mut self) -> Result<(), DisplayInitError> {
        let geometry = FbGeometry::read(&self.device, &self.sysfs_dir)?;
        if geometry.width < self.surface.width() || geometry.height < self.surface.height() {
            return Err(DisplayInitError::TooSmall {
                device: self.device.clone(),
                width: geometry.width,
                height: geometry.height,
                needed_width: self.surface.width(),
                needed_height: self.surface.height(),
            });
        }

        let file = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .map_err(|source| DisplayInitError::Open {
                device: self.device.clone(),
                source,
            })?;

        info!(
            "Framebuffer {} is {}x{} at {} bpp, stride {}",
            self.device.display(),
            geometry.width,
            geometry.height,
            geometry.bits_per_pixel,
            geometry.stride
        );

        self.disable_cursor_blink();

        self.file = Some(file);
        self.geometry = Some(geometry);
        self.scratch = Vec::with_capacity(self.surface.width() as usize * geometry.bytes_per_pixel());

        self.surface.fill_background();
        self.write_frame().map_err(|source| DisplayInitError::Write {
            device: self.device.clone(),
            source,
        })
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn flush(&mut self) {
        if let Err(e) = self.write_frame() {
            warn!("Framebuffer write to {} failed: {}", self.device.display(), e);
        }
    }
}
