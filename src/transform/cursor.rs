//! Hardware Cursor Transforms
//!
//! Rotates cursor images to match a CRTC's rotation and maps the hot-spot
//! position between framebuffer and CRTC coordinates. Cursor images are
//! mapped through the rotation bits only, never the general projective
//! transform; a CRTC carrying a projective transform must fall back to a
//! software cursor instead.
//!
//! Two image formats are handled: the classic two-color cursor (one
//! source bitmap and one mask bitmap, one bit per pixel, rows padded to a
//! byte) and 32-bit ARGB.

use super::{map_dest_to_src, rotation_swaps_axes, Rotation};

/// A two-color cursor: 1bpp source and mask planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapCursor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Source plane, rows padded to whole bytes, LSB first
    pub source: Vec<u8>,
    /// Mask plane, same layout as `source`
    pub mask: Vec<u8>,
}

/// A 32-bit ARGB cursor, row-major, un-premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbCursor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixels, `width * height` entries
    pub pixels: Vec<u32>,
}

fn row_bytes(width: u32) -> usize {
    width.div_ceil(8) as usize
}

fn get_bit(plane: &[u8], width: u32, x: u32, y: u32) -> bool {
    let idx = y as usize * row_bytes(width) + (x / 8) as usize;
    plane.get(idx).is_some_and(|b| b & (1 << (x % 8)) != 0)
}

fn set_bit(plane: &mut [u8], width: u32, x: u32, y: u32) {
    let idx = y as usize * row_bytes(width) + (x / 8) as usize;
    if let Some(b) = plane.get_mut(idx) {
        *b |= 1 << (x % 8);
    }
}

impl BitmapCursor {
    /// An all-transparent cursor of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        let len = row_bytes(width) * height as usize;
        BitmapCursor {
            width,
            height,
            source: vec![0; len],
            mask: vec![0; len],
        }
    }

    /// Source bit at (x, y).
    pub fn source_bit(&self, x: u32, y: u32) -> bool {
        get_bit(&self.source, self.width, x, y)
    }

    /// Mask bit at (x, y). A clear mask bit means transparent.
    pub fn mask_bit(&self, x: u32, y: u32) -> bool {
        get_bit(&self.mask, self.width, x, y)
    }

    /// Re-pack the bit planes under `rotation`.
    ///
    /// The result has swapped dimensions for 90/270 so the cursor appears
    /// upright on the rotated output.
    pub fn rotate(&self, rotation: Rotation) -> BitmapCursor {
        let (dw, dh) = if rotation_swaps_axes(rotation) {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let mut out = BitmapCursor::empty(dw, dh);
        for dy in 0..dh {
            for dx in 0..dw {
                let (sx, sy) = map_dest_to_src(rotation, self.width, self.height, dx, dy);
                if self.source_bit(sx, sy) {
                    set_bit(&mut out.source, dw, dx, dy);
                }
                if self.mask_bit(sx, sy) {
                    set_bit(&mut out.mask, dw, dx, dy);
                }
            }
        }
        out
    }

    /// Convert to ARGB using the given foreground and background colors
    /// (0xRRGGBB). Masked-out pixels become fully transparent.
    ///
    /// For hardware that only implements ARGB cursors.
    pub fn to_argb(&self, foreground: u32, background: u32) -> ArgbCursor {
        let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let px = if !self.mask_bit(x, y) {
                    0
                } else if self.source_bit(x, y) {
                    0xFF00_0000 | (foreground & 0x00FF_FFFF)
                } else {
                    0xFF00_0000 | (background & 0x00FF_FFFF)
                };
                pixels.push(px);
            }
        }
        ArgbCursor {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

impl ArgbCursor {
    /// Pixel at (x, y), transparent black when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// Rotate the pixel grid under `rotation`.
    pub fn rotate(&self, rotation: Rotation) -> ArgbCursor {
        let (dw, dh) = if rotation_swaps_axes(rotation) {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let mut pixels = vec![0u32; (dw * dh) as usize];
        for dy in 0..dh {
            for dx in 0..dw {
                let (sx, sy) = map_dest_to_src(rotation, self.width, self.height, dx, dy);
                pixels[(dy * dw + dx) as usize] = self.pixel(sx, sy);
            }
        }
        ArgbCursor {
            width: dw,
            height: dh,
            pixels,
        }
    }
}

/// Where the hardware cursor should be programmed for a CRTC, or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
    /// Program the cursor at this CRTC-relative position (may be
    /// partially off-screen on the negative side)
    At {
        /// CRTC-relative x of the cursor's top-left corner
        x: i32,
        /// CRTC-relative y of the cursor's top-left corner
        y: i32,
    },
    /// The cursor lies entirely outside this CRTC
    Hidden,
}

/// Map a framebuffer-space cursor position onto one CRTC.
///
/// `fb_x`/`fb_y` is the top-left corner of the (already rotated) cursor
/// image in framebuffer coordinates. `origin` is the CRTC's framebuffer
/// position, `mode_size` its scanout dimensions (un-rotated), and
/// `cursor_size` the square hardware cursor dimension. Axis order swaps
/// for 90/270 rotations.
pub fn place_cursor(
    rotation: Rotation,
    origin: (i32, i32),
    mode_size: (u32, u32),
    cursor_size: u32,
    fb_x: i32,
    fb_y: i32,
) -> CursorPlacement {
    let (mode_w, mode_h) = (mode_size.0 as i32, mode_size.1 as i32);
    let (fp_w, fp_h) = if rotation_swaps_axes(rotation) {
        (mode_h, mode_w)
    } else {
        (mode_w, mode_h)
    };

    // CRTC-local position inside the footprint.
    let local_x = fb_x - origin.0;
    let local_y = fb_y - origin.1;

    // Map the footprint-local corner into scanout space. The cursor
    // image itself was rotated separately, so only the anchor moves.
    let size = cursor_size as i32;
    let (x, y) = match super::rotation_degrees(rotation) {
        90 => (fp_h - local_y - size, local_x),
        180 => (fp_w - local_x - size, fp_h - local_y - size),
        270 => (local_y, fp_w - local_x - size),
        _ => (local_x, local_y),
    };

    if x <= -size || y <= -size || x >= mode_w || y >= mode_h {
        CursorPlacement::Hidden
    } else {
        CursorPlacement::At { x, y }
    }
}
