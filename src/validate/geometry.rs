//! Geometry Solver
//!
//! Computes scanline pitches that satisfy framebuffer padding,
//! pixel-alignment, and bank-boundary constraints, and negotiates the
//! virtual framebuffer size. Banked framebuffers require that no
//! on-screen pixel straddle a bank boundary, which makes pitch selection
//! an exact search rather than a simple round-up.

use thiserror::Error;
use tracing::{debug, trace};

/// Framebuffers above this size are rejected outright.
const MAX_FRAMEBUFFER_BYTES: u64 = 8 * 1024 * 1024 * 1024;

/// Hard failures of the geometry pass.
///
/// Unlike per-mode rejections these abort the whole validate pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// No pitch satisfies the padding and bank constraints
    #[error("no feasible scanline pitch for {width}x{height} at {bpp} bpp")]
    NoPitch {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
        /// Bits per pixel
        bpp: u32,
    },
    /// Requested virtual size violates the configured bounds
    #[error("virtual size {width}x{height} outside allowed range {min_width}x{min_height}..{max_width}x{max_height}")]
    VirtualBounds {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Minimum allowed width
        min_width: u32,
        /// Minimum allowed height
        min_height: u32,
        /// Maximum allowed width
        max_width: u32,
        /// Maximum allowed height
        max_height: u32,
    },
}

/// Pixel format and framebuffer layout constraints.
#[derive(Debug, Clone, Copy)]
pub struct PitchParams {
    /// Bits per pixel
    pub bpp: u32,
    /// Scanline padding granularity in bits
    pub pad_bits: u32,
    /// Pitch increment unit in pixels
    pub pitch_unit: u32,
    /// Bank size in bytes, 0 for unbanked framebuffers
    pub bank_size: u32,
}

impl Default for PitchParams {
    fn default() -> Self {
        PitchParams {
            bpp: 32,
            pad_bits: 32,
            pitch_unit: 8,
            bank_size: 0,
        }
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

/// Smallest pitch (in pixels) for a `width` x `height` framebuffer.
///
/// The pitch is a multiple of `lcm(pad_bits, pitch_unit * bpp)` bits,
/// at least `min_pitch` pixels, and — for banked framebuffers —
/// guarantees no on-screen pixel straddles a bank boundary on any of
/// the `height` scanlines. `None` when no pitch satisfies the bank
/// constraint below the overflow bound.
pub fn scanline_pitch(
    width: u32,
    height: u32,
    min_pitch: u32,
    params: &PitchParams,
) -> Option<u32> {
    if width == 0 || height == 0 || params.bpp == 0 {
        return None;
    }
    let bpp = params.bpp as u64;
    // Pitch granularity in bits: scanline padding and the pitch unit
    // (pixels) both must divide it.
    let unit_bits = params.pitch_unit.max(1) as u64 * bpp;
    let gran_bits = lcm(params.pad_bits.max(1) as u64, unit_bits);

    let floor_bits = (width as u64 * bpp).max(min_pitch as u64 * bpp);
    let mut pitch_bits = floor_bits.div_ceil(gran_bits) * gran_bits;

    // Bound the search so pitch * height stays under the overflow
    // ceiling.
    let max_bits = MAX_FRAMEBUFFER_BYTES
        .checked_mul(8)?
        .checked_div(height as u64)?;

    while pitch_bits <= max_bits {
        if fits_banks(width, height, pitch_bits, params) {
            let pitch = pitch_bits / bpp;
            trace!(width, height, pitch, "scanline pitch solved");
            return u32::try_from(pitch).ok();
        }
        pitch_bits += gran_bits;
    }
    debug!(width, height, "no feasible scanline pitch");
    None
}

/// Whether any on-screen pixel straddles a bank boundary.
fn fits_banks(width: u32, height: u32, pitch_bits: u64, params: &PitchParams) -> bool {
    if params.bank_size == 0 {
        return true;
    }
    let bank_bits = params.bank_size as u64 * 8;
    let bpp = params.bpp as u64;
    let row_bits = width as u64 * bpp;

    // Scanline start offsets repeat modulo the bank size with period
    // bank / gcd(pitch, bank); checking one full period (capped at the
    // actual height) is exact.
    let period = bank_bits / gcd(pitch_bits, bank_bits);
    let rows = (height as u64).min(period);
    for y in 0..rows {
        let start = (y * pitch_bits) % bank_bits;
        // Boundaries fall at multiples of bank_bits; any boundary that
        // lands a non-multiple of bpp past the row start splits a pixel.
        let mut boundary = bank_bits - start;
        while boundary < row_bits {
            if boundary % bpp != 0 {
                return false;
            }
            boundary += bank_bits;
        }
    }
    true
}

/// A negotiated framebuffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSize {
    /// Virtual width in pixels
    pub width: u32,
    /// Virtual height in pixels
    pub height: u32,
    /// Scanline pitch in pixels
    pub pitch: u32,
}

/// Bounds on the virtual framebuffer size.
#[derive(Debug, Clone, Copy)]
pub struct VirtualBounds {
    /// Minimum width
    pub min_width: u32,
    /// Minimum height
    pub min_height: u32,
    /// Maximum width
    pub max_width: u32,
    /// Maximum height
    pub max_height: u32,
}

impl Default for VirtualBounds {
    fn default() -> Self {
        VirtualBounds {
            min_width: 1,
            min_height: 1,
            max_width: 32_767,
            max_height: 32_767,
        }
    }
}

/// Settle a virtual framebuffer size and pitch.
///
/// Widths are rounded up to `align` pixels, then candidate widths are
/// walked upward until a feasible pitch exists. Bound violations and
/// pitch exhaustion abort the pass.
pub fn negotiate_virtual_size(
    width: u32,
    height: u32,
    align: u32,
    bounds: &VirtualBounds,
    params: &PitchParams,
) -> Result<VirtualSize, GeometryError> {
    let align = align.max(1);
    let width = width.div_ceil(align) * align;
    if width < bounds.min_width
        || height < bounds.min_height
        || width > bounds.max_width
        || height > bounds.max_height
    {
        return Err(GeometryError::VirtualBounds {
            width,
            height,
            min_width: bounds.min_width,
            min_height: bounds.min_height,
            max_width: bounds.max_width,
            max_height: bounds.max_height,
        });
    }

    let mut candidate = width;
    while candidate <= bounds.max_width {
        if let Some(pitch) = scanline_pitch(candidate, height, candidate, params) {
            debug!(width = candidate, height, pitch, "virtual size negotiated");
            return Ok(VirtualSize {
                width: candidate,
                height,
                pitch,
            });
        }
        candidate += align;
    }
    Err(GeometryError::NoPitch {
        width,
        height,
        bpp: params.bpp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pitch_respects_padding() {
        // 1x1 at 32bpp, pad 32 bits, unit 8 pixels: granularity is
        // lcm(32, 256) = 256 bits = 8 pixels.
        let p = scanline_pitch(1, 1, 0, &PitchParams::default()).unwrap();
        assert_eq!(p, 8);
        assert_eq!(p * 32 % 32, 0);
    }

    #[test]
    fn test_min_pitch_floor() {
        let p = scanline_pitch(1, 1, 100, &PitchParams::default()).unwrap();
        assert!(p >= 100);
        assert_eq!(p % 8, 0);
    }

    #[test]
    fn test_common_mode_pitch_is_width() {
        // 1920 is already a multiple of the 8 pixel granularity.
        let p = scanline_pitch(1920, 1080, 0, &PitchParams::default()).unwrap();
        assert_eq!(p, 1920);
    }

    #[test]
    fn test_unbanked_never_fails_below_overflow() {
        let p = scanline_pitch(1366, 768, 0, &PitchParams::default()).unwrap();
        // Rounded up to the next multiple of 8.
        assert_eq!(p, 1368);
    }

    #[test]
    fn test_bank_aligned_pixels_pass() {
        // 64 KiB banks, 32bpp: bank bits are a multiple of bpp, so no
        // pixel can ever straddle.
        let params = PitchParams {
            bank_size: 65_536,
            ..Default::default()
        };
        assert_eq!(scanline_pitch(800, 600, 0, &params), Some(800));
    }

    #[test]
    fn test_bank_straddle_forces_larger_pitch() {
        // 24bpp with 1 KiB banks: 8192 bank bits is not a multiple of
        // 24, so most pitches split a pixel somewhere; the solver must
        // find one where every boundary lands between pixels, or none.
        let params = PitchParams {
            bpp: 24,
            pad_bits: 32,
            pitch_unit: 1,
            bank_size: 1024,
        };
        if let Some(p) = scanline_pitch(320, 200, 0, &params) {
            assert!(fits_banks(320, 200, p as u64 * 24, &params));
            assert!(p >= 320);
        }
    }

    #[test]
    fn test_overflow_rejected() {
        // height chosen so even the minimum pitch exceeds 8 GiB.
        assert_eq!(
            scanline_pitch(1_000_000, 1_000_000, 0, &PitchParams::default()),
            None
        );
    }

    #[test]
    fn test_negotiate_rounds_width_up() {
        let size =
            negotiate_virtual_size(1366, 768, 8, &VirtualBounds::default(), &PitchParams::default())
                .unwrap();
        assert_eq!(size.width, 1368);
        assert_eq!(size.pitch, 1368);
    }

    #[test]
    fn test_negotiate_rejects_out_of_bounds() {
        let bounds = VirtualBounds {
            max_width: 2048,
            max_height: 2048,
            ..Default::default()
        };
        let err = negotiate_virtual_size(
            4096,
            2160,
            8,
            &bounds,
            &PitchParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::VirtualBounds { .. }));
    }
}
