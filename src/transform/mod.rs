//! Rotation, Reflection, and Shadow Transforms
//!
//! Builds the forward (CRTC-space to framebuffer-space) transform for a
//! CRTC from its rotation/reflection bits, panning offset, and optional
//! projective user transform, plus the floating-point inverse used by the
//! shadow compositor. Decides per CRTC whether a software shadow buffer is
//! required, and rotates cursor images and damage regions to match.
//!
//! # State machine
//!
//! ```text
//! Off -> (enable) -> On(Identity) <-> On(ShadowComposited) -> (disable) -> Off
//! ```
//!
//! A CRTC enters `ShadowComposited` when a non-identity composed transform
//! is requested and the backend does not handle output transforms itself;
//! it returns to `Identity` when the composed transform reduces to the
//! identity and the result still fits the configured virtual size. All
//! transitions are synchronous; only redisplay is driven by externally
//! delivered damage events.

use enumflags2::{bitflags, BitFlags};

pub mod cursor;
pub mod shadow;

pub use shadow::{ShadowState, TransformEngine};

// =============================================================================
// Rotation
// =============================================================================

/// One rotation or reflection bit.
///
/// Exactly one rotation bit is meaningful at a time; the reflection bits
/// combine with it. Reflection applies before rotation.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationFlag {
    /// No rotation
    Rotate0 = 1 << 0,
    /// 90 degrees clockwise
    Rotate90 = 1 << 1,
    /// 180 degrees
    Rotate180 = 1 << 2,
    /// 270 degrees clockwise
    Rotate270 = 1 << 3,
    /// Mirror across the vertical axis
    ReflectX = 1 << 4,
    /// Mirror across the horizontal axis
    ReflectY = 1 << 5,
}

/// A rotation/reflection bitset.
pub type Rotation = BitFlags<RotationFlag>;

/// The identity rotation.
pub fn rotation_identity() -> Rotation {
    RotationFlag::Rotate0.into()
}

/// Degrees of clockwise rotation encoded in `rotation` (0/90/180/270).
pub fn rotation_degrees(rotation: Rotation) -> u32 {
    if rotation.contains(RotationFlag::Rotate90) {
        90
    } else if rotation.contains(RotationFlag::Rotate180) {
        180
    } else if rotation.contains(RotationFlag::Rotate270) {
        270
    } else {
        0
    }
}

/// Whether this rotation swaps the output's width and height.
pub fn rotation_swaps_axes(rotation: Rotation) -> bool {
    matches!(rotation_degrees(rotation), 90 | 270)
}

/// Whether the bitset is a pure identity (no rotation, no reflection).
pub fn rotation_is_identity(rotation: Rotation) -> bool {
    rotation_degrees(rotation) == 0
        && !rotation.intersects(RotationFlag::ReflectX | RotationFlag::ReflectY)
}

/// Map a destination pixel back to its source pixel under `rotation`.
///
/// `src_width`/`src_height` are the un-rotated image dimensions. The
/// destination image has swapped dimensions for 90/270. Reflection is
/// applied in source space, before rotation.
pub fn map_dest_to_src(
    rotation: Rotation,
    src_width: u32,
    src_height: u32,
    dx: u32,
    dy: u32,
) -> (u32, u32) {
    let (mut sx, mut sy) = match rotation_degrees(rotation) {
        // dest(x, y) = src(y, h-1-x) for a 90 degree clockwise turn
        90 => (dy, src_height - 1 - dx),
        180 => (src_width - 1 - dx, src_height - 1 - dy),
        270 => (src_width - 1 - dy, dx),
        _ => (dx, dy),
    };
    if rotation.contains(RotationFlag::ReflectX) {
        sx = src_width - 1 - sx;
    }
    if rotation.contains(RotationFlag::ReflectY) {
        sy = src_height - 1 - sy;
    }
    (sx, sy)
}

/// The rotation that undoes `rotation`.
pub fn invert_rotation(rotation: Rotation) -> Rotation {
    let degrees = match rotation_degrees(rotation) {
        90 => RotationFlag::Rotate270,
        180 => RotationFlag::Rotate180,
        270 => RotationFlag::Rotate90,
        _ => RotationFlag::Rotate0,
    };
    let mut out: Rotation = degrees.into();
    // A reflection composed with a rotation inverts to the same
    // reflection bits around the inverse rotation only for 0/180; for
    // 90/270 the axes swap.
    let swap = rotation_swaps_axes(rotation);
    if rotation.contains(RotationFlag::ReflectX) {
        out |= if swap {
            RotationFlag::ReflectY
        } else {
            RotationFlag::ReflectX
        };
    }
    if rotation.contains(RotationFlag::ReflectY) {
        out |= if swap {
            RotationFlag::ReflectX
        } else {
            RotationFlag::ReflectY
        };
    }
    out
}

// =============================================================================
// Matrices
// =============================================================================

/// A row-major 3x3 projective transform over f64.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    /// Row-major coefficients
    pub m: [[f64; 3]; 3],
}

impl Matrix3 {
    /// The identity matrix.
    pub const IDENTITY: Matrix3 = Matrix3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// A pure translation.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix3 {
            m: [[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]],
        }
    }

    /// The pixel-space matrix for a rotation bitset over a w x h source.
    ///
    /// Maps source coordinates into the rotated destination space, with
    /// the destination origin at (0, 0).
    pub fn from_rotation(rotation: Rotation, width: f64, height: f64) -> Self {
        let mut m = Matrix3::IDENTITY;
        if rotation.contains(RotationFlag::ReflectX) {
            m = Matrix3 {
                m: [[-1.0, 0.0, width], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            }
            .multiply(&m);
        }
        if rotation.contains(RotationFlag::ReflectY) {
            m = Matrix3 {
                m: [[1.0, 0.0, 0.0], [0.0, -1.0, height], [0.0, 0.0, 1.0]],
            }
            .multiply(&m);
        }
        let rot = match rotation_degrees(rotation) {
            90 => Matrix3 {
                m: [[0.0, -1.0, height], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            },
            180 => Matrix3 {
                m: [[-1.0, 0.0, width], [0.0, -1.0, height], [0.0, 0.0, 1.0]],
            },
            270 => Matrix3 {
                m: [[0.0, 1.0, 0.0], [-1.0, 0.0, width], [0.0, 0.0, 1.0]],
            },
            _ => Matrix3::IDENTITY,
        };
        rot.multiply(&m)
    }

    /// Matrix product `self * other`.
    pub fn multiply(&self, other: &Matrix3) -> Matrix3 {
        let mut out = [[0.0f64; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Matrix3 { m: out }
    }

    /// Apply to a point, with projective division.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let w = self.m[2][0] * x + self.m[2][1] * y + self.m[2][2];
        let px = self.m[0][0] * x + self.m[0][1] * y + self.m[0][2];
        let py = self.m[1][0] * x + self.m[1][1] * y + self.m[1][2];
        if w.abs() < f64::EPSILON {
            (px, py)
        } else {
            (px / w, py / w)
        }
    }

    /// Inverse via the adjugate, `None` for a singular matrix.
    pub fn invert(&self) -> Option<Matrix3> {
        let m = &self.m;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut out = [[0.0f64; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                // Cofactor expansion, transposed.
                let r0 = (j + 1) % 3;
                let r1 = (j + 2) % 3;
                let c0 = (i + 1) % 3;
                let c1 = (i + 2) % 3;
                *cell = (m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]) * inv_det;
            }
        }
        Some(Matrix3 { m: out })
    }

    /// Identity check with a small epsilon.
    pub fn is_identity(&self) -> bool {
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 1.0 } else { 0.0 };
                if (self.m[i][j] - expect).abs() > 1e-9 {
                    return false;
                }
            }
        }
        true
    }
}

/// Convolution filter parameters attached to a projective transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterInfo {
    /// Kernel width in pixels
    pub width: u32,
    /// Kernel height in pixels
    pub height: u32,
    /// Number of filter taps
    pub taps: u32,
}
