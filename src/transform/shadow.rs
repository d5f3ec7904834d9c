//! Shadow Compositing State
//!
//! Tracks, per CRTC, whether scanout happens directly from the shared
//! framebuffer or from a private rotated shadow surface, and plans the
//! recomposite work needed when framebuffer damage arrives.
//!
//! The shadow surface is allocated at the CRTC's mode size (scanout
//! orientation); the output's framebuffer footprint has the rotated
//! dimensions. The compositor fetches source pixels through the forward
//! (CRTC-to-framebuffer) matrix. Damage delivered in framebuffer
//! coordinates is first expanded by the filter kernel half-width, then
//! mapped through the inverse matrix into shadow coordinates.

use tracing::{debug, trace};

use super::{
    rotation_identity, rotation_is_identity, rotation_swaps_axes, FilterInfo, Matrix3, Rotation,
};

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// A w x h rectangle at (x, y).
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Intersection, `None` when the rectangles do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
        } else {
            None
        }
    }

    /// Grow by `margin` pixels on every side.
    pub fn inflate(&self, margin: u32) -> Rect {
        let m = margin as i32;
        Rect::new(
            self.x - m,
            self.y - m,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }
}

/// Scanout state of one CRTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowState {
    /// CRTC disabled, no scanout surface
    #[default]
    Off,
    /// Scanning out of the shared framebuffer directly
    Identity,
    /// Scanning out of a private shadow surface recomposited through
    /// the inverse transform
    ShadowComposited,
}

/// Per-CRTC transform engine.
///
/// Owns the composed forward/inverse matrices, the shadow state, and the
/// pending recomposite region.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    state: ShadowState,
    rotation: Rotation,
    user_transform: Option<Matrix3>,
    filter: Option<FilterInfo>,
    /// Forward: CRTC scanout coordinates to framebuffer coordinates
    forward: Matrix3,
    /// Floating-point inverse of `forward` (framebuffer to CRTC)
    inverse: Matrix3,
    /// Shadow surface dimensions (mode size, scanout orientation)
    shadow_size: (u32, u32),
    /// Framebuffer footprint dimensions (swapped for 90/270)
    footprint_size: (u32, u32),
    /// Framebuffer origin of this CRTC
    origin: (i32, i32),
    /// Whole shadow surface needs recompositing
    stale: bool,
    pending: Vec<Rect>,
    /// Backend composites transforms itself, no shadow needed
    backend_transforms: bool,
}

impl Default for TransformEngine {
    fn default() -> Self {
        TransformEngine {
            state: ShadowState::Off,
            rotation: rotation_identity(),
            user_transform: None,
            filter: None,
            forward: Matrix3::IDENTITY,
            inverse: Matrix3::IDENTITY,
            shadow_size: (0, 0),
            footprint_size: (0, 0),
            origin: (0, 0),
            stale: false,
            pending: Vec::new(),
            backend_transforms: false,
        }
    }
}

impl TransformEngine {
    /// Engine for a backend that applies output transforms in hardware.
    pub fn with_backend_transforms() -> Self {
        TransformEngine {
            backend_transforms: true,
            ..Default::default()
        }
    }

    /// Current scanout state.
    pub fn state(&self) -> ShadowState {
        self.state
    }

    /// Active rotation bits.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Forward transform (CRTC space to framebuffer space), used by the
    /// shadow compositor to fetch source pixels.
    pub fn forward(&self) -> &Matrix3 {
        &self.forward
    }

    /// Inverse transform (framebuffer space to CRTC space), used to map
    /// damage into shadow coordinates.
    pub fn inverse(&self) -> &Matrix3 {
        &self.inverse
    }

    /// Shadow surface dimensions, `(0, 0)` when no shadow is active.
    pub fn shadow_size(&self) -> (u32, u32) {
        if self.state == ShadowState::ShadowComposited {
            self.shadow_size
        } else {
            (0, 0)
        }
    }

    /// Disable the CRTC, releasing any shadow surface.
    pub fn disable(&mut self) {
        debug!("transform engine disabled");
        self.state = ShadowState::Off;
        self.pending.clear();
        self.stale = false;
    }

    /// Program the engine for a mode of `width` x `height` (un-rotated)
    /// at framebuffer position (`x`, `y`) with the given rotation and
    /// optional projective user transform.
    ///
    /// Returns the new scanout state. A fresh entry into
    /// `ShadowComposited`, or a change of shadow dimensions while there,
    /// marks the whole surface stale.
    pub fn set_transform(
        &mut self,
        width: u32,
        height: u32,
        x: i32,
        y: i32,
        rotation: Rotation,
        user_transform: Option<Matrix3>,
        filter: Option<FilterInfo>,
    ) -> ShadowState {
        self.rotation = rotation;
        self.user_transform = user_transform;
        self.filter = filter;
        self.origin = (x, y);

        let (shadow_w, shadow_h) = (width, height);
        self.footprint_size = if rotation_swaps_axes(rotation) {
            (height, width)
        } else {
            (width, height)
        };

        // Compose CRTC-to-framebuffer: rotate the mode-sized scanout
        // surface into the footprint orientation, apply the user
        // transform, then translate to the panning position.
        let rot = Matrix3::from_rotation(rotation, width as f64, height as f64);
        let mut forward = match &user_transform {
            Some(user) => user.multiply(&rot),
            None => rot,
        };
        forward = Matrix3::translate(x as f64, y as f64).multiply(&forward);

        let plain = rotation_is_identity(rotation) && user_transform.is_none();
        let needs_shadow = !plain && !self.backend_transforms;

        self.forward = forward;
        self.inverse = forward.invert().unwrap_or(Matrix3::IDENTITY);

        let previous = self.state;
        self.state = if needs_shadow {
            ShadowState::ShadowComposited
        } else {
            ShadowState::Identity
        };

        if self.state == ShadowState::ShadowComposited
            && (previous != ShadowState::ShadowComposited || self.shadow_size != (shadow_w, shadow_h))
        {
            self.stale = true;
            self.pending.clear();
            debug!(
                shadow_w,
                shadow_h,
                ?rotation,
                "entering shadow compositing, whole surface stale"
            );
        }
        self.shadow_size = (shadow_w, shadow_h);
        self.state
    }

    /// Record framebuffer damage against this CRTC.
    ///
    /// Damage is clipped to the CRTC's framebuffer footprint, expanded by
    /// the filter kernel half-width, and mapped into shadow coordinates.
    /// No-op unless shadow compositing is active.
    pub fn record_damage(&mut self, damage: &[Rect]) {
        if self.state != ShadowState::ShadowComposited || self.stale {
            return;
        }
        let (sw, sh) = self.shadow_size;
        let footprint = self.framebuffer_footprint();
        let margin = self
            .filter
            .map(|f| (f.width.max(f.height)).div_ceil(2))
            .unwrap_or(0);
        for rect in damage {
            let Some(hit) = rect.inflate(margin).intersect(&footprint) else {
                continue;
            };
            // Map the four corners through the forward transform and
            // take the bounding box; projective maps do not preserve
            // axis alignment.
            let corners = [
                (hit.x as f64, hit.y as f64),
                (hit.right() as f64, hit.y as f64),
                (hit.x as f64, hit.bottom() as f64),
                (hit.right() as f64, hit.bottom() as f64),
            ];
            let mut min_x = f64::MAX;
            let mut min_y = f64::MAX;
            let mut max_x = f64::MIN;
            let mut max_y = f64::MIN;
            for (cx, cy) in corners {
                let (tx, ty) = self.inverse.apply(cx, cy);
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
            let mapped = Rect::new(
                min_x.floor() as i32,
                min_y.floor() as i32,
                (max_x.ceil() - min_x.floor()).max(0.0) as u32,
                (max_y.ceil() - min_y.floor()).max(0.0) as u32,
            );
            let bounds = Rect::new(0, 0, sw, sh);
            if let Some(clipped) = mapped.intersect(&bounds) {
                trace!(?clipped, "shadow damage recorded");
                self.pending.push(clipped);
            }
        }
    }

    /// Take the shadow regions that must be recomposited.
    ///
    /// When the whole surface is stale a single full-surface rectangle is
    /// returned. Clears the pending set.
    pub fn take_redisplay(&mut self) -> Vec<Rect> {
        if self.state != ShadowState::ShadowComposited {
            self.pending.clear();
            return Vec::new();
        }
        if self.stale {
            self.stale = false;
            self.pending.clear();
            let (w, h) = self.shadow_size;
            return vec![Rect::new(0, 0, w, h)];
        }
        std::mem::take(&mut self.pending)
    }

    fn framebuffer_footprint(&self) -> Rect {
        let (w, h) = self.footprint_size;
        Rect::new(self.origin.0, self.origin.1, w, h)
    }
}
