//! Mode-Setting Backend Interface
//!
//! The seam between the policy layers (validation, assignment, the
//! engine) and whatever actually programs scanout hardware. Backends
//! declare their clock model up front and get a veto over individual
//! modes; everything else is policy.

use thiserror::Error;

use crate::modes::{Mode, ModeStatus};
use crate::topology::CrtcId;
use crate::transform::Rotation;

/// Errors surfaced by a backend commit.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend declined the configuration
    #[error("configuration rejected by backend: {0}")]
    Rejected(String),
    /// The hardware failed while programming
    #[error("hardware fault: {0}")]
    Hardware(String),
}

/// One CRTC's slice of a commit.
#[derive(Debug, Clone)]
pub struct CrtcCommit<'a> {
    /// CRTC being programmed
    pub crtc: CrtcId,
    /// Mode to set, `None` disables the CRTC
    pub mode: Option<&'a Mode>,
    /// Framebuffer x position
    pub x: i32,
    /// Framebuffer y position
    pub y: i32,
    /// Rotation to apply
    pub rotation: Rotation,
}

/// A driver for some piece of scanout hardware.
///
/// The default implementations describe the most permissive hardware:
/// a fully programmable clock, no per-mode vetoes, no hardware
/// transforms, two-color cursors accepted.
pub trait ModeSetBackend {
    /// Discrete pixel clocks the hardware supports, in kHz.
    ///
    /// Empty means the clock is programmable and only the validator's
    /// clock ranges apply.
    fn clock_table(&self) -> &[u32] {
        &[]
    }

    /// Whether the pixel clock is continuously programmable.
    fn programmable_clock(&self) -> bool {
        self.clock_table().is_empty()
    }

    /// Driver veto over a single mode, called at the end of the
    /// validation pipeline.
    fn try_mode(&self, _mode: &Mode) -> ModeStatus {
        ModeStatus::Ok
    }

    /// Program a set of CRTCs atomically.
    fn commit(&mut self, commits: &[CrtcCommit<'_>]) -> Result<(), BackendError>;

    /// Whether the hardware scans out rotated/transformed surfaces
    /// itself. When false, non-identity transforms go through the
    /// shadow compositor.
    fn handles_transforms(&self) -> bool {
        false
    }

    /// Whether the cursor plane only accepts ARGB images. Two-color
    /// cursors are converted before upload when true.
    fn argb_cursor_only(&self) -> bool {
        false
    }

    /// Square hardware cursor dimension in pixels.
    fn cursor_size(&self) -> u32 {
        64
    }
}
