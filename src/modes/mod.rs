//! Display Timing Modes
//!
//! Core mode model for the configuration engine: the [`Mode`] timing
//! descriptor, its flag and type bitsets, and the [`catalog`] builder that
//! turns monitor capabilities and driver/config mode lists into a
//! deduplicated candidate list.
//!
//! # Overview
//!
//! A [`Mode`] describes one complete video timing: pixel clock plus the
//! horizontal and vertical display/sync-start/sync-end/total counts, with
//! flags for interlace, doublescan, and sync polarity. Modes are plain
//! values held in insertion-ordered `Vec`s; there are no linked lists and
//! no shared mutable state between copies.
//!
//! # Sources
//!
//! Candidate modes come from four places, in priority order:
//!
//! 1. Modes named explicitly in [`DisplayConfig`](crate::config::DisplayConfig)
//! 2. Modes reported natively by the driver probe
//! 3. Modes synthesized from EDID (detailed, standard, established, CVT, CEA)
//! 4. Built-in default/fallback modes
//!
//! Synthesis from a standard-timing code tries the fixed [`dmt`] table
//! first, then falls back to [`cvt`] generation when the monitor declares
//! CVT support, else [`gtf`].

use std::fmt;

use enumflags2::{bitflags, BitFlags};

pub mod catalog;
pub mod cea;
pub mod cvt;
pub mod dmt;
pub mod gtf;

mod status;

pub use catalog::{CatalogOptions, ModeCatalog};
pub use status::ModeStatus;

// =============================================================================
// Flags
// =============================================================================

/// Individual timing flags.
///
/// Polarity flags come in explicit positive/negative pairs; a mode with
/// neither set uses the driver's default polarity.
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlag {
    /// Positive hsync polarity
    PosHSync = 1 << 0,
    /// Negative hsync polarity
    NegHSync = 1 << 1,
    /// Positive vsync polarity
    PosVSync = 1 << 2,
    /// Negative vsync polarity
    NegVSync = 1 << 3,
    /// Interlaced scan
    Interlace = 1 << 4,
    /// Each scanline doubled
    DoubleScan = 1 << 5,
    /// Composite sync
    CompositeSync = 1 << 6,
    /// Pixel clock is doubled after the dot-clock divider
    ClockDiv2 = 1 << 7,
}

/// Set of [`ModeFlag`]s carried by a mode.
pub type ModeFlags = BitFlags<ModeFlag>;

/// Provenance bits for a mode.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTypeBit {
    /// Reported by the driver probe
    Driver = 1 << 0,
    /// From the built-in default list
    Default = 1 << 1,
    /// Named by the user in configuration
    UserPreferred = 1 << 2,
    /// Marked preferred by the monitor's EDID
    EdidPreferred = 1 << 3,
    /// Synthesized by this engine (DMT/CVT/GTF/CEA)
    Builtin = 1 << 4,
}

/// Set of [`ModeTypeBit`]s carried by a mode.
pub type ModeType = BitFlags<ModeTypeBit>;

// =============================================================================
// Mode
// =============================================================================

/// A complete video timing descriptor.
///
/// Two modes are *equal* ([`Mode::timings_equal`]) iff every timing field
/// and the flag set match; the name, status, type bits, and private value
/// are excluded from equality.
#[derive(Debug, Clone)]
pub struct Mode {
    /// Pixel clock in kHz
    pub clock: u32,

    /// Horizontal display pixels
    pub hdisplay: u32,
    /// Horizontal sync start
    pub hsync_start: u32,
    /// Horizontal sync end
    pub hsync_end: u32,
    /// Horizontal total
    pub htotal: u32,
    /// Horizontal skew
    pub hskew: u32,

    /// Vertical display lines
    pub vdisplay: u32,
    /// Vertical sync start
    pub vsync_start: u32,
    /// Vertical sync end
    pub vsync_end: u32,
    /// Vertical total
    pub vtotal: u32,
    /// Scanline multiplier (1 unless doublescan-style hardware repeat)
    pub vscan: u32,

    /// Timing flags
    pub flags: ModeFlags,

    /// Provenance bits
    pub kind: ModeType,

    /// Optional human-readable name (e.g. "1920x1080")
    pub name: Option<String>,

    /// Validation status, updated by the validator pipeline
    pub status: ModeStatus,

    /// Opaque value copied from the matching clock range
    pub private: i32,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            clock: 0,
            hdisplay: 0,
            hsync_start: 0,
            hsync_end: 0,
            htotal: 0,
            hskew: 0,
            vdisplay: 0,
            vsync_start: 0,
            vsync_end: 0,
            vtotal: 0,
            vscan: 1,
            flags: ModeFlags::empty(),
            kind: ModeType::empty(),
            name: None,
            status: ModeStatus::Ok,
            private: 0,
        }
    }
}

impl Mode {
    /// Create a bare mode with the given timings.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: u32,
        hdisplay: u32,
        hsync_start: u32,
        hsync_end: u32,
        htotal: u32,
        vdisplay: u32,
        vsync_start: u32,
        vsync_end: u32,
        vtotal: u32,
        flags: ModeFlags,
    ) -> Self {
        Self {
            clock,
            hdisplay,
            hsync_start,
            hsync_end,
            htotal,
            vdisplay,
            vsync_start,
            vsync_end,
            vtotal,
            flags,
            ..Default::default()
        }
    }

    /// Deep copy with no shared mutable state.
    ///
    /// Mutating the copy's status never affects the original.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Timing-and-flags equality (name, status, type bits excluded).
    pub fn timings_equal(&self, other: &Mode) -> bool {
        self.clock == other.clock
            && self.hdisplay == other.hdisplay
            && self.hsync_start == other.hsync_start
            && self.hsync_end == other.hsync_end
            && self.htotal == other.htotal
            && self.hskew == other.hskew
            && self.vdisplay == other.vdisplay
            && self.vsync_start == other.vsync_start
            && self.vsync_end == other.vsync_end
            && self.vtotal == other.vtotal
            && self.vscan == other.vscan
            && self.flags == other.flags
    }

    /// Vertical total adjusted for interlace, doublescan, and vscan.
    ///
    /// Interlace halves the per-field line count; doublescan and vscan
    /// multiply it.
    pub fn effective_vtotal(&self) -> f64 {
        let mut vtotal = self.vtotal as f64;
        if self.flags.contains(ModeFlag::Interlace) {
            vtotal /= 2.0;
        }
        if self.flags.contains(ModeFlag::DoubleScan) {
            vtotal *= 2.0;
        }
        if self.vscan > 1 {
            vtotal *= self.vscan as f64;
        }
        vtotal
    }

    /// Horizontal sync rate in kHz, 0.0 for degenerate timings.
    pub fn hsync_khz(&self) -> f64 {
        if self.htotal == 0 {
            return 0.0;
        }
        self.clock as f64 / self.htotal as f64
    }

    /// Vertical refresh rate in Hz, 0.0 for degenerate timings.
    pub fn vrefresh_hz(&self) -> f64 {
        let vtotal = self.effective_vtotal();
        if self.htotal == 0 || vtotal == 0.0 {
            return 0.0;
        }
        self.clock as f64 * 1000.0 / (self.htotal as f64 * vtotal)
    }

    /// Whether this mode carries any preferred bit.
    pub fn is_preferred(&self) -> bool {
        self.kind
            .intersects(ModeTypeBit::UserPreferred | ModeTypeBit::EdidPreferred)
    }

    /// Synthesize the canonical name ("1920x1080", "1920x1080i") if unset.
    pub fn ensure_name(&mut self) {
        if self.name.is_none() {
            let suffix = if self.flags.contains(ModeFlag::Interlace) {
                "i"
            } else {
                ""
            };
            self.name = Some(format!("{}x{}{}", self.hdisplay, self.vdisplay, suffix));
        }
    }

    /// The mode's name, or the canonical name when unset.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => {
                let suffix = if self.flags.contains(ModeFlag::Interlace) {
                    "i"
                } else {
                    ""
                };
                format!("{}x{}{}", self.hdisplay, self.vdisplay, suffix)
            }
        }
    }

    /// Pixel area (hdisplay * vdisplay).
    pub fn area(&self) -> u64 {
        self.hdisplay as u64 * self.vdisplay as u64
    }

    /// Sort key: preferred first, then descending area, then descending
    /// clock. A repeatable ordering, not an identity.
    fn sort_key(&self) -> (bool, u64, u32) {
        (!self.is_preferred(), u64::MAX - self.area(), u32::MAX - self.clock)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" {:.1} {} {} {} {} {} {} {} {}",
            self.display_name(),
            self.clock as f64 / 1000.0,
            self.hdisplay,
            self.hsync_start,
            self.hsync_end,
            self.htotal,
            self.vdisplay,
            self.vsync_start,
            self.vsync_end,
            self.vtotal,
        )?;
        if self.flags.contains(ModeFlag::Interlace) {
            write!(f, " interlace")?;
        }
        if self.flags.contains(ModeFlag::DoubleScan) {
            write!(f, " doublescan")?;
        }
        if self.flags.contains(ModeFlag::PosHSync) {
            write!(f, " +hsync")?;
        }
        if self.flags.contains(ModeFlag::NegHSync) {
            write!(f, " -hsync")?;
        }
        if self.flags.contains(ModeFlag::PosVSync) {
            write!(f, " +vsync")?;
        }
        if self.flags.contains(ModeFlag::NegVSync) {
            write!(f, " -vsync")?;
        }
        Ok(())
    }
}

/// Sort a mode list in place by the canonical ordering (preferred flag,
/// descending pixel area, descending clock).
pub fn sort_modes(modes: &mut [Mode]) {
    modes.sort_by_key(|m| m.sort_key());
}
