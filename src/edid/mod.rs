//! EDID Decoding
//!
//! Parses a monitor's raw EDID block (128 bytes, plus optional 128-byte
//! extensions) into a structured [`MonitorCaps`] value.
//!
//! # Overview
//!
//! The decoder is deliberately forgiving about content and strict about
//! framing:
//!
//! - The fixed 8-byte header is required, but DDC1 bit-sampled sources may
//!   deliver it rotationally shifted; the decoder re-aligns before use.
//! - Each 128-byte block must checksum to zero mod 256. An all-zero block
//!   is treated as a "no data" sentinel, not a checksum failure.
//! - Only EDID major version 1 is accepted. Revisions above the highest
//!   known (1.4) are accepted with a logged forward-compatibility note.
//! - Unknown detailed-descriptor subtypes are preserved as opaque
//!   vendor/unknown variants rather than rejected.
//! - Every byte access is bounds-checked; malformed input yields a
//!   [`DecodeError`], never a panic.
//!
//! A final table-driven quirk pass ([`quirks`]) corrects known-bad monitor
//! data: under-reported maximum pixel clocks and physical sizes encoded as
//! aspect ratios.
//!
//! Decode failures are always recoverable: callers fall back to
//! [`default_sync_ranges`] and [`DEFAULT_MAX_CLOCK_KHZ`] and treat the
//! monitor as EDID-less.

use thiserror::Error;

use crate::modes::Mode;

mod decode;
mod extensions;
pub mod quirks;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use decode::decode;
pub use quirks::Quirk;

/// One EDID block is always 128 bytes.
pub const BLOCK_SIZE: usize = 128;

/// Fallback maximum pixel clock (kHz) when no EDID is available.
pub const DEFAULT_MAX_CLOCK_KHZ: u32 = 65_000;

// =============================================================================
// Errors
// =============================================================================

/// EDID decode failure.
///
/// All variants are recoverable by treating the monitor as "no EDID".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The 8-byte header pattern was not found at any rotation
    #[error("EDID header pattern not found")]
    BadHeader,

    /// EDID major version is not 1
    #[error("Unsupported EDID version {0}.{1}")]
    BadVersion(u8, u8),

    /// Buffer shorter than 128 bytes, or extensions truncated
    #[error("EDID buffer truncated: {got} bytes, need {need}")]
    Truncated {
        /// Bytes actually present
        got: usize,
        /// Bytes required
        need: usize,
    },

    /// A non-all-zero block failed its checksum
    #[error("EDID block {0} checksum invalid")]
    Checksum(usize),
}

// =============================================================================
// Monitor capabilities
// =============================================================================

/// Monitor vendor identity: PNP id, product, serial, manufacture date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorInfo {
    /// Three-letter PNP vendor id (e.g. "SAM")
    pub id: String,
    /// Product code
    pub product: u16,
    /// Serial number
    pub serial: u32,
    /// Week of manufacture (0 = unspecified, 0xFF = model year)
    pub week: u8,
    /// Year of manufacture (or model year)
    pub year: u16,
}

/// Physical size declaration from the base block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicalSize {
    /// Size in millimeters
    Millimeters {
        /// Horizontal size (mm)
        width: u32,
        /// Vertical size (mm)
        height: u32,
    },
    /// EDID 1.4 aspect-ratio encoding (width / height)
    AspectRatio(f64),
    /// Size not specified (projectors, unset fields)
    Unknown,
}

/// A monitor sync range: hsync in kHz or vrefresh in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncRange {
    /// Lower bound (inclusive)
    pub lo: f64,
    /// Upper bound (inclusive)
    pub hi: f64,
}

impl SyncRange {
    /// Inclusive membership with a tolerance fraction at the edges.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lo * (1.0 - tolerance) && value <= self.hi * (1.0 + tolerance)
    }
}

/// A standard-timing code: size plus refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardTiming {
    /// Horizontal pixels
    pub width: u32,
    /// Vertical pixels (derived from the aspect bits)
    pub height: u32,
    /// Field refresh rate in Hz
    pub refresh: u32,
}

/// Monitor range descriptor payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorRanges {
    /// Vertical refresh bounds (Hz)
    pub vrefresh: SyncRange,
    /// Horizontal sync bounds (kHz)
    pub hsync: SyncRange,
    /// Maximum pixel clock in kHz, if declared
    pub max_clock_khz: Option<u32>,
    /// Timing-formula support declared by the descriptor
    pub formula: TimingFormula,
}

/// Timing formula support carried by a range descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingFormula {
    /// Default GTF only
    Default,
    /// Secondary GTF curve parameters present
    SecondaryGtf,
    /// CVT supported (EDID 1.4)
    Cvt,
}

/// A decoded detailed timing: the mode plus its declared physical size.
#[derive(Debug, Clone)]
pub struct DetailedTiming {
    /// The full timing
    pub mode: Mode,
    /// Declared image width in mm (0 when absent)
    pub width_mm: u32,
    /// Declared image height in mm (0 when absent)
    pub height_mm: u32,
    /// Stereo signaling bits were set; such timings are not usable as
    /// plain scanout modes
    pub stereo: bool,
}

/// One of the four 18-byte detailed-descriptor slots, tagged by type.
#[derive(Debug, Clone)]
pub enum DetailedBlock {
    /// A detailed timing (pixel clock non-zero)
    Timing(DetailedTiming),
    /// Monitor serial number string (0xFF)
    SerialString(String),
    /// Unclassified data string (0xFE)
    DataString(String),
    /// Monitor range limits (0xFD)
    Range(MonitorRanges),
    /// Monitor name string (0xFC)
    Name(String),
    /// Additional white point data (0xFB), stored raw
    WhitePoint([u8; 13]),
    /// Additional standard timings (0xFA)
    StandardTimings(Vec<StandardTiming>),
    /// CVT 3-byte codes (0xF8)
    CvtCodes(Vec<CvtCode>),
    /// Established timings III bitmap (0xF7), stored raw
    EstablishedIii([u8; 13]),
    /// Vendor-specific or unknown descriptor, stored opaquely
    Vendor {
        /// Descriptor type byte
        tag: u8,
        /// Raw payload
        data: [u8; 13],
    },
}

/// One CVT 3-byte code: a size plus supported refresh rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvtCode {
    /// Horizontal pixels
    pub width: u32,
    /// Vertical pixels
    pub height: u32,
    /// Preferred refresh rate (Hz)
    pub preferred_refresh: u32,
    /// Supported refresh rates (Hz); 60 may mean reduced blanking
    pub refreshes: [bool; 5],
    /// Whether the 60 Hz bit means reduced blanking
    pub rb_at_60: bool,
}

impl CvtCode {
    /// Refresh rates corresponding to the support bits, in Hz.
    pub const REFRESH_RATES: [u32; 5] = [50, 60, 75, 85, 60];
}

/// An extension block, parsed when the tag is known, raw otherwise.
#[derive(Debug, Clone)]
pub enum ExtensionBlock {
    /// CEA-861 extension (tag 0x02)
    Cea(CeaExtension),
    /// Any other extension tag, kept opaque
    Other {
        /// Extension tag byte
        tag: u8,
        /// Full 128-byte payload
        data: Vec<u8>,
    },
}

/// Decoded CEA-861 extension content.
#[derive(Debug, Clone, Default)]
pub struct CeaExtension {
    /// CEA revision
    pub revision: u8,
    /// Basic audio supported
    pub basic_audio: bool,
    /// Underscan supported
    pub underscan: bool,
    /// Short video descriptor codes (VICs, native bit stripped)
    pub video_codes: Vec<u8>,
    /// Which of `video_codes` carried the native bit
    pub native_codes: Vec<u8>,
    /// Short audio descriptors, raw 3-byte groups
    pub audio_blocks: Vec<[u8; 3]>,
    /// Speaker allocation payloads
    pub speaker_blocks: Vec<[u8; 3]>,
    /// Vendor data blocks (OUI + payload)
    pub vendor_blocks: Vec<VendorDataBlock>,
    /// Detailed timings found after the DTD offset
    pub detailed: Vec<DetailedTiming>,
    /// Maximum TMDS clock from an HDMI vendor block, kHz
    pub max_tmds_khz: Option<u32>,
}

/// A CEA vendor-specific data block.
#[derive(Debug, Clone)]
pub struct VendorDataBlock {
    /// IEEE OUI, host byte order
    pub oui: u32,
    /// Payload after the OUI
    pub data: Vec<u8>,
}

/// The HDMI licensing OUI, identifying HDMI vendor blocks.
pub const HDMI_OUI: u32 = 0x000C03;

/// Structured monitor capabilities decoded from EDID.
#[derive(Debug, Clone)]
pub struct MonitorCaps {
    /// Vendor identity
    pub vendor: VendorInfo,
    /// (major, minor) EDID version
    pub version: (u8, u8),
    /// Digital (vs. analog) video input
    pub digital: bool,
    /// Physical size or declared aspect ratio
    pub size: PhysicalSize,
    /// Display gamma (2.2 typical); None when unset
    pub gamma: Option<f64>,
    /// Preferred-timing bit from the features byte
    pub preferred_timing: bool,
    /// Monitor claims continuous frequency / default GTF support
    pub default_gtf: bool,
    /// Established timing bitmap, bits 0..17 (byte 35 LSB-first)
    pub established: u32,
    /// Standard timing codes from the base block
    pub standard: Vec<StandardTiming>,
    /// The four detailed-descriptor slots
    pub detailed: Vec<DetailedBlock>,
    /// Hsync ranges in kHz (from range descriptors, possibly several)
    pub hsync_ranges: Vec<SyncRange>,
    /// Vrefresh ranges in Hz
    pub vrefresh_ranges: Vec<SyncRange>,
    /// Maximum pixel clock in kHz, if declared anywhere
    pub max_clock_khz: Option<u32>,
    /// Monitor name from a name descriptor
    pub name: Option<String>,
    /// Serial string from a serial descriptor
    pub serial_string: Option<String>,
    /// Extension blocks, in order
    pub extensions: Vec<ExtensionBlock>,
    /// Number of trailing 128-byte blocks physically present
    pub no_sections: usize,
    /// The raw EDID bytes, preserved verbatim for re-export
    pub raw: Vec<u8>,
}

impl MonitorCaps {
    /// Whether the monitor declares CVT support in a range descriptor.
    pub fn supports_cvt(&self) -> bool {
        self.detailed.iter().any(|d| {
            matches!(
                d,
                DetailedBlock::Range(r) if r.formula == TimingFormula::Cvt
            )
        })
    }

    /// Reduced-blanking capability.
    ///
    /// Policy: EDID revision >= 4 with a digital input. Applied uniformly
    /// at every call site.
    pub fn supports_reduced_blanking(&self) -> bool {
        self.version.1 >= 4 && self.digital
    }

    /// All detailed timings, base block first, then CEA extensions.
    pub fn detailed_timings(&self) -> Vec<&DetailedTiming> {
        let mut out: Vec<&DetailedTiming> = self
            .detailed
            .iter()
            .filter_map(|d| match d {
                DetailedBlock::Timing(t) => Some(t),
                _ => None,
            })
            .collect();
        for ext in &self.extensions {
            if let ExtensionBlock::Cea(cea) = ext {
                out.extend(cea.detailed.iter());
            }
        }
        out
    }

    /// Maximum TMDS clock from an HDMI vendor block, if present.
    pub fn max_tmds_khz(&self) -> Option<u32> {
        self.extensions.iter().find_map(|e| match e {
            ExtensionBlock::Cea(cea) => cea.max_tmds_khz,
            _ => None,
        })
    }
}

/// Built-in default sync ranges used when no EDID is available:
/// 31.5-48 kHz hsync, 50-70 Hz vrefresh.
pub fn default_sync_ranges() -> (SyncRange, SyncRange) {
    (
        SyncRange { lo: 31.5, hi: 48.0 },
        SyncRange { lo: 50.0, hi: 70.0 },
    )
}
