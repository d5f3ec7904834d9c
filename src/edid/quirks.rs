//! Vendor-specific EDID quirks.
//!
//! Some monitors ship EDID data that is internally inconsistent. Two
//! generic corrections run on every decode:
//!
//! 1. A declared maximum pixel clock lower than an actual detailed-timing
//!    clock is rounded up to cover it.
//! 2. When the base block encodes an aspect ratio instead of millimeters,
//!    the physical size is re-derived from the largest detailed timing
//!    whose declared image size matches the aspect (16:9, 16:10, 4:3, 5:4
//!    heuristics, 5% tolerance).
//!
//! On top of that, a fixed table keyed by (vendor id, product id) applies
//! per-monitor corrections for units known to lie.

use tracing::{debug, info};

use super::{DetailedBlock, MonitorCaps, PhysicalSize};

/// Per-monitor correction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quirk {
    /// Prefer the largest 60 Hz mode over the declared preferred timing
    PreferLargestAt60,
    /// Prefer the largest 75 Hz mode over the declared preferred timing
    PreferLargestAt75,
    /// Detailed timing sync polarities must be forced positive/positive
    ForceSyncPositive,
    /// The first detailed timing is preferred even without the feature bit
    FirstDetailedPreferred,
    /// Physical size must come from the largest detailed timing's size
    DetailedUseMaximumSize,
}

struct QuirkEntry {
    vendor: &'static str,
    product: u16,
    quirk: Quirk,
}

/// Known-bad monitors. Matched on PNP vendor id + product code.
static QUIRK_TABLE: &[QuirkEntry] = &[
    // Envision Peripherals EN-7100e: image size only valid in the DTD.
    QuirkEntry {
        vendor: "EPI",
        product: 59_264,
        quirk: Quirk::DetailedUseMaximumSize,
    },
    // Acer AL1706: claims a 60 Hz preferred mode, panel wants 75 Hz.
    QuirkEntry {
        vendor: "ACR",
        product: 44_358,
        quirk: Quirk::PreferLargestAt75,
    },
    // Philips 107p5: first detailed timing is the usable one.
    QuirkEntry {
        vendor: "PHL",
        product: 57_364,
        quirk: Quirk::FirstDetailedPreferred,
    },
    // Proview AY765C: as above.
    QuirkEntry {
        vendor: "PTS",
        product: 765,
        quirk: Quirk::FirstDetailedPreferred,
    },
    // Samsung SyncMaster 205BW: sync polarities inverted in the DTD.
    QuirkEntry {
        vendor: "SAM",
        product: 541,
        quirk: Quirk::ForceSyncPositive,
    },
];

/// Aspect ratios tried when re-deriving size from a detailed timing.
const KNOWN_ASPECTS: [(u32, u32); 4] = [(16, 9), (16, 10), (4, 3), (5, 4)];
const ASPECT_TOLERANCE: f64 = 0.05;

/// Quirks matching this monitor's identity.
pub fn lookup(caps: &MonitorCaps) -> Vec<Quirk> {
    QUIRK_TABLE
        .iter()
        .filter(|e| e.vendor == caps.vendor.id && e.product == caps.vendor.product)
        .map(|e| e.quirk)
        .collect()
}

/// Run the generic corrections plus any table-driven quirks.
pub(super) fn apply(caps: &mut MonitorCaps) {
    fixup_max_clock(caps);
    fixup_physical_size(caps);

    for quirk in lookup(caps) {
        info!(
            vendor = %caps.vendor.id,
            product = caps.vendor.product,
            ?quirk,
            "applying EDID quirk"
        );
        match quirk {
            Quirk::ForceSyncPositive => force_sync_positive(caps),
            Quirk::DetailedUseMaximumSize => use_detailed_max_size(caps),
            // The preference quirks are consumed by the mode catalog.
            Quirk::PreferLargestAt60
            | Quirk::PreferLargestAt75
            | Quirk::FirstDetailedPreferred => {}
        }
    }
}

/// Round a reported max pixel clock up when a detailed timing exceeds it.
fn fixup_max_clock(caps: &mut MonitorCaps) {
    let fastest = caps
        .detailed_timings()
        .iter()
        .map(|t| t.mode.clock)
        .max()
        .unwrap_or(0);
    if fastest == 0 {
        return;
    }
    if let Some(declared) = caps.max_clock_khz {
        if declared < fastest {
            // Round up to the next 10 MHz step the range descriptor
            // could have expressed.
            let rounded = fastest.div_ceil(10_000) * 10_000;
            debug!(declared, fastest, rounded, "max clock below detailed timing, raising");
            caps.max_clock_khz = Some(rounded);
        }
    }
}

/// Derive millimeters from the largest aspect-matching detailed timing
/// when the base block only declared an aspect ratio.
fn fixup_physical_size(caps: &mut MonitorCaps) {
    let target_aspect = match caps.size {
        PhysicalSize::AspectRatio(a) => a,
        _ => return,
    };

    let mut best: Option<(u32, u32)> = None;
    for t in caps.detailed_timings() {
        if t.width_mm == 0 || t.height_mm == 0 {
            continue;
        }
        // Suppress bogus entries that merely echo the resolution.
        if t.width_mm == t.mode.hdisplay && t.height_mm == t.mode.vdisplay {
            continue;
        }
        let ratio = t.width_mm as f64 / t.height_mm as f64;
        let matches_declared = (ratio - target_aspect).abs() <= target_aspect * ASPECT_TOLERANCE;
        let matches_known = KNOWN_ASPECTS.iter().any(|&(n, d)| {
            let known = n as f64 / d as f64;
            (ratio - known).abs() <= known * ASPECT_TOLERANCE
                && (known - target_aspect).abs() <= target_aspect * ASPECT_TOLERANCE
        });
        if !(matches_declared || matches_known) {
            continue;
        }
        if best.map_or(true, |(w, h)| t.width_mm * t.height_mm > w * h) {
            best = Some((t.width_mm, t.height_mm));
        }
    }

    if let Some((w, h)) = best {
        debug!(width_mm = w, height_mm = h, "derived physical size from detailed timing");
        caps.size = PhysicalSize::Millimeters {
            width: w,
            height: h,
        };
    }
}

fn force_sync_positive(caps: &mut MonitorCaps) {
    use crate::modes::ModeFlag;
    for block in &mut caps.detailed {
        if let DetailedBlock::Timing(t) = block {
            t.mode.flags.remove(ModeFlag::NegHSync | ModeFlag::NegVSync);
            t.mode.flags |= ModeFlag::PosHSync | ModeFlag::PosVSync;
        }
    }
}

fn use_detailed_max_size(caps: &mut MonitorCaps) {
    let best = caps
        .detailed_timings()
        .iter()
        .filter(|t| t.width_mm > 0 && t.height_mm > 0)
        .max_by_key(|t| t.width_mm * t.height_mm)
        .map(|t| (t.width_mm, t.height_mm));
    if let Some((w, h)) = best {
        caps.size = PhysicalSize::Millimeters {
            width: w,
            height: h,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edid::decode;
    use crate::edid::test_fixtures::{base_block_1080p, finish_block};

    #[test]
    fn test_max_clock_raised_to_cover_detailed_timing() {
        let mut block = base_block_1080p();
        // Lower the range descriptor's max clock to 100 MHz, below the
        // 148.5 MHz detailed timing.
        block[81] = 10;
        finish_block(&mut block);

        let caps = decode(&block).expect("decode failed");
        assert_eq!(caps.max_clock_khz, Some(150_000));
    }

    #[test]
    fn test_declared_max_clock_kept_when_sufficient() {
        let caps = decode(&base_block_1080p()).expect("decode failed");
        assert_eq!(caps.max_clock_khz, Some(200_000));
    }

    #[test]
    fn test_aspect_ratio_replaced_by_detailed_size() {
        let mut block = base_block_1080p();
        // Encode 16:9 aspect instead of centimeters: h = 79, v = 0.
        block[21] = 79;
        block[22] = 0;
        finish_block(&mut block);

        let caps = decode(&block).expect("decode failed");
        // The 600x340 mm detailed-timing size matches 16:9 within 5%.
        assert_eq!(
            caps.size,
            PhysicalSize::Millimeters {
                width: 600,
                height: 340
            }
        );
    }

    #[test]
    fn test_sync_polarity_quirk() {
        let mut block = base_block_1080p();
        // Identify as the quirky Samsung unit (product 541).
        // "SAM" = (19,1,13) -> 0x4C2D big-endian.
        block[8] = 0x4C;
        block[9] = 0x2D;
        block[10] = 0x1D;
        block[11] = 0x02;
        // Flip the DTD to negative/negative sync.
        block[71] = 0x18;
        finish_block(&mut block);

        let caps = decode(&block).expect("decode failed");
        use crate::modes::ModeFlag;
        let t = &caps.detailed_timings()[0].mode;
        assert!(t.flags.contains(ModeFlag::PosHSync));
        assert!(t.flags.contains(ModeFlag::PosVSync));
    }
}
