//! Mode Catalog
//!
//! Builds the per-output candidate mode list by merging, in priority
//! order: user-configured modes, driver-probed modes, modes synthesized
//! from the monitor's EDID, and (when no source yields a preferred
//! mode) the built-in fallback set. The result is deduplicated on full timing
//! equality, keeping the preferred copy, and sorted largest-first.
//!
//! EDID synthesis covers five sources: detailed timing descriptors,
//! standard timing codes (DMT lookup first, then CVT or GTF), the
//! established timing bitmap, CVT 3-byte codes, and CEA short video
//! descriptors plus extension-block detailed timings.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::edid::{
    CvtCode, DetailedBlock, ExtensionBlock, MonitorCaps, Quirk, StandardTiming,
};
use crate::modes::{cea, cvt, dmt, gtf, sort_modes, Mode, ModeTypeBit};

/// Established timing bitmap entries, indexed as
/// `(byte - 35) * 8 + bit`. The 1024x768 interlaced entry (bit 12) has
/// no progressive-scan equivalent and is left out.
const ESTABLISHED: &[(u32, u32, u32, u32)] = &[
    (0, 800, 600, 60),
    (1, 800, 600, 56),
    (2, 640, 480, 75),
    (3, 640, 480, 72),
    (4, 640, 480, 67),
    (5, 640, 480, 60),
    (6, 720, 400, 88),
    (7, 720, 400, 70),
    (8, 1280, 1024, 75),
    (9, 1024, 768, 75),
    (10, 1024, 768, 70),
    (11, 1024, 768, 60),
    (13, 832, 624, 75),
    (14, 800, 600, 75),
    (15, 800, 600, 72),
    (23, 1152, 870, 75),
];

/// Established timings III bitmap entries, as `(byte, bit, width,
/// height, refresh, reduced_blanking)` with `byte` indexing the six
/// bitmap bytes that follow the descriptor's revision byte, MSB first.
const ESTABLISHED_III: &[(usize, u8, u32, u32, u32, bool)] = &[
    (0, 7, 640, 350, 85, false),
    (0, 6, 640, 400, 85, false),
    (0, 5, 720, 400, 85, false),
    (0, 4, 640, 480, 85, false),
    (0, 3, 848, 480, 60, false),
    (0, 2, 800, 600, 85, false),
    (0, 1, 1024, 768, 85, false),
    (0, 0, 1152, 864, 75, false),
    (1, 7, 1280, 768, 60, true),
    (1, 6, 1280, 768, 60, false),
    (1, 5, 1280, 768, 75, false),
    (1, 4, 1280, 768, 85, false),
    (1, 3, 1280, 960, 60, false),
    (1, 2, 1280, 960, 85, false),
    (1, 1, 1280, 1024, 60, false),
    (1, 0, 1280, 1024, 85, false),
    (2, 7, 1360, 768, 60, false),
    (2, 6, 1440, 900, 60, true),
    (2, 5, 1440, 900, 60, false),
    (2, 4, 1440, 900, 75, false),
    (2, 3, 1440, 900, 85, false),
    (2, 2, 1400, 1050, 60, true),
    (2, 1, 1400, 1050, 60, false),
    (2, 0, 1400, 1050, 75, false),
    (3, 7, 1400, 1050, 85, false),
    (3, 6, 1680, 1050, 60, true),
    (3, 5, 1680, 1050, 60, false),
    (3, 4, 1680, 1050, 75, false),
    (3, 3, 1680, 1050, 85, false),
    (3, 2, 1600, 1200, 60, false),
    (3, 1, 1600, 1200, 65, false),
    (3, 0, 1600, 1200, 70, false),
    (4, 7, 1600, 1200, 75, false),
    (4, 6, 1600, 1200, 85, false),
    (4, 5, 1792, 1344, 60, false),
    (4, 4, 1792, 1344, 75, false),
    (4, 3, 1856, 1392, 60, false),
    (4, 2, 1856, 1392, 75, false),
    (4, 1, 1920, 1200, 60, true),
    (4, 0, 1920, 1200, 60, false),
    (5, 7, 1920, 1200, 75, false),
    (5, 6, 1920, 1200, 85, false),
    (5, 5, 1920, 1440, 60, false),
    (5, 4, 1920, 1440, 75, false),
];

/// CVT 3-byte code refresh rates, in `CvtCode::refreshes` order. The
/// final slot is 60 Hz reduced blanking.
const CVT_CODE_RATES: [u32; 4] = [50, 60, 75, 85];

/// Inputs to catalog construction beyond the EDID.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Modes named in user configuration, highest priority
    pub user_modes: Vec<Mode>,
    /// Modes probed by the driver
    pub driver_modes: Vec<Mode>,
    /// Append the built-in fallback set when no source yields a
    /// preferred mode
    pub include_fallback: bool,
}

/// A deduplicated, sorted candidate mode list for one output.
#[derive(Debug, Clone, Default)]
pub struct ModeCatalog {
    modes: Vec<Mode>,
    by_name: HashMap<String, usize>,
}

impl ModeCatalog {
    /// Build the catalog for one output.
    pub fn build(caps: Option<&MonitorCaps>, options: &CatalogOptions) -> Self {
        let mut modes = Vec::new();

        for m in &options.user_modes {
            let mut m = m.clone();
            m.kind |= ModeTypeBit::UserPreferred;
            m.ensure_name();
            modes.push(m);
        }
        modes.extend(options.driver_modes.iter().cloned());

        if let Some(caps) = caps {
            synthesize_from_edid(caps, &mut modes);
        }

        if options.include_fallback && !modes.iter().any(|m| m.is_preferred()) {
            debug!("no preferred mode from any source, adding built-in fallbacks");
            modes.extend(dmt::fallback_modes());
        }

        if let Some(caps) = caps {
            apply_preference_quirks(caps, &mut modes);
        }

        dedup_modes(&mut modes);
        sort_modes(&mut modes);

        let by_name = modes
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.name.clone().map(|n| (n, i)))
            .collect();
        debug!(count = modes.len(), "mode catalog built");
        ModeCatalog { modes, by_name }
    }

    /// All candidate modes, largest-first.
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// Take ownership of the mode list.
    pub fn into_modes(self) -> Vec<Mode> {
        self.modes
    }

    /// The preferred mode, if any source marked one.
    pub fn preferred(&self) -> Option<&Mode> {
        self.modes.iter().find(|m| m.is_preferred())
    }

    /// Look a mode up by its display name.
    pub fn find(&self, name: &str) -> Option<&Mode> {
        self.by_name.get(name).map(|&i| &self.modes[i])
    }

    /// Whether the catalog came up empty.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

/// A detailed timing is unusable as a scanout mode when it is tiny,
/// carries stereo signaling, or places sync beyond the total.
fn degenerate(mode: &Mode, stereo: bool) -> bool {
    stereo
        || mode.hdisplay < 64
        || mode.vdisplay < 64
        || mode.hsync_end > mode.htotal
        || mode.vsync_end > mode.vtotal
}

fn synthesize_from_edid(caps: &MonitorCaps, modes: &mut Vec<Mode>) {
    // Detailed descriptors first; their sizes also veto standard-timing
    // synthesis below to avoid duplicate generation.
    let mut detailed_sizes: Vec<(u32, u32)> = Vec::new();
    for t in caps.detailed_timings() {
        if degenerate(&t.mode, t.stereo) {
            trace!(mode = %t.mode.display_name(), "skipping degenerate detailed timing");
            continue;
        }
        detailed_sizes.push((t.mode.hdisplay, t.mode.vdisplay));
        modes.push(t.mode.clone());
    }
    for ext in &caps.extensions {
        if let ExtensionBlock::Cea(cea_ext) = ext {
            for t in &cea_ext.detailed {
                if degenerate(&t.mode, t.stereo) {
                    continue;
                }
                detailed_sizes.push((t.mode.hdisplay, t.mode.vdisplay));
                modes.push(t.mode.clone());
            }
            for &vic in &cea_ext.video_codes {
                if let Some(m) = cea::mode_for_vic(vic) {
                    modes.push(m);
                }
            }
        }
    }

    for st in &caps.standard {
        if detailed_sizes.contains(&(st.width, st.height)) {
            trace!(
                width = st.width,
                height = st.height,
                "standard timing collides with a detailed descriptor"
            );
            continue;
        }
        modes.push(standard_timing_mode(caps, st));
    }

    for &(bit, width, height, refresh) in ESTABLISHED {
        if caps.established & (1 << bit) == 0 {
            continue;
        }
        if let Some(m) = dmt::find_any(width, height, refresh) {
            modes.push(m);
        }
    }

    for block in &caps.detailed {
        match block {
            DetailedBlock::CvtCodes(codes) => {
                for code in codes {
                    expand_cvt_code(code, modes);
                }
            }
            DetailedBlock::EstablishedIii(payload) => {
                // payload[0] is the descriptor revision; six bitmap
                // bytes follow.
                for &(byte, bit, width, height, refresh, reduced) in ESTABLISHED_III {
                    if payload[1 + byte] & (1 << bit) == 0 {
                        continue;
                    }
                    if let Some(m) = dmt::find(width, height, refresh, reduced) {
                        modes.push(m);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Synthesize one standard timing: DMT table first, then CVT when the
/// monitor declares it, GTF otherwise.
fn standard_timing_mode(caps: &MonitorCaps, st: &StandardTiming) -> Mode {
    let reduced = caps.supports_reduced_blanking();
    if let Some(m) = dmt::find(st.width, st.height, st.refresh, false) {
        return m;
    }
    if reduced {
        if let Some(m) = dmt::find(st.width, st.height, st.refresh, true) {
            return m;
        }
    }
    if caps.supports_cvt() {
        cvt::mode(st.width, st.height, st.refresh, false)
    } else {
        gtf::mode(st.width, st.height, st.refresh)
    }
}

fn expand_cvt_code(code: &CvtCode, modes: &mut Vec<Mode>) {
    for (i, &rate) in CVT_CODE_RATES.iter().enumerate() {
        if !code.refreshes[i] {
            continue;
        }
        modes.push(cvt::mode(code.width, code.height, rate, false));
    }
    if code.refreshes[4] {
        modes.push(cvt::mode(code.width, code.height, 60, true));
    }
}

/// Preference quirks move the preferred bit rather than adding modes.
fn apply_preference_quirks(caps: &MonitorCaps, modes: &mut [Mode]) {
    let quirks = crate::edid::quirks::lookup(caps);
    for quirk in quirks {
        let target = match quirk {
            Quirk::PreferLargestAt60 => largest_at(modes, 60),
            Quirk::PreferLargestAt75 => largest_at(modes, 75),
            Quirk::FirstDetailedPreferred => modes
                .iter()
                .position(|m| m.kind.contains(ModeTypeBit::Driver)),
            _ => None,
        };
        if let Some(idx) = target {
            for m in modes.iter_mut() {
                m.kind.remove(ModeTypeBit::EdidPreferred);
            }
            modes[idx].kind |= ModeTypeBit::EdidPreferred;
            debug!(mode = %modes[idx].display_name(), ?quirk, "preference quirk applied");
        }
    }
}

fn largest_at(modes: &[Mode], refresh: u32) -> Option<usize> {
    modes
        .iter()
        .enumerate()
        .filter(|(_, m)| (m.vrefresh_hz() - refresh as f64).abs() < 1.0)
        .max_by_key(|(_, m)| m.area())
        .map(|(i, _)| i)
}

/// Drop timing-equal duplicates, keeping the preferred copy (or the
/// earlier, higher-priority one).
fn dedup_modes(modes: &mut Vec<Mode>) {
    let mut kept: Vec<Mode> = Vec::with_capacity(modes.len());
    for mode in modes.drain(..) {
        match kept.iter_mut().find(|k| k.timings_equal(&mode)) {
            Some(existing) => {
                // Merge type bits so a driver+EDID duplicate keeps both
                // provenances; preference travels with the merge.
                existing.kind |= mode.kind;
                if mode.is_preferred() && existing.name.is_none() {
                    existing.name = mode.name;
                }
            }
            None => kept.push(mode),
        }
    }
    *modes = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edid::test_fixtures::{base_block_1080p, base_block_established_only};
    use crate::edid::{decode, PhysicalSize};
    use crate::modes::ModeFlag;

    fn caps_1080p() -> MonitorCaps {
        decode(&base_block_1080p()).expect("fixture decodes")
    }

    #[test]
    fn test_detailed_timing_becomes_mode() {
        let caps = caps_1080p();
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        let preferred = catalog.preferred().expect("preferred mode");
        assert_eq!((preferred.hdisplay, preferred.vdisplay), (1920, 1080));
        assert_eq!(preferred.clock, 148_500);
    }

    #[test]
    fn test_established_bitmap_expands() {
        let caps = decode(&base_block_established_only()).expect("fixture decodes");
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        assert!(catalog
            .modes()
            .iter()
            .any(|m| (m.hdisplay, m.vdisplay) == (720, 400)));
    }

    #[test]
    fn test_established_iii_descriptor_expands() {
        let mut caps = decode(&base_block_established_only()).expect("fixture decodes");
        let mut payload = [0u8; 13];
        payload[0] = 0x0A;
        // Second bitmap byte, bit 1: 1280x1024@60.
        payload[2] = 0x02;
        caps.detailed.push(DetailedBlock::EstablishedIii(payload));
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        assert!(catalog
            .modes()
            .iter()
            .any(|m| (m.hdisplay, m.vdisplay) == (1280, 1024)));
    }

    #[test]
    fn test_fallbacks_when_no_source() {
        let options = CatalogOptions {
            include_fallback: true,
            ..Default::default()
        };
        let catalog = ModeCatalog::build(None, &options);
        assert!(!catalog.is_empty());
        assert!(catalog
            .modes()
            .iter()
            .any(|m| (m.hdisplay, m.vdisplay) == (640, 480)));
    }

    #[test]
    fn test_no_fallbacks_without_opt_in() {
        let catalog = ModeCatalog::build(None, &CatalogOptions::default());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_user_modes_carry_user_preferred_bit() {
        let options = CatalogOptions {
            user_modes: vec![cvt::mode(1600, 900, 60, false)],
            ..Default::default()
        };
        let catalog = ModeCatalog::build(None, &options);
        assert!(catalog.modes()[0].kind.contains(ModeTypeBit::UserPreferred));
    }

    #[test]
    fn test_duplicates_merge_not_repeat() {
        let m = dmt::find(1024, 768, 60, false).unwrap();
        let options = CatalogOptions {
            driver_modes: vec![m.clone(), m],
            ..Default::default()
        };
        let catalog = ModeCatalog::build(None, &options);
        assert_eq!(catalog.modes().len(), 1);
    }

    #[test]
    fn test_degenerate_detailed_rejected() {
        let mut caps = caps_1080p();
        // Stereo-flag the only detailed timing; it must vanish, but the
        // standard-timing collision veto then no longer applies.
        if let Some(DetailedBlock::Timing(t)) = caps
            .detailed
            .iter_mut()
            .find(|b| matches!(b, DetailedBlock::Timing(_)))
        {
            t.stereo = true;
        }
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        assert!(!catalog
            .modes()
            .iter()
            .any(|m| (m.hdisplay, m.vdisplay) == (1920, 1080) && m.clock == 148_500));
    }

    #[test]
    fn test_lookup_by_name() {
        let caps = caps_1080p();
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        let m = catalog.find("1920x1080").expect("named mode");
        assert_eq!(m.vdisplay, 1080);
    }

    #[test]
    fn test_standard_timing_falls_back_to_gtf() {
        // A monitor with a nonstandard size and no CVT declaration gets
        // a GTF-generated timing.
        let mut caps = caps_1080p();
        caps.detailed.clear();
        caps.standard = vec![StandardTiming {
            width: 1440,
            height: 1080,
            refresh: 70,
        }];
        caps.size = PhysicalSize::Unknown;
        let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
        let m = catalog
            .modes()
            .iter()
            .find(|m| (m.hdisplay, m.vdisplay) == (1440, 1080))
            .expect("synthesized timing");
        assert!(m.flags.contains(ModeFlag::NegHSync));
    }
}
