//! Mode Validation Pipeline
//!
//! Runs every candidate mode through a layered sequence of independent
//! predicates and stamps each with a [`ModeStatus`]. Rejections are
//! always local to one mode; the batch never aborts. The order is
//! fixed: geometry sanity, monitor sync ranges, pixel clock, reduced
//! blanking policy, framebuffer feasibility, pitch and panel bounds,
//! then the driver callback.
//!
//! ```text
//!  candidates ──> geometry ──> sync ──> clock ──> rb ──> memory ──> driver
//!                    │           │        │        │        │          │
//!                    └───────────┴────────┴────────┴────────┴──────────┴──> ModeStatus
//! ```

use tracing::{debug, trace};

use crate::backend::ModeSetBackend;
use crate::edid::{default_sync_ranges, MonitorCaps, SyncRange};
use crate::modes::{Mode, ModeFlag, ModeStatus};

pub mod clock;
pub mod geometry;

pub use clock::{nearest_clock, realized_clock, ClockRange, NearestClock};
pub use geometry::{
    negotiate_virtual_size, scanline_pitch, GeometryError, PitchParams, VirtualBounds, VirtualSize,
};

/// Sync-range membership tolerance: 5 percent.
const SYNC_TOLERANCE: f64 = 0.05;

/// Everything the validator needs to judge one output's modes.
#[derive(Debug, Clone)]
pub struct Constraints {
    /// Acceptable horizontal sync ranges, kHz
    pub hsync: Vec<SyncRange>,
    /// Acceptable vertical refresh ranges, Hz
    pub vrefresh: Vec<SyncRange>,
    /// Monitor/link bandwidth ceiling, kHz
    pub max_clock_khz: u32,
    /// Reduced-blanking modes acceptable
    pub allow_reduced_blanking: bool,
    /// Fixed-panel dimensions, modes larger than this are rejected
    pub panel_size: Option<(u32, u32)>,
    /// Video memory available, bytes
    pub memory_bytes: Option<u64>,
    /// Bits per pixel used for memory accounting
    pub bpp: u32,
    /// Maximum scanline pitch in pixels
    pub max_pitch: Option<u32>,
    /// Maximum virtual framebuffer size
    pub max_virtual: Option<(u32, u32)>,
}

impl Default for Constraints {
    fn default() -> Self {
        let (hsync, vrefresh) = default_sync_ranges();
        Constraints {
            hsync: vec![hsync],
            vrefresh: vec![vrefresh],
            max_clock_khz: crate::edid::DEFAULT_MAX_CLOCK_KHZ,
            allow_reduced_blanking: false,
            panel_size: None,
            memory_bytes: None,
            bpp: 32,
            max_pitch: None,
            max_virtual: None,
        }
    }
}

impl Constraints {
    /// Constraints derived from decoded monitor capabilities.
    ///
    /// Monitors without range descriptors fall back to the built-in
    /// default ranges.
    pub fn from_caps(caps: &MonitorCaps) -> Self {
        let mut c = Constraints::default();
        if !caps.hsync_ranges.is_empty() {
            c.hsync = caps.hsync_ranges.clone();
        }
        if !caps.vrefresh_ranges.is_empty() {
            c.vrefresh = caps.vrefresh_ranges.clone();
        }
        c.max_clock_khz = caps
            .max_clock_khz
            .or_else(|| caps.max_tmds_khz())
            .unwrap_or(crate::edid::DEFAULT_MAX_CLOCK_KHZ);
        c.allow_reduced_blanking = caps.supports_reduced_blanking();
        c
    }
}

fn in_any_range(ranges: &[SyncRange], value: f64) -> bool {
    ranges.iter().any(|r| r.contains(value, SYNC_TOLERANCE))
}

/// Heuristic reduced-blanking detection.
///
/// CVT-RB and its descendants share a short fixed horizontal blank with
/// positive hsync and negative vsync; nothing else in common use does.
fn looks_reduced_blanking(mode: &Mode) -> bool {
    let hblank = mode.htotal.saturating_sub(mode.hdisplay);
    hblank <= 160
        && mode.flags.contains(ModeFlag::PosHSync)
        && mode.flags.contains(ModeFlag::NegVSync)
}

/// Validate one mode, returning its (and setting its) status.
///
/// `ranges` describes the driver's acceptable pixel clocks; for
/// discrete-clock hardware the backend's clock table is consulted via
/// the solver. The first structurally matching range's `private` value
/// is copied onto the mode.
pub fn validate_mode(
    mode: &mut Mode,
    constraints: &Constraints,
    ranges: &[ClockRange],
    backend: &dyn ModeSetBackend,
) -> ModeStatus {
    let status = run_pipeline(mode, constraints, ranges, backend);
    mode.status = status;
    if !status.is_ok() {
        debug!(mode = %mode.display_name(), status = status.as_str(), "mode rejected");
    }
    status
}

fn run_pipeline(
    mode: &mut Mode,
    constraints: &Constraints,
    ranges: &[ClockRange],
    backend: &dyn ModeSetBackend,
) -> ModeStatus {
    // Geometry sanity.
    if !(mode.hdisplay > 0
        && mode.hdisplay <= mode.hsync_start
        && mode.hsync_start < mode.hsync_end
        && mode.hsync_end < mode.htotal)
    {
        return ModeStatus::BadHTimings;
    }
    if !(mode.vdisplay > 0
        && mode.vdisplay <= mode.vsync_start
        && mode.vsync_start < mode.vsync_end
        && mode.vsync_end < mode.vtotal)
    {
        return ModeStatus::BadVTimings;
    }

    // Monitor sync ranges, with tolerance.
    if !in_any_range(&constraints.hsync, mode.hsync_khz()) {
        return ModeStatus::HSyncOutOfRange;
    }
    if !in_any_range(&constraints.vrefresh, mode.vrefresh_hz()) {
        return ModeStatus::VRefreshOutOfRange;
    }

    // Pixel clock: bandwidth ceiling first, then range or table match.
    if mode.clock > constraints.max_clock_khz {
        return ModeStatus::BandwidthExceeded;
    }
    match check_clock(mode, ranges, backend) {
        ModeStatus::Ok => {}
        status => return status,
    }

    // Reduced-blanking policy.
    if !constraints.allow_reduced_blanking && looks_reduced_blanking(mode) {
        return ModeStatus::ReducedBlankingUnsupported;
    }

    // Framebuffer feasibility.
    if let Some(memory) = constraints.memory_bytes {
        let bytes =
            mode.hdisplay as u64 * mode.vdisplay as u64 * constraints.bpp.max(1) as u64 / 8;
        if bytes > memory {
            return ModeStatus::InsufficientMemory;
        }
    }

    // Pitch, virtual, and panel bounds.
    if let Some(max_pitch) = constraints.max_pitch {
        if mode.hdisplay > max_pitch {
            return ModeStatus::WidthTooLarge;
        }
    }
    if let Some((vw, vh)) = constraints.max_virtual {
        if mode.hdisplay > vw || mode.vdisplay > vh {
            return ModeStatus::VirtualSizeExceeded;
        }
    }
    if let Some((pw, ph)) = constraints.panel_size {
        if mode.hdisplay > pw || mode.vdisplay > ph {
            return ModeStatus::PanelSizeExceeded;
        }
    }

    // Driver callback last.
    backend.try_mode(mode)
}

/// Clock feasibility: match a range (programmable) or solve against the
/// discrete table.
fn check_clock(mode: &mut Mode, ranges: &[ClockRange], backend: &dyn ModeSetBackend) -> ModeStatus {
    // No declared ranges means the hardware takes any clock.
    let unrestricted = [ClockRange::default()];
    let ranges = if ranges.is_empty() {
        &unrestricted[..]
    } else {
        ranges
    };
    let interlaced = mode.flags.contains(ModeFlag::Interlace);
    let doublescan = mode.flags.contains(ModeFlag::DoubleScan);

    // First structural match wins; remember why near-misses failed so
    // the rejection code is specific.
    let mut clock_seen = false;
    let mut flag_reject = ModeStatus::ClockOutOfRange;
    let matched = ranges.iter().find(|r| {
        if !r.contains_clock(mode.clock) {
            return false;
        }
        clock_seen = true;
        if interlaced && !r.allow_interlace {
            flag_reject = ModeStatus::NoInterlace;
            return false;
        }
        if doublescan && !r.allow_doublescan {
            flag_reject = ModeStatus::NoDoubleScan;
            return false;
        }
        true
    });

    let Some(range) = matched else {
        return if clock_seen {
            flag_reject
        } else {
            ModeStatus::ClockOutOfRange
        };
    };
    mode.private = range.private;

    if backend.programmable_clock() {
        return ModeStatus::Ok;
    }

    let table = backend.clock_table();
    let Some(choice) = nearest_clock(table, mode.clock, range) else {
        return ModeStatus::NoClock;
    };
    let realized = realized_clock(table, range, choice);
    if !range.contains_clock(realized) {
        return ModeStatus::ClockOutOfRange;
    }
    trace!(
        mode = %mode.display_name(),
        requested = mode.clock,
        realized,
        "discrete clock selected"
    );
    mode.clock = realized;
    ModeStatus::Ok
}

/// Batch report: every rejected mode with its reason string.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    /// Modes that passed
    pub accepted: usize,
    /// `(mode name, reason)` per rejection
    pub rejected: Vec<(String, &'static str)>,
}

impl ValidationReport {
    /// Whether any mode survived.
    pub fn any_accepted(&self) -> bool {
        self.accepted > 0
    }
}

/// Validate a whole candidate list in place.
///
/// Statuses are stamped onto the modes; nothing is removed. The report
/// carries one diagnostic entry per rejection.
pub fn validate_all(
    modes: &mut [Mode],
    constraints: &Constraints,
    ranges: &[ClockRange],
    backend: &dyn ModeSetBackend,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for mode in modes.iter_mut() {
        match validate_mode(mode, constraints, ranges, backend) {
            ModeStatus::Ok => report.accepted += 1,
            status => report
                .rejected
                .push((mode.display_name(), status.as_str())),
        }
    }
    debug!(
        accepted = report.accepted,
        rejected = report.rejected.len(),
        "validation pass complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::MockBackend;
    use crate::modes::dmt;

    fn mode_1024() -> Mode {
        dmt::find(1024, 768, 60, false).expect("dmt entry").clone()
    }

    fn permissive() -> (Constraints, Vec<ClockRange>) {
        let constraints = Constraints {
            max_clock_khz: 400_000,
            hsync: vec![SyncRange { lo: 1.0, hi: 200.0 }],
            vrefresh: vec![SyncRange { lo: 1.0, hi: 200.0 }],
            ..Default::default()
        };
        (constraints, vec![ClockRange::spanning(10_000, 400_000)])
    }

    #[test]
    fn test_good_mode_passes() {
        let (constraints, ranges) = permissive();
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::Ok
        );
        assert!(mode.status.is_ok());
    }

    #[test]
    fn test_bad_geometry_rejected() {
        let (constraints, ranges) = permissive();
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        mode.hsync_end = mode.htotal + 1;
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::BadHTimings
        );
    }

    #[test]
    fn test_hsync_out_of_range() {
        let (mut constraints, ranges) = permissive();
        constraints.hsync = vec![SyncRange { lo: 30.0, hi: 40.0 }];
        let backend = MockBackend::default();
        // 1024x768@60 runs hsync at ~48.4 kHz.
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::HSyncOutOfRange
        );
    }

    #[test]
    fn test_sync_tolerance_admits_borderline() {
        let (mut constraints, ranges) = permissive();
        // 48.4 kHz against a 31.5-47 kHz range: within 5 percent of the
        // upper bound.
        constraints.hsync = vec![SyncRange { lo: 31.5, hi: 47.0 }];
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::Ok
        );
    }

    #[test]
    fn test_bandwidth_ceiling() {
        let (mut constraints, ranges) = permissive();
        constraints.max_clock_khz = 40_000;
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::BandwidthExceeded
        );
    }

    #[test]
    fn test_clock_range_private_flags_copied() {
        let (constraints, _) = permissive();
        let ranges = vec![
            ClockRange {
                min_clock: 10_000,
                max_clock: 50_000,
                private: 7,
                ..Default::default()
            },
            ClockRange {
                min_clock: 50_001,
                max_clock: 400_000,
                private: 9,
                ..Default::default()
            },
        ];
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::Ok
        );
        // 65 MHz lands in the second range.
        assert_eq!(mode.private, 9);
    }

    #[test]
    fn test_interlace_refused_by_range() {
        let (constraints, _) = permissive();
        let ranges = vec![ClockRange {
            min_clock: 10_000,
            max_clock: 400_000,
            allow_interlace: false,
            ..Default::default()
        }];
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        mode.flags |= ModeFlag::Interlace;
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::NoInterlace
        );
    }

    #[test]
    fn test_discrete_table_snaps_clock() {
        let (constraints, ranges) = permissive();
        let backend = MockBackend {
            clocks: vec![25_175, 40_000, 65_000, 108_000],
            ..Default::default()
        };
        let mut mode = mode_1024();
        mode.clock = 64_900;
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::Ok
        );
        assert_eq!(mode.clock, 65_000);
    }

    #[test]
    fn test_empty_table_is_no_clock() {
        let (constraints, ranges) = permissive();
        // programmable_clock() keys off an empty table in the mock, so
        // force the discrete path with a table that cannot match.
        struct Discrete;
        impl ModeSetBackend for Discrete {
            fn clock_table(&self) -> &[u32] {
                &[]
            }
            fn programmable_clock(&self) -> bool {
                false
            }
            fn commit(
                &mut self,
                _: &[crate::backend::CrtcCommit<'_>],
            ) -> Result<(), crate::backend::BackendError> {
                Ok(())
            }
        }
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &Discrete),
            ModeStatus::NoClock
        );
    }

    #[test]
    fn test_memory_footprint() {
        let (mut constraints, ranges) = permissive();
        constraints.memory_bytes = Some(1024 * 1024);
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::InsufficientMemory
        );
    }

    #[test]
    fn test_panel_bound() {
        let (mut constraints, ranges) = permissive();
        constraints.panel_size = Some((800, 600));
        let backend = MockBackend::default();
        let mut mode = mode_1024();
        assert_eq!(
            validate_mode(&mut mode, &constraints, &ranges, &backend),
            ModeStatus::PanelSizeExceeded
        );
    }

    #[test]
    fn test_driver_veto_is_last() {
        let (constraints, ranges) = permissive();
        let backend = MockBackend {
            reject_interlace: true,
            ..Default::default()
        };
        let ranges_interlace_ok = ranges;
        let mut mode = dmt::find(1920, 1080, 60, false)
            .map(|m| m.clone())
            .unwrap_or_else(mode_1024);
        mode.flags |= ModeFlag::Interlace;
        let status = validate_mode(&mut mode, &constraints, &ranges_interlace_ok, &backend);
        assert_eq!(status, ModeStatus::RejectedByDriver);
    }

    #[test]
    fn test_batch_reports_rejections() {
        let (constraints, ranges) = permissive();
        let backend = MockBackend::default();
        let mut modes = vec![mode_1024(), mode_1024()];
        modes[1].hsync_start = 0;
        let report = validate_all(&mut modes, &constraints, &ranges, &backend);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].1, "bad horizontal timings");
    }
}
