//! VESA Coordinated Video Timings (CVT) synthesis.
//!
//! Generates a full timing from (width, height, refresh) per the CVT 1.1
//! standard, including the reduced-blanking variant for digital displays.
//! Used for standard-timing codes that miss the DMT table when the monitor
//! declares CVT support.

use super::{Mode, ModeFlag, ModeTypeBit};

const CELL_GRAN: f64 = 8.0;
const CLOCK_STEP_KHZ: f64 = 250.0;

// CVT-computed blanking ("C prime" / "M prime" with the default
// C=40, J=20, K=128, M=600 parameter set).
const C_PRIME: f64 = 30.0;
const M_PRIME: f64 = 300.0;

const MIN_VSYNC_BP_US: f64 = 550.0;
const MIN_V_PORCH: u32 = 3;

const RB_MIN_VBLANK_US: f64 = 460.0;
const RB_H_SYNC: u32 = 32;
const RB_H_BLANK: u32 = 160;
const RB_V_FPORCH: u32 = 3;
const RB_MIN_V_BPORCH: u32 = 6;

/// Vertical sync width in lines, chosen by aspect ratio per the standard.
fn vsync_width(hdisplay: u32, vdisplay: u32) -> u32 {
    if vdisplay * 4 / 3 == hdisplay {
        4
    } else if vdisplay * 16 / 9 == hdisplay {
        5
    } else if vdisplay * 16 / 10 == hdisplay {
        6
    } else if vdisplay * 5 / 4 == hdisplay || vdisplay * 15 / 9 == hdisplay {
        7
    } else {
        // Custom aspect
        10
    }
}

/// Synthesize a CVT mode.
///
/// `reduced` selects the reduced-blanking variant; callers gate it on the
/// monitor's reduced-blanking capability.
pub fn mode(width: u32, height: u32, refresh: u32, reduced: bool) -> Mode {
    if reduced {
        reduced_blanking_mode(width, height, refresh)
    } else {
        full_blanking_mode(width, height, refresh)
    }
}

fn full_blanking_mode(width: u32, height: u32, refresh: u32) -> Mode {
    let hdisplay = (width as f64 / CELL_GRAN).floor() * CELL_GRAN;
    let vdisplay = height as f64;
    let vsync = vsync_width(hdisplay as u32, height) as f64;
    let vrefresh = refresh as f64;

    // Estimated horizontal period in microseconds.
    let h_period_est =
        ((1_000_000.0 / vrefresh) - MIN_VSYNC_BP_US) / (vdisplay + MIN_V_PORCH as f64);

    // Vertical sync + back porch in lines.
    let mut vsync_bp = (MIN_VSYNC_BP_US / h_period_est).floor() + 1.0;
    if vsync_bp < vsync + MIN_V_PORCH as f64 {
        vsync_bp = vsync + MIN_V_PORCH as f64;
    }

    let vtotal = vdisplay + vsync_bp + MIN_V_PORCH as f64;

    // Ideal blanking duty cycle, clamped to 20%.
    let ideal_duty = C_PRIME - (M_PRIME * h_period_est / 1000.0);
    let hblank = if ideal_duty < 20.0 {
        (hdisplay * 20.0 / 80.0 / (2.0 * CELL_GRAN)).floor() * 2.0 * CELL_GRAN
    } else {
        (hdisplay * ideal_duty / (100.0 - ideal_duty) / (2.0 * CELL_GRAN)).floor()
            * 2.0
            * CELL_GRAN
    };

    let htotal = hdisplay + hblank;
    let clock_khz =
        ((htotal / h_period_est * 1000.0) / CLOCK_STEP_KHZ).floor() * CLOCK_STEP_KHZ;

    let hsync = (0.08 * htotal / CELL_GRAN).floor() * CELL_GRAN;
    let hsync_end = hdisplay + hblank / 2.0;
    let hsync_start = hsync_end - hsync;

    let mut m = Mode::new(
        clock_khz as u32,
        hdisplay as u32,
        hsync_start as u32,
        hsync_end as u32,
        htotal as u32,
        height,
        height + MIN_V_PORCH,
        height + MIN_V_PORCH + vsync as u32,
        vtotal as u32,
        ModeFlag::NegHSync | ModeFlag::PosVSync,
    );
    m.kind = ModeTypeBit::Builtin.into();
    m.ensure_name();
    m
}

fn reduced_blanking_mode(width: u32, height: u32, refresh: u32) -> Mode {
    let hdisplay = ((width as f64 / CELL_GRAN).floor() * CELL_GRAN) as u32;
    let vsync = vsync_width(hdisplay, height);
    let vrefresh = refresh as f64;

    let h_period_est = ((1_000_000.0 / vrefresh) - RB_MIN_VBLANK_US) / height as f64;

    let mut vbi_lines = (RB_MIN_VBLANK_US / h_period_est).floor() as u32 + 1;
    let min_vbi = RB_V_FPORCH + vsync + RB_MIN_V_BPORCH;
    if vbi_lines < min_vbi {
        vbi_lines = min_vbi;
    }

    let vtotal = height + vbi_lines;
    let htotal = hdisplay + RB_H_BLANK;

    let clock_khz = ((htotal as f64 * vtotal as f64 * vrefresh / 1000.0) / CLOCK_STEP_KHZ)
        .floor()
        * CLOCK_STEP_KHZ;

    let hsync_end = hdisplay + RB_H_BLANK / 2;
    let hsync_start = hsync_end - RB_H_SYNC;

    let mut m = Mode::new(
        clock_khz as u32,
        hdisplay,
        hsync_start,
        hsync_end,
        htotal,
        height,
        height + RB_V_FPORCH,
        height + RB_V_FPORCH + vsync,
        vtotal,
        ModeFlag::PosHSync | ModeFlag::NegVSync,
    );
    m.kind = ModeTypeBit::Builtin.into();
    m.ensure_name();
    m
}
