//! VESA Generalized Timing Formula (GTF) synthesis.
//!
//! The pre-CVT timing formula, used for standard-timing codes that miss the
//! DMT table on monitors that do not declare CVT support. Uses the default
//! parameter set (M=600, C=40, K=128, J=20).

use super::{Mode, ModeFlag, ModeTypeBit};

const CELL_GRAN: f64 = 8.0;
const MIN_PORCH: f64 = 1.0;
const V_SYNC_RQD: f64 = 3.0;
const H_SYNC_PERCENT: f64 = 8.0;
const MIN_VSYNC_PLUS_BP_US: f64 = 550.0;

// C' and M' derived from the default M/C/K/J parameters.
const C_PRIME: f64 = 30.0;
const M_PRIME: f64 = 300.0;

/// Synthesize a GTF mode for (width, height, refresh).
pub fn mode(width: u32, height: u32, refresh: u32) -> Mode {
    let h_pixels_rnd = (width as f64 / CELL_GRAN).round() * CELL_GRAN;
    let v_lines = height as f64;
    let v_field_rqd = refresh as f64;

    // First-pass horizontal period estimate (microseconds).
    let h_period_est =
        ((1.0 / v_field_rqd) * 1_000_000.0 - MIN_VSYNC_PLUS_BP_US) / (v_lines + MIN_PORCH);

    let vsync_plus_bp = (MIN_VSYNC_PLUS_BP_US / h_period_est).round();
    let total_v_lines = v_lines + vsync_plus_bp + MIN_PORCH;

    // Refine the period against the achieved field rate.
    let v_field_est = (1.0 / h_period_est / total_v_lines) * 1_000_000.0;
    let h_period = h_period_est * v_field_est / v_field_rqd;

    let ideal_duty_cycle = C_PRIME - (M_PRIME * h_period / 1000.0);
    let h_blank = (h_pixels_rnd * ideal_duty_cycle / (100.0 - ideal_duty_cycle)
        / (2.0 * CELL_GRAN))
        .round()
        * 2.0
        * CELL_GRAN;

    let total_pixels = h_pixels_rnd + h_blank;
    let pixel_freq_mhz = total_pixels / h_period;

    let h_sync = (H_SYNC_PERCENT / 100.0 * total_pixels / CELL_GRAN).round() * CELL_GRAN;
    let h_front_porch = h_blank / 2.0 - h_sync;

    let mut m = Mode::new(
        (pixel_freq_mhz * 1000.0).round() as u32,
        h_pixels_rnd as u32,
        (h_pixels_rnd + h_front_porch) as u32,
        (h_pixels_rnd + h_front_porch + h_sync) as u32,
        total_pixels as u32,
        height,
        (v_lines + MIN_PORCH) as u32,
        (v_lines + MIN_PORCH + V_SYNC_RQD) as u32,
        total_v_lines as u32,
        ModeFlag::NegHSync | ModeFlag::PosVSync,
    );
    m.kind = ModeTypeBit::Builtin.into();
    m.ensure_name();
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gtf_refresh_is_close() {
        for &(w, h, r) in &[(640u32, 480u32, 60u32), (1024, 768, 75), (1280, 1024, 85)] {
            let m = mode(w, h, r);
            let refresh = m.vrefresh_hz();
            assert!(
                (refresh - r as f64).abs() < 0.5,
                "{w}x{h}@{r} synthesized {refresh}"
            );
        }
    }

    #[test]
    fn test_gtf_640x480_60_matches_published() {
        // The canonical GTF worked example: 640x480@60 comes out at
        // 23.86 MHz with an 800-pixel horizontal total.
        let m = mode(640, 480, 60);
        assert_eq!(m.htotal, 800);
        assert!((m.clock as i64 - 23_856).abs() <= 50, "clock {}", m.clock);
    }

    #[test]
    fn test_gtf_polarity() {
        let m = mode(800, 600, 60);
        assert!(m.flags.contains(ModeFlag::NegHSync));
        assert!(m.flags.contains(ModeFlag::PosVSync));
    }

    #[test]
    fn test_gtf_timings_monotonic() {
        let m = mode(1152, 864, 70);
        assert!(m.hdisplay <= m.hsync_start);
        assert!(m.hsync_start < m.hsync_end);
        assert!(m.hsync_end < m.htotal);
        assert!(m.vdisplay < m.vsync_start);
        assert!(m.vsync_start < m.vsync_end);
        assert!(m.vsync_end < m.vtotal);
    }
}
