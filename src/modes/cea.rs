//! CEA-861 short video descriptor timings.
//!
//! CEA extension blocks describe modes by a one-byte video identification
//! code (VIC). Codes 1-64 map 1:1 into this fixed table.
//!
//! CEA encodes interlaced timings with per-field line counts. The catalog
//! calls [`correct_interlace`] on every interlaced CEA mode so that the
//! 1080i/480i/576i family is reported at full frame height with an odd
//! vertical total, matching what the hardware actually scans out.

use tracing::trace;

use super::{Mode, ModeFlag, ModeFlags, ModeTypeBit};

struct CeaEntry {
    clock: u32,
    h: [u32; 4],
    v: [u32; 4],
    interlace: bool,
    pos_sync: bool,
}

impl CeaEntry {
    const fn new(clock: u32, h: [u32; 4], v: [u32; 4], interlace: bool, pos_sync: bool) -> Self {
        Self {
            clock,
            h,
            v,
            interlace,
            pos_sync,
        }
    }
}

/// VICs 1-64 of CEA-861. Index 0 is VIC 1.
#[rustfmt::skip]
static CEA_MODES: &[CeaEntry] = &[
    /* 1: 640x480@60 */      CeaEntry::new(25_175, [640, 656, 752, 800], [480, 490, 492, 525], false, false),
    /* 2: 720x480@60 */      CeaEntry::new(27_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 3: 720x480@60 */      CeaEntry::new(27_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 4: 1280x720@60 */     CeaEntry::new(74_250, [1280, 1390, 1430, 1650], [720, 725, 730, 750], false, true),
    /* 5: 1920x1080i@60 */   CeaEntry::new(74_250, [1920, 2008, 2052, 2200], [540, 542, 547, 562], true, true),
    /* 6: 1440x480i@60 */    CeaEntry::new(27_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 7: 1440x480i@60 */    CeaEntry::new(27_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 8: 1440x240@60 */     CeaEntry::new(27_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], false, false),
    /* 9: 1440x240@60 */     CeaEntry::new(27_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], false, false),
    /* 10: 2880x480i@60 */   CeaEntry::new(54_000, [2880, 2956, 3204, 3432], [240, 244, 247, 262], true, false),
    /* 11: 2880x480i@60 */   CeaEntry::new(54_000, [2880, 2956, 3204, 3432], [240, 244, 247, 262], true, false),
    /* 12: 2880x240@60 */    CeaEntry::new(54_000, [2880, 2956, 3204, 3432], [240, 244, 247, 262], false, false),
    /* 13: 2880x240@60 */    CeaEntry::new(54_000, [2880, 2956, 3204, 3432], [240, 244, 247, 262], false, false),
    /* 14: 1440x480@60 */    CeaEntry::new(54_000, [1440, 1472, 1596, 1716], [480, 489, 495, 525], false, false),
    /* 15: 1440x480@60 */    CeaEntry::new(54_000, [1440, 1472, 1596, 1716], [480, 489, 495, 525], false, false),
    /* 16: 1920x1080@60 */   CeaEntry::new(148_500, [1920, 2008, 2052, 2200], [1080, 1084, 1089, 1125], false, true),
    /* 17: 720x576@50 */     CeaEntry::new(27_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 18: 720x576@50 */     CeaEntry::new(27_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 19: 1280x720@50 */    CeaEntry::new(74_250, [1280, 1720, 1760, 1980], [720, 725, 730, 750], false, true),
    /* 20: 1920x1080i@50 */  CeaEntry::new(74_250, [1920, 2448, 2492, 2640], [540, 542, 547, 562], true, true),
    /* 21: 1440x576i@50 */   CeaEntry::new(27_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 22: 1440x576i@50 */   CeaEntry::new(27_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 23: 1440x288@50 */    CeaEntry::new(27_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], false, false),
    /* 24: 1440x288@50 */    CeaEntry::new(27_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], false, false),
    /* 25: 2880x576i@50 */   CeaEntry::new(54_000, [2880, 2928, 3180, 3456], [288, 290, 293, 312], true, false),
    /* 26: 2880x576i@50 */   CeaEntry::new(54_000, [2880, 2928, 3180, 3456], [288, 290, 293, 312], true, false),
    /* 27: 2880x288@50 */    CeaEntry::new(54_000, [2880, 2928, 3180, 3456], [288, 290, 293, 312], false, false),
    /* 28: 2880x288@50 */    CeaEntry::new(54_000, [2880, 2928, 3180, 3456], [288, 290, 293, 312], false, false),
    /* 29: 1440x576@50 */    CeaEntry::new(54_000, [1440, 1464, 1592, 1728], [576, 581, 586, 625], false, false),
    /* 30: 1440x576@50 */    CeaEntry::new(54_000, [1440, 1464, 1592, 1728], [576, 581, 586, 625], false, false),
    /* 31: 1920x1080@50 */   CeaEntry::new(148_500, [1920, 2448, 2492, 2640], [1080, 1084, 1089, 1125], false, true),
    /* 32: 1920x1080@24 */   CeaEntry::new(74_250, [1920, 2558, 2602, 2750], [1080, 1084, 1089, 1125], false, true),
    /* 33: 1920x1080@25 */   CeaEntry::new(74_250, [1920, 2448, 2492, 2640], [1080, 1084, 1089, 1125], false, true),
    /* 34: 1920x1080@30 */   CeaEntry::new(74_250, [1920, 2008, 2052, 2200], [1080, 1084, 1089, 1125], false, true),
    /* 35: 2880x480@60 */    CeaEntry::new(108_000, [2880, 2944, 3192, 3432], [480, 489, 495, 525], false, false),
    /* 36: 2880x480@60 */    CeaEntry::new(108_000, [2880, 2944, 3192, 3432], [480, 489, 495, 525], false, false),
    /* 37: 2880x576@50 */    CeaEntry::new(108_000, [2880, 2928, 3184, 3456], [576, 581, 586, 625], false, false),
    /* 38: 2880x576@50 */    CeaEntry::new(108_000, [2880, 2928, 3184, 3456], [576, 581, 586, 625], false, false),
    /* 39: 1920x1080i@50 (1250 lines) */
                             CeaEntry::new(72_000, [1920, 1952, 2120, 2304], [540, 553, 566, 625], true, true),
    /* 40: 1920x1080i@100 */ CeaEntry::new(148_500, [1920, 2448, 2492, 2640], [540, 542, 547, 562], true, true),
    /* 41: 1280x720@100 */   CeaEntry::new(148_500, [1280, 1720, 1760, 1980], [720, 725, 730, 750], false, true),
    /* 42: 720x576@100 */    CeaEntry::new(54_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 43: 720x576@100 */    CeaEntry::new(54_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 44: 1440x576i@100 */  CeaEntry::new(54_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 45: 1440x576i@100 */  CeaEntry::new(54_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 46: 1920x1080i@120 */ CeaEntry::new(148_500, [1920, 2008, 2052, 2200], [540, 542, 547, 562], true, true),
    /* 47: 1280x720@120 */   CeaEntry::new(148_500, [1280, 1390, 1430, 1650], [720, 725, 730, 750], false, true),
    /* 48: 720x480@120 */    CeaEntry::new(54_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 49: 720x480@120 */    CeaEntry::new(54_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 50: 1440x480i@120 */  CeaEntry::new(54_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 51: 1440x480i@120 */  CeaEntry::new(54_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 52: 720x576@200 */    CeaEntry::new(108_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 53: 720x576@200 */    CeaEntry::new(108_000, [720, 732, 796, 864], [576, 581, 586, 625], false, false),
    /* 54: 1440x576i@200 */  CeaEntry::new(108_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 55: 1440x576i@200 */  CeaEntry::new(108_000, [1440, 1464, 1590, 1728], [288, 290, 293, 312], true, false),
    /* 56: 720x480@240 */    CeaEntry::new(108_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 57: 720x480@240 */    CeaEntry::new(108_000, [720, 736, 798, 858], [480, 489, 495, 525], false, false),
    /* 58: 1440x480i@240 */  CeaEntry::new(108_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 59: 1440x480i@240 */  CeaEntry::new(108_000, [1440, 1478, 1602, 1716], [240, 244, 247, 262], true, false),
    /* 60: 1280x720@24 */    CeaEntry::new(59_400, [1280, 3040, 3080, 3300], [720, 725, 730, 750], false, true),
    /* 61: 1280x720@25 */    CeaEntry::new(74_250, [1280, 3700, 3740, 3960], [720, 725, 730, 750], false, true),
    /* 62: 1280x720@30 */    CeaEntry::new(74_250, [1280, 3040, 3080, 3300], [720, 725, 730, 750], false, true),
    /* 63: 1920x1080@120 */  CeaEntry::new(297_000, [1920, 2008, 2052, 2200], [1080, 1084, 1089, 1125], false, true),
    /* 64: 1920x1080@100 */  CeaEntry::new(297_000, [1920, 2448, 2492, 2640], [1080, 1084, 1089, 1125], false, true),
];

/// Per-field heights that expand to a known interlaced frame size.
const HALF_HEIGHT_FAMILIES: [u32; 3] = [540, 240, 288];

/// Resolve a CEA short video descriptor code into a mode.
///
/// Returns `None` for codes outside 1-64. Interlaced entries come back
/// already corrected to full frame height.
pub fn mode_for_vic(vic: u8) -> Option<Mode> {
    if vic == 0 || vic as usize > CEA_MODES.len() {
        trace!(vic, "unknown CEA VIC");
        return None;
    }
    let entry = &CEA_MODES[vic as usize - 1];

    let mut flags = ModeFlags::empty();
    if entry.pos_sync {
        flags |= ModeFlag::PosHSync | ModeFlag::PosVSync;
    } else {
        flags |= ModeFlag::NegHSync | ModeFlag::NegVSync;
    }
    if entry.interlace {
        flags |= ModeFlag::Interlace;
    }

    let mut mode = Mode::new(
        entry.clock,
        entry.h[0],
        entry.h[1],
        entry.h[2],
        entry.h[3],
        entry.v[0],
        entry.v[1],
        entry.v[2],
        entry.v[3],
        flags,
    );
    mode.kind = ModeTypeBit::Builtin.into();
    if entry.interlace {
        correct_interlace(&mut mode);
    }
    mode.ensure_name();
    Some(mode)
}

/// Expand an interlaced CEA timing from field counts to frame counts.
///
/// Applies only when the encoded height is exactly half of a known
/// interlaced frame size (1080i, 480i, 576i family): vertical fields are
/// doubled and the total is forced odd.
pub fn correct_interlace(mode: &mut Mode) {
    if !mode.flags.contains(ModeFlag::Interlace) {
        return;
    }
    if !HALF_HEIGHT_FAMILIES.contains(&mode.vdisplay) {
        return;
    }
    mode.vdisplay *= 2;
    mode.vsync_start *= 2;
    mode.vsync_end *= 2;
    mode.vtotal *= 2;
    mode.vtotal |= 1;
}
