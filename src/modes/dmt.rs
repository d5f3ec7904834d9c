//! VESA DMT (Display Monitor Timing) lookup table.
//!
//! Standard-timing descriptors are resolved against this table before any
//! CVT/GTF synthesis is attempted, so monitors that advertise a DMT size
//! get the exact published timing rather than a computed approximation.
//!
//! Entries are keyed by (width, height, refresh, reduced-blanking). The
//! table also carries the handful of non-DMT industry timings reachable
//! from the EDID established-timing bitmap (IBM 720x400, Apple 640x480@67,
//! 832x624 and 1152x870).

use super::{Mode, ModeFlag, ModeFlags, ModeTypeBit};

/// One fixed timing table entry.
struct DmtEntry {
    clock: u32,
    h: [u32; 4], // display, sync start, sync end, total
    v: [u32; 4],
    refresh: u32,
    reduced: bool,
    interlace: bool,
    pos_hsync: bool,
    pos_vsync: bool,
}

impl DmtEntry {
    const fn new(
        clock: u32,
        h: [u32; 4],
        v: [u32; 4],
        refresh: u32,
        reduced: bool,
        interlace: bool,
        pos_hsync: bool,
        pos_vsync: bool,
    ) -> Self {
        Self {
            clock,
            h,
            v,
            refresh,
            reduced,
            interlace,
            pos_hsync,
            pos_vsync,
        }
    }

    fn flags(&self) -> ModeFlags {
        let mut flags = ModeFlags::empty();
        flags |= if self.pos_hsync {
            ModeFlag::PosHSync
        } else {
            ModeFlag::NegHSync
        };
        flags |= if self.pos_vsync {
            ModeFlag::PosVSync
        } else {
            ModeFlag::NegVSync
        };
        if self.interlace {
            flags |= ModeFlag::Interlace;
        }
        flags
    }

    fn to_mode(&self) -> Mode {
        let mut mode = Mode::new(
            self.clock,
            self.h[0],
            self.h[1],
            self.h[2],
            self.h[3],
            self.v[0],
            self.v[1],
            self.v[2],
            self.v[3],
            self.flags(),
        );
        mode.kind = ModeTypeBit::Builtin.into();
        mode.ensure_name();
        mode
    }
}

/// VESA DMT timings plus the established-timing extras.
#[rustfmt::skip]
static DMT: &[DmtEntry] = &[
    // 640x350
    DmtEntry::new(31_500, [640, 672, 736, 832], [350, 382, 385, 445], 85, false, false, true, false),
    // 640x400
    DmtEntry::new(31_500, [640, 672, 736, 832], [400, 401, 404, 445], 85, false, false, false, true),
    // 720x400 (IBM VGA text modes, established timings)
    DmtEntry::new(28_320, [720, 738, 846, 900], [400, 412, 414, 449], 70, false, false, false, true),
    DmtEntry::new(35_500, [720, 738, 846, 900], [400, 421, 423, 449], 88, false, false, false, true),
    DmtEntry::new(35_500, [720, 756, 828, 936], [400, 401, 404, 446], 85, false, false, false, true),
    // 640x480
    DmtEntry::new(25_175, [640, 656, 752, 800], [480, 490, 492, 525], 60, false, false, false, false),
    DmtEntry::new(30_240, [640, 704, 768, 864], [480, 483, 486, 525], 67, false, false, false, false),
    DmtEntry::new(31_500, [640, 664, 704, 832], [480, 489, 492, 520], 72, false, false, false, false),
    DmtEntry::new(31_500, [640, 656, 720, 840], [480, 481, 484, 500], 75, false, false, false, false),
    DmtEntry::new(36_000, [640, 696, 752, 832], [480, 481, 484, 509], 85, false, false, false, false),
    // 800x600
    DmtEntry::new(36_000, [800, 824, 896, 1024], [600, 601, 603, 625], 56, false, false, true, true),
    DmtEntry::new(40_000, [800, 840, 968, 1056], [600, 601, 605, 628], 60, false, false, true, true),
    DmtEntry::new(50_000, [800, 856, 976, 1040], [600, 637, 643, 666], 72, false, false, true, true),
    DmtEntry::new(49_500, [800, 816, 896, 1056], [600, 601, 604, 625], 75, false, false, true, true),
    DmtEntry::new(56_250, [800, 832, 896, 1048], [600, 601, 604, 631], 85, false, false, true, true),
    DmtEntry::new(73_250, [800, 848, 880, 960], [600, 603, 607, 636], 120, true, false, true, false),
    // 832x624 (Apple, established timings)
    DmtEntry::new(57_284, [832, 864, 928, 1152], [624, 625, 628, 667], 75, false, false, false, false),
    // 848x480
    DmtEntry::new(33_750, [848, 864, 976, 1088], [480, 486, 494, 517], 60, false, false, true, true),
    // 1024x768
    DmtEntry::new(44_900, [1024, 1032, 1208, 1264], [768, 768, 772, 817], 43, false, true, true, true),
    DmtEntry::new(65_000, [1024, 1048, 1184, 1344], [768, 771, 777, 806], 60, false, false, false, false),
    DmtEntry::new(75_000, [1024, 1048, 1184, 1328], [768, 771, 777, 806], 70, false, false, false, false),
    DmtEntry::new(78_750, [1024, 1040, 1136, 1312], [768, 769, 772, 800], 75, false, false, true, true),
    DmtEntry::new(94_500, [1024, 1072, 1168, 1376], [768, 769, 772, 808], 85, false, false, true, true),
    DmtEntry::new(115_500, [1024, 1072, 1104, 1184], [768, 771, 775, 813], 120, true, false, true, false),
    // 1152x864 / 1152x870 (Apple)
    DmtEntry::new(108_000, [1152, 1216, 1344, 1600], [864, 865, 868, 900], 75, false, false, true, true),
    DmtEntry::new(108_000, [1152, 1216, 1328, 1456], [870, 871, 874, 915], 75, false, false, true, true),
    // 1280x768
    DmtEntry::new(68_250, [1280, 1328, 1360, 1440], [768, 771, 778, 790], 60, true, false, true, false),
    DmtEntry::new(79_500, [1280, 1344, 1472, 1664], [768, 771, 778, 798], 60, false, false, false, true),
    DmtEntry::new(102_250, [1280, 1360, 1488, 1696], [768, 771, 778, 805], 75, false, false, false, true),
    DmtEntry::new(117_500, [1280, 1360, 1496, 1712], [768, 771, 778, 809], 85, false, false, false, true),
    // 1280x800
    DmtEntry::new(71_000, [1280, 1328, 1360, 1440], [800, 803, 809, 823], 60, true, false, true, false),
    DmtEntry::new(83_500, [1280, 1352, 1480, 1680], [800, 803, 809, 831], 60, false, false, false, true),
    DmtEntry::new(106_500, [1280, 1360, 1488, 1696], [800, 803, 809, 838], 75, false, false, false, true),
    DmtEntry::new(122_500, [1280, 1360, 1496, 1712], [800, 803, 809, 843], 85, false, false, false, true),
    // 1280x960
    DmtEntry::new(108_000, [1280, 1376, 1488, 1800], [960, 961, 964, 1000], 60, false, false, true, true),
    DmtEntry::new(148_500, [1280, 1344, 1504, 1728], [960, 961, 964, 1011], 85, false, false, true, true),
    // 1280x1024
    DmtEntry::new(108_000, [1280, 1328, 1440, 1688], [1024, 1025, 1028, 1066], 60, false, false, true, true),
    DmtEntry::new(135_000, [1280, 1296, 1440, 1688], [1024, 1025, 1028, 1066], 75, false, false, true, true),
    DmtEntry::new(157_500, [1280, 1344, 1504, 1728], [1024, 1025, 1028, 1072], 85, false, false, true, true),
    // 1360x768
    DmtEntry::new(85_500, [1360, 1424, 1536, 1792], [768, 771, 777, 795], 60, false, false, true, true),
    // 1400x1050
    DmtEntry::new(101_000, [1400, 1448, 1480, 1560], [1050, 1053, 1057, 1080], 60, true, false, true, false),
    DmtEntry::new(121_750, [1400, 1488, 1632, 1864], [1050, 1053, 1057, 1089], 60, false, false, false, true),
    DmtEntry::new(156_000, [1400, 1504, 1648, 1896], [1050, 1053, 1057, 1099], 75, false, false, false, true),
    // 1440x900
    DmtEntry::new(88_750, [1440, 1488, 1520, 1600], [900, 903, 909, 926], 60, true, false, true, false),
    DmtEntry::new(106_500, [1440, 1520, 1672, 1904], [900, 903, 909, 934], 60, false, false, false, true),
    DmtEntry::new(136_750, [1440, 1536, 1688, 1936], [900, 903, 909, 942], 75, false, false, false, true),
    DmtEntry::new(157_000, [1440, 1544, 1696, 1952], [900, 903, 909, 948], 85, false, false, false, true),
    // 1600x1200
    DmtEntry::new(162_000, [1600, 1664, 1856, 2160], [1200, 1201, 1204, 1250], 60, false, false, true, true),
    DmtEntry::new(175_500, [1600, 1664, 1856, 2160], [1200, 1201, 1204, 1250], 65, false, false, true, true),
    DmtEntry::new(189_000, [1600, 1664, 1856, 2160], [1200, 1201, 1204, 1250], 70, false, false, true, true),
    DmtEntry::new(202_500, [1600, 1664, 1856, 2160], [1200, 1201, 1204, 1250], 75, false, false, true, true),
    DmtEntry::new(229_500, [1600, 1664, 1856, 2160], [1200, 1201, 1204, 1250], 85, false, false, true, true),
    // 1680x1050
    DmtEntry::new(119_000, [1680, 1728, 1760, 1840], [1050, 1053, 1059, 1080], 60, true, false, true, false),
    DmtEntry::new(146_250, [1680, 1784, 1960, 2240], [1050, 1053, 1059, 1089], 60, false, false, false, true),
    DmtEntry::new(187_000, [1680, 1800, 1976, 2272], [1050, 1053, 1059, 1099], 75, false, false, false, true),
    // 1792x1344
    DmtEntry::new(204_750, [1792, 1920, 2120, 2448], [1344, 1345, 1348, 1394], 60, false, false, false, true),
    DmtEntry::new(261_000, [1792, 1888, 2104, 2456], [1344, 1345, 1348, 1417], 75, false, false, false, true),
    // 1856x1392
    DmtEntry::new(218_250, [1856, 1952, 2176, 2528], [1392, 1393, 1396, 1439], 60, false, false, false, true),
    DmtEntry::new(288_000, [1856, 1984, 2208, 2560], [1392, 1393, 1396, 1500], 75, false, false, false, true),
    // 1920x1080
    DmtEntry::new(148_500, [1920, 2008, 2052, 2200], [1080, 1084, 1089, 1125], 60, false, false, true, true),
    // 1920x1200
    DmtEntry::new(154_000, [1920, 1968, 2000, 2080], [1200, 1203, 1209, 1235], 60, true, false, true, false),
    DmtEntry::new(193_250, [1920, 2056, 2256, 2592], [1200, 1203, 1209, 1245], 60, false, false, false, true),
    DmtEntry::new(245_250, [1920, 2056, 2264, 2608], [1200, 1203, 1209, 1255], 75, false, false, false, true),
    // 1920x1440
    DmtEntry::new(234_000, [1920, 2048, 2256, 2600], [1440, 1441, 1444, 1500], 60, false, false, false, true),
    DmtEntry::new(297_000, [1920, 2064, 2288, 2640], [1440, 1441, 1444, 1500], 75, false, false, false, true),
    // 2560x1600
    DmtEntry::new(268_500, [2560, 2608, 2640, 2720], [1600, 1603, 1609, 1646], 60, true, false, true, false),
    DmtEntry::new(348_500, [2560, 2752, 3032, 3504], [1600, 1603, 1609, 1658], 60, false, false, false, true),
    DmtEntry::new(443_250, [2560, 2768, 3048, 3536], [1600, 1603, 1609, 1672], 75, false, false, false, true),
];

/// Look up a DMT timing by size, refresh rate, and reduced-blanking flag.
///
/// The refresh match tolerates rounding (a 59.94 Hz request finds the
/// 60 Hz entry).
pub fn find(width: u32, height: u32, refresh: u32, reduced: bool) -> Option<Mode> {
    DMT.iter()
        .find(|e| {
            e.h[0] == width
                && e.v[0] == height
                && e.reduced == reduced
                && refresh_close(e.refresh, refresh)
        })
        .map(|e| e.to_mode())
}

/// Look up a DMT timing by size and refresh, preferring non-reduced.
pub fn find_any(width: u32, height: u32, refresh: u32) -> Option<Mode> {
    find(width, height, refresh, false).or_else(|| find(width, height, refresh, true))
}

/// Built-in fallback modes used when a monitor provides no timing data.
pub fn fallback_modes() -> Vec<Mode> {
    [
        (640, 480, 60),
        (800, 600, 56),
        (800, 600, 60),
        (1024, 768, 60),
    ]
    .iter()
    .filter_map(|&(w, h, r)| {
        let mut m = find_any(w, h, r)?;
        m.kind |= ModeTypeBit::Default;
        Some(m)
    })
    .collect()
}

fn refresh_close(a: u32, b: u32) -> bool {
    a.abs_diff(b) <= 1
}
