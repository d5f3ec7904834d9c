//! EDID base-block parsing.
//!
//! All offsets here are fixed by the EDID 1.x layout. The block is known
//! to be exactly 128 bytes before any field is touched, so direct indexing
//! below is bounds-safe by construction.

use tracing::{debug, trace, warn};

use super::extensions::parse_extension;
use super::quirks;
use super::{
    CvtCode, DecodeError, DetailedBlock, DetailedTiming, MonitorCaps, MonitorRanges,
    PhysicalSize, StandardTiming, SyncRange, TimingFormula, VendorInfo, BLOCK_SIZE,
};
use crate::modes::{Mode, ModeFlag, ModeFlags, ModeTypeBit};

/// The fixed EDID header pattern.
const HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Highest EDID 1.x revision this decoder fully knows.
const MAX_KNOWN_REVISION: u8 = 4;

/// Decode a raw EDID buffer into monitor capabilities.
///
/// The buffer must hold at least one 128-byte block; extension blocks are
/// expected in multiples of 128 bytes behind it. Raw input is preserved
/// verbatim in [`MonitorCaps::raw`].
///
/// # Errors
///
/// [`DecodeError::Truncated`] when shorter than a full block,
/// [`DecodeError::BadHeader`] when the header is absent at every rotation,
/// [`DecodeError::BadVersion`] for non-1.x EDID, and
/// [`DecodeError::Checksum`] for a corrupt non-all-zero block.
pub fn decode(bytes: &[u8]) -> Result<MonitorCaps, DecodeError> {
    if bytes.len() < BLOCK_SIZE {
        return Err(DecodeError::Truncated {
            got: bytes.len(),
            need: BLOCK_SIZE,
        });
    }

    let mut base: [u8; BLOCK_SIZE] = bytes[..BLOCK_SIZE].try_into().expect("sized slice");
    realign_header(&mut base)?;
    verify_checksum(&base, 0)?;

    let version = (base[18], base[19]);
    if version.0 != 1 {
        return Err(DecodeError::BadVersion(version.0, version.1));
    }
    if version.1 > MAX_KNOWN_REVISION {
        warn!(
            major = version.0,
            minor = version.1,
            "EDID revision newer than {}, assuming forward compatibility",
            MAX_KNOWN_REVISION
        );
    }

    let vendor = parse_vendor(&base);
    let digital = base[20] & 0x80 != 0;
    let size = parse_size(&base);
    let gamma = match base[23] {
        0xFF => None,
        g => Some((g as f64 + 100.0) / 100.0),
    };
    let features = base[24];
    let preferred_timing = features & 0x02 != 0;
    let default_gtf = features & 0x01 != 0;

    let established =
        base[35] as u32 | ((base[36] as u32) << 8) | ((base[37] as u32) << 16);

    let mut standard = Vec::new();
    for slot in 0..8 {
        let off = 38 + slot * 2;
        if let Some(st) = parse_standard_timing(base[off], base[off + 1], version) {
            standard.push(st);
        }
    }

    let mut detailed = Vec::with_capacity(4);
    let mut first_timing = true;
    for slot in 0..4 {
        let off = 54 + slot * 18;
        let desc: [u8; 18] = base[off..off + 18].try_into().expect("sized slice");
        let block = parse_descriptor(&desc, version, preferred_timing && first_timing);
        if matches!(block, DetailedBlock::Timing(_)) {
            first_timing = false;
        }
        detailed.push(block);
    }

    // Physical count of trailing blocks wins over the declared count; a
    // DDC read can deliver fewer blocks than byte 126 promises.
    let declared = base[126] as usize;
    let physical = bytes.len() / BLOCK_SIZE - 1;
    let no_sections = physical;
    if declared != physical {
        debug!(declared, physical, "EDID extension count mismatch");
    }

    let mut extensions = Vec::new();
    for i in 1..=no_sections {
        let block = &bytes[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE];
        if block.iter().all(|&b| b == 0) {
            // "No data" sentinel, not a checksum failure.
            trace!(block = i, "skipping all-zero EDID block");
            continue;
        }
        verify_checksum(block, i)?;
        extensions.push(parse_extension(block));
    }

    let mut hsync_ranges = Vec::new();
    let mut vrefresh_ranges = Vec::new();
    let mut max_clock_khz = None;
    let mut name = None;
    let mut serial_string = None;
    for block in &detailed {
        match block {
            DetailedBlock::Range(r) => {
                hsync_ranges.push(r.hsync);
                vrefresh_ranges.push(r.vrefresh);
                if let Some(c) = r.max_clock_khz {
                    max_clock_khz = Some(max_clock_khz.map_or(c, |m: u32| m.max(c)));
                }
            }
            DetailedBlock::Name(n) if name.is_none() => name = Some(n.clone()),
            DetailedBlock::SerialString(s) if serial_string.is_none() => {
                serial_string = Some(s.clone())
            }
            _ => {}
        }
    }

    let mut caps = MonitorCaps {
        vendor,
        version,
        digital,
        size,
        gamma,
        preferred_timing,
        default_gtf,
        established,
        standard,
        detailed,
        hsync_ranges,
        vrefresh_ranges,
        max_clock_khz,
        name,
        serial_string,
        extensions,
        no_sections,
        raw: bytes.to_vec(),
    };

    quirks::apply(&mut caps);
    Ok(caps)
}

/// Re-align a DDC1 bit-sampled block whose header is rotationally shifted.
///
/// Searches all 128 byte rotations for the header pattern and rotates the
/// block so the header lands at offset 0.
fn realign_header(block: &mut [u8; BLOCK_SIZE]) -> Result<(), DecodeError> {
    if block[..8] == HEADER {
        return Ok(());
    }
    for shift in 1..BLOCK_SIZE {
        if (0..8).all(|j| block[(shift + j) % BLOCK_SIZE] == HEADER[j]) {
            debug!(shift, "re-aligning rotated EDID header");
            block.rotate_left(shift);
            return Ok(());
        }
    }
    Err(DecodeError::BadHeader)
}

/// 8-bit checksum: every 128-byte block must sum to zero mod 256.
fn verify_checksum(block: &[u8], index: usize) -> Result<(), DecodeError> {
    let sum = block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(DecodeError::Checksum(index));
    }
    Ok(())
}

fn parse_vendor(base: &[u8; BLOCK_SIZE]) -> VendorInfo {
    let packed = u16::from_be_bytes([base[8], base[9]]);
    let letter = |v: u16| (b'A' + ((v & 0x1F) as u8).saturating_sub(1)) as char;
    let id: String = [
        letter(packed >> 10),
        letter(packed >> 5),
        letter(packed),
    ]
    .iter()
    .collect();

    VendorInfo {
        id,
        product: u16::from_le_bytes([base[10], base[11]]),
        serial: u32::from_le_bytes([base[12], base[13], base[14], base[15]]),
        week: base[16],
        year: 1990 + base[17] as u16,
    }
}

fn parse_size(base: &[u8; BLOCK_SIZE]) -> PhysicalSize {
    let h_cm = base[21] as u32;
    let v_cm = base[22] as u32;
    match (h_cm, v_cm) {
        (0, 0) => PhysicalSize::Unknown,
        // EDID 1.4 landscape aspect: ratio = (value + 99) / 100
        (h, 0) => PhysicalSize::AspectRatio((h as f64 + 99.0) / 100.0),
        // Portrait aspect: ratio = 100 / (value + 99)
        (0, v) => PhysicalSize::AspectRatio(100.0 / (v as f64 + 99.0)),
        (h, v) => PhysicalSize::Millimeters {
            width: h * 10,
            height: v * 10,
        },
    }
}

/// Decode one 2-byte standard timing code, `None` for the 0x0101 filler.
pub(super) fn parse_standard_timing(
    b0: u8,
    b1: u8,
    version: (u8, u8),
) -> Option<StandardTiming> {
    if (b0, b1) == (0x01, 0x01) || b0 == 0 {
        return None;
    }
    let width = (b0 as u32 + 31) * 8;
    let aspect = b1 >> 6;
    let height = match aspect {
        // Before EDID 1.3 the 0 encoding meant 1:1.
        0 if version < (1, 3) => width,
        0 => width * 10 / 16,
        1 => width * 3 / 4,
        2 => width * 4 / 5,
        _ => width * 9 / 16,
    };
    Some(StandardTiming {
        width,
        height,
        refresh: (b1 & 0x3F) as u32 + 60,
    })
}

/// Parse one 18-byte descriptor slot, tagged by its type byte.
fn parse_descriptor(desc: &[u8; 18], version: (u8, u8), preferred: bool) -> DetailedBlock {
    let clock_10khz = u16::from_le_bytes([desc[0], desc[1]]);
    if clock_10khz != 0 {
        return DetailedBlock::Timing(parse_detailed_timing(desc, clock_10khz, preferred));
    }

    let payload: [u8; 13] = desc[5..18].try_into().expect("sized slice");
    match desc[3] {
        0xFF => DetailedBlock::SerialString(descriptor_string(&payload)),
        0xFE => DetailedBlock::DataString(descriptor_string(&payload)),
        0xFD => DetailedBlock::Range(parse_range(desc)),
        0xFC => DetailedBlock::Name(descriptor_string(&payload)),
        0xFB => DetailedBlock::WhitePoint(payload),
        0xFA => {
            let mut timings = Vec::new();
            for pair in 0..6 {
                let off = pair * 2;
                if let Some(st) =
                    parse_standard_timing(payload[off], payload[off + 1], version)
                {
                    timings.push(st);
                }
            }
            DetailedBlock::StandardTimings(timings)
        }
        0xF8 => DetailedBlock::CvtCodes(parse_cvt_codes(&payload)),
        0xF7 => DetailedBlock::EstablishedIii(payload),
        tag => {
            trace!(tag, "unknown detailed descriptor subtype, storing opaquely");
            DetailedBlock::Vendor { tag, data: payload }
        }
    }
}

/// Decode an 18-byte detailed timing into a full mode.
pub(super) fn parse_detailed_timing(
    desc: &[u8; 18],
    clock_10khz: u16,
    preferred: bool,
) -> DetailedTiming {
    let hactive = desc[2] as u32 | (((desc[4] & 0xF0) as u32) << 4);
    let hblank = desc[3] as u32 | (((desc[4] & 0x0F) as u32) << 8);
    let vactive = desc[5] as u32 | (((desc[7] & 0xF0) as u32) << 4);
    let vblank = desc[6] as u32 | (((desc[7] & 0x0F) as u32) << 8);

    let hsync_off = desc[8] as u32 | (((desc[11] & 0xC0) as u32) << 2);
    let hsync_width = desc[9] as u32 | (((desc[11] & 0x30) as u32) << 4);
    let vsync_off = (desc[10] >> 4) as u32 | (((desc[11] & 0x0C) as u32) << 2);
    let vsync_width = (desc[10] & 0x0F) as u32 | (((desc[11] & 0x03) as u32) << 4);

    let width_mm = desc[12] as u32 | (((desc[14] & 0xF0) as u32) << 4);
    let height_mm = desc[13] as u32 | (((desc[14] & 0x0F) as u32) << 8);

    let misc = desc[17];
    let interlaced = misc & 0x80 != 0;

    let mut flags = ModeFlags::empty();
    if misc & 0x18 == 0x18 {
        // Digital separate sync: explicit polarities.
        flags |= if misc & 0x02 != 0 {
            ModeFlag::PosHSync
        } else {
            ModeFlag::NegHSync
        };
        flags |= if misc & 0x04 != 0 {
            ModeFlag::PosVSync
        } else {
            ModeFlag::NegVSync
        };
    } else {
        flags |= ModeFlag::CompositeSync;
    }
    if interlaced {
        flags |= ModeFlag::Interlace;
    }

    let mut mode = Mode::new(
        clock_10khz as u32 * 10,
        hactive,
        hactive + hsync_off,
        hactive + hsync_off + hsync_width,
        hactive + hblank,
        vactive,
        vactive + vsync_off,
        vactive + vsync_off + vsync_width,
        vactive + vblank,
        flags,
    );
    if interlaced {
        // EDID stores per-field vertical counts for interlaced timings.
        mode.vdisplay *= 2;
        mode.vsync_start *= 2;
        mode.vsync_end *= 2;
        mode.vtotal = mode.vtotal * 2 + 1;
    }
    mode.kind = ModeTypeBit::Driver.into();
    if preferred {
        mode.kind |= ModeTypeBit::EdidPreferred;
    }
    mode.ensure_name();

    DetailedTiming {
        mode,
        width_mm,
        height_mm,
        stereo: misc & 0x60 != 0,
    }
}

fn parse_range(desc: &[u8; 18]) -> MonitorRanges {
    // EDID 1.4 adds 255+ offsets in byte 4; only the +255 max offsets are
    // common in practice.
    let offsets = desc[4];
    let v_max_off = if offsets & 0x02 != 0 { 255.0 } else { 0.0 };
    let v_min_off = if offsets & 0x03 == 0x03 { 255.0 } else { 0.0 };
    let h_max_off = if offsets & 0x08 != 0 { 255.0 } else { 0.0 };
    let h_min_off = if offsets & 0x0C == 0x0C { 255.0 } else { 0.0 };

    let vrefresh = SyncRange {
        lo: desc[5] as f64 + v_min_off,
        hi: desc[6] as f64 + v_max_off,
    };
    let hsync = SyncRange {
        lo: desc[7] as f64 + h_min_off,
        hi: desc[8] as f64 + h_max_off,
    };
    let max_clock_khz = match desc[9] {
        0 | 0xFF => None,
        v => Some(v as u32 * 10_000),
    };
    let formula = match desc[10] {
        0x02 => TimingFormula::SecondaryGtf,
        0x04 => TimingFormula::Cvt,
        _ => TimingFormula::Default,
    };

    MonitorRanges {
        vrefresh,
        hsync,
        max_clock_khz,
        formula,
    }
}

fn parse_cvt_codes(payload: &[u8; 13]) -> Vec<CvtCode> {
    let mut codes = Vec::new();
    // payload[0] is the descriptor version; four 3-byte codes follow.
    for i in 0..4 {
        let off = 1 + i * 3;
        let b = [payload[off], payload[off + 1], payload[off + 2]];
        if b == [0, 0, 0] {
            continue;
        }
        let lines = ((((b[1] & 0xF0) as u32) << 4 | b[0] as u32) + 1) * 2;
        let aspect = (b[1] >> 2) & 0x03;
        let width = match aspect {
            0 => 8 * (lines * 4 / 3 / 8),
            1 => 8 * (lines * 16 / 9 / 8),
            2 => 8 * (lines * 16 / 10 / 8),
            _ => 8 * (lines * 15 / 9 / 8),
        };
        let preferred_refresh = match (b[2] >> 5) & 0x03 {
            0 => 50,
            1 => 60,
            2 => 75,
            _ => 85,
        };
        let refreshes = [
            b[2] & 0x10 != 0, // 50 Hz
            b[2] & 0x08 != 0, // 60 Hz
            b[2] & 0x04 != 0, // 75 Hz
            b[2] & 0x02 != 0, // 85 Hz
            b[2] & 0x01 != 0, // 60 Hz reduced blanking
        ];
        codes.push(CvtCode {
            width,
            height: lines,
            preferred_refresh,
            refreshes,
            rb_at_60: b[2] & 0x01 != 0,
        });
    }
    codes
}

/// Descriptor strings are 0x0A-terminated and space-padded.
fn descriptor_string(payload: &[u8; 13]) -> String {
    let end = payload.iter().position(|&b| b == 0x0A).unwrap_or(13);
    payload[..end]
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edid::test_fixtures::{base_block_1080p, finish_block, FIXTURE_VENDOR};

    #[test]
    fn test_decode_minimal_1080p() {
        let block = base_block_1080p();
        let caps = decode(&block).expect("decode failed");
        assert_eq!(caps.vendor.id, FIXTURE_VENDOR);
        assert_eq!(caps.version, (1, 4));
        assert_eq!(caps.no_sections, 0);
        assert_eq!(caps.raw, block);

        let timings = caps.detailed_timings();
        assert_eq!(timings.len(), 1);
        let mode = &timings[0].mode;
        assert_eq!((mode.hdisplay, mode.vdisplay), (1920, 1080));
        assert_eq!(mode.clock, 148_500);
        assert!(mode.kind.contains(ModeTypeBit::EdidPreferred));
    }

    #[test]
    fn test_truncated_buffer() {
        let err = decode(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { got: 64, need: 128 }));
    }

    #[test]
    fn test_bad_checksum_is_rejected() {
        let mut block = base_block_1080p();
        block[100] ^= 0x5A; // corrupt without touching the checksum byte
        let err = decode(&block).unwrap_err();
        assert_eq!(err, DecodeError::Checksum(0));
    }

    #[test]
    fn test_rotated_header_is_realigned() {
        let block = base_block_1080p();
        let mut rotated = block.clone();
        rotated.rotate_right(5);
        let caps = decode(&rotated).expect("rotated decode failed");
        assert_eq!(caps.vendor.id, FIXTURE_VENDOR);
        assert_eq!(caps.detailed_timings().len(), 1);
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut block = base_block_1080p();
        block[18] = 2;
        finish_block(&mut block);
        let err = decode(&block).unwrap_err();
        assert_eq!(err, DecodeError::BadVersion(2, 4));
    }

    #[test]
    fn test_future_minor_revision_accepted() {
        let mut block = base_block_1080p();
        block[19] = 9;
        finish_block(&mut block);
        let caps = decode(&block).expect("future revision should decode");
        assert_eq!(caps.version, (1, 9));
    }

    #[test]
    fn test_all_zero_extension_tolerated() {
        let mut edid = base_block_1080p();
        edid[126] = 1;
        finish_block(&mut edid);
        edid.extend_from_slice(&[0u8; 128]);
        let caps = decode(&edid).expect("zero extension should decode");
        assert_eq!(caps.no_sections, 1);
        assert!(caps.extensions.is_empty());
    }

    #[test]
    fn test_standard_timing_aspect_decode() {
        // 0xD1 0xC0: (0xD1+31)*8 = 1920 wide, aspect 16:9, 60 Hz.
        let st = parse_standard_timing(0xD1, 0xC0, (1, 4)).unwrap();
        assert_eq!((st.width, st.height, st.refresh), (1920, 1080, 60));

        // Filler slots decode to nothing.
        assert!(parse_standard_timing(0x01, 0x01, (1, 4)).is_none());
    }
}
