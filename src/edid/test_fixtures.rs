//! Hand-built EDID blocks for decoder unit tests.

/// Vendor id encoded in the fixture blocks.
pub const FIXTURE_VENDOR: &str = "LMC";

/// Recompute the trailing checksum byte of the last 128-byte block.
pub fn finish_block(block: &mut [u8]) {
    let len = block.len();
    let start = len - 128;
    block[len - 1] = 0;
    let sum = block[start..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    block[len - 1] = 0u8.wrapping_sub(sum);
}

/// An EDID 1.4 base block: digital input, 600x340 mm, one preferred
/// 1920x1080@60 detailed timing, a 50-76 Hz / 30-90 kHz range descriptor
/// with a 200 MHz clock cap, and a name descriptor.
pub fn base_block_1080p() -> Vec<u8> {
    let mut b = vec![0u8; 128];

    // Header
    b[..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
    // Vendor "LMC", product 0x1234, serial 1
    b[8] = 0x31;
    b[9] = 0xA3;
    b[10] = 0x34;
    b[11] = 0x12;
    b[12] = 0x01;
    // Week 10 of 2020
    b[16] = 10;
    b[17] = 30;
    // EDID 1.4
    b[18] = 1;
    b[19] = 4;
    // Digital input
    b[20] = 0x80;
    // 60x34 cm
    b[21] = 60;
    b[22] = 34;
    // Gamma 2.2
    b[23] = 120;
    // Preferred timing bit
    b[24] = 0x02;
    // Established timings: none
    // Standard timings: all filler
    for slot in 0..8 {
        b[38 + slot * 2] = 0x01;
        b[39 + slot * 2] = 0x01;
    }

    // Descriptor 1: 1920x1080@60, 148.5 MHz, +hsync +vsync, 600x340 mm
    b[54..72].copy_from_slice(&[
        0x02, 0x3A, // clock 14850 x 10 kHz
        0x80, 0x18, 0x71, // hactive 1920, hblank 280
        0x38, 0x2D, 0x40, // vactive 1080, vblank 45
        0x58, 0x2C, // hsync offset 88, width 44
        0x45, 0x00, // vsync offset 4, width 5
        0x58, 0x54, 0x21, // 600x340 mm
        0x00, 0x00, // borders
        0x1E, // digital separate sync, +h +v
    ]);

    // Descriptor 2: monitor range 50-76 Hz, 30-90 kHz, max clock 200 MHz
    b[72..90].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFD, 0x00, //
        50, 76, 30, 90, 20, //
        0x00, 0x0A, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    ]);

    // Descriptor 3: monitor name
    b[90..108].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFC, 0x00, //
        b'L', b'M', b'C', b' ', b'T', b'E', b'S', b'T', 0x0A, 0x20, 0x20, 0x20, 0x20,
    ]);

    // Descriptor 4: dummy
    b[108] = 0x00;
    b[111] = 0x10;

    finish_block(&mut b);
    b
}

/// Base block whose only timing data is the established 720x400@70 bit.
pub fn base_block_established_only() -> Vec<u8> {
    let mut b = base_block_1080p();
    // Established: 720x400@70 (byte 35 bit 7) only.
    b[35] = 0x80;
    // Replace the detailed timing slot with a dummy descriptor.
    b[54..72].fill(0);
    b[57] = 0x10;
    // Clear the preferred-timing feature bit.
    b[24] = 0;
    finish_block(&mut b);
    b
}

/// Base block with one preferred 1280x1024@60 detailed timing.
pub fn base_block_1280x1024() -> Vec<u8> {
    let mut b = base_block_1080p();
    // 1280x1024@60: 108 MHz, hblank 408, vblank 42,
    // hsync offset 48 width 112, vsync offset 1 width 3.
    b[54..72].copy_from_slice(&[
        0x30, 0x2A, // clock 10800 x 10 kHz
        0x00, 0x98, 0x51, // hactive 1280, hblank 408
        0x00, 0x2A, 0x40, // vactive 1024, vblank 42
        0x30, 0x70, // hsync offset 48, width 112
        0x13, 0x00, // vsync offset 1, width 3
        0x58, 0x54, 0x21, // 600x340 mm
        0x00, 0x00, //
        0x1E,
    ]);
    finish_block(&mut b);
    b
}
