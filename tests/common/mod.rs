//! Shared fixtures for the integration tests: hand-built EDID blocks
//! and an accept-everything backend.
#![allow(dead_code)]

use lamco_modeset::backend::{BackendError, CrtcCommit, ModeSetBackend};
use lamco_modeset::topology::{Connection, Crtc, Output, Topology};

/// Recompute the trailing checksum byte of the last 128-byte block.
pub fn finish_block(block: &mut [u8]) {
    let len = block.len();
    let start = len - 128;
    block[len - 1] = 0;
    let sum = block[start..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    block[len - 1] = 0u8.wrapping_sub(sum);
}

/// An EDID 1.4 base block: digital input, one preferred 1920x1080@60
/// detailed timing, a 50-76 Hz / 30-90 kHz range descriptor with a
/// 200 MHz clock cap, and a name descriptor.
pub fn edid_1080p() -> Vec<u8> {
    let mut b = vec![0u8; 128];
    b[..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
    // Vendor "LMC", product 0x1234, serial 1, week 10 of 2020, EDID 1.4.
    b[8] = 0x31;
    b[9] = 0xA3;
    b[10] = 0x34;
    b[11] = 0x12;
    b[12] = 0x01;
    b[16] = 10;
    b[17] = 30;
    b[18] = 1;
    b[19] = 4;
    // Digital input, 60x34 cm, gamma 2.2, preferred-timing bit.
    b[20] = 0x80;
    b[21] = 60;
    b[22] = 34;
    b[23] = 120;
    b[24] = 0x02;
    for slot in 0..8 {
        b[38 + slot * 2] = 0x01;
        b[39 + slot * 2] = 0x01;
    }
    // 1920x1080@60: 148.5 MHz, +hsync +vsync.
    b[54..72].copy_from_slice(&[
        0x02, 0x3A, 0x80, 0x18, 0x71, 0x38, 0x2D, 0x40, 0x58, 0x2C, 0x45, 0x00, 0x58, 0x54, 0x21,
        0x00, 0x00, 0x1E,
    ]);
    // Range descriptor: 50-76 Hz, 30-90 kHz, max clock 200 MHz.
    b[72..90].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFD, 0x00, 50, 76, 30, 90, 20, 0x00, 0x0A, 0x20, 0x20, 0x20, 0x20,
        0x20, 0x20,
    ]);
    // Name descriptor.
    b[90..108].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFC, 0x00, b'L', b'M', b'C', b' ', b'T', b'E', b'S', b'T', 0x0A, 0x20,
        0x20, 0x20, 0x20,
    ]);
    b[108] = 0x00;
    b[111] = 0x10;
    finish_block(&mut b);
    b
}

/// Base block with one preferred 1280x1024@60 detailed timing.
pub fn edid_1280x1024() -> Vec<u8> {
    let mut b = edid_1080p();
    // 108 MHz, hblank 408, vblank 42, hsync 48/112, vsync 1/3.
    b[54..72].copy_from_slice(&[
        0x30, 0x2A, 0x00, 0x98, 0x51, 0x00, 0x2A, 0x40, 0x30, 0x70, 0x13, 0x00, 0x58, 0x54, 0x21,
        0x00, 0x00, 0x1E,
    ]);
    finish_block(&mut b);
    b
}

/// Base block whose only timing data is the established 720x400@70 bit.
pub fn edid_established_only() -> Vec<u8> {
    let mut b = edid_1080p();
    b[35] = 0x80;
    b[54..72].fill(0);
    b[57] = 0x10;
    b[24] = 0;
    finish_block(&mut b);
    b
}

/// A backend that accepts every mode and records commits.
#[derive(Default)]
pub struct AcceptBackend {
    pub committed: usize,
}

impl ModeSetBackend for AcceptBackend {
    fn commit(&mut self, commits: &[CrtcCommit<'_>]) -> Result<(), BackendError> {
        self.committed += commits.len();
        Ok(())
    }
}

/// A topology of `crtcs` CRTCs and one connected output per EDID blob,
/// named DP-1, DP-2, ... with unrestricted CRTC and clone masks.
pub fn topology_with(crtcs: usize, edids: &[Vec<u8>]) -> Topology {
    let mut topo = Topology::new();
    for _ in 0..crtcs {
        topo.add_crtc(Crtc::new());
    }
    let crtc_mask = (1u32 << crtcs) - 1;
    let clone_mask = (1u32 << edids.len()) - 1;
    for (i, bytes) in edids.iter().enumerate() {
        let mut out = Output::new(format!("DP-{}", i + 1));
        out.connection = Connection::Connected;
        out.possible_crtcs = crtc_mask;
        out.possible_clones = clone_mask;
        out.caps = lamco_modeset::edid::decode(bytes).ok();
        topo.add_output(out);
    }
    topo
}
