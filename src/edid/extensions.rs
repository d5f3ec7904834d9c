//! EDID extension block parsing.
//!
//! CEA-861 blocks are decoded into short data blocks plus trailing
//! detailed timings; every other extension tag (VTB, DI, LS, MI, ...) is
//! kept opaque so the raw bytes survive re-export.

use tracing::{debug, trace};

use super::decode::parse_detailed_timing;
use super::{CeaExtension, ExtensionBlock, VendorDataBlock, HDMI_OUI};

const TAG_CEA: u8 = 0x02;

const BLOCK_AUDIO: u8 = 1;
const BLOCK_VIDEO: u8 = 2;
const BLOCK_VENDOR: u8 = 3;
const BLOCK_SPEAKER: u8 = 4;

/// Parse one 128-byte extension block by tag.
pub(super) fn parse_extension(block: &[u8]) -> ExtensionBlock {
    match block[0] {
        TAG_CEA => ExtensionBlock::Cea(parse_cea(block)),
        tag => {
            trace!(tag, "storing unparsed extension block");
            ExtensionBlock::Other {
                tag,
                data: block.to_vec(),
            }
        }
    }
}

fn parse_cea(block: &[u8]) -> CeaExtension {
    let mut cea = CeaExtension {
        revision: block[1],
        underscan: block[3] & 0x80 != 0,
        basic_audio: block[3] & 0x40 != 0,
        ..Default::default()
    };

    let dtd_offset = block[2] as usize;

    // Short data blocks live between byte 4 and the DTD offset.
    if dtd_offset > 4 {
        let mut pos = 4usize;
        while pos < dtd_offset.min(block.len()) {
            let header = block[pos];
            let block_type = header >> 5;
            let len = (header & 0x1F) as usize;
            let payload_start = pos + 1;
            let payload_end = payload_start + len;
            if payload_end > block.len() {
                debug!(pos, len, "CEA data block overruns extension, stopping");
                break;
            }
            let payload = &block[payload_start..payload_end];
            match block_type {
                BLOCK_VIDEO => {
                    for &svd in payload {
                        let vic = svd & 0x7F;
                        cea.video_codes.push(vic);
                        if svd & 0x80 != 0 {
                            cea.native_codes.push(vic);
                        }
                    }
                }
                BLOCK_AUDIO => {
                    for chunk in payload.chunks_exact(3) {
                        cea.audio_blocks.push([chunk[0], chunk[1], chunk[2]]);
                    }
                }
                BLOCK_SPEAKER => {
                    for chunk in payload.chunks_exact(3) {
                        cea.speaker_blocks.push([chunk[0], chunk[1], chunk[2]]);
                    }
                }
                BLOCK_VENDOR if len >= 3 => {
                    let oui = payload[0] as u32
                        | (payload[1] as u32) << 8
                        | (payload[2] as u32) << 16;
                    let data = payload[3..].to_vec();
                    if oui == HDMI_OUI {
                        // HDMI VSDB: physical address (2 bytes), caps
                        // byte, then Max_TMDS_Clock in 5 MHz units.
                        if let Some(&tmds) = data.get(3) {
                            if tmds != 0 {
                                cea.max_tmds_khz = Some(tmds as u32 * 5_000);
                            }
                        }
                    }
                    cea.vendor_blocks.push(VendorDataBlock { oui, data });
                }
                other => {
                    trace!(block_type = other, len, "skipping CEA data block");
                }
            }
            pos = payload_end;
        }
    }

    // Detailed timings follow at the DTD offset until padding.
    if dtd_offset >= 4 {
        let mut pos = dtd_offset;
        while pos + 18 <= block.len() - 1 {
            let desc: [u8; 18] = block[pos..pos + 18].try_into().expect("sized slice");
            let clock = u16::from_le_bytes([desc[0], desc[1]]);
            if clock == 0 {
                break;
            }
            cea.detailed.push(parse_detailed_timing(&desc, clock, false));
            pos += 18;
        }
    }

    cea
}
