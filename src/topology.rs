//! CRTC and Output Topology
//!
//! The arena of scanout engines (CRTCs) and physical connectors
//! (outputs) the assignment and engine layers operate on. CRTCs and
//! outputs are addressed by index-based ids into the [`Topology`] arena;
//! `possible_crtcs` and `possible_clones` are bitmasks over those
//! indices, mirroring how display hardware expresses routing
//! constraints.

use crate::edid::MonitorCaps;
use crate::modes::Mode;
use crate::transform::{rotation_identity, Rotation};

/// Index of a CRTC in the topology arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrtcId(pub usize);

/// Index of an output in the topology arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub usize);

impl std::fmt::Display for CrtcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "crtc-{}", self.0)
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output-{}", self.0)
    }
}

/// Connection state reported for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connection {
    /// A monitor is attached
    Connected,
    /// Nothing attached
    Disconnected,
    /// The connector cannot report attachment
    #[default]
    Unknown,
}

/// One scanout engine.
#[derive(Debug, Clone, Default)]
pub struct Crtc {
    /// Currently programmed mode, `None` when disabled
    pub mode: Option<Mode>,
    /// Framebuffer x position
    pub x: i32,
    /// Framebuffer y position
    pub y: i32,
    /// Active rotation
    pub rotation: Rotation,
    /// Rotations the hardware can scan out directly
    pub supported_rotations: Rotation,
    /// Outputs currently driven by this CRTC
    pub outputs: Vec<OutputId>,
}

impl Crtc {
    /// A disabled CRTC that only supports unrotated scanout.
    pub fn new() -> Self {
        Crtc {
            rotation: rotation_identity(),
            supported_rotations: rotation_identity(),
            ..Default::default()
        }
    }

    /// Whether a mode is programmed.
    pub fn enabled(&self) -> bool {
        self.mode.is_some()
    }
}

/// Position of one tile within a tiled monitor group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    /// Group id shared by all tiles of one monitor
    pub group: u32,
    /// Horizontal tile count in the group
    pub num_h: u32,
    /// Vertical tile count in the group
    pub num_v: u32,
    /// This tile's column, 0-based from the left
    pub h_loc: u32,
    /// This tile's row, 0-based from the top
    pub v_loc: u32,
    /// Tile width in pixels
    pub width: u32,
    /// Tile height in pixels
    pub height: u32,
}

/// One physical connector.
#[derive(Debug, Clone, Default)]
pub struct Output {
    /// Connector name, e.g. `DP-1`
    pub name: String,
    /// Attachment state
    pub connection: Connection,
    /// Bitmask of CRTC indices this output can be routed to
    pub possible_crtcs: u32,
    /// Bitmask of output indices this output can share a CRTC with
    pub possible_clones: u32,
    /// Decoded monitor capabilities, when an EDID was read
    pub caps: Option<MonitorCaps>,
    /// Probed mode list, preferred modes first
    pub modes: Vec<Mode>,
    /// Physical width in millimeters, 0 when unknown
    pub mm_width: u32,
    /// Physical height in millimeters, 0 when unknown
    pub mm_height: u32,
    /// Tiling metadata for one tile of a tiled monitor
    pub tile: Option<TileInfo>,
    /// CRTC currently driving this output
    pub crtc: Option<CrtcId>,
}

impl Output {
    /// A disconnected output with the given connector name.
    pub fn new(name: impl Into<String>) -> Self {
        Output {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether a monitor is (or may be) attached. Unknown counts as
    /// connected so blind connectors still light up.
    pub fn usable(&self) -> bool {
        !matches!(self.connection, Connection::Disconnected)
    }

    /// Whether this output may be routed to the CRTC at `index`.
    pub fn supports_crtc(&self, index: usize) -> bool {
        index < 32 && self.possible_crtcs & (1 << index) != 0
    }

    /// Whether this output may share a CRTC with the output at `index`.
    pub fn can_clone(&self, index: usize) -> bool {
        index < 32 && self.possible_clones & (1 << index) != 0
    }

    /// The output's preferred mode, if the probe marked one.
    pub fn preferred_mode(&self) -> Option<&Mode> {
        self.modes.iter().find(|m| m.is_preferred())
    }
}

/// The full scanout arena.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// All CRTCs, addressed by [`CrtcId`]
    pub crtcs: Vec<Crtc>,
    /// All outputs, addressed by [`OutputId`]
    pub outputs: Vec<Output>,
}

impl Topology {
    /// An empty arena.
    pub fn new() -> Self {
        Topology::default()
    }

    /// Add a CRTC, returning its id.
    pub fn add_crtc(&mut self, crtc: Crtc) -> CrtcId {
        self.crtcs.push(crtc);
        CrtcId(self.crtcs.len() - 1)
    }

    /// Add an output, returning its id.
    pub fn add_output(&mut self, output: Output) -> OutputId {
        self.outputs.push(output);
        OutputId(self.outputs.len() - 1)
    }

    /// Outputs with a monitor attached (or attachment unknown).
    pub fn usable_outputs(&self) -> impl Iterator<Item = (OutputId, &Output)> {
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| o.usable())
            .map(|(i, o)| (OutputId(i), o))
    }

    /// All tiles of the same tile group as `output`, including itself.
    pub fn tile_group(&self, output: OutputId) -> Vec<OutputId> {
        let Some(tile) = self.outputs[output.0].tile else {
            return vec![output];
        };
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| o.tile.is_some_and(|t| t.group == tile.group))
            .map(|(i, _)| OutputId(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_possible_crtcs_mask() {
        let mut out = Output::new("DP-1");
        out.possible_crtcs = 0b101;
        assert!(out.supports_crtc(0));
        assert!(!out.supports_crtc(1));
        assert!(out.supports_crtc(2));
        assert!(!out.supports_crtc(40));
    }

    #[test]
    fn test_unknown_connection_is_usable() {
        let mut out = Output::new("VGA-1");
        assert!(out.usable());
        out.connection = Connection::Disconnected;
        assert!(!out.usable());
    }

    #[test]
    fn test_tile_group_collects_peers() {
        let mut topo = Topology::new();
        let tile = |h_loc| TileInfo {
            group: 7,
            num_h: 2,
            num_v: 1,
            h_loc,
            v_loc: 0,
            width: 1920,
            height: 2160,
        };
        let a = topo.add_output(Output {
            tile: Some(tile(0)),
            ..Output::new("DP-1")
        });
        let b = topo.add_output(Output {
            tile: Some(tile(1)),
            ..Output::new("DP-2")
        });
        let c = topo.add_output(Output::new("HDMI-1"));
        assert_eq!(topo.tile_group(a), vec![a, b]);
        assert_eq!(topo.tile_group(c), vec![c]);
    }
}
