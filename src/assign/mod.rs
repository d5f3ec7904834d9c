//! CRTC Assignment
//!
//! Routes outputs onto CRTCs. The search (`pick_crtcs`) is a recursive
//! backtracking walk over the outputs in index order: each output is
//! first tried disabled, then on every CRTC its possible-CRTC mask
//! allows — including CRTCs already claimed by an earlier output when
//! the two can clone — and the maximum-scoring assignment wins.
//!
//! Scoring per enabled output: 1 baseline, +1 when the output is
//! definitely connected, +1 when its chosen mode is a native preferred
//! mode. Ties keep the first assignment found. The search is pure; it
//! never touches the topology.

use thiserror::Error;
use tracing::{debug, trace};

use crate::modes::Mode;
use crate::topology::{Connection, CrtcId, OutputId, Topology};
use crate::transform::Rotation;

pub mod position;
pub mod target;
pub mod tile;

pub use position::{resolve_positions, Placement, PositionRequest};
pub use target::{select_targets, TargetInput, TargetLayout, TargetPlan};
pub use tile::{tile_group_size, tile_positions};

/// Assignment failure: nothing could be enabled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    /// No output could be routed to any CRTC
    #[error("unable to configure any output")]
    NoAssignment,
}

/// One output entering the CRTC search, with its target already chosen.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The output being placed
    pub output: OutputId,
    /// Target mode from the selection pass
    pub mode: Mode,
    /// Initial framebuffer x
    pub x: i32,
    /// Initial framebuffer y
    pub y: i32,
    /// Requested rotation
    pub rotation: Rotation,
    /// Definitely connected (scores higher)
    pub connected: bool,
}

impl Candidate {
    /// Build a candidate from topology state.
    pub fn new(topology: &Topology, output: OutputId, mode: Mode, x: i32, y: i32, rotation: Rotation) -> Self {
        Candidate {
            output,
            mode,
            x,
            y,
            rotation,
            connected: matches!(
                topology.outputs[output.0].connection,
                Connection::Connected
            ),
        }
    }

    fn score(&self) -> u32 {
        1 + self.connected as u32 + self.mode.is_preferred() as u32
    }
}

/// The chosen routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// CRTC per candidate, index-aligned; `None` leaves the output off
    pub crtcs: Vec<Option<CrtcId>>,
    /// Total score of the assignment
    pub score: u32,
}

impl Assignment {
    /// `(output, crtc)` pairs for the enabled outputs.
    pub fn placements<'a>(&'a self, candidates: &'a [Candidate]) -> impl Iterator<Item = (OutputId, CrtcId)> + 'a {
        self.crtcs
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|crtc| (candidates[i].output, crtc)))
    }
}

/// Search for the best CRTC routing.
///
/// Errors only when no output could be enabled at all; the caller is
/// expected to fall back to an off-screen framebuffer rather than
/// treat that as fatal.
pub fn pick_crtcs(topology: &Topology, candidates: &[Candidate]) -> Result<Assignment, AssignError> {
    if candidates.is_empty() || topology.crtcs.is_empty() {
        return Err(AssignError::NoAssignment);
    }
    let mut used: Vec<Option<usize>> = vec![None; topology.crtcs.len()];
    let (score, crtcs) = search(topology, candidates, 0, &mut used);
    if score == 0 {
        return Err(AssignError::NoAssignment);
    }
    let assignment = Assignment { crtcs, score };
    debug!(score, "crtc assignment chosen");
    Ok(assignment)
}

fn search(
    topology: &Topology,
    candidates: &[Candidate],
    idx: usize,
    used: &mut Vec<Option<usize>>,
) -> (u32, Vec<Option<CrtcId>>) {
    if idx == candidates.len() {
        return (0, vec![None; candidates.len()]);
    }

    // Baseline: this output stays off.
    let (mut best_score, mut best) = search(topology, candidates, idx + 1, used);

    let candidate = &candidates[idx];
    let output = &topology.outputs[candidate.output.0];
    for crtc_index in 0..topology.crtcs.len() {
        if !output.supports_crtc(crtc_index) {
            continue;
        }
        if let Some(prev_idx) = used[crtc_index] {
            if !clone_compatible(topology, candidates, prev_idx, idx) {
                continue;
            }
        }
        let previous = used[crtc_index];
        used[crtc_index] = Some(previous.unwrap_or(idx));
        let (sub_score, mut sub) = search(topology, candidates, idx + 1, used);
        used[crtc_index] = previous;

        let total = sub_score + candidate.score();
        if total > best_score {
            sub[idx] = Some(CrtcId(crtc_index));
            trace!(
                output = %candidate.output,
                crtc = crtc_index,
                total,
                "better assignment found"
            );
            best_score = total;
            best = sub;
        }
    }
    (best_score, best)
}

/// Two outputs may share a CRTC only when both clone masks allow it and
/// their targets are identical in size, rotation, and position.
fn clone_compatible(
    topology: &Topology,
    candidates: &[Candidate],
    a: usize,
    b: usize,
) -> bool {
    let (ca, cb) = (&candidates[a], &candidates[b]);
    let (oa, ob) = (
        &topology.outputs[ca.output.0],
        &topology.outputs[cb.output.0],
    );
    oa.can_clone(cb.output.0)
        && ob.can_clone(ca.output.0)
        && ca.mode.hdisplay == cb.mode.hdisplay
        && ca.mode.vdisplay == cb.mode.vdisplay
        && ca.rotation == cb.rotation
        && (ca.x, ca.y) == (cb.x, cb.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{dmt, ModeTypeBit};
    use crate::topology::{Crtc, Output};
    use crate::transform::rotation_identity;

    fn mode(w: u32, h: u32) -> Mode {
        dmt::find(w, h, 60, false).expect("dmt entry")
    }

    fn preferred(mut m: Mode) -> Mode {
        m.kind |= ModeTypeBit::EdidPreferred;
        m
    }

    fn topo(crtcs: usize, outputs: &[(u32, u32)]) -> Topology {
        // outputs are (possible_crtcs, possible_clones) masks.
        let mut t = Topology::new();
        for _ in 0..crtcs {
            t.add_crtc(Crtc::new());
        }
        for (i, &(possible, clones)) in outputs.iter().enumerate() {
            let mut o = Output::new(format!("DP-{}", i + 1));
            o.connection = Connection::Connected;
            o.possible_crtcs = possible;
            o.possible_clones = clones;
            t.add_output(o);
        }
        t
    }

    fn candidate(t: &Topology, idx: usize, m: Mode, x: i32) -> Candidate {
        Candidate::new(t, OutputId(idx), m, x, 0, rotation_identity())
    }

    #[test]
    fn test_single_output_takes_sole_crtc() {
        let t = topo(1, &[(0b1, 0)]);
        let cands = vec![candidate(&t, 0, preferred(mode(1920, 1080)), 0)];
        let a = pick_crtcs(&t, &cands).unwrap();
        assert_eq!(a.crtcs, vec![Some(CrtcId(0))]);
        assert_eq!(a.score, 3);
    }

    #[test]
    fn test_two_outputs_two_crtcs() {
        let t = topo(2, &[(0b11, 0), (0b11, 0)]);
        let cands = vec![
            candidate(&t, 0, mode(1280, 1024), 0),
            candidate(&t, 1, mode(1280, 1024), 1280),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        let crtcs: Vec<_> = a.crtcs.iter().flatten().collect();
        assert_eq!(crtcs.len(), 2);
        assert_ne!(a.crtcs[0], a.crtcs[1]);
    }

    #[test]
    fn test_contention_prefers_connected_preferred() {
        // One CRTC, two outputs, no cloning: the higher scorer wins.
        let mut t = topo(1, &[(0b1, 0), (0b1, 0)]);
        t.outputs[1].connection = Connection::Unknown;
        let cands = vec![
            candidate(&t, 0, preferred(mode(1920, 1080)), 0),
            candidate(&t, 1, mode(1024, 768), 0),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        assert_eq!(a.crtcs, vec![Some(CrtcId(0)), None]);
    }

    #[test]
    fn test_cloning_shares_a_crtc() {
        let t = topo(1, &[(0b1, 0b10), (0b1, 0b01)]);
        let cands = vec![
            candidate(&t, 0, mode(1024, 768), 0),
            candidate(&t, 1, mode(1024, 768), 0),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        assert_eq!(a.crtcs, vec![Some(CrtcId(0)), Some(CrtcId(0))]);
    }

    #[test]
    fn test_clone_refused_on_position_mismatch() {
        let t = topo(1, &[(0b1, 0b10), (0b1, 0b01)]);
        let cands = vec![
            candidate(&t, 0, mode(1024, 768), 0),
            candidate(&t, 1, mode(1024, 768), 1024),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        // Only one can light up.
        assert_eq!(a.crtcs.iter().flatten().count(), 1);
    }

    #[test]
    fn test_clone_refused_without_mask() {
        let t = topo(1, &[(0b1, 0), (0b1, 0)]);
        let cands = vec![
            candidate(&t, 0, mode(1024, 768), 0),
            candidate(&t, 1, mode(1024, 768), 0),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        assert_eq!(a.crtcs.iter().flatten().count(), 1);
    }

    #[test]
    fn test_impossible_mask_errors() {
        let t = topo(1, &[(0, 0)]);
        let cands = vec![candidate(&t, 0, mode(800, 600), 0)];
        assert_eq!(pick_crtcs(&t, &cands), Err(AssignError::NoAssignment));
    }

    #[test]
    fn test_swap_needed_for_full_coverage() {
        // Output 0 can use both CRTCs, output 1 only CRTC 0; the search
        // must route 0 onto CRTC 1 so both fit.
        let t = topo(2, &[(0b11, 0), (0b01, 0)]);
        let cands = vec![
            candidate(&t, 0, mode(1280, 1024), 0),
            candidate(&t, 1, mode(1280, 1024), 1280),
        ];
        let a = pick_crtcs(&t, &cands).unwrap();
        assert_eq!(a.crtcs, vec![Some(CrtcId(1)), Some(CrtcId(0))]);
    }
}
