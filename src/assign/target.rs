//! Target Mode Selection
//!
//! Decides which mode each enabled output should aim for, before CRTC
//! assignment runs. Five strategies are tried in fixed priority order,
//! stopping at the first that covers every enabled output:
//!
//! 1. explicit user-preferred modes from configuration
//! 2. side-by-side layout of native preferred modes (multi-output,
//!    nobody asking to clone)
//! 3. one size shared by every output's mode list, maximizing area
//! 4. the largest mode under a common aspect ratio (own aspect or 4:3)
//! 5. snap everything to the closest match of the single most
//!    preferred mode anywhere

use tracing::{debug, trace};

use crate::modes::{Mode, ModeTypeBit};

/// Aspect-ratio comparison tolerance.
const ASPECT_TOLERANCE: f64 = 0.05;

/// What target selection sees of one output.
#[derive(Debug, Clone)]
pub struct TargetInput<'a> {
    /// Connector name, for diagnostics
    pub name: &'a str,
    /// Whether the enablement pass turned this output on
    pub enabled: bool,
    /// Definitely-connected status (affects nothing here but carried
    /// for symmetry with the assignment scorer)
    pub connected: bool,
    /// Candidate modes, largest-first
    pub modes: &'a [Mode],
    /// Explicitly configured mode, already resolved against `modes`
    pub user_preferred: Option<&'a Mode>,
    /// Configuration asks this output to clone another
    pub prefers_clone: bool,
}

impl TargetInput<'_> {
    fn active(&self) -> bool {
        self.enabled && !self.modes.is_empty()
    }

    fn native_preferred(&self) -> Option<&Mode> {
        self.modes
            .iter()
            .find(|m| m.is_preferred())
            .or_else(|| self.modes.first())
    }
}

/// How the chosen modes are meant to be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLayout {
    /// Positions come from configuration / the position pass
    Configured,
    /// Outputs line up left to right
    SideBySide,
    /// All outputs share one viewport
    Cloned,
}

/// The outcome of target selection.
#[derive(Debug, Clone)]
pub struct TargetPlan {
    /// Chosen mode per input, index-aligned; `None` for outputs that
    /// stay off
    pub choices: Vec<Option<Mode>>,
    /// Intended layout
    pub layout: TargetLayout,
}

/// Run the strategy ladder.
///
/// Always returns a plan; the last strategy cannot fail unless no
/// output has any mode at all, in which case every choice is `None`.
pub fn select_targets(inputs: &[TargetInput<'_>]) -> TargetPlan {
    let strategies: [(&str, fn(&[TargetInput<'_>]) -> Option<TargetPlan>); 5] = [
        ("user preference", try_user_preferred),
        ("side by side", try_side_by_side),
        ("common size", try_common_size),
        ("common aspect", try_common_aspect),
        ("closest match", try_closest_match),
    ];
    for (label, strategy) in strategies {
        if let Some(plan) = strategy(inputs) {
            debug!(strategy = label, "target modes selected");
            return plan;
        }
    }
    TargetPlan {
        choices: vec![None; inputs.len()],
        layout: TargetLayout::Configured,
    }
}

fn try_user_preferred(inputs: &[TargetInput<'_>]) -> Option<TargetPlan> {
    if !inputs.iter().any(|i| i.active()) {
        return None;
    }
    let mut choices = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.active() {
            choices.push(None);
            continue;
        }
        choices.push(Some(input.user_preferred?.clone()));
    }
    Some(TargetPlan {
        choices,
        layout: TargetLayout::Configured,
    })
}

fn try_side_by_side(inputs: &[TargetInput<'_>]) -> Option<TargetPlan> {
    let active = inputs.iter().filter(|i| i.active()).count();
    if active < 2 || inputs.iter().any(|i| i.active() && i.prefers_clone) {
        return None;
    }
    let mut choices = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.active() {
            choices.push(None);
            continue;
        }
        choices.push(Some(input.native_preferred()?.clone()));
    }
    Some(TargetPlan {
        choices,
        layout: TargetLayout::SideBySide,
    })
}

fn try_common_size(inputs: &[TargetInput<'_>]) -> Option<TargetPlan> {
    let first = inputs.iter().find(|i| i.active())?;
    // Candidate sizes come from the first active output; every other
    // active output must offer the same size.
    let mut best: Option<(u32, u32)> = None;
    for m in first.modes {
        let size = (m.hdisplay, m.vdisplay);
        if best.is_some_and(|(w, h)| w as u64 * h as u64 >= m.area()) {
            continue;
        }
        let shared = inputs.iter().filter(|i| i.active()).all(|i| {
            i.modes
                .iter()
                .any(|c| (c.hdisplay, c.vdisplay) == size)
        });
        if shared {
            best = Some(size);
        }
    }
    let size = best?;
    trace!(width = size.0, height = size.1, "common size found");
    Some(plan_for_size(inputs, size, TargetLayout::Cloned))
}

fn aspect(mode: &Mode) -> f64 {
    mode.hdisplay as f64 / mode.vdisplay.max(1) as f64
}

fn aspect_close(a: f64, b: f64) -> bool {
    (a - b).abs() < ASPECT_TOLERANCE
}

fn try_common_aspect(inputs: &[TargetInput<'_>]) -> Option<TargetPlan> {
    let first = inputs.iter().find(|i| i.active())?;
    // Candidate aspects: the first output's own modes, plus 4:3.
    let mut candidates: Vec<f64> = first.modes.iter().map(aspect).collect();
    candidates.push(4.0 / 3.0);

    let mut best: Option<(u64, Vec<Option<Mode>>)> = None;
    for &target_aspect in &candidates {
        let mut choices = Vec::with_capacity(inputs.len());
        let mut min_area = u64::MAX;
        let mut feasible = true;
        for input in inputs {
            if !input.active() {
                choices.push(None);
                continue;
            }
            match input
                .modes
                .iter()
                .filter(|m| aspect_close(aspect(m), target_aspect))
                .max_by_key(|m| m.area())
            {
                Some(m) => {
                    min_area = min_area.min(m.area());
                    choices.push(Some(m.clone()));
                }
                None => {
                    feasible = false;
                    break;
                }
            }
        }
        if feasible && best.as_ref().map_or(true, |(a, _)| min_area > *a) {
            best = Some((min_area, choices));
        }
    }
    best.map(|(_, choices)| TargetPlan {
        choices,
        layout: TargetLayout::Cloned,
    })
}

fn try_closest_match(inputs: &[TargetInput<'_>]) -> Option<TargetPlan> {
    // The single most preferred mode anywhere becomes the target.
    let target = inputs
        .iter()
        .filter(|i| i.active())
        .filter_map(|i| i.native_preferred())
        .max_by_key(|m| (m.is_preferred(), m.kind.contains(ModeTypeBit::Default), m.area()))?
        .clone();
    trace!(target = %target.display_name(), "closest-match target");

    let choices = inputs
        .iter()
        .map(|input| {
            if !input.active() {
                return None;
            }
            input
                .modes
                .iter()
                .min_by_key(|m| m.area().abs_diff(target.area()))
                .cloned()
        })
        .collect();
    Some(TargetPlan {
        choices,
        layout: TargetLayout::Cloned,
    })
}

fn plan_for_size(inputs: &[TargetInput<'_>], size: (u32, u32), layout: TargetLayout) -> TargetPlan {
    let choices = inputs
        .iter()
        .map(|input| {
            if !input.active() {
                return None;
            }
            // Lists are sorted preferred-first, so the first hit is the
            // best copy at that size.
            input
                .modes
                .iter()
                .find(|m| (m.hdisplay, m.vdisplay) == size)
                .cloned()
        })
        .collect();
    TargetPlan { choices, layout }
}
