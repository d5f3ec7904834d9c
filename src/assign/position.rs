//! Initial Position Resolution
//!
//! Turns per-output position configuration — explicit coordinates or
//! placement relative to another named output — into concrete
//! framebuffer coordinates. Relative placements resolve iteratively
//! until every output settles; a dependency cycle drops the affected
//! outputs to (0, 0). The final layout is normalized so the minimum
//! coordinate is (0, 0).

use tracing::{debug, warn};

/// Where configuration wants an output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Placement {
    /// No opinion; lands at (0, 0) unless a later pass moves it
    #[default]
    Auto,
    /// Explicit framebuffer coordinates
    At(i32, i32),
    /// Immediately right of the named output
    RightOf(String),
    /// Immediately left of the named output
    LeftOf(String),
    /// Directly above the named output
    Above(String),
    /// Directly below the named output
    Below(String),
}

impl Placement {
    fn anchor(&self) -> Option<&str> {
        match self {
            Placement::RightOf(n)
            | Placement::LeftOf(n)
            | Placement::Above(n)
            | Placement::Below(n) => Some(n),
            _ => None,
        }
    }
}

/// One output entering position resolution.
#[derive(Debug, Clone)]
pub struct PositionRequest {
    /// Connector name, the anchor namespace for relative placement
    pub name: String,
    /// Target mode size (already rotated where applicable)
    pub width: u32,
    /// Target mode height
    pub height: u32,
    /// Configured placement
    pub placement: Placement,
}

/// Resolve every output's (x, y).
///
/// Returned coordinates are index-aligned with `requests` and
/// normalized to a (0, 0) minimum.
pub fn resolve_positions(requests: &[PositionRequest]) -> Vec<(i32, i32)> {
    let mut positions: Vec<Option<(i32, i32)>> = requests
        .iter()
        .map(|r| match r.placement {
            Placement::Auto => Some((0, 0)),
            Placement::At(x, y) => Some((x, y)),
            _ => None,
        })
        .collect();

    // Each pass settles every output whose anchor already settled; at
    // least one settles per productive pass, so `len` passes suffice.
    for _ in 0..requests.len() {
        let mut progressed = false;
        for (i, req) in requests.iter().enumerate() {
            if positions[i].is_some() {
                continue;
            }
            let Some(anchor_name) = req.placement.anchor() else {
                continue;
            };
            let Some(j) = requests.iter().position(|r| r.name == anchor_name) else {
                warn!(
                    output = %req.name,
                    anchor = anchor_name,
                    "relative placement names an unknown output, using (0, 0)"
                );
                positions[i] = Some((0, 0));
                progressed = true;
                continue;
            };
            let Some((ax, ay)) = positions[j] else {
                continue;
            };
            let anchor = &requests[j];
            positions[i] = Some(match req.placement {
                Placement::RightOf(_) => (ax + anchor.width as i32, ay),
                Placement::LeftOf(_) => (ax - req.width as i32, ay),
                Placement::Above(_) => (ax, ay - req.height as i32),
                Placement::Below(_) => (ax, ay + anchor.height as i32),
                _ => (ax, ay),
            });
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    // Anything still unresolved sits in a cycle.
    for (i, pos) in positions.iter_mut().enumerate() {
        if pos.is_none() {
            warn!(
                output = %requests[i].name,
                "relative placement cycle, falling back to (0, 0)"
            );
            *pos = Some((0, 0));
        }
    }

    let mut resolved: Vec<(i32, i32)> =
        positions.into_iter().map(|p| p.unwrap_or((0, 0))).collect();

    // Normalize to a (0, 0) origin.
    if let (Some(min_x), Some(min_y)) = (
        resolved.iter().map(|p| p.0).min(),
        resolved.iter().map(|p| p.1).min(),
    ) {
        for p in &mut resolved {
            p.0 -= min_x;
            p.1 -= min_y;
        }
    }
    debug!(?resolved, "initial positions resolved");
    resolved
}
