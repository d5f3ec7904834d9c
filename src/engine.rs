//! Configuration Engine
//!
//! Ties the pipeline together: per-output mode catalogs, validation,
//! enablement, target selection, position resolution, CRTC assignment,
//! tile placement, and virtual-size negotiation. One call to
//! [`Engine::validate`] runs the whole flow synchronously on the
//! caller's thread and returns the best configuration found, plus one
//! diagnostic per rejected mode.
//!
//! ```text
//! EDID -> catalog -> validator -> targets -> positions -> pick_crtcs
//!                                                             |
//!                virtual size <- tiles <- placements <---------
//! ```
//!
//! The engine holds no state between calls and takes no locks; the
//! caller serializes reconfiguration (including hot-plug rescans) and
//! owns every `Topology` it passes in.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assign::{
    pick_crtcs, resolve_positions, select_targets, tile_positions, AssignError, Candidate,
    Placement, PositionRequest, TargetInput, TargetLayout,
};
use crate::backend::{BackendError, CrtcCommit, ModeSetBackend};
use crate::config::DisplayConfig;
use crate::modes::{CatalogOptions, Mode, ModeCatalog, ModeTypeBit};
use crate::topology::{Connection, CrtcId, OutputId, Topology};
use crate::transform::{
    rotation_identity, rotation_swaps_axes, Rotation, ShadowState, TransformEngine,
};
use crate::validate::{
    negotiate_virtual_size, validate_all, ClockRange, Constraints, GeometryError, PitchParams,
    VirtualBounds, VirtualSize,
};

/// Hard failures of a configuration pass.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// Geometry negotiation failed
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// No output could be enabled
    #[error(transparent)]
    Assign(#[from] AssignError),
    /// Configuration is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// One enabled output in the final configuration.
#[derive(Debug, Clone)]
pub struct OutputPlacement {
    /// The output
    pub output: OutputId,
    /// Connector name
    pub name: String,
    /// CRTC driving it
    pub crtc: CrtcId,
    /// Chosen mode
    pub mode: Mode,
    /// Applied rotation
    pub rotation: Rotation,
    /// Framebuffer x
    pub x: i32,
    /// Framebuffer y
    pub y: i32,
    /// Whether scanout needs the shadow compositor
    pub shadow: ShadowState,
}

/// The outcome of one configuration pass.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Negotiated framebuffer geometry
    pub virtual_size: VirtualSize,
    /// Enabled outputs with their CRTCs
    pub placements: Vec<OutputPlacement>,
    /// `(output, mode, reason)` per rejected mode
    pub rejected: Vec<(String, String, &'static str)>,
}

impl Configuration {
    /// The placement for a named output, if enabled.
    pub fn placement(&self, name: &str) -> Option<&OutputPlacement> {
        self.placements.iter().find(|p| p.name == name)
    }
}

/// The engine. Stateless; exists to group the pipeline behind one
/// entry point and carry framebuffer settings.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    /// Pixel format and layout constraints for pitch negotiation
    pub pitch: PitchParams,
    /// Bounds on the virtual framebuffer
    pub bounds: VirtualBounds,
}

impl Engine {
    /// An engine with default 32bpp framebuffer parameters.
    pub fn new() -> Self {
        Engine::default()
    }

    /// Run a full configuration pass.
    ///
    /// Reads the topology's probed outputs and decoded EDIDs, applies
    /// the user configuration, and returns the best achievable
    /// configuration. Per-mode rejections are diagnostics, never
    /// failures; only geometry exhaustion or a completely unroutable
    /// topology error out.
    pub fn validate(
        &self,
        topology: &Topology,
        config: &DisplayConfig,
        backend: &dyn ModeSetBackend,
    ) -> Result<Configuration, ConfigureError> {
        config
            .validate()
            .map_err(|e| ConfigureError::Config(e.to_string()))?;

        let mut rejected = Vec::new();

        // Per-output candidate lists, validated.
        let mut catalogs: Vec<Vec<Mode>> = Vec::with_capacity(topology.outputs.len());
        for (i, output) in topology.outputs.iter().enumerate() {
            let output_config = config.output(&output.name);
            let caps = if output_config.ignore_edid {
                None
            } else {
                output.caps.as_ref()
            };
            let options = CatalogOptions {
                driver_modes: output.modes.clone(),
                include_fallback: output.usable(),
                ..Default::default()
            };
            let catalog = ModeCatalog::build(caps, &options);
            let mut modes = catalog.into_modes();

            let mut constraints = caps.map(Constraints::from_caps).unwrap_or_default();
            if let Some(max) = output_config.max_clock_khz {
                constraints.max_clock_khz = max;
            }
            let ranges = [ClockRange::spanning(
                output_config.min_clock_khz.unwrap_or(0),
                output_config.max_clock_khz.unwrap_or(u32::MAX),
            )];
            let report = validate_all(&mut modes, &constraints, &ranges, backend);
            for (mode_name, reason) in report.rejected {
                rejected.push((topology.outputs[i].name.clone(), mode_name, reason));
            }
            modes.retain(|m| m.status.is_ok());

            // Everything the monitor offered failed: fall back to the
            // built-in set and give those a chance too.
            if modes.is_empty() && output.usable() {
                let fallback = ModeCatalog::build(
                    None,
                    &CatalogOptions {
                        include_fallback: true,
                        ..Default::default()
                    },
                );
                let mut extra = fallback.into_modes();
                validate_all(&mut extra, &constraints, &ranges, backend);
                extra.retain(|m| m.status.is_ok());
                if !extra.is_empty() {
                    warn!(
                        output = %output.name,
                        "no probed mode validated, using built-in fallbacks"
                    );
                }
                modes = extra;
            }
            catalogs.push(modes);
        }

        // Enablement: config override, else connected, else (when
        // nothing is definitely connected) anything not definitely
        // disconnected.
        let any_connected = topology
            .outputs
            .iter()
            .any(|o| matches!(o.connection, Connection::Connected));
        let enabled: Vec<bool> = topology
            .outputs
            .iter()
            .enumerate()
            .map(|(i, o)| {
                if catalogs[i].is_empty() {
                    return false;
                }
                match config.output(&o.name).enable {
                    Some(forced) => forced,
                    None if any_connected => matches!(o.connection, Connection::Connected),
                    None => o.usable(),
                }
            })
            .collect();

        // Target modes.
        let user_preferred: Vec<Option<Mode>> = topology
            .outputs
            .iter()
            .enumerate()
            .map(|(i, o)| {
                config
                    .output(&o.name)
                    .preferred_modes
                    .iter()
                    .find_map(|name| {
                        catalogs[i]
                            .iter()
                            .find(|m| m.display_name() == *name)
                            .cloned()
                    })
            })
            .collect();
        let inputs: Vec<TargetInput<'_>> = topology
            .outputs
            .iter()
            .enumerate()
            .map(|(i, o)| TargetInput {
                name: &o.name,
                enabled: enabled[i],
                connected: matches!(o.connection, Connection::Connected),
                modes: &catalogs[i],
                user_preferred: user_preferred[i].as_ref(),
                prefers_clone: config.output(&o.name).clone_of.is_some(),
            })
            .collect();
        let plan = select_targets(&inputs);

        // Rotations, then positions in rotated dimensions.
        let rotations: Vec<Rotation> = topology
            .outputs
            .iter()
            .map(|o| {
                config.output(&o.name).rotation().unwrap_or_else(|e| {
                    warn!(output = %o.name, error = %e, "ignoring invalid rotation");
                    rotation_identity()
                })
            })
            .collect();
        // Explicit placement in the configuration overrides whatever
        // layout the strategy ladder proposed.
        let layout = if topology
            .outputs
            .iter()
            .any(|o| config.output(&o.name).placement() != Placement::Auto)
        {
            TargetLayout::Configured
        } else {
            plan.layout
        };
        let positions = self.layout_positions(topology, config, &plan.choices, &rotations, layout);

        // CRTC assignment over the enabled outputs that got a target.
        let mut candidates = Vec::new();
        for (i, choice) in plan.choices.iter().enumerate() {
            let Some(mode) = choice else { continue };
            let (x, y) = positions[i];
            candidates.push(Candidate::new(
                topology,
                OutputId(i),
                mode.clone(),
                x,
                y,
                rotations[i],
            ));
        }
        let assignment = pick_crtcs(topology, &candidates)?;

        // Build placements, with the tile sub-pass overriding positions
        // for tile-group members.
        let mut placements = Vec::new();
        for (idx, crtc) in assignment.crtcs.iter().enumerate() {
            let Some(crtc) = crtc else { continue };
            let candidate = &candidates[idx];
            let output = &topology.outputs[candidate.output.0];
            placements.push(OutputPlacement {
                output: candidate.output,
                name: output.name.clone(),
                crtc: *crtc,
                mode: candidate.mode.clone(),
                rotation: candidate.rotation,
                x: candidate.x,
                y: candidate.y,
                shadow: ShadowState::Off,
            });
        }
        self.apply_tile_positions(topology, &mut placements);

        // Shadow decisions. A rotation the CRTC can scan out natively
        // never needs the shadow path.
        for placement in &mut placements {
            let crtc = &topology.crtcs[placement.crtc.0];
            let native = backend.handles_transforms()
                || crtc.supported_rotations.contains(placement.rotation);
            let mut engine = if native {
                TransformEngine::with_backend_transforms()
            } else {
                TransformEngine::default()
            };
            placement.shadow = engine.set_transform(
                placement.mode.hdisplay,
                placement.mode.vdisplay,
                placement.x,
                placement.y,
                placement.rotation,
                None,
                None,
            );
        }

        let virtual_size = self.settle_virtual_size(config, &mut placements)?;
        info!(
            outputs = placements.len(),
            width = virtual_size.width,
            height = virtual_size.height,
            pitch = virtual_size.pitch,
            "configuration ready"
        );
        Ok(Configuration {
            virtual_size,
            placements,
            rejected,
        })
    }

    /// Program a configuration through the backend and mirror it into
    /// the topology.
    pub fn apply(
        &self,
        topology: &mut Topology,
        configuration: &Configuration,
        backend: &mut dyn ModeSetBackend,
    ) -> Result<(), BackendError> {
        let commits: Vec<CrtcCommit<'_>> = configuration
            .placements
            .iter()
            .map(|p| CrtcCommit {
                crtc: p.crtc,
                mode: Some(&p.mode),
                x: p.x,
                y: p.y,
                rotation: p.rotation,
            })
            .collect();
        backend.commit(&commits)?;

        for crtc in &mut topology.crtcs {
            crtc.mode = None;
            crtc.outputs.clear();
        }
        for output in &mut topology.outputs {
            output.crtc = None;
        }
        for p in &configuration.placements {
            let crtc = &mut topology.crtcs[p.crtc.0];
            crtc.mode = Some(p.mode.clone());
            crtc.x = p.x;
            crtc.y = p.y;
            crtc.rotation = p.rotation;
            crtc.outputs.push(p.output);
            topology.outputs[p.output.0].crtc = Some(p.crtc);
        }
        debug!(crtcs = commits.len(), "configuration committed");
        Ok(())
    }

    /// Rotated footprint of a mode.
    fn footprint(mode: &Mode, rotation: Rotation) -> (u32, u32) {
        if rotation_swaps_axes(rotation) {
            (mode.vdisplay, mode.hdisplay)
        } else {
            (mode.hdisplay, mode.vdisplay)
        }
    }

    fn layout_positions(
        &self,
        topology: &Topology,
        config: &DisplayConfig,
        choices: &[Option<Mode>],
        rotations: &[Rotation],
        layout: TargetLayout,
    ) -> Vec<(i32, i32)> {
        match layout {
            TargetLayout::SideBySide => {
                // Left-to-right in index order; tile-group members are
                // re-placed afterwards.
                let mut x = 0i32;
                choices
                    .iter()
                    .enumerate()
                    .map(|(i, c)| match c {
                        Some(mode) => {
                            let pos = (x, 0);
                            x += Self::footprint(mode, rotations[i]).0 as i32;
                            pos
                        }
                        None => (0, 0),
                    })
                    .collect()
            }
            TargetLayout::Cloned => vec![(0, 0); choices.len()],
            TargetLayout::Configured => {
                let requests: Vec<PositionRequest> = topology
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(i, o)| {
                        let (w, h) = choices[i]
                            .as_ref()
                            .map(|m| Self::footprint(m, rotations[i]))
                            .unwrap_or((0, 0));
                        PositionRequest {
                            name: o.name.clone(),
                            width: w,
                            height: h,
                            placement: config.output(&o.name).placement(),
                        }
                    })
                    .collect();
                resolve_positions(&requests)
            }
        }
    }

    fn apply_tile_positions(&self, topology: &Topology, placements: &mut [OutputPlacement]) {
        let mut done: Vec<u32> = Vec::new();
        for i in 0..placements.len() {
            let Some(tile) = topology.outputs[placements[i].output.0].tile else {
                continue;
            };
            if done.contains(&tile.group) {
                continue;
            }
            done.push(tile.group);
            let group = topology.tile_group(placements[i].output);
            let origin = (placements[i].x, placements[i].y);
            for (output, (x, y)) in tile_positions(topology, &group, origin) {
                if let Some(p) = placements.iter_mut().find(|p| p.output == output) {
                    p.x = x;
                    p.y = y;
                }
            }
        }
    }

    /// Union the placements into a virtual size (honoring a fixed
    /// framebuffer) and negotiate the pitch.
    fn settle_virtual_size(
        &self,
        config: &DisplayConfig,
        placements: &mut Vec<OutputPlacement>,
    ) -> Result<VirtualSize, GeometryError> {
        let union = placements.iter().fold((1u32, 1u32), |(w, h), p| {
            let (pw, ph) = Self::footprint(&p.mode, p.rotation);
            (
                w.max((p.x.max(0) as u32).saturating_add(pw)),
                h.max((p.y.max(0) as u32).saturating_add(ph)),
            )
        });

        let (width, height) = match config.virtual_size {
            Some((w, h)) if config.fixed_framebuffer => {
                if union.0 > w || union.1 > h {
                    self.shrink_to_fit(placements, (w, h));
                }
                (w, h)
            }
            Some((w, h)) => (union.0.max(w), union.1.max(h)),
            None => union,
        };

        negotiate_virtual_size(width, height, 8, &self.bounds, &self.pitch)
    }

    /// A fixed framebuffer smaller than the layout: keep the most
    /// preferred placements that fit, largest first by provenance.
    fn shrink_to_fit(&self, placements: &mut Vec<OutputPlacement>, bound: (u32, u32)) {
        // Provenance priority for the re-derivation: builtin+preferred,
        // builtin, driver+preferred, driver.
        let rank = |m: &Mode| -> u32 {
            let builtin = m.kind.contains(ModeTypeBit::Builtin);
            match (builtin, m.is_preferred()) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            }
        };
        placements.sort_by_key(|p| (rank(&p.mode), std::cmp::Reverse(p.mode.area())));
        placements.retain(|p| {
            let (w, h) = Self::footprint(&p.mode, p.rotation);
            let fits = (p.x.max(0) as u32 + w) <= bound.0 && (p.y.max(0) as u32 + h) <= bound.1;
            if !fits {
                warn!(
                    output = %p.name,
                    mode = %p.mode.display_name(),
                    "placement exceeds fixed framebuffer, dropping"
                );
            }
            fits
        });
        placements.sort_by_key(|p| p.output);
    }
}
