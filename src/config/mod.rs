//! Configuration management
//!
//! Handles loading and validation of display configuration from TOML
//! files. The configuration is the "already-parsed user intent" the
//! engine consumes: which outputs to enable, which mode and position
//! each should get, rotation, and per-output clock limits. Everything
//! is optional; an empty configuration means "probe and auto-layout
//! everything".

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::assign::Placement;
use crate::transform::{Rotation, RotationFlag};

/// Top-level display configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Fixed virtual framebuffer size; unset means grow to fit
    #[serde(default)]
    pub virtual_size: Option<(u32, u32)>,
    /// Never grow the framebuffer past `virtual_size`
    #[serde(default)]
    pub fixed_framebuffer: bool,
    /// Per-output configuration, keyed by connector name
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputConfig>,
}

/// Configuration for one output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Force the output on or off; unset follows connection state
    #[serde(default)]
    pub enable: Option<bool>,
    /// Preferred mode names, e.g. "1920x1080", most preferred first
    #[serde(default)]
    pub preferred_modes: Vec<String>,
    /// Explicit position in the framebuffer
    #[serde(default)]
    pub position: Option<(i32, i32)>,
    /// Relative placement, e.g. `right-of = "DP-1"`
    #[serde(default)]
    pub right_of: Option<String>,
    /// See `right_of`
    #[serde(default)]
    pub left_of: Option<String>,
    /// See `right_of`
    #[serde(default)]
    pub above: Option<String>,
    /// See `right_of`
    #[serde(default)]
    pub below: Option<String>,
    /// Rotation: "normal", "left", "right", "inverted", with optional
    /// "reflect-x"/"reflect-y" suffixes
    #[serde(default)]
    pub rotation: Option<String>,
    /// Clone the named output instead of extending
    #[serde(default)]
    pub clone_of: Option<String>,
    /// Minimum acceptable pixel clock, kHz
    #[serde(default)]
    pub min_clock_khz: Option<u32>,
    /// Maximum acceptable pixel clock, kHz
    #[serde(default)]
    pub max_clock_khz: Option<u32>,
    /// Skip the monitor's EDID entirely
    #[serde(default)]
    pub ignore_edid: bool,
}

impl DisplayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DisplayConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if let Some((w, h)) = self.virtual_size {
            if w == 0 || h == 0 {
                bail!("Virtual size must be non-zero: {}x{}", w, h);
            }
        }
        if self.fixed_framebuffer && self.virtual_size.is_none() {
            bail!("fixed_framebuffer requires virtual_size");
        }

        for (name, output) in &self.outputs {
            let relatives = [
                &output.right_of,
                &output.left_of,
                &output.above,
                &output.below,
            ];
            let relative_count = relatives.iter().filter(|r| r.is_some()).count();
            if relative_count > 1 {
                bail!("Output {name}: at most one relative placement allowed");
            }
            if relative_count == 1 && output.position.is_some() {
                bail!("Output {name}: position and relative placement are exclusive");
            }
            for anchor in relatives.into_iter().flatten() {
                if anchor == name {
                    bail!("Output {name}: cannot be placed relative to itself");
                }
                if !self.outputs.contains_key(anchor) {
                    bail!("Output {name}: placement names unknown output {anchor}");
                }
            }
            if let Some(rotation) = &output.rotation {
                parse_rotation(rotation)
                    .with_context(|| format!("Output {name}: invalid rotation"))?;
            }
            if let (Some(min), Some(max)) = (output.min_clock_khz, output.max_clock_khz) {
                if min > max {
                    bail!("Output {name}: min_clock_khz {min} exceeds max_clock_khz {max}");
                }
            }
            if let Some(clone) = &output.clone_of {
                if !self.outputs.contains_key(clone) {
                    bail!("Output {name}: clone_of names unknown output {clone}");
                }
            }
        }
        Ok(())
    }

    /// Configuration for one output, defaults when absent.
    pub fn output(&self, name: &str) -> OutputConfig {
        self.outputs.get(name).cloned().unwrap_or_default()
    }
}

impl OutputConfig {
    /// The placement this configuration asks for.
    pub fn placement(&self) -> Placement {
        if let Some((x, y)) = self.position {
            return Placement::At(x, y);
        }
        if let Some(anchor) = &self.right_of {
            return Placement::RightOf(anchor.clone());
        }
        if let Some(anchor) = &self.left_of {
            return Placement::LeftOf(anchor.clone());
        }
        if let Some(anchor) = &self.above {
            return Placement::Above(anchor.clone());
        }
        if let Some(anchor) = &self.below {
            return Placement::Below(anchor.clone());
        }
        Placement::Auto
    }

    /// The configured rotation, identity when unset.
    pub fn rotation(&self) -> Result<Rotation> {
        match &self.rotation {
            Some(s) => parse_rotation(s),
            None => Ok(RotationFlag::Rotate0.into()),
        }
    }
}

/// Parse a rotation string: one orientation word plus optional
/// reflection suffixes, whitespace separated.
pub fn parse_rotation(s: &str) -> Result<Rotation> {
    let mut rotation: Option<RotationFlag> = None;
    let mut reflect = Rotation::empty();
    for word in s.split_whitespace() {
        match word {
            "normal" => rotation = Some(RotationFlag::Rotate0),
            "left" => rotation = Some(RotationFlag::Rotate90),
            "inverted" => rotation = Some(RotationFlag::Rotate180),
            "right" => rotation = Some(RotationFlag::Rotate270),
            "reflect-x" => reflect |= RotationFlag::ReflectX,
            "reflect-y" => reflect |= RotationFlag::ReflectY,
            other => bail!("Unknown rotation word: {other}"),
        }
    }
    let base = rotation.unwrap_or(RotationFlag::Rotate0);
    Ok(Rotation::from(base) | reflect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_valid() {
        let config: DisplayConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.outputs.is_empty());
    }

    #[test]
    fn test_full_output_section_parses() {
        let config: DisplayConfig = toml::from_str(
            r#"
            virtual_size = [3840, 1080]

            [outputs.DP-1]
            enable = true
            preferred_modes = ["1920x1080"]
            position = [0, 0]
            rotation = "normal"

            [outputs.DP-2]
            right_of = "DP-1"
            rotation = "left reflect-x"
            min_clock_khz = 25000
            max_clock_khz = 300000
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        let dp2 = config.output("DP-2");
        assert_eq!(dp2.placement(), Placement::RightOf("DP-1".into()));
        let rotation = dp2.rotation().unwrap();
        assert!(rotation.contains(RotationFlag::Rotate90));
        assert!(rotation.contains(RotationFlag::ReflectX));
    }

    #[test]
    fn test_conflicting_placement_rejected() {
        let config: DisplayConfig = toml::from_str(
            r#"
            [outputs.DP-1]
            position = [0, 0]
            right_of = "DP-2"

            [outputs.DP-2]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_anchor_rejected() {
        let config: DisplayConfig = toml::from_str(
            r#"
            [outputs.DP-1]
            right_of = "GHOST"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_clock_limits_rejected() {
        let config: DisplayConfig = toml::from_str(
            r#"
            [outputs.DP-1]
            min_clock_khz = 300000
            max_clock_khz = 25000
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_rotation_rejected() {
        assert!(parse_rotation("sideways").is_err());
        assert!(parse_rotation("left reflect-x").is_ok());
    }

    #[test]
    fn test_fixed_framebuffer_needs_size() {
        let config: DisplayConfig = toml::from_str("fixed_framebuffer = true").unwrap();
        assert!(config.validate().is_err());
    }
}
