//! lamco-modeset - Display mode configuration tool
//!
//! Entry point for the inspection binary: decode EDID blobs and dry-run
//! display layouts without touching hardware.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lamco_modeset::backend::{BackendError, CrtcCommit, ModeSetBackend};
use lamco_modeset::config::DisplayConfig;
use lamco_modeset::edid;
use lamco_modeset::engine::Engine;
use lamco_modeset::modes::{CatalogOptions, ModeCatalog};
use lamco_modeset::topology::{Connection, Crtc, Output, Topology};
use lamco_modeset::validate::{validate_all, Constraints};

/// Command-line arguments for lamco-modeset
#[derive(Parser, Debug)]
#[command(name = "lamco-modeset")]
#[command(version, about = "Display mode configuration tool", long_about = None)]
pub struct Args {
    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode an EDID blob and list the validated mode catalog
    Decode {
        /// Path to a raw EDID file (128-byte blocks)
        edid: PathBuf,
    },
    /// Dry-run a display layout from a configuration file
    Layout {
        /// Configuration file path
        config: PathBuf,
        /// Attach an output, as NAME=EDID_PATH (repeatable)
        #[arg(short, long = "output", value_name = "NAME=EDID")]
        outputs: Vec<String>,
        /// Number of CRTCs to model
        #[arg(long, default_value = "2")]
        crtcs: usize,
    },
}

/// A backend that accepts everything; the tool never programs hardware.
struct NullBackend;

impl ModeSetBackend for NullBackend {
    fn commit(&mut self, _commits: &[CrtcCommit<'_>]) -> Result<(), BackendError> {
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("BUILD_DATE"),
        commit = env!("GIT_HASH"),
        "lamco-modeset"
    );

    match args.command {
        Command::Decode { edid } => decode_command(&edid),
        Command::Layout {
            config,
            outputs,
            crtcs,
        } => layout_command(&config, &outputs, crtcs),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn decode_command(path: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let caps = edid::decode(&bytes).with_context(|| format!("decoding {}", path.display()))?;

    println!("Monitor: {}", caps.name.as_deref().unwrap_or("(unnamed)"));
    if let Some(serial) = &caps.serial_string {
        println!("Serial:  {}", serial);
    }
    println!(
        "Vendor:  {} product {:04x} (week {} year {})",
        caps.vendor.id, caps.vendor.product, caps.vendor.week, caps.vendor.year
    );
    if let lamco_modeset::edid::PhysicalSize::Millimeters { width, height } = caps.size {
        println!("Size:    {}mm x {}mm", width, height);
    }
    for range in &caps.hsync_ranges {
        println!("HSync:   {:.1}-{:.1} kHz", range.lo, range.hi);
    }
    for range in &caps.vrefresh_ranges {
        println!("VRefresh: {:.1}-{:.1} Hz", range.lo, range.hi);
    }
    if let Some(max) = caps.max_clock_khz {
        println!("Max dot clock: {} kHz", max);
    }
    let quirks = lamco_modeset::edid::quirks::lookup(&caps);
    if !quirks.is_empty() {
        println!("Quirks:  {:?}", quirks);
    }

    let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
    let mut modes = catalog.into_modes();
    let constraints = Constraints::from_caps(&caps);
    validate_all(&mut modes, &constraints, &[], &NullBackend);

    println!("\nModes:");
    for mode in &modes {
        println!(
            "  {:14} {:7} kHz  {:5.2} Hz  {:9?}{}",
            mode.display_name(),
            mode.clock,
            mode.vrefresh_hz(),
            mode.status,
            if mode.is_preferred() { "  preferred" } else { "" },
        );
    }
    Ok(())
}

fn layout_command(config_path: &PathBuf, outputs: &[String], crtcs: usize) -> Result<()> {
    let config = DisplayConfig::load(config_path)?;

    let mut topology = Topology::new();
    for _ in 0..crtcs.max(1) {
        topology.add_crtc(Crtc::new());
    }
    let crtc_mask = ((1u64 << crtcs.max(1).min(32)) - 1) as u32;
    let clone_mask = ((1u64 << outputs.len().min(32)) - 1) as u32;
    for pair in outputs {
        let (name, edid_path) = pair
            .split_once('=')
            .with_context(|| format!("expected NAME=EDID_PATH, got {:?}", pair))?;
        let bytes = std::fs::read(edid_path).with_context(|| format!("reading {}", edid_path))?;
        let mut output = Output::new(name);
        output.connection = Connection::Connected;
        output.possible_crtcs = crtc_mask;
        output.possible_clones = clone_mask;
        output.caps = match edid::decode(&bytes) {
            Ok(caps) => Some(caps),
            Err(e) => {
                tracing::warn!(output = name, error = %e, "EDID rejected");
                None
            }
        };
        topology.add_output(output);
    }
    anyhow::ensure!(!topology.outputs.is_empty(), "no outputs given (use --output)");

    let engine = Engine::new();
    let backend = NullBackend;
    let configuration = engine.validate(&topology, &config, &backend)?;

    println!(
        "Virtual: {}x{} pitch {}",
        configuration.virtual_size.width,
        configuration.virtual_size.height,
        configuration.virtual_size.pitch
    );
    for p in &configuration.placements {
        println!(
            "  {:8} {} on {} at ({}, {}){}",
            p.name,
            p.mode.display_name(),
            p.crtc,
            p.x,
            p.y,
            if p.shadow == lamco_modeset::transform::ShadowState::ShadowComposited {
                "  [shadow]"
            } else {
                ""
            },
        );
    }
    if !configuration.rejected.is_empty() {
        println!("\nRejected modes:");
        for (output, mode, reason) in &configuration.rejected {
            println!("  {:8} {:14} {}", output, mode, reason);
        }
    }
    Ok(())
}
