//! # lamco-modeset
//!
//! Display configuration engine: EDID decoding, mode cataloging and
//! validation, CRTC assignment, and the scanout transform machinery
//! that backs rotated and reflected outputs.
//!
//! # Architecture
//!
//! ```text
//! lamco-modeset
//!   ├─> EDID Decoder (base block, CEA extensions, quirks)
//!   ├─> Mode Catalog (detailed timings, DMT/CVT/GTF synthesis, dedup)
//!   ├─> Validator (sync ranges, bandwidth, clock solver, geometry)
//!   ├─> Assigner (target selection, positions, tiles, CRTC search)
//!   ├─> Transform Engine (rotation matrices, shadow surface, cursors)
//!   └─> Engine (one-call orchestration over a backend trait)
//! ```
//!
//! # Data Flow
//!
//! **Probe Path:** EDID bytes → [`edid::decode`] → [`modes::ModeCatalog`]
//! → [`validate::validate_all`] → per-mode [`modes::ModeStatus`]
//!
//! **Configure Path:** [`topology::Topology`] + [`config::DisplayConfig`]
//! → [`engine::Engine::validate`] → [`engine::Configuration`] →
//! [`engine::Engine::apply`] → [`backend::ModeSetBackend`]

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CRTC assignment, target selection, and position resolution
pub mod assign;

/// The hardware abstraction the engine programs
pub mod backend;

/// User-facing TOML configuration
pub mod config;

/// EDID parsing and monitor capability extraction
///
/// Handles base-block realignment and checksums, detailed timing
/// descriptors, monitor range/name/serial descriptors, established and
/// standard timing bitmaps, CVT 3-byte codes, CEA-861 extension blocks
/// (short video descriptors, HDMI vendor blocks), and the quirk table
/// for monitors that ship wrong data.
pub mod edid;

/// One-call configuration orchestration
pub mod engine;

/// Mode types, status codes, and the VESA/CEA timing generators
///
/// [`modes::Mode`] is the currency of the whole crate: the catalog
/// produces them, the validator stamps them, the assigner places them.
/// Synthesis covers the DMT table, CVT (plain and reduced-blanking),
/// GTF, and the CEA VIC table.
pub mod modes;

/// CRTCs, outputs, and connection state
pub mod topology;

/// Rotation algebra, the shadow surface, and cursor transforms
///
/// Rotation is a bitflag set ([`transform::RotationFlag`]) mirroring
/// common hardware capability masks. When the backend cannot scan out
/// a transform natively, [`transform::TransformEngine`] tracks the
/// shadow surface, the forward/inverse matrices, and damage mapping
/// between framebuffer and scanout coordinates.
pub mod transform;

/// Mode validation and framebuffer geometry
///
/// The validation pipeline runs a fixed order: geometry sanity, sync
/// ranges, bandwidth, the clock solver, the reduced-blanking check,
/// memory and pitch bounds, then the backend's own veto. Geometry
/// helpers negotiate pitch against padding, alignment, and bank
/// boundaries.
pub mod validate;
