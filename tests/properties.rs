//! Property tests over the decoder, solvers, and the assigner.

mod common;

use proptest::prelude::*;

use lamco_modeset::assign::{pick_crtcs, Candidate};
use lamco_modeset::modes::{dmt, CatalogOptions, ModeCatalog};
use lamco_modeset::topology::{Connection, Crtc, Output, OutputId, Topology};
use lamco_modeset::transform::{
    invert_rotation, map_dest_to_src, rotation_identity, rotation_swaps_axes, Rotation,
    RotationFlag,
};
use lamco_modeset::validate::{
    nearest_clock, realized_clock, scanline_pitch, ClockRange, PitchParams,
};

proptest! {
    /// Any single-byte corruption of a valid base block is a hard
    /// decode error: either the header no longer matches or the
    /// checksum no longer balances.
    #[test]
    fn prop_decode_rejects_corruption(index in 0usize..128, delta in 1u8..=255) {
        let good = common::edid_1080p();
        let mut bad = good.clone();
        bad[index] = bad[index].wrapping_add(delta);
        prop_assert!(lamco_modeset::edid::decode(&bad).is_err());
    }

    /// Duplicating the driver mode list does not change the catalog.
    #[test]
    fn prop_catalog_ignores_duplicates(copies in 2usize..5) {
        let base = dmt::fallback_modes();
        let once = ModeCatalog::build(None, &CatalogOptions {
            driver_modes: base.clone(),
            ..Default::default()
        });
        let mut repeated = Vec::new();
        for _ in 0..copies {
            repeated.extend(base.iter().cloned());
        }
        let many = ModeCatalog::build(None, &CatalogOptions {
            driver_modes: repeated,
            ..Default::default()
        });
        let names = |c: &ModeCatalog| -> Vec<String> {
            c.modes().iter().map(|m| m.display_name()).collect()
        };
        prop_assert_eq!(names(&once), names(&many));
    }

    /// When the target is in the table, the solver realizes it exactly.
    #[test]
    fn prop_clock_solver_exact_hit(
        mut table in prop::collection::vec(1_000u32..400_000, 1..16),
        pick in 0usize..16,
    ) {
        let target = table[pick % table.len()];
        table.sort_unstable();
        let range = ClockRange::default();
        let choice = nearest_clock(&table, target, &range).unwrap();
        prop_assert_eq!(realized_clock(&table, &range, choice), target);
    }

    /// A single-entry table is always chosen, whatever the target.
    #[test]
    fn prop_clock_solver_single_entry(entry in 1u32..400_000, target in 1u32..400_000) {
        let range = ClockRange::default();
        let choice = nearest_clock(&[entry], target, &range).unwrap();
        prop_assert_eq!(choice.index, 0);
        prop_assert!(!choice.div2);
    }

    /// The negotiated pitch covers the width, honors the floor, and
    /// keeps the padding alignment.
    #[test]
    fn prop_pitch_alignment(
        width in 1u32..4096,
        height in 1u32..2160,
        min_pitch in 0u32..5000,
    ) {
        let params = PitchParams::default();
        let pitch = scanline_pitch(width, height, min_pitch, &params).unwrap();
        prop_assert!(pitch >= width);
        prop_assert!(pitch >= min_pitch);
        // 32 bpp with 32-bit padding and 8-pixel units: the pitch is a
        // multiple of 8 pixels.
        prop_assert_eq!(pitch % 8, 0);
    }

    /// Without bank constraints the pitch is the smallest aligned value
    /// covering both the width and the floor.
    #[test]
    fn prop_pitch_minimality(width in 1u32..4096, min_pitch in 0u32..5000) {
        let params = PitchParams::default();
        let pitch = scanline_pitch(width, 1080, min_pitch, &params).unwrap();
        prop_assert!(pitch < width.max(min_pitch) + 8);
    }

    /// A bank constraint can only push the pitch up, never down.
    #[test]
    fn prop_bank_constraint_monotonic(
        width in 1u32..2048,
        bank_shift in 16u32..22,
    ) {
        let free = PitchParams::default();
        let banked = PitchParams {
            bank_size: 1 << bank_shift,
            ..Default::default()
        };
        let base = scanline_pitch(width, 768, 0, &free).unwrap();
        if let Some(constrained) = scanline_pitch(width, 768, 0, &banked) {
            prop_assert!(constrained >= base);
        }
    }

    /// With unrestricted masks and no cloning, the assigner always
    /// drives min(outputs, crtcs) outputs.
    #[test]
    fn prop_assignment_completeness(outputs in 1usize..5, crtcs in 1usize..5) {
        let mode = dmt::find_any(1024, 768, 60).unwrap();
        let mut topo = Topology::new();
        for _ in 0..crtcs {
            topo.add_crtc(Crtc::new());
        }
        for i in 0..outputs {
            let mut out = Output::new(format!("out-{i}"));
            out.connection = Connection::Connected;
            out.possible_crtcs = ((1u64 << crtcs) - 1) as u32;
            topo.add_output(out);
        }
        let candidates: Vec<Candidate> = (0..outputs)
            .map(|i| Candidate::new(
                &topo,
                OutputId(i),
                mode.clone(),
                (i as i32) * 1024,
                0,
                rotation_identity(),
            ))
            .collect();
        let assignment = pick_crtcs(&topo, &candidates).unwrap();
        let driven = assignment.crtcs.iter().filter(|c| c.is_some()).count();
        prop_assert_eq!(driven, outputs.min(crtcs));
    }

    /// Mapping a pixel through a rotation and then through its inverse
    /// lands back on the same pixel.
    #[test]
    fn prop_rotation_roundtrip(
        degrees_index in 0usize..4,
        reflect_x in any::<bool>(),
        reflect_y in any::<bool>(),
        width in 1u32..64,
        height in 1u32..64,
        seed_x in 0u32..64,
        seed_y in 0u32..64,
    ) {
        let turn = [
            RotationFlag::Rotate0,
            RotationFlag::Rotate90,
            RotationFlag::Rotate180,
            RotationFlag::Rotate270,
        ][degrees_index];
        let mut rotation: Rotation = turn.into();
        if reflect_x {
            rotation |= RotationFlag::ReflectX;
        }
        if reflect_y {
            rotation |= RotationFlag::ReflectY;
        }
        let (dest_w, dest_h) = if rotation_swaps_axes(rotation) {
            (height, width)
        } else {
            (width, height)
        };
        let (dx, dy) = (seed_x % dest_w, seed_y % dest_h);

        let src = map_dest_to_src(rotation, width, height, dx, dy);
        let inverse = invert_rotation(rotation);
        let back = map_dest_to_src(inverse, dest_w, dest_h, src.0, src.1);
        prop_assert_eq!(back, (dx, dy));
    }
}
