//! Mode Pipeline Benchmarks
//!
//! Measures EDID decoding, catalog construction, and full-catalog
//! validation, plus the CRTC search at various topology sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use lamco_modeset::assign::{pick_crtcs, Candidate};
use lamco_modeset::backend::{BackendError, CrtcCommit, ModeSetBackend};
use lamco_modeset::edid;
use lamco_modeset::modes::{dmt, CatalogOptions, ModeCatalog};
use lamco_modeset::topology::{Connection, Crtc, Output, OutputId, Topology};
use lamco_modeset::transform::rotation_identity;
use lamco_modeset::validate::{validate_all, Constraints};

/// A base block with one preferred 1920x1080@60 detailed timing, a
/// range descriptor, and a populated standard-timing table.
fn bench_edid() -> Vec<u8> {
    let mut b = vec![0u8; 128];
    b[..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
    b[8] = 0x31;
    b[9] = 0xA3;
    b[10] = 0x34;
    b[11] = 0x12;
    b[12] = 0x01;
    b[16] = 10;
    b[17] = 30;
    b[18] = 1;
    b[19] = 4;
    b[20] = 0x80;
    b[21] = 60;
    b[22] = 34;
    b[23] = 120;
    b[24] = 0x02;
    // Established timings: the common VESA block.
    b[35] = 0xFF;
    b[36] = 0xFF;
    // Standard timings: 1280x1024@60, 1440x900@60, 1680x1050@60.
    b[38..44].copy_from_slice(&[0x81, 0x80, 0x95, 0x00, 0xB3, 0x00]);
    for slot in 3..8 {
        b[38 + slot * 2] = 0x01;
        b[39 + slot * 2] = 0x01;
    }
    b[54..72].copy_from_slice(&[
        0x02, 0x3A, 0x80, 0x18, 0x71, 0x38, 0x2D, 0x40, 0x58, 0x2C, 0x45, 0x00, 0x58, 0x54, 0x21,
        0x00, 0x00, 0x1E,
    ]);
    b[72..90].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFD, 0x00, 50, 76, 30, 90, 20, 0x00, 0x0A, 0x20, 0x20, 0x20, 0x20,
        0x20, 0x20,
    ]);
    b[90..108].copy_from_slice(&[
        0x00, 0x00, 0x00, 0xFC, 0x00, b'B', b'E', b'N', b'C', b'H', 0x0A, 0x20, 0x20, 0x20, 0x20,
        0x20, 0x20, 0x20,
    ]);
    b[108] = 0x00;
    b[111] = 0x10;
    let sum = b[..127].iter().fold(0u8, |acc, &v| acc.wrapping_add(v));
    b[127] = 0u8.wrapping_sub(sum);
    b
}

struct NullBackend;

impl ModeSetBackend for NullBackend {
    fn commit(&mut self, _commits: &[CrtcCommit<'_>]) -> Result<(), BackendError> {
        Ok(())
    }
}

fn bench_decode(c: &mut Criterion) {
    let bytes = bench_edid();
    c.bench_function("edid_decode", |b| {
        b.iter(|| edid::decode(black_box(&bytes)).unwrap())
    });
}

fn bench_catalog(c: &mut Criterion) {
    let caps = edid::decode(&bench_edid()).unwrap();
    c.bench_function("catalog_build", |b| {
        b.iter(|| ModeCatalog::build(black_box(Some(&caps)), &CatalogOptions::default()))
    });
}

fn bench_validate(c: &mut Criterion) {
    let caps = edid::decode(&bench_edid()).unwrap();
    let catalog = ModeCatalog::build(Some(&caps), &CatalogOptions::default());
    let constraints = Constraints::from_caps(&caps);
    let template = catalog.into_modes();
    c.bench_function("validate_catalog", |b| {
        b.iter_batched(
            || template.clone(),
            |mut modes| validate_all(&mut modes, &constraints, &[], &NullBackend),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_crtc_search(c: &mut Criterion) {
    let mode = dmt::find_any(1920, 1080, 60).unwrap();
    let mut group = c.benchmark_group("pick_crtcs");
    for size in [2usize, 4, 6] {
        let mut topo = Topology::new();
        for _ in 0..size {
            topo.add_crtc(Crtc::new());
        }
        for i in 0..size {
            let mut out = Output::new(format!("out-{i}"));
            out.connection = Connection::Connected;
            out.possible_crtcs = ((1u64 << size) - 1) as u32;
            topo.add_output(out);
        }
        let candidates: Vec<Candidate> = (0..size)
            .map(|i| {
                Candidate::new(
                    &topo,
                    OutputId(i),
                    mode.clone(),
                    (i as i32) * 1920,
                    0,
                    rotation_identity(),
                )
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| pick_crtcs(black_box(&topo), black_box(&candidates)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_catalog,
    bench_validate,
    bench_crtc_search
);
criterion_main!(benches);
