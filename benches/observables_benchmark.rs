use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use finalstate::prelude::*;

fn four_lepton_state() -> FinalState4 {
    let daughters = std::array::from_fn(|i| {
        let phi = 1.5 * i as f64 - 2.0;
        let pt = 40.0 - 7.0 * i as f64;
        let (charge, pdg_id) = if i % 2 == 0 { (-1, 13) } else { (1, -13) };
        let p4 = Vec4::from_pt_eta_phi_m(pt, 0.3 * i as f64, phi, 0.105);
        Arc::new(
            Candidate::new(p4, charge, pdg_id)
                .with_shifted_p4("es+", Vec4::from_pt_eta_phi_m(1.01 * pt, 0.3 * i as f64, phi, 0.105))
                .with_shifted_p4("es-", Vec4::from_pt_eta_phi_m(0.99 * pt, 0.3 * i as f64, phi, 0.105)),
        )
    });
    FinalState4::new(
        daughters,
        Arc::new(
            MissingEnergy::new(Vec4::new(15.0, -5.0, 0.0, 250.0_f64.sqrt()))
                .with_variant("uncl+", Vec4::new(17.0, -4.0, 0.0, 305.0_f64.sqrt())),
        ),
        Arc::new(Vertex::new(0.01, -0.02, 1.3, 60.0)),
        Arc::new(TriggerEvent::default()),
    )
}

fn tagged_observables_benchmark(c: &mut Criterion) {
    let fs = four_lepton_state();
    c.bench_function("vis p4 tagged", |b| {
        b.iter(|| black_box(fs.vis_p4_tagged(black_box("es+, @, #, es-")).unwrap()));
    });
    c.bench_function("indices by pt", |b| {
        b.iter(|| black_box(fs.indices_by_pt(black_box("es-,es+,@,@")).unwrap()));
    });
    c.bench_function("smallest delta r", |b| {
        b.iter(|| black_box(fs.smallest_delta_r().unwrap()));
    });
    c.bench_function("mt met tagged", |b| {
        b.iter(|| black_box(fs.mt_met_tagged(0, black_box("es+"), black_box("uncl+")).unwrap()));
    });
}

fn collection_benchmark(c: &mut Criterion) {
    let collection: FinalStateCollection = (0..256)
        .map(|_| Arc::new(four_lepton_state()) as Arc<dyn FinalState>)
        .collect();
    c.bench_function("collection vis p4s", |b| {
        b.iter(|| black_box(collection.vis_p4s(black_box("es+,es+,es+,es+")).unwrap()));
    });
}

criterion_group!(benches, tagged_observables_benchmark, collection_benchmark);
criterion_main!(benches);
