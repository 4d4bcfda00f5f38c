use carbonsense::model::{EmissionModel, TrainingParams};
use carbonsense::primitives::Matrix;
use carbonsense::synthetic::SyntheticGenerator;
use carbonsense::traits::{Estimator, Transformer};
use carbonsense::tree::RandomForestRegressor;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);

    for n_estimators in [10, 50, 100].iter() {
        let corpus = SyntheticGenerator::new(1_000)
            .with_seed(42)
            .generate()
            .expect("corpus");
        group.bench_with_input(
            BenchmarkId::from_parameter(n_estimators),
            n_estimators,
            |b, &n_estimators| {
                b.iter(|| {
                    let mut forest = RandomForestRegressor::new(n_estimators)
                        .with_max_depth(15)
                        .with_random_state(42);
                    forest
                        .fit(black_box(&corpus.inputs), black_box(&corpus.target))
                        .expect("fit");
                    forest
                });
            },
        );
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let params = TrainingParams {
        n_estimators: 100,
        ..TrainingParams::default()
    };
    let (model, _) = EmissionModel::train(&params).expect("train");
    let inputs = [15.5, 120.0, 18.0, 12.0, 6.0, 200.0];

    c.bench_function("predict_one", |b| {
        b.iter(|| model.predict_one(black_box(&inputs)).expect("predict"));
    });

    let rows: Vec<[f64; 6]> = (0..1_000)
        .map(|i| {
            let f = i as f64;
            [f % 50.0, f % 400.0, f % 30.0, f % 20.0, f % 15.0, f % 300.0]
        })
        .collect();
    let batch = Matrix::from_f64_rows(&rows, 6).expect("batch");
    let scaled = model.scaler().transform(&batch).expect("scale");
    c.bench_function("forest_predict_1k", |b| {
        b.iter(|| model.forest().predict(black_box(&scaled)).expect("predict"));
    });
}

criterion_group!(benches, bench_forest_fit, bench_predict);
criterion_main!(benches);
