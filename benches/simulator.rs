use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowgrid::config::SimulatorConfig;
use flowgrid::load_yaml;
use flowgrid::SystemSimulator;

fn fixture(name: &str) -> &'static str {
    match name {
        "basic" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/basic.yaml"
        )),
        "nested" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/nested.yaml"
        )),
        "hub" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/hub.yaml"
        )),
        other => panic!("unknown fixture {other}"),
    }
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for name in ["basic", "nested", "hub"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| load_yaml(black_box(input)).expect("load"));
        });
    }
    group.finish();
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    let config = SimulatorConfig::default();
    for name in ["basic", "nested", "hub"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| {
                let output = load_yaml(black_box(input)).expect("load");
                let mut graph = output.system;
                black_box(SystemSimulator::compute(&mut graph, &config))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_compute);
criterion_main!(benches);
