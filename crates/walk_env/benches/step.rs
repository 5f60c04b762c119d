use criterion::{criterion_group, criterion_main, Criterion};
use physics::{MockSim, MockSimConfig};
use walk_env::{LeggedEnv, WalkConfig, WalkTask, NUM_DOF};

fn bench_walk_step(c: &mut Criterion) {
    let mut config = WalkConfig::default();
    config.env.num_envs = 256;
    let sim = MockSim::new(MockSimConfig {
        num_envs: config.env.num_envs,
        ..MockSimConfig::default()
    });
    let task = WalkTask::new(&config).unwrap();
    let mut env = LeggedEnv::new(sim, task, config).unwrap();
    env.reset_all().unwrap();
    let actions = vec![0.1; env.num_envs() * NUM_DOF];

    c.bench_function("walk_step_256_envs", |b| {
        b.iter(|| env.step(&actions).unwrap());
    });
}

fn bench_reset(c: &mut Criterion) {
    let mut config = WalkConfig::default();
    config.env.num_envs = 256;
    let sim = MockSim::new(MockSimConfig {
        num_envs: config.env.num_envs,
        ..MockSimConfig::default()
    });
    let task = WalkTask::new(&config).unwrap();
    let mut env = LeggedEnv::new(sim, task, config).unwrap();
    let ids: Vec<usize> = (0..env.num_envs()).step_by(2).collect();

    c.bench_function("reset_half_of_256_envs", |b| {
        b.iter(|| env.reset(&ids).unwrap());
    });
}

criterion_group!(benches, bench_walk_step, bench_reset);
criterion_main!(benches);
