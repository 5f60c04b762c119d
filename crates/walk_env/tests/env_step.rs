mod common;

use physics::MockSim;
use walk_env::{EnvError, LeggedEnv, WalkTask, NUM_DOF};

#[test]
fn reset_only_touches_selected_envs() {
    let mut env = common::mock_env(common::config(3));
    env.reset_all().unwrap();
    let zeros = vec![0.0; 3 * NUM_DOF];
    for _ in 0..5 {
        env.step(&zeros).unwrap();
    }

    let before = env.state().clone();
    let sim_roots = env.sim().state().root.clone();
    env.reset(&[1]).unwrap();
    let after = env.state();

    assert_eq!(after.episode_length[1], 0);
    assert_eq!(after.last_heading[1], after.heading[1]);
    for other in [0, 2] {
        assert_eq!(after.episode_length[other], before.episode_length[other]);
        assert_eq!(after.commands[other], before.commands[other]);
        assert_eq!(after.last_heading[other], before.last_heading[other]);
        assert_eq!(after.tensors.root[other], before.tensors.root[other]);
        assert_eq!(after.tensors.env_dofs(other), before.tensors.env_dofs(other));
        assert_eq!(env.sim().state().root[other], sim_roots[other]);
    }
}

#[test]
fn step_returns_batched_buffers() {
    let mut env = common::mock_env(common::config(2));
    let obs = env.reset_all().unwrap();
    assert_eq!(obs.len(), 2 * 47);

    let result = env.step(&vec![0.1; 2 * NUM_DOF]).unwrap();
    assert_eq!(result.obs.len(), 2 * env.obs_len());
    assert_eq!(result.rewards.len(), 2);
    assert_eq!(result.dones.len(), 2);
    assert_eq!(result.info.time_outs.len(), 2);
    assert!(result.rewards.iter().all(|r| r.is_finite()));
    for row in result.obs.chunks_exact(env.obs_len()) {
        let g = (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt();
        assert!((g - 1.0).abs() < 1e-4, "gravity norm {g}");
    }
    assert!(result.info.metrics.is_some());
}

#[test]
fn actions_are_clipped_and_stored() {
    let mut cfg = common::config(1);
    cfg.normalization.clip_actions = 0.5;
    let mut env = common::mock_env(cfg);
    env.reset_all().unwrap();
    let mut actions = vec![0.0; NUM_DOF];
    actions[0] = 3.0;
    actions[1] = -3.0;
    env.step(&actions).unwrap();
    assert_eq!(env.state().actions[0][0], 0.5);
    assert_eq!(env.state().actions[0][1], -0.5);
    assert_eq!(env.state().last_actions[0][0], 0.5);

    let recorded = env.diffusion_action();
    assert_eq!(recorded.len(), NUM_DOF);
    assert_eq!(recorded[..2], [0.5, -0.5]);
    let obs = env.diffusion_observation();
    assert_eq!(obs.len(), walk_env::observation::DIFFUSION_OBS_LEN);
    assert_eq!(obs[obs.len() - NUM_DOF..], recorded[..]);
}

#[test]
fn episodes_time_out_with_summary() {
    let mut cfg = common::config(2);
    cfg.env.episode_length_s = 0.11;
    let mut env = common::mock_env(cfg);
    assert_eq!(env.max_episode_length(), 6);
    env.reset_all().unwrap();

    let zeros = vec![0.0; 2 * NUM_DOF];
    let mut timed_out = None;
    for _ in 0..10 {
        let result = env.step(&zeros).unwrap();
        if result.dones.iter().all(|&d| d) {
            timed_out = Some(result);
            break;
        }
    }
    let result = timed_out.expect("episodes never ended");
    assert!(result.info.time_outs.iter().all(|&t| t));
    assert!(result.info.episode.contains_key("rew_tracking_lin_vel"));
    assert!(env.state().episode_length.iter().all(|&l| l == 0));
}

#[test]
fn wrong_action_length_is_rejected() {
    let mut env = common::mock_env(common::config(2));
    let err = env.step(&[0.0; 5]).unwrap_err();
    assert!(matches!(err, EnvError::ActionShape { got: 5, expected: 24 }));
}

#[test]
fn construction_checks_simulator_and_layout() {
    let cfg = common::config(2);
    let sim = MockSim::new(physics::MockSimConfig::default());
    let task = WalkTask::new(&cfg).unwrap();
    assert!(matches!(
        LeggedEnv::new(sim, task, cfg.clone()),
        Err(EnvError::InvalidConfig(_))
    ));

    let mut bad = cfg;
    bad.env.num_single_state = 50;
    assert!(matches!(
        WalkTask::new(&bad),
        Err(EnvError::ObservationLayout { layout: 47, declared: 50 })
    ));
}

#[test]
fn initial_feet_are_captured_on_first_step() {
    let mut env = common::mock_env(common::config(1));
    env.reset_all().unwrap();
    let state = env.state();
    assert_eq!(state.episode_length[0], 1);
    assert_eq!(state.init_feet_positions[0], state.feet[0].pos);
}
