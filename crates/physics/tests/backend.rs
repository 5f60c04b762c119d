use physics::{MockSim, MockSimConfig, PhysicsError, RootState, SimBackend, SimTensors};

fn tensors_for(sim: &MockSim) -> SimTensors {
    SimTensors::zeros(sim.num_envs(), sim.num_bodies(), sim.num_dof())
}

#[test]
fn refresh_copies_simulator_state() {
    let mut sim = MockSim::new(MockSimConfig { num_envs: 2, ..MockSimConfig::default() });
    sim.state_mut().root[1] = RootState::at([1.0, 2.0, 0.3]);
    let mut tensors = tensors_for(&sim);
    sim.simulate().unwrap();
    sim.refresh(&mut tensors).unwrap();
    assert_eq!(tensors.root, sim.state().root);
    assert_eq!(tensors.bodies, sim.state().bodies);
    assert_eq!(tensors.contact_forces, sim.state().contact_forces);
    // the foot of the first leg hangs 0.3 below the base
    let foot = tensors.body(1, 4).position();
    assert!((foot.z - 0.0).abs() < 1e-6);
}

#[test]
fn dof_refresh_leaves_bodies_alone() {
    let mut sim = MockSim::new(MockSimConfig::default());
    let mut tensors = tensors_for(&sim);
    sim.set_dof_actuation_force(&[2.0; 12]).unwrap();
    sim.simulate().unwrap();
    sim.refresh_dof_state(&mut tensors).unwrap();
    assert!(tensors.dofs.iter().all(|d| d.vel > 0.0));
    assert!(tensors.bodies.iter().all(|b| *b == RootState::default()));
}

#[test]
fn indexed_dof_write_is_isolated() {
    let mut sim = MockSim::new(MockSimConfig { num_envs: 2, ..MockSimConfig::default() });
    let mut tensors = tensors_for(&sim);
    for dof in &mut tensors.dofs {
        dof.pos = 0.5;
    }
    sim.set_dof_state_indexed(&tensors, &[0]).unwrap();
    assert!(sim.state().env_dofs(0).iter().all(|d| d.pos == 0.5));
    assert!(sim.state().env_dofs(1).iter().all(|d| d.pos == 0.0));
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut sim = MockSim::new(MockSimConfig::default());
    assert!(matches!(
        sim.set_dof_actuation_force(&[0.0; 3]),
        Err(PhysicsError::ShapeMismatch(_))
    ));
    let mut wrong = SimTensors::zeros(2, sim.num_bodies(), sim.num_dof());
    assert!(sim.refresh(&mut wrong).is_err());
}
