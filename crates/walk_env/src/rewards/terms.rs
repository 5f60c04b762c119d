//! Reward terms. Each is a pure function of the step context for one
//! environment; scaling and summation happen in the bank.

use std::f32::consts::PI;

use glam::Vec2;

use super::RewardContext;
use crate::config::AngRewardMode;
use crate::math::{lerp_clamped, quat_apply_yaw, quat_apply_yaw_inverse, wrap_to_pi};
use crate::{NUM_DOF, NUM_LEGS};

/// Vertical force below which a body counts as airborne.
const CONTACT_FORCE_THRESHOLD: f32 = 1.0;
const UPRIGHT_COSINE: f32 = 0.9;
const REAR: [usize; 2] = [2, 3];
const FRONT: [usize; 2] = [0, 1];

fn as_f32(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Whether the body-forward axis points along the yaw-frame upright axis.
pub(crate) fn is_stand(ctx: &RewardContext<'_>, env: usize) -> bool {
    let q = ctx.state.base_quat[env];
    let layout = &ctx.state.layout;
    let forward = q * layout.forward;
    let upright = quat_apply_yaw(q, layout.upright);
    forward.dot(upright) / upright.length() > UPRIGHT_COSINE
}

/// Linear ramp of the rear-relative base height between the scale factors.
pub(crate) fn height_scale(ctx: &RewardContext<'_>, env: usize) -> f32 {
    lerp_clamped(
        ctx.state.rear_relative_height(env),
        ctx.cfg.scale_factor_low,
        ctx.cfg.scale_factor_high,
    )
}

fn tracking_gate(ctx: &RewardContext<'_>, env: usize) -> f32 {
    as_f32(is_stand(ctx, env)) * height_scale(ctx, env)
}

fn estimated_yaw_rate(ctx: &RewardContext<'_>, env: usize) -> f32 {
    wrap_to_pi(ctx.state.heading[env] - ctx.state.last_heading[env]) / ctx.dt
}

fn in_settling_window(ctx: &RewardContext<'_>, env: usize) -> bool {
    ctx.state.episode_length[env] < ctx.cfg.allow_contact_steps
}

fn past_settling_window(ctx: &RewardContext<'_>, env: usize) -> bool {
    ctx.state.episode_length[env] > ctx.cfg.allow_contact_steps
}

pub fn lift_up(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let delta = ctx.state.rear_relative_height(env) - ctx.cfg.liftup_target;
    (-(delta * delta) / ctx.cfg.tracking_liftup_sigma).exp()
}

pub fn lift_up_linear(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let [t0, t1] = ctx.cfg.lift_up_threshold;
    ((ctx.state.rear_relative_height(env) - t0) / (t1 - t0)).clamp(0.0, 1.0)
}

pub fn tracking_lin_vel(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    let cmd = state.commands[env];
    let actual = quat_apply_yaw_inverse(state.base_quat[env], state.tensors.root[env].linear_velocity());
    let error = (cmd[0] - actual.x).powi(2) + (cmd[1] - actual.y).powi(2);
    (-error / ctx.cfg.tracking_sigma).exp() * tracking_gate(ctx, env)
}

pub fn tracking_ang_vel(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    let cmd = state.commands[env];
    let heading_error = (wrap_to_pi(cmd[3] - state.heading[env]) / PI).powi(2);
    let reward = match ctx.cfg.ang_rew_mode {
        AngRewardMode::Heading => (-heading_error / ctx.cfg.tracking_sigma).exp(),
        AngRewardMode::HeadingWithPen => {
            let penalty = (estimated_yaw_rate(ctx, env).abs() - 1.0).max(0.0);
            (-heading_error / ctx.cfg.tracking_sigma).exp() - 0.1 * penalty
        }
        AngRewardMode::AngVel => {
            let error = (cmd[2] - estimated_yaw_rate(ctx, env)).abs();
            (-error / ctx.cfg.tracking_ang_sigma).exp()
        }
    };
    reward * tracking_gate(ctx, env)
}

/// Squared error to a swing-height profile peaking mid-swing, rear feet only.
pub fn feet_clearance_cmd_linear(ctx: &RewardContext<'_>, env: usize) -> f32 {
    if !past_settling_window(ctx, env) {
        return 0.0;
    }
    let feet = &ctx.state.feet[env];
    let phases = &ctx.state.phases[env];
    REAR.iter()
        .map(|&f| {
            let phase = 1.0 - (1.0 - (phases.foot_indices[f] * 2.0 - 1.0).clamp(0.0, 1.0) * 2.0).abs();
            let target = ctx.cfg.foot_target * phase + feet.terrain[f] + 0.02;
            (target - feet.pos[f].z).powi(2) * (1.0 - phases.desired_contact[f])
        })
        .sum()
}

/// Both rear feet airborne, plus each rear foot airborne while its calf
/// touches the ground.
pub fn rear_air(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    let layout = &state.layout;
    let airborne = |body: usize| state.contact_force(env, body).z < CONTACT_FORCE_THRESHOLD;
    let feet_air = REAR.map(|f| airborne(layout.feet[f]));
    let calf_air = REAR.map(|f| airborne(layout.calves[f]));
    let unhealthy = feet_air
        .iter()
        .zip(&calf_air)
        .filter(|&(&foot, &calf)| foot && !calf)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let unhealthy = unhealthy as f32;
    as_f32(feet_air.iter().all(|&a| a)) + unhealthy
}

/// A rear foot lifted while the robot is still rising in the settling window.
pub fn stand_air(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    let forward_z = (state.base_quat[env] * state.layout.forward).z;
    let lifted = REAR.iter().any(|&f| state.feet[env].clearance(f) > 0.03);
    as_f32(in_settling_window(ctx, env) && forward_z < UPRIGHT_COSINE && lifted)
}

pub fn foot_twist(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let feet = &ctx.state.feet[env];
    let total: f32 = (0..NUM_LEGS)
        .filter(|&f| feet.clearance(f) < 0.025)
        .map(|f| feet.vel[f].truncate().length() + 0.1 * feet.ang_vel[f].length())
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = total / NUM_LEGS as f32;
    mean
}

pub fn feet_slip(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let feet = &ctx.state.feet[env];
    (0..NUM_LEGS)
        .filter(|&f| feet.clearance(f) < 0.03)
        .map(|f| feet.vel[f].truncate().length_squared() + (feet.ang_vel[f].z / PI).powi(2))
        .sum()
}

/// Drift of the feet from where they were at the start of the episode,
/// during the settling window. Front feet may move forward freely.
pub fn foot_shift(ctx: &RewardContext<'_>, env: usize) -> f32 {
    if !in_settling_window(ctx, env) {
        return 0.0;
    }
    let feet = &ctx.state.feet[env];
    let init = &ctx.state.init_feet_positions[env];
    let rear: f32 = REAR
        .iter()
        .map(|&f| {
            let mut desired = init[f];
            desired.z = 0.02 + feet.terrain[f];
            (feet.pos[f] - desired).length()
        })
        .sum::<f32>()
        / 2.0;
    let front: f32 = FRONT
        .iter()
        .map(|&f| {
            Vec2::new(
                (init[f].x - feet.pos[f].x).max(0.0),
                (init[f].y - feet.pos[f].y).abs(),
            )
            .length()
        })
        .sum::<f32>()
        / 2.0;
    front + rear
}

/// Mean contact force magnitude on the front calves.
pub fn front_contact_force(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    let bodies = state.layout.termination_contacts.get(5..7).unwrap_or(&[]);
    if bodies.is_empty() {
        return 0.0;
    }
    let total: f32 = bodies.iter().map(|&b| state.contact_force(env, b).length()).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = total / bodies.len() as f32;
    mean
}

/// Mean hip abduction magnitude once the robot is walking.
pub fn hip_still(ctx: &RewardContext<'_>, env: usize) -> f32 {
    if !past_settling_window(ctx, env) {
        return 0.0;
    }
    let dof_pos = ctx.state.dof_pos(env);
    #[allow(clippy::cast_precision_loss)]
    let mean = (0..NUM_LEGS).map(|leg| dof_pos[leg * 3].abs()).sum::<f32>() / NUM_LEGS as f32;
    mean
}

pub fn action_rate(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let state = ctx.state;
    (0..NUM_DOF)
        .map(|j| (state.last_actions[env][j] - state.actions[env][j]).powi(2))
        .sum()
}

pub fn dof_acc(ctx: &RewardContext<'_>, env: usize) -> f32 {
    let vel = ctx.state.dof_vel(env);
    let last = &ctx.state.last_dof_vel[env];
    (0..NUM_DOF).map(|j| ((last[j] - vel[j]) / ctx.dt).powi(2)).sum()
}

pub fn torques(ctx: &RewardContext<'_>, env: usize) -> f32 {
    ctx.state.torques[env].iter().map(|t| t * t).sum()
}

/// Terminal penalty for non-timeout terminations.
pub fn termination(ctx: &RewardContext<'_>, env: usize) -> f32 {
    as_f32(ctx.state.reset_buf[env] && !ctx.state.time_out_buf[env])
}

/// Placeholder for the metrics side channel; never contributes reward.
pub fn evaluate_metrics(_ctx: &RewardContext<'_>, _env: usize) -> f32 {
    0.0
}
