//! Frame conversions and scalar helpers shared by observations and rewards.
//!
//! Quaternions are assumed normalised, as delivered by the simulator.

use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Quat, Vec3};

/// Wraps an angle into `(-pi, pi]`.
#[must_use]
pub fn wrap_to_pi(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Rotates a world-frame vector into the body frame of `q`.
#[must_use]
pub fn quat_rotate_inverse(q: Quat, v: Vec3) -> Vec3 {
    q.conjugate() * v
}

/// The yaw-only part of `q`: x and y components dropped, renormalised.
#[must_use]
pub fn yaw_quat(q: Quat) -> Quat {
    let yaw = Quat::from_xyzw(0.0, 0.0, q.z, q.w);
    if yaw.length_squared() < 1e-12 {
        Quat::IDENTITY
    } else {
        yaw.normalize()
    }
}

#[must_use]
pub fn quat_apply_yaw(q: Quat, v: Vec3) -> Vec3 {
    yaw_quat(q) * v
}

#[must_use]
pub fn quat_apply_yaw_inverse(q: Quat, v: Vec3) -> Vec3 {
    yaw_quat(q).conjugate() * v
}

/// Roll, pitch, yaw of `q` for the `Rz * Ry * Rx` convention.
#[must_use]
pub fn euler_xyz(q: Quat) -> Vec3 {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::ZYX);
    Vec3::new(roll, pitch, yaw)
}

/// Inverse of [`euler_xyz`].
#[must_use]
pub fn quat_from_euler_xyz(rpy: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, rpy.z, rpy.y, rpy.x)
}

/// Planar heading of the body-frame vector `axis` once rotated by `q`.
#[must_use]
pub fn heading_of(q: Quat, axis: Vec3) -> f32 {
    let v = q * axis;
    v.y.atan2(v.x)
}

/// Standard normal CDF.
#[must_use]
pub fn normal_cdf(x: f32) -> f32 {
    0.5 * (1.0 + erf(x / std::f32::consts::SQRT_2))
}

// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7.
fn erf(x: f32) -> f32 {
    let sign = x.signum();
    let x = f64::from(x.abs());
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    #[allow(clippy::cast_possible_truncation)]
    let y = (1.0 - poly * (-x * x).exp()) as f32;
    sign * y
}

#[must_use]
pub fn lerp_clamped(value: f32, low: f32, high: f32) -> f32 {
    ((value.clamp(low, high) - low) / (high - low)).clamp(0.0, 1.0)
}
