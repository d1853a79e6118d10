//! Rotation and rigid transform helpers over `nalgebra`.
//!
//! All functions are pure and return values, rotations are unit quaternions
//! and rigid transforms are isometries.

use {
    nalgebra as na,
    std::f64::consts::{FRAC_PI_2, PI},
};

pub type Vec3 = na::Vector3<f64>;
pub type Rotation = na::UnitQuaternion<f64>;
pub type Transform = na::Isometry3<f64>;

/// Vectors shorter than this are treated as zero-length.
pub const EPSILON: f64 = 1e-9;

/// Arc cosine with argument clamped to the valid domain.
///
/// Arguments above `1` yield `0`, arguments below `-1` yield `π`.
/// Non-finite arguments (from a zero-length side) yield `0`.
pub fn acos_clamped(x: f64) -> f64 {
    if !x.is_finite() {
        0.0
    } else if x > 1.0 {
        0.0
    } else if x < -1.0 {
        PI
    } else {
        x.acos()
    }
}

/// Rotation by `angle` radians about `axis`. Axis need not be normalized.
/// A zero-length axis produces identity.
pub fn exp(axis: &Vec3, angle: f64) -> Rotation {
    match na::Unit::try_new(*axis, EPSILON) {
        Some(axis) => Rotation::from_axis_angle(&axis, angle),
        None => Rotation::identity(),
    }
}

/// Rotation from a scaled axis (`axis * angle`).
pub fn exp_scaled(scaled_axis: &Vec3) -> Rotation {
    Rotation::from_scaled_axis(*scaled_axis)
}

/// Logarithm map, the inverse of [`exp_scaled`].
pub fn log(rotation: &Rotation) -> Vec3 {
    rotation.scaled_axis()
}

/// Spherical interpolation `r0 ∘ exp(t · log(r0⁻¹ ∘ r1))`.
///
/// `t` is not clamped, values outside `[0, 1]` extrapolate along the same arc.
pub fn slerp(r0: &Rotation, r1: &Rotation, t: f64) -> Rotation {
    r0 * exp_scaled(&(log(&(r0.inverse() * r1)) * t))
}

pub fn lerp(v0: &Vec3, v1: &Vec3, t: f64) -> Vec3 {
    v0 + (v1 - v0) * t
}

/// Normalized `v`, or `fallback` if `v` is (nearly) zero-length.
pub fn normalize_or(v: &Vec3, fallback: Vec3) -> Vec3 {
    match na::Unit::try_new(*v, EPSILON) {
        Some(unit) => unit.into_inner(),
        None => fallback,
    }
}

pub fn rot_x(angle: f64) -> Rotation {
    Rotation::from_axis_angle(&Vec3::x_axis(), angle)
}

pub fn rot_y(angle: f64) -> Rotation {
    Rotation::from_axis_angle(&Vec3::y_axis(), angle)
}

pub fn rot_z(angle: f64) -> Rotation {
    Rotation::from_axis_angle(&Vec3::z_axis(), angle)
}

pub fn translation(v: &Vec3) -> Transform {
    Transform::from_parts(na::Translation3::from(*v), Rotation::identity())
}

pub fn rotation(r: &Rotation) -> Transform {
    Transform::from_parts(na::Translation3::identity(), *r)
}

/// Builds `Rz(z) · Rx(x) · Ry(y)`.
pub fn from_zxy(z: f64, x: f64, y: f64) -> Rotation {
    rot_z(z) * rot_x(x) * rot_y(y)
}

/// Decomposes a rotation into `(z, x, y)` angles such that
/// `from_zxy(z, x, y)` reproduces it.
pub fn to_zxy(rotation: &Rotation) -> (f64, f64, f64) {
    let m = rotation.to_rotation_matrix().into_inner();

    let sx = m[(2, 1)];
    if sx.abs() < 1.0 - EPSILON {
        let x = sx.asin();
        let y = f64::atan2(-m[(2, 0)], m[(2, 2)]);
        let z = f64::atan2(-m[(0, 1)], m[(1, 1)]);
        (z, x, y)
    } else {
        // Gimbal lock: only `z ± y` is defined, pin `y` to zero.
        let x = FRAC_PI_2.copysign(sx);
        let z = f64::atan2(m[(1, 0)], m[(0, 0)]);
        (z, x, 0.0)
    }
}
