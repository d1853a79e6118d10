//! Skeletal animation data model.
//!
//! A [`Skeleton`] is the immutable joint hierarchy, a [`Posture`] assigns a
//! local rotation to every joint and a [`Motion`] is a frame sequence of
//! postures sharing one skeleton.

pub mod bvh;
pub mod contact;
pub mod error;
pub mod loader;
pub mod math;
pub mod motion;
pub mod posture;
pub mod render;
pub mod skeleton;

pub use self::{
    bvh::{write_bvh, BvhLoader},
    contact::{contact_states, contact_timings, ContactThresholds},
    error::Error,
    loader::{LoadError, Loader},
    math::{Rotation, Transform, Vec3},
    motion::{Motion, MotionView},
    posture::Posture,
    render::{render_posture, PoseRenderer},
    skeleton::{JointRef, Skeleton},
};
