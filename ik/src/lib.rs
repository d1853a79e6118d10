//! Closed-form inverse kinematics over [`animate::Posture`].

mod analytic;

pub use self::analytic::solve;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum IkError {
    #[error("Joint {joint} needs a parent and a grandparent to form an IK chain")]
    InvalidChain { joint: String },

    #[error("{source}")]
    Animate {
        #[from]
        source: animate::Error,
    },
}
