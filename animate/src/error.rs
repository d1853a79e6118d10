/// Errors produced by skeleton, posture and motion operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Joint lookup by label or index missed.
    #[error("Joint {joint} not found")]
    NotFound { joint: String },

    /// Frame or posture index is outside of valid bounds.
    #[error("Frame index {index} is out of range 0..{len}")]
    IndexOutOfRange { index: f64, len: usize },

    /// Operation combines postures or motions built on different skeletons.
    #[error("Postures are bound to different skeletons")]
    SkeletonMismatch,

    /// Structural mutation would break the joint tree.
    #[error("Invalid skeleton operation: {reason}")]
    InvalidOperation { reason: &'static str },

    /// Joint labels must be unique within a skeleton.
    #[error("Joint label `{label}` is already used")]
    DuplicateLabel { label: String },

    /// Bulk data does not match the skeleton joint count.
    #[error("Expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl Error {
    pub(crate) fn out_of_range(index: f64, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }
}
