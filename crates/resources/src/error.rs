//! Error types for asset construction.

use thiserror::Error;

/// Error type for building models, skeletons and animations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A render unit's index buffer is not a triangle list over its vertices.
    #[error("Invalid mesh in render unit {unit}: {message}")]
    InvalidMesh {
        /// Index of the offending unit.
        unit: usize,
        message: String,
    },

    /// A joint refers to a parent that does not come before it.
    #[error("Joint '{joint}' has parent index {parent}, which is not an earlier joint")]
    InvalidJointParent { joint: String, parent: usize },

    /// An animation channel or vertex targets a joint the skeleton does not have.
    #[error("{context} references joint {joint}, but the skeleton has {joint_count} joints")]
    JointOutOfRange {
        context: String,
        joint: usize,
        joint_count: usize,
    },

    /// An animation clip has a non-positive duration or tick rate.
    #[error("Animation '{0}' has an invalid duration or tick rate")]
    InvalidAnimation(String),
}

/// Result type alias for asset operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
