//! Joint hierarchies for skinned models.

use glam::Mat4;

use crate::error::{ResourceError, ResourceResult};

/// One bone of a [`Skeleton`].
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Index of the parent joint; `None` for roots.
    pub parent: Option<usize>,
    /// Inverse bind matrix: mesh space to this joint's local space.
    pub offset: Mat4,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, offset: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            offset,
        }
    }
}

/// Joints stored parent-before-child, so one forward pass can accumulate
/// global transforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    /// # Errors
    ///
    /// Fails if any joint's parent does not precede it.
    pub fn new(joints: Vec<Joint>) -> ResourceResult<Self> {
        for (i, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent
                && parent >= i
            {
                return Err(ResourceError::InvalidJointParent {
                    joint: joint.name.clone(),
                    parent,
                });
            }
        }
        Ok(Self { joints })
    }

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_before_child_accepted() {
        let skeleton = Skeleton::new(vec![
            Joint::new("root", None, Mat4::IDENTITY),
            Joint::new("spine", Some(0), Mat4::IDENTITY),
            Joint::new("head", Some(1), Mat4::IDENTITY),
        ])
        .unwrap();

        assert_eq!(skeleton.joint_count(), 3);
        assert_eq!(skeleton.find("head"), Some(2));
        assert_eq!(skeleton.find("tail"), None);
    }

    #[test]
    fn test_forward_parent_rejected() {
        let result = Skeleton::new(vec![
            Joint::new("child", Some(1), Mat4::IDENTITY),
            Joint::new("root", None, Mat4::IDENTITY),
        ]);
        assert!(matches!(
            result,
            Err(ResourceError::InvalidJointParent { parent: 1, .. })
        ));
    }

    #[test]
    fn test_self_parent_rejected() {
        let result = Skeleton::new(vec![Joint::new("loop", Some(0), Mat4::IDENTITY)]);
        assert!(result.is_err());
    }
}
