//! Vertex layouts.
//!
//! Both types are `#[repr(C)]` and `Pod` so vertex arrays can be uploaded
//! with [`bytemuck::cast_slice`] without copying.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex of a static mesh.
///
/// Layout: position (0), normal (12), tex_coord (24); 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Maximum number of joints that may influence one skinned vertex.
pub const MAX_JOINT_INFLUENCES: usize = 4;

/// Vertex of a skinned mesh.
///
/// Unused influence slots have a joint id of -1 and a weight of 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexSkinned {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
    pub joint_ids: [i32; MAX_JOINT_INFLUENCES],
    pub joint_weights: [f32; MAX_JOINT_INFLUENCES],
}

impl Default for VertexSkinned {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            tex_coord: Vec2::ZERO,
            joint_ids: [-1; MAX_JOINT_INFLUENCES],
            joint_weights: [0.0; MAX_JOINT_INFLUENCES],
        }
    }
}

impl VertexSkinned {
    /// Joint ids of the influence slots in use.
    pub fn influencing_joints(&self) -> impl Iterator<Item = usize> + '_ {
        self.joint_ids
            .iter()
            .filter(|&&id| id >= 0)
            .map(|&id| id as usize)
    }
}
