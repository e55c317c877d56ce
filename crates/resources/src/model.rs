//! Static and skinned models.
//!
//! A model is a list of [`RenderUnit`]s, one per material. Skinned models
//! additionally carry a [`Skeleton`] and their animation clips. Models are
//! validated once at construction and immutable afterwards; the scene and
//! the render list share them through `Arc`.

use glam::Vec3;
use tracing::debug;

use crate::animation::Animation;
use crate::error::{ResourceError, ResourceResult};
use crate::material::Material;
use crate::skeleton::Skeleton;
use crate::vertex::{Vertex, VertexSkinned};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Vertices, triangle-list indices and the material they are drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUnit<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl<V> RenderUnit<V> {
    pub fn new(vertices: Vec<V>, indices: Vec<u32>, material: Material) -> Self {
        Self {
            vertices,
            indices,
            material,
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn validate(&self, unit: usize) -> ResourceResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(ResourceError::InvalidMesh {
                unit,
                message: format!("{} indices is not a triangle list", self.indices.len()),
            });
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(ResourceError::InvalidMesh {
                unit,
                message: format!("index {} exceeds {} vertices", bad, self.vertices.len()),
            });
        }
        Ok(())
    }
}

/// Non-animated model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatic {
    units: Vec<RenderUnit<Vertex>>,
    aabb: Option<Aabb>,
}

impl ModelStatic {
    /// # Errors
    ///
    /// Fails if any unit's indices are not a valid triangle list.
    pub fn new(units: Vec<RenderUnit<Vertex>>) -> ResourceResult<Self> {
        for (i, unit) in units.iter().enumerate() {
            unit.validate(i)?;
        }
        let aabb = Aabb::from_points(units.iter().flat_map(|u| u.vertices.iter().map(|v| v.position)));
        debug!("Static model built with {} units", units.len());
        Ok(Self { units, aabb })
    }

    #[inline]
    pub fn units(&self) -> &[RenderUnit<Vertex>] {
        &self.units
    }

    /// Bounds of every vertex; `None` for an empty model.
    #[inline]
    pub fn aabb(&self) -> Option<Aabb> {
        self.aabb
    }

    pub fn triangle_count(&self) -> usize {
        self.units.iter().map(RenderUnit::triangle_count).sum()
    }
}

/// Model deformed by a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSkinned {
    units: Vec<RenderUnit<VertexSkinned>>,
    skeleton: Skeleton,
    animations: Vec<Animation>,
}

impl ModelSkinned {
    /// # Errors
    ///
    /// Fails if a unit is malformed, or if a vertex influence or animation
    /// channel refers to a joint outside `skeleton`.
    pub fn new(
        units: Vec<RenderUnit<VertexSkinned>>,
        skeleton: Skeleton,
        animations: Vec<Animation>,
    ) -> ResourceResult<Self> {
        let joint_count = skeleton.joint_count();
        for (i, unit) in units.iter().enumerate() {
            unit.validate(i)?;
            if let Some(joint) = unit
                .vertices
                .iter()
                .flat_map(VertexSkinned::influencing_joints)
                .find(|&j| j >= joint_count)
            {
                return Err(ResourceError::JointOutOfRange {
                    context: format!("render unit {}", i),
                    joint,
                    joint_count,
                });
            }
        }
        for animation in &animations {
            animation.validate(&skeleton)?;
        }

        debug!(
            "Skinned model built with {} units, {} joints, {} animations",
            units.len(),
            joint_count,
            animations.len()
        );
        Ok(Self {
            units,
            skeleton,
            animations,
        })
    }

    #[inline]
    pub fn units(&self) -> &[RenderUnit<VertexSkinned>] {
        &self.units
    }

    #[inline]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[inline]
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec2};

    use super::*;
    use crate::animation::JointChannel;
    use crate::skeleton::Joint;

    fn triangle() -> RenderUnit<Vertex> {
        let v = |x: f32, y: f32| Vertex::new(Vec3::new(x, y, 0.0), Vec3::Z, Vec2::ZERO);
        RenderUnit::new(vec![v(-1.0, 0.0), v(1.0, 0.0), v(0.0, 2.0)], vec![0, 1, 2], Material::default())
    }

    fn skinned_triangle(joint: i32) -> RenderUnit<VertexSkinned> {
        let vertex = VertexSkinned {
            joint_ids: [joint, -1, -1, -1],
            joint_weights: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        RenderUnit::new(vec![vertex; 3], vec![0, 1, 2], Material::default())
    }

    fn one_joint() -> Skeleton {
        Skeleton::new(vec![Joint::new("root", None, Mat4::IDENTITY)]).unwrap()
    }

    #[test]
    fn test_static_model_bounds() {
        let model = ModelStatic::new(vec![triangle()]).unwrap();
        let aabb = model.aabb().unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn test_empty_model_has_no_bounds() {
        assert!(ModelStatic::new(vec![]).unwrap().aabb().is_none());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut unit = triangle();
        unit.indices = vec![0, 1, 7];
        assert!(matches!(
            ModelStatic::new(vec![unit]),
            Err(ResourceError::InvalidMesh { unit: 0, .. })
        ));
    }

    #[test]
    fn test_partial_triangle_rejected() {
        let mut unit = triangle();
        unit.indices = vec![0, 1];
        assert!(ModelStatic::new(vec![unit]).is_err());
    }

    #[test]
    fn test_skinned_model_accessors() {
        let clip = Animation::new("idle", 24.0, 48.0, vec![JointChannel::new(0)]).unwrap();
        let model = ModelSkinned::new(vec![skinned_triangle(0)], one_joint(), vec![clip]).unwrap();

        assert_eq!(model.skeleton().joint_count(), 1);
        assert_eq!(model.animations().len(), 1);
        assert_eq!(model.animations()[0].name(), "idle");
    }

    #[test]
    fn test_vertex_joint_outside_skeleton_rejected() {
        let result = ModelSkinned::new(vec![skinned_triangle(4)], one_joint(), vec![]);
        assert!(matches!(
            result,
            Err(ResourceError::JointOutOfRange { joint: 4, .. })
        ));
    }

    #[test]
    fn test_animation_joint_outside_skeleton_rejected() {
        let clip = Animation::new("wave", 24.0, 48.0, vec![JointChannel::new(2)]).unwrap();
        assert!(ModelSkinned::new(vec![skinned_triangle(0)], one_joint(), vec![clip]).is_err());
    }
}
