//! CPU-side asset data.
//!
//! This crate holds the data the scene and renderer share:
//! - Vertex layouts and render units (mesh + material)
//! - Static and skinned models
//! - Skeletons and animation clips
//!
//! Models are immutable once built and are shared through `Arc`.

mod error;

pub mod animation;
pub mod material;
pub mod model;
pub mod skeleton;
pub mod vertex;

pub use animation::{Animation, JointChannel, Keyframe};
pub use error::{ResourceError, ResourceResult};
pub use material::Material;
pub use model::{Aabb, ModelSkinned, ModelStatic, RenderUnit};
pub use skeleton::{Joint, Skeleton};
pub use vertex::{Vertex, VertexSkinned};
