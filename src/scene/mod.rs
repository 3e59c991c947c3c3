//! Scene graph for 2D actors.
//!
//! - [`Node`]: shared hierarchy + transform payload, tagged with a [`NodeKind`]
//! - [`Transform2D`]: TRS with cached, dirty-checked matrices
//! - [`Hierarchy`]: node storage and pull-based world transforms
//! - [`Bone`]: bone component
//! - [`SkinnedMesh`]: skinned textured mesh component
//! - [`Actor`]: container owning the flat node array

pub mod actor;
pub mod bone;
pub mod hierarchy;
pub mod mesh;
pub mod node;
pub mod transform;

pub use actor::Actor;
pub use bone::Bone;
pub use hierarchy::{Hierarchy, WorldTransforms};
pub use mesh::{BlendMode, BoneBinding, BoneBindings, SkinnedMesh};
pub use node::{Node, NodeKind};
pub use transform::Transform2D;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
}
