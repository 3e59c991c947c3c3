//! # Myth Skin2D
//!
//! Skinned 2D mesh nodes: binary loading, bone binding resolution and
//! per-frame skinning matrix evaluation for cut-out style 2D animation.
//!
//! ```rust,ignore
//! use skin2d::{Actor, ActorSettings};
//!
//! let mut actor = Actor::load(&bytes, &ActorSettings::default())?;
//! for handle in actor.meshes_by_draw_order() {
//!     let matrices = actor.compute_skinning_matrices(handle)?;
//!     renderer.draw(handle, matrices);
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod io;
pub mod math;
pub mod scene;
pub mod settings;

pub use errors::{Result, Skin2dError};
pub use io::{BlockReader, BlockWriter};
pub use scene::{
    Actor, BlendMode, Bone, BoneBinding, Hierarchy, Node, NodeHandle, NodeKind, SkinnedMesh,
    Transform2D, WorldTransforms,
};
pub use settings::{ActorSettings, GeometryRetention};
