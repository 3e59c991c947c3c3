//! Actor Load Settings
//!
//! Configuration applied when an [`Actor`](crate::Actor) is loaded.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use skin2d::{Actor, ActorSettings, GeometryRetention};
//!
//! // Default: geometry is released once the renderer has uploaded it
//! let settings = ActorSettings::default();
//!
//! // Editor-style: keep CPU geometry around and deform at runtime
//! let settings = ActorSettings {
//!     geometry_retention: GeometryRetention::Keep,
//!     enable_vertex_deform: true,
//! };
//!
//! let actor = Actor::load(&bytes, &settings)?;
//! ```

// ---------------------------------------------------------------------------
// GeometryRetention
// ---------------------------------------------------------------------------

/// What happens to CPU-side mesh geometry once a renderer has uploaded it.
///
/// Applied by [`Actor::notify_geometry_uploaded`](crate::Actor::notify_geometry_uploaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryRetention {
    /// Keep vertices and triangles. Needed by tools that re-read or
    /// re-serialize geometry.
    Keep,
    /// Release triangles, and vertices unless the mesh deforms at runtime.
    #[default]
    DisposeAfterUpload,
}

// ---------------------------------------------------------------------------
// ActorSettings
// ---------------------------------------------------------------------------

/// Load-time configuration for an actor and its runtime instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActorSettings {
    /// Geometry reclamation policy after upload.
    pub geometry_retention: GeometryRetention,
    /// Allocate a deform buffer on every mesh right after loading.
    pub enable_vertex_deform: bool,
}
