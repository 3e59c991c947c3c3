//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Skin2dError`] covers three failure families:
//! - Malformed streams (truncated blocks, bad enum bytes, bad headers)
//! - Dangling references (node indices past the flat node array)
//! - Contract misuse (evaluating before resolution, stale handles)
//!
//! Loading is all-or-nothing: any error aborts the whole actor load and no
//! partially populated actor is returned.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, Skin2dError>`.
//!
//! ```rust,ignore
//! use skin2d::errors::Result;
//!
//! fn load(bytes: &[u8]) -> Result<skin2d::Actor> {
//!     skin2d::Actor::load(bytes, &skin2d::ActorSettings::default())
//! }
//! ```

use thiserror::Error;

/// The main error type for skinned 2D mesh loading and evaluation.
#[derive(Error, Debug)]
pub enum Skin2dError {
    // ========================================================================
    // Malformed Stream Errors
    // ========================================================================
    /// A read ran past the end of the current block.
    #[error("Unexpected end of block while reading {context}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// What was being read
        context: &'static str,
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the block
        remaining: usize,
    },

    /// Blend mode byte outside the known range.
    #[error("Invalid blend mode: {0}")]
    InvalidBlendMode(u8),

    /// A string field did not contain valid UTF-8.
    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// What was being read
        context: &'static str,
    },

    /// The stream does not start with the actor signature.
    #[error("Invalid actor signature")]
    InvalidSignature,

    /// The stream declares a format version this crate cannot read.
    #[error("Unsupported actor format version: {0}")]
    UnsupportedVersion(u32),

    // ========================================================================
    // Reference Resolution Errors
    // ========================================================================
    /// A node index points past the flat node array.
    #[error("Node index out of bounds: {context} (index: {index}, len: {len})")]
    NodeIndexOutOfBounds {
        /// Description of what was being resolved
        context: &'static str,
        /// The invalid index
        index: usize,
        /// Length of the node array
        len: usize,
    },

    /// The actor holds more nodes than a stream's `u16` indices can address.
    #[error("Too many nodes to serialize: {0} (stream indices are u16)")]
    TooManyNodes(usize),

    // ========================================================================
    // Misuse Errors
    // ========================================================================
    /// Skinning was evaluated before bone references were resolved.
    #[error("Bone binding {binding} has not been resolved")]
    UnresolvedBoneBinding {
        /// Position of the binding in the mesh's binding list
        binding: usize,
    },

    /// The node handle does not belong to this hierarchy.
    #[error("Stale node handle")]
    StaleNodeHandle,

    /// A mesh operation was requested on a node that carries no mesh.
    #[error("Node is not a mesh")]
    NotAMesh,

    /// Geometry was read after it had been disposed.
    #[error("Mesh geometry has been disposed")]
    GeometryDisposed,

    /// Parent links loop back on themselves.
    #[error("Cycle in node hierarchy")]
    HierarchyCycle,

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// Writer-side I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, Skin2dError>`.
pub type Result<T> = std::result::Result<T, Skin2dError>;
