use glam::{Affine2, Vec2};

use crate::math;

/// 2D transform component.
///
/// Wraps a node's translation, rotation and scale together with its cached
/// local and world matrices and the dirty-check state. Public TRS fields may
/// be written freely; [`update_local_matrix`](Self::update_local_matrix)
/// notices the change by comparing against the last applied values.
#[derive(Debug, Clone)]
pub struct Transform2D {
    // === Public properties ===
    pub translation: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    pub scale: Vec2,

    // === Matrix cache ===
    pub(crate) local_matrix: Affine2,
    pub(crate) world_matrix: Affine2,

    // === Dirty-check state ===
    last_translation: Vec2,
    last_rotation: f32,
    last_scale: Vec2,
    force_update: bool,
}

impl Transform2D {
    #[must_use]
    pub fn new() -> Self {
        Self::from_trs(Vec2::ZERO, 0.0, Vec2::ONE)
    }

    #[must_use]
    pub fn from_trs(translation: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            translation,
            rotation,
            scale,

            local_matrix: Affine2::IDENTITY,
            world_matrix: Affine2::IDENTITY,

            last_translation: translation,
            last_rotation: rotation,
            last_scale: scale,
            force_update: true,
        }
    }

    /// Recomputes the local matrix if TRS changed since the last call.
    ///
    /// Returns whether the matrix changed.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.translation != self.last_translation
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = math::compose(self.translation, self.rotation, self.scale);

            self.last_translation = self.translation;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine2 {
        &self.local_matrix
    }

    /// Last computed world matrix. May be stale; use
    /// [`Hierarchy::world_transform`](super::Hierarchy::world_transform) for a fresh one.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine2 {
        &self.world_matrix
    }

    pub(crate) fn set_world_matrix(&mut self, mat: Affine2) {
        self.world_matrix = mat;
    }

    /// Forces the next update to recompute.
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::new()
    }
}
