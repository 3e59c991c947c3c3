//! 2×3 affine helpers.
//!
//! [`glam::Affine2`] is the transform type throughout the crate. Streams and
//! skinning buffers carry it as six floats in column order `[a, b, c, d, tx, ty]`,
//! which is exactly [`Affine2::to_cols_array`].

use glam::{Affine2, Vec2};

/// Float count of one packed affine matrix.
pub const AFFINE_COMPONENTS: usize = 6;

/// Packed identity matrix.
pub const IDENTITY_COMPONENTS: [f32; AFFINE_COMPONENTS] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Builds a local matrix from 2D translation, rotation (radians) and scale.
#[inline]
#[must_use]
pub fn compose(translation: Vec2, rotation: f32, scale: Vec2) -> Affine2 {
    Affine2::from_scale_angle_translation(scale, rotation, translation)
}

/// Writes `mat` into the first six floats of `out`.
#[inline]
pub fn write_components(mat: &Affine2, out: &mut [f32]) {
    out[..AFFINE_COMPONENTS].copy_from_slice(&mat.to_cols_array());
}

/// Component-wise comparison within `epsilon`.
#[must_use]
pub fn approx_eq(a: &Affine2, b: &Affine2, epsilon: f32) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() <= epsilon)
}
