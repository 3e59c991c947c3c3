//! Stream fixtures shared by the integration tests.
//!
//! Streams are assembled field by field with `BlockWriter` primitives so the
//! reader is never tested against its own serializer.

#![allow(dead_code)]

use glam::{Affine2, Vec2};
use skin2d::BlockWriter;
use skin2d::errors::Result;

pub const EPSILON: f32 = 1e-5;

pub const BLOCK_NODE: u8 = 2;
pub const BLOCK_BONE: u8 = 3;
pub const BLOCK_ROOT_BONE: u8 = 4;
pub const BLOCK_MESH: u8 = 5;

/// Routes library logs to the test harness. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn affine_approx(a: &Affine2, b: &Affine2) -> bool {
    skin2d::math::approx_eq(a, b, EPSILON)
}

pub fn slice_approx(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| approx(*x, *y))
}

/// Base node fields with unit scale and full opacity.
pub fn write_base(
    w: &mut BlockWriter,
    name: &str,
    parent_index: u16,
    translation: Vec2,
    rotation: f32,
) -> Result<()> {
    w.write_string(name)?;
    w.write_u16(parent_index)?;
    w.write_f32(translation.x)?;
    w.write_f32(translation.y)?;
    w.write_f32(rotation)?;
    w.write_f32(1.0)?;
    w.write_f32(1.0)?;
    w.write_f32(1.0)?;
    w.write_u8(0)
}

/// Mesh payload without bone bindings. Vertex floats count up from zero.
pub fn write_rigid_mesh(
    w: &mut BlockWriter,
    blend_mode: u8,
    draw_order: u16,
    texture_index: u8,
    vertex_count: u32,
    triangles: &[u16],
) -> Result<()> {
    w.write_u8(1)?;
    w.write_u8(blend_mode)?;
    w.write_u16(draw_order)?;
    w.write_u8(texture_index)?;
    w.write_u8(0)?;
    w.write_u32(vertex_count)?;
    for i in 0..vertex_count * 4 {
        w.write_f32(i as f32)?;
    }
    w.write_u32((triangles.len() / 3) as u32)?;
    w.write_u16_array(triangles)
}

/// Mesh payload bound to `bindings` (flat bone index, bind pose).
pub fn write_skinned_mesh(
    w: &mut BlockWriter,
    draw_order: u16,
    bindings: &[(u16, Affine2)],
    world_override: &Affine2,
    vertex_count: u32,
    triangles: &[u16],
) -> Result<()> {
    w.write_u8(1)?;
    w.write_u8(0)?;
    w.write_u16(draw_order)?;
    w.write_u8(0)?;
    w.write_u8(bindings.len() as u8)?;
    for (index, bind) in bindings {
        w.write_u16(*index)?;
        w.write_affine(bind)?;
    }
    w.write_affine(world_override)?;
    w.write_u32(vertex_count)?;
    for i in 0..vertex_count * 12 {
        w.write_f32(i as f32 * 0.5)?;
    }
    w.write_u32((triangles.len() / 3) as u32)?;
    w.write_u16_array(triangles)
}

/// Full actor stream: header plus a nodes block holding `node_count` node
/// blocks written by `nodes`.
pub fn actor_bytes<F>(node_count: u16, nodes: F) -> Vec<u8>
where
    F: FnOnce(&mut BlockWriter) -> Result<()>,
{
    let mut w = BlockWriter::new();
    w.write_bytes(b"NIMA");
    w.write_u32(1).unwrap();
    w.write_block(1, |w| {
        w.write_u16(node_count)?;
        nodes(w)
    })
    .unwrap();
    w.into_bytes()
}

/// Bone node block.
pub fn bone_block(
    w: &mut BlockWriter,
    name: &str,
    parent_index: u16,
    translation: Vec2,
    rotation: f32,
) -> Result<()> {
    w.write_block(BLOCK_BONE, |w| {
        write_base(w, name, parent_index, translation, rotation)?;
        w.write_f32(10.0)
    })
}

/// A small skinned rig:
///
/// ```text
/// 0 Root
/// ├── 1 Mesh  (bound to bones 3 and 2, forward references)
/// └── 2 RootBone at (5, 0)
///     └── 3 Bone at (10, 0)
/// ```
pub fn rig_bytes() -> Vec<u8> {
    let bind_root = Affine2::from_translation(Vec2::new(5.0, 0.0));
    let bind_child = Affine2::from_translation(Vec2::new(15.0, 0.0));
    actor_bytes(3, |w| {
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "body", 0, Vec2::ZERO, 0.0)?;
            write_skinned_mesh(
                w,
                4,
                &[(3, bind_child), (2, bind_root)],
                &Affine2::IDENTITY,
                3,
                &[0, 1, 2],
            )
        })?;
        w.write_block(BLOCK_ROOT_BONE, |w| {
            write_base(w, "hip", 0, Vec2::new(5.0, 0.0), 0.0)
        })?;
        bone_block(w, "thigh", 2, Vec2::new(10.0, 0.0), 0.0)
    })
}
