//! Actor Integration Tests
//!
//! Tests for:
//! - Full stream loading: header validation, node dispatch, forward references
//! - Parent linking and mesh-connected bones
//! - Skinning through the live hierarchy
//! - Instancing independence
//! - Geometry retention policy and draw order
//! - Serialization round trip

mod common;

use common::*;
use glam::{Affine2, Vec2};
use skin2d::errors::Skin2dError;
use skin2d::math::IDENTITY_COMPONENTS;
use skin2d::{Actor, ActorSettings, GeometryRetention, NodeKind};
use std::f32::consts::FRAC_PI_2;

fn load_rig() -> Actor {
    init_logger();
    Actor::load(&rig_bytes(), &ActorSettings::default()).unwrap()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_builds_flat_array_in_stream_order() {
    let actor = load_rig();
    assert_eq!(actor.flat_nodes().len(), 4);

    let kinds: Vec<NodeKind> = actor
        .flat_nodes()
        .iter()
        .map(|&h| actor.node(h).unwrap().kind())
        .collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Node, NodeKind::Mesh, NodeKind::RootBone, NodeKind::Bone]
    );
    assert_eq!(actor.find_node("thigh"), actor.node_at(3));
}

#[test]
fn load_links_parents() {
    let actor = load_rig();
    let root = actor.root();
    let hip = actor.find_node("hip").unwrap();
    let thigh = actor.find_node("thigh").unwrap();

    assert_eq!(actor.node(hip).unwrap().parent(), Some(root));
    assert_eq!(actor.node(thigh).unwrap().parent(), Some(hip));
    assert!(actor.node(root).unwrap().children().contains(&hip));
}

#[test]
fn load_resolves_forward_bone_references() {
    let actor = load_rig();
    let body = actor.find_node("body").unwrap();
    let hip = actor.find_node("hip").unwrap();
    let thigh = actor.find_node("thigh").unwrap();

    let mesh = actor.mesh(body).unwrap();
    assert_eq!(mesh.draw_order, 4);
    assert_eq!(mesh.bone_bindings()[0].bone(), Some(thigh));
    assert_eq!(mesh.bone_bindings()[1].bone(), Some(hip));

    assert!(actor.bone(hip).unwrap().is_root());
    assert!(actor.bone(hip).unwrap().is_connected_to_mesh());
    assert!(actor.bone(thigh).unwrap().is_connected_to_mesh());
    assert!((actor.bone(thigh).unwrap().length - 10.0).abs() < EPSILON);
}

#[test]
fn load_rejects_bad_signature() {
    let mut bytes = rig_bytes();
    bytes[0] = b'X';
    assert!(matches!(
        Actor::load(&bytes, &ActorSettings::default()),
        Err(Skin2dError::InvalidSignature)
    ));
}

#[test]
fn load_rejects_unknown_version() {
    let mut bytes = rig_bytes();
    bytes[4] = 9;
    assert!(matches!(
        Actor::load(&bytes, &ActorSettings::default()),
        Err(Skin2dError::UnsupportedVersion(9))
    ));
}

#[test]
fn load_rejects_dangling_bone_index() {
    let bytes = actor_bytes(1, |w| {
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "mesh", 0, Vec2::ZERO, 0.0)?;
            write_skinned_mesh(w, 0, &[(5, Affine2::IDENTITY)], &Affine2::IDENTITY, 0, &[])
        })
    });
    match Actor::load(&bytes, &ActorSettings::default()) {
        Err(Skin2dError::NodeIndexOutOfBounds { context, index, len }) => {
            assert_eq!(context, "bone binding");
            assert_eq!(index, 5);
            assert_eq!(len, 2);
        }
        other => panic!("expected NodeIndexOutOfBounds, got {other:?}"),
    }
}

#[test]
fn load_rejects_dangling_parent_index() {
    let bytes = actor_bytes(1, |w| bone_block(w, "bone", 40, Vec2::ZERO, 0.0));
    assert!(matches!(
        Actor::load(&bytes, &ActorSettings::default()),
        Err(Skin2dError::NodeIndexOutOfBounds {
            context: "parent index",
            ..
        })
    ));
}

#[test]
fn load_rejects_missing_node_blocks() {
    let bytes = actor_bytes(2, |w| bone_block(w, "only", 0, Vec2::ZERO, 0.0));
    assert!(matches!(
        Actor::load(&bytes, &ActorSettings::default()),
        Err(Skin2dError::UnexpectedEof {
            context: "node block",
            ..
        })
    ));
}

#[test]
fn load_skips_unknown_blocks_keeping_indices() {
    let bytes = actor_bytes(2, |w| {
        w.write_block(200, |w| w.write_u32(0xdead_beef))?;
        bone_block(w, "after", 1, Vec2::ZERO, 0.0)
    });
    let actor = Actor::load(&bytes, &ActorSettings::default()).unwrap();

    assert_eq!(actor.flat_nodes().len(), 3);
    let after = actor.find_node("after").unwrap();
    assert_eq!(actor.node(after).unwrap().parent(), actor.node_at(1));
}

#[test]
fn load_with_vertex_deform_setting() {
    let settings = ActorSettings {
        enable_vertex_deform: true,
        ..ActorSettings::default()
    };
    let actor = Actor::load(&rig_bytes(), &settings).unwrap();
    let body = actor.find_node("body").unwrap();
    assert_eq!(
        actor.mesh(body).unwrap().animation_deformed_vertices().unwrap().len(),
        6
    );
}

// ============================================================================
// Skinning Through The Hierarchy
// ============================================================================

#[test]
fn skinning_at_rest_pose_is_identity() {
    let mut actor = load_rig();
    let body = actor.find_node("body").unwrap();

    let matrices = actor.compute_skinning_matrices(body).unwrap();
    assert_eq!(matrices.len(), 18);
    for slot in matrices.chunks(6) {
        assert!(slice_approx(slot, &IDENTITY_COMPONENTS));
    }
}

#[test]
fn skinning_pulls_ancestor_motion() {
    let mut actor = load_rig();
    let body = actor.find_node("body").unwrap();
    let hip = actor.find_node("hip").unwrap();

    // Rotating the hip moves both bones; the thigh only through its parent.
    actor.node_mut(hip).unwrap().transform.rotation = FRAC_PI_2;
    let matrices = actor.compute_skinning_matrices(body).unwrap().to_vec();

    let hip_world = Affine2::from_translation(Vec2::new(5.0, 0.0)) * Affine2::from_angle(FRAC_PI_2);
    let thigh_world = hip_world * Affine2::from_translation(Vec2::new(10.0, 0.0));
    let thigh_skin = thigh_world * Affine2::from_translation(Vec2::new(15.0, 0.0)).inverse();
    let hip_skin = hip_world * Affine2::from_translation(Vec2::new(5.0, 0.0)).inverse();

    assert!(slice_approx(&matrices[0..6], &IDENTITY_COMPONENTS));
    assert!(slice_approx(&matrices[6..12], &thigh_skin.to_cols_array()));
    assert!(slice_approx(&matrices[12..18], &hip_skin.to_cols_array()));

    // A vertex at the thigh's bind position follows the thigh.
    let moved = thigh_skin.transform_point2(Vec2::new(15.0, 0.0));
    assert!(approx(moved.x, 5.0));
    assert!(approx(moved.y, 10.0));
}

#[test]
fn skinning_on_non_mesh_is_an_error() {
    let mut actor = load_rig();
    let hip = actor.find_node("hip").unwrap();
    assert!(matches!(
        actor.compute_skinning_matrices(hip),
        Err(Skin2dError::NotAMesh)
    ));
}

#[test]
fn mesh_world_uses_override_transform() {
    let world_override = Affine2::from_translation(Vec2::new(-3.0, 2.0));
    let bytes = actor_bytes(2, |w| {
        w.write_block(BLOCK_NODE, |w| write_base(w, "group", 0, Vec2::new(50.0, 0.0), 0.0))?;
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "mesh", 1, Vec2::new(1.0, 1.0), 0.0)?;
            write_skinned_mesh(w, 0, &[(1, Affine2::IDENTITY)], &world_override, 0, &[])
        })
    });
    let mut actor = Actor::load(&bytes, &ActorSettings::default()).unwrap();
    let mesh = actor.find_node("mesh").unwrap();

    let world = actor.world_transform(mesh).unwrap();
    assert!(affine_approx(&world, &world_override));
}

// ============================================================================
// Instancing
// ============================================================================

#[test]
fn instance_evaluates_independently() {
    let template = load_rig();
    let mut instance = template.instantiate().unwrap();
    let body = instance.find_node("body").unwrap();
    let hip = instance.find_node("hip").unwrap();

    assert!(
        instance
            .mesh(body)
            .unwrap()
            .shares_geometry_with(template.mesh(body).unwrap())
    );

    instance.node_mut(hip).unwrap().transform.translation = Vec2::new(8.0, 0.0);
    let matrices = instance.compute_skinning_matrices(body).unwrap();
    assert!(approx(matrices[12 + 4], 3.0));

    // Template untouched.
    let mut template = template;
    let matrices = template.compute_skinning_matrices(body).unwrap();
    assert!(approx(matrices[12 + 4], 0.0));
}

#[test]
fn instance_deform_does_not_leak_into_template() {
    let template = load_rig();
    let mut instance = template.instantiate().unwrap();
    let body = instance.find_node("body").unwrap();

    instance.mesh_mut(body).unwrap().enable_animation_deform(true);
    assert!(instance.mesh(body).unwrap().does_animation_vertex_deform());
    assert!(!template.mesh(body).unwrap().does_animation_vertex_deform());
}

// ============================================================================
// Geometry Retention
// ============================================================================

#[test]
fn geometry_disposed_after_upload_by_default() {
    let mut actor = load_rig();
    let body = actor.find_node("body").unwrap();
    actor.notify_geometry_uploaded();

    let mesh = actor.mesh(body).unwrap();
    assert!(mesh.vertices().is_none());
    assert!(mesh.triangles().is_none());
    assert!(matches!(actor.to_bytes(), Err(Skin2dError::GeometryDisposed)));
}

#[test]
fn geometry_kept_when_configured() {
    let settings = ActorSettings {
        geometry_retention: GeometryRetention::Keep,
        ..ActorSettings::default()
    };
    let mut actor = Actor::load(&rig_bytes(), &settings).unwrap();
    let body = actor.find_node("body").unwrap();
    actor.notify_geometry_uploaded();

    let mesh = actor.mesh(body).unwrap();
    assert_eq!(mesh.vertices().unwrap().len(), 36);
    assert_eq!(mesh.triangles().unwrap().len(), 3);
}

#[test]
fn instance_disposal_does_not_release_template_geometry() {
    let template = load_rig();
    let mut instance = template.instantiate().unwrap();
    let body = instance.find_node("body").unwrap();

    instance.notify_geometry_uploaded();
    assert!(instance.mesh(body).unwrap().vertices().is_none());
    assert!(template.mesh(body).unwrap().vertices().is_some());
}

// ============================================================================
// Draw Order
// ============================================================================

#[test]
fn meshes_sorted_by_draw_order() {
    let bytes = actor_bytes(3, |w| {
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "front", 0, Vec2::ZERO, 0.0)?;
            write_rigid_mesh(w, 0, 9, 0, 0, &[])
        })?;
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "back", 0, Vec2::ZERO, 0.0)?;
            write_rigid_mesh(w, 0, 1, 0, 0, &[])
        })?;
        w.write_block(BLOCK_MESH, |w| {
            write_base(w, "middle", 0, Vec2::ZERO, 0.0)?;
            write_rigid_mesh(w, 0, 5, 0, 0, &[])
        })
    });
    let actor = Actor::load(&bytes, &ActorSettings::default()).unwrap();

    let names: Vec<&str> = actor
        .meshes_by_draw_order()
        .into_iter()
        .map(|h| actor.node(h).unwrap().name.as_str())
        .collect();
    assert_eq!(names, vec!["back", "middle", "front"]);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn to_bytes_round_trips_byte_for_byte() -> anyhow::Result<()> {
    let bytes = rig_bytes();
    let actor = Actor::load(&bytes, &ActorSettings::default())?;
    assert_eq!(actor.to_bytes()?, bytes);
    Ok(())
}

#[test]
fn programmatic_actor_loads_back() -> anyhow::Result<()> {
    let mut actor = Actor::default();
    let bone = actor.push_bone(
        skin2d::Node::new("arm", NodeKind::Bone),
        skin2d::Bone::new(4.0),
        0,
    );
    actor.node_mut(bone).unwrap().transform.translation = Vec2::new(2.0, 3.0);

    let mut bindings = skin2d::scene::mesh::BoneBindings::new();
    bindings.push(skin2d::BoneBinding::new(1, Affine2::from_translation(Vec2::new(2.0, 3.0))));
    let mut mesh_node = skin2d::Node::new("sleeve", NodeKind::Mesh);
    mesh_node.set_override_world_transform(Some(Affine2::IDENTITY));
    actor.push_mesh(
        mesh_node,
        skin2d::SkinnedMesh::from_geometry(vec![1.0; 24], vec![0, 1, 1], bindings),
        0,
    );
    actor.resolve_references()?;

    let loaded = Actor::load(&actor.to_bytes()?, &ActorSettings::default())?;

    let sleeve = loaded.find_node("sleeve").unwrap();
    let arm = loaded.find_node("arm").unwrap();
    let mesh = loaded.mesh(sleeve).unwrap();
    assert_eq!(mesh.vertex_count(), 2);
    assert_eq!(mesh.bone_bindings()[0].bone(), Some(arm));
    assert!(loaded.bone(arm).unwrap().is_connected_to_mesh());
    assert_eq!(loaded.node(arm).unwrap().transform.translation, Vec2::new(2.0, 3.0));
    Ok(())
}

#[test]
fn to_bytes_rejects_indices_beyond_u16() {
    let mut actor = Actor::default();
    for _ in 0..u16::MAX {
        actor.push_node(skin2d::Node::new("n", NodeKind::Node), 0);
    }
    actor.resolve_references().unwrap();
    assert!(actor.to_bytes().is_ok());

    actor.push_node(skin2d::Node::new("overflow", NodeKind::Node), 0);
    assert!(matches!(
        actor.to_bytes(),
        Err(Skin2dError::TooManyNodes(65537))
    ));
}
