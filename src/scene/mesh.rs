//! Skinned 2D mesh nodes.
//!
//! A [`SkinnedMesh`] owns a static vertex/triangle buffer, an optional list of
//! [`BoneBinding`]s and an optional runtime deform buffer. Each frame it turns
//! the bound bones' world transforms into a flat array of skinning matrices
//! that a renderer multiplies against per-vertex bone weights.
//!
//! # Vertex layout
//!
//! Rigid meshes interleave `[x, y, u, v]` (stride 4). Bone-bound meshes add
//! four bone index/weight pairs (stride 12). Bone indices in the vertex data
//! address the skinning matrix array, where slot 0 is the identity.
//!
//! # Lifecycle
//!
//! 1. [`SkinnedMesh::read`] parses a node block. Bone bindings hold raw flat
//!    indices at this point.
//! 2. [`SkinnedMesh::resolve_references`] turns those indices into handles once
//!    the whole node array exists.
//! 3. [`SkinnedMesh::compute_skinning_matrices`] runs once per frame.

use std::sync::Arc;

use glam::Affine2;
use slotmap::SecondaryMap;
use smallvec::SmallVec;

use crate::errors::{Result, Skin2dError};
use crate::io::{BlockReader, BlockWriter};
use crate::math::{self, AFFINE_COMPONENTS, IDENTITY_COMPONENTS};
use crate::scene::NodeHandle;
use crate::scene::bone::Bone;
use crate::scene::hierarchy::WorldTransforms;
use crate::scene::node::{Node, NodeKind};

/// Floats per vertex for a rigid mesh: position + UV.
pub const RIGID_VERTEX_STRIDE: usize = 4;
/// Floats per vertex for a bone-bound mesh: position + UV + 4 index/weight pairs.
pub const SKINNED_VERTEX_STRIDE: usize = 12;

// Stream byte for "no texture".
const UNSET_TEXTURE_BYTE: u8 = u8::MAX;

/// Compositing mode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Normal = 0,
    Multiply = 1,
    Screen = 2,
    Additive = 3,
}

impl TryFrom<u8> for BlendMode {
    type Error = Skin2dError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Multiply),
            2 => Ok(Self::Screen),
            3 => Ok(Self::Additive),
            other => Err(Skin2dError::InvalidBlendMode(other)),
        }
    }
}

/// One bone the mesh is skinned to.
#[derive(Debug, Clone)]
pub struct BoneBinding {
    bone_index: u16,
    bone: Option<NodeHandle>,
    bind_pose: Affine2,
    inverse_bind_pose: Affine2,
}

impl BoneBinding {
    /// Creates an unresolved binding, caching the inverse bind pose.
    ///
    /// A singular bind pose (zero determinant, e.g. a bone scaled to zero
    /// when bound) has no inverse; the identity is used instead so the bone
    /// still contributes its plain world transform.
    #[must_use]
    pub fn new(bone_index: u16, bind_pose: Affine2) -> Self {
        let det = bind_pose.matrix2.determinant();
        let inverse_bind_pose = if det == 0.0 || !det.is_finite() {
            log::warn!("Bind pose for bone {bone_index} is not invertible, using identity");
            Affine2::IDENTITY
        } else {
            bind_pose.inverse()
        };
        Self {
            bone_index,
            bone: None,
            bind_pose,
            inverse_bind_pose,
        }
    }

    /// Raw flat-array index of the bone node.
    #[inline]
    #[must_use]
    pub fn bone_index(&self) -> u16 {
        self.bone_index
    }

    /// Resolved bone node, `None` until references are resolved.
    #[inline]
    #[must_use]
    pub fn bone(&self) -> Option<NodeHandle> {
        self.bone
    }

    #[inline]
    #[must_use]
    pub fn bind_pose(&self) -> &Affine2 {
        &self.bind_pose
    }

    #[inline]
    #[must_use]
    pub fn inverse_bind_pose(&self) -> &Affine2 {
        &self.inverse_bind_pose
    }
}

/// Bindings per mesh are few; keep them inline.
pub type BoneBindings = SmallVec<[BoneBinding; 8]>;

/// Skinned textured mesh payload.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    /// Render-order key among sibling meshes.
    pub draw_order: u16,
    pub blend_mode: BlendMode,
    /// Index into the texture atlas table; `-1` when unset.
    pub texture_index: i32,

    is_visible: bool,
    vertex_count: usize,
    triangle_count: usize,

    // Immutable after load and shared between a template and its instances.
    // `None` once disposed.
    vertices: Option<Arc<[f32]>>,
    triangles: Option<Arc<[u16]>>,

    animation_deformed_vertices: Option<Box<[f32]>>,
    is_vertex_deform_dirty: bool,

    bone_bindings: BoneBindings,

    // Scratch buffer, allocated on the first evaluation and overwritten after.
    skinning_matrices: Vec<f32>,
}

impl Default for SkinnedMesh {
    fn default() -> Self {
        Self {
            draw_order: 0,
            blend_mode: BlendMode::Normal,
            texture_index: -1,
            is_visible: false,
            vertex_count: 0,
            triangle_count: 0,
            vertices: Some(Arc::from(Vec::new())),
            triangles: Some(Arc::from(Vec::new())),
            animation_deformed_vertices: None,
            is_vertex_deform_dirty: false,
            bone_bindings: BoneBindings::new(),
            skinning_matrices: Vec::new(),
        }
    }
}

impl SkinnedMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a visible mesh directly from geometry.
    ///
    /// `vertices` must hold `vertex_count × stride` floats, where the stride is
    /// 12 when `bone_bindings` is non-empty and 4 otherwise; a trailing partial
    /// vertex is ignored by [`vertex_count`](Self::vertex_count).
    #[must_use]
    pub fn from_geometry(vertices: Vec<f32>, triangles: Vec<u16>, bone_bindings: BoneBindings) -> Self {
        let stride = stride_for(bone_bindings.len());
        Self {
            is_visible: true,
            vertex_count: vertices.len() / stride,
            triangle_count: triangles.len() / 3,
            vertices: Some(Arc::from(vertices)),
            triangles: Some(Arc::from(triangles)),
            bone_bindings,
            ..Self::default()
        }
    }

    // ========================================================================
    // Deserialization
    // ========================================================================

    /// Reads a mesh node block: base node fields, then the mesh payload.
    pub fn read(reader: &mut BlockReader<'_>) -> Result<(Node, Self)> {
        let mut node = Node::new("", NodeKind::Mesh);
        let mut mesh = Self::new();
        mesh.read_into(reader, &mut node)?;
        Ok((node, mesh))
    }

    /// Populates a pre-allocated node and mesh in place.
    ///
    /// Any previous mesh state is discarded first, including the skinning
    /// buffer, the deform buffer and the node's override world transform.
    /// Invisible meshes stop after the visibility byte and keep their
    /// defaults. For bone-bound meshes the trailing override world transform
    /// is installed on `node`.
    pub fn read_into(&mut self, reader: &mut BlockReader<'_>, node: &mut Node) -> Result<()> {
        node.read_base(reader)?;
        node.kind = NodeKind::Mesh;
        node.set_override_world_transform(None);
        *self = Self::default();

        self.is_visible = reader.read_u8("visibility")? != 0;
        if !self.is_visible {
            return Ok(());
        }

        self.blend_mode = BlendMode::try_from(reader.read_u8("blend mode")?)?;
        self.draw_order = reader.read_u16("draw order")?;
        self.texture_index = match reader.read_u8("texture index")? {
            UNSET_TEXTURE_BYTE => -1,
            index => i32::from(index),
        };

        let binding_count = usize::from(reader.read_u8("bone binding count")?);
        if binding_count > 0 {
            for _ in 0..binding_count {
                let bone_index = reader.read_u16("bone index")?;
                let bind_pose = reader.read_affine("bind pose")?;
                self.bone_bindings.push(BoneBinding::new(bone_index, bind_pose));
            }
            let world_override = reader.read_affine("override world transform")?;
            node.set_override_world_transform(Some(world_override));
        }

        let stride = stride_for(binding_count);
        self.vertex_count = reader.read_u32("vertex count")? as usize;
        let vertex_len = self.vertex_count.saturating_mul(stride);
        self.vertices = Some(Arc::from(reader.read_f32_array(vertex_len, "vertices")?));

        self.triangle_count = reader.read_u32("triangle count")? as usize;
        let index_len = self.triangle_count.saturating_mul(3);
        self.triangles = Some(Arc::from(reader.read_u16_array(index_len, "triangles")?));

        log::debug!(
            "Read mesh '{}': {} vertices, {} triangles, {} bone bindings",
            node.name,
            self.vertex_count,
            self.triangle_count,
            binding_count
        );
        Ok(())
    }

    /// Writes the mesh payload after the base fields of `node`.
    pub fn write(&self, node: &Node, parent_index: u16, writer: &mut BlockWriter) -> Result<()> {
        node.write_base(parent_index, writer)?;
        writer.write_u8(u8::from(self.is_visible))?;
        if !self.is_visible {
            return Ok(());
        }

        let vertices = self.vertices.as_deref().ok_or(Skin2dError::GeometryDisposed)?;
        let triangles = self.triangles.as_deref().ok_or(Skin2dError::GeometryDisposed)?;

        writer.write_u8(self.blend_mode as u8)?;
        writer.write_u16(self.draw_order)?;
        writer.write_u8(u8::try_from(self.texture_index).unwrap_or(UNSET_TEXTURE_BYTE))?;

        writer.write_u8(self.bone_bindings.len() as u8)?;
        if !self.bone_bindings.is_empty() {
            for binding in &self.bone_bindings {
                writer.write_u16(binding.bone_index)?;
                writer.write_affine(&binding.bind_pose)?;
            }
            let world_override = node.override_world_transform().copied().unwrap_or(Affine2::IDENTITY);
            writer.write_affine(&world_override)?;
        }

        writer.write_u32(self.vertex_count as u32)?;
        writer.write_f32_array(vertices)?;
        writer.write_u32(self.triangle_count as u32)?;
        writer.write_u16_array(triangles)
    }

    // ========================================================================
    // Reference resolution & instancing
    // ========================================================================

    /// Converts raw bone indices into handles from `flat_nodes` and flags the
    /// bound bones as mesh-connected.
    ///
    /// All indices are checked before any binding is touched, so a dangling
    /// index leaves the mesh unchanged.
    pub fn resolve_references(
        &mut self,
        flat_nodes: &[NodeHandle],
        bones: &mut SecondaryMap<NodeHandle, Bone>,
    ) -> Result<()> {
        for binding in &self.bone_bindings {
            let index = usize::from(binding.bone_index);
            if index >= flat_nodes.len() {
                return Err(Skin2dError::NodeIndexOutOfBounds {
                    context: "bone binding",
                    index,
                    len: flat_nodes.len(),
                });
            }
        }

        for binding in &mut self.bone_bindings {
            let handle = flat_nodes[usize::from(binding.bone_index)];
            binding.bone = Some(handle);
            match bones.get_mut(handle) {
                Some(bone) => bone.set_connected_to_mesh(true),
                None => log::warn!(
                    "Bone binding targets node {} which is not a bone",
                    binding.bone_index
                ),
            }
        }
        Ok(())
    }

    /// Creates a runtime instance.
    ///
    /// Geometry buffers are shared with `self`. Bindings and the deform buffer
    /// are copied; the skinning matrix cache starts empty.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        Self {
            draw_order: self.draw_order,
            blend_mode: self.blend_mode,
            texture_index: self.texture_index,
            is_visible: self.is_visible,
            vertex_count: self.vertex_count,
            triangle_count: self.triangle_count,
            vertices: self.vertices.clone(),
            triangles: self.triangles.clone(),
            animation_deformed_vertices: self.animation_deformed_vertices.clone(),
            is_vertex_deform_dirty: false,
            bone_bindings: self.bone_bindings.clone(),
            skinning_matrices: Vec::new(),
        }
    }

    // ========================================================================
    // Skinning
    // ========================================================================

    /// Length of the skinning matrix buffer: one identity slot plus one slot
    /// per binding, six floats each.
    #[inline]
    #[must_use]
    pub fn skinning_matrices_len(&self) -> usize {
        (self.bone_bindings.len() + 1) * AFFINE_COMPONENTS
    }

    /// Recomputes the skinning matrices from the bones' current world
    /// transforms and returns the buffer.
    ///
    /// Slot 0 is always the identity. Slot `i` holds
    /// `world(bone[i-1]) * inverse_bind_pose[i-1]`. The returned slice is
    /// overwritten in place by the next call.
    pub fn compute_skinning_matrices<W>(&mut self, world: &mut W) -> Result<&[f32]>
    where
        W: WorldTransforms + ?Sized,
    {
        if self.skinning_matrices.is_empty() {
            self.skinning_matrices = vec![0.0; self.skinning_matrices_len()];
            self.skinning_matrices[..AFFINE_COMPONENTS].copy_from_slice(&IDENTITY_COMPONENTS);
        }

        for (i, binding) in self.bone_bindings.iter().enumerate() {
            let bone = binding
                .bone
                .ok_or(Skin2dError::UnresolvedBoneBinding { binding: i })?;
            let bone_world = world.world_transform(bone)?;
            let skin = bone_world * binding.inverse_bind_pose;

            let offset = (i + 1) * AFFINE_COMPONENTS;
            math::write_components(&skin, &mut self.skinning_matrices[offset..]);
        }

        Ok(&self.skinning_matrices)
    }

    /// Last computed skinning matrices; empty before the first evaluation.
    #[inline]
    #[must_use]
    pub fn skinning_matrices(&self) -> &[f32] {
        &self.skinning_matrices
    }

    /// Byte view of the last computed skinning matrices, for buffer upload.
    #[inline]
    #[must_use]
    pub fn skinning_matrices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.skinning_matrices.as_slice())
    }

    // ========================================================================
    // Geometry & deformation
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        !self.bone_bindings.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn bone_bindings(&self) -> &[BoneBinding] {
        &self.bone_bindings
    }

    /// Floats per vertex in [`vertices`](Self::vertices).
    #[inline]
    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        stride_for(self.bone_bindings.len())
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Interleaved vertex data, `None` once disposed.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> Option<&[f32]> {
        self.vertices.as_deref()
    }

    /// Triangle index list, `None` once disposed.
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> Option<&[u16]> {
        self.triangles.as_deref()
    }

    /// Whether `other` shares this mesh's vertex buffer.
    #[must_use]
    pub fn shares_geometry_with(&self, other: &Self) -> bool {
        match (&self.vertices, &other.vertices) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn does_animation_vertex_deform(&self) -> bool {
        self.animation_deformed_vertices.is_some()
    }

    /// Creates (zeroed, `vertex_count × 2` floats) or drops the deform buffer.
    /// Enabling an already enabled buffer keeps its contents.
    pub fn enable_animation_deform(&mut self, enable: bool) {
        if enable {
            if self.animation_deformed_vertices.is_none() {
                self.animation_deformed_vertices =
                    Some(vec![0.0; self.vertex_count * 2].into_boxed_slice());
            }
        } else {
            self.animation_deformed_vertices = None;
        }
    }

    #[inline]
    #[must_use]
    pub fn animation_deformed_vertices(&self) -> Option<&[f32]> {
        self.animation_deformed_vertices.as_deref()
    }

    #[inline]
    pub fn animation_deformed_vertices_mut(&mut self) -> Option<&mut [f32]> {
        self.animation_deformed_vertices.as_deref_mut()
    }

    #[inline]
    #[must_use]
    pub fn is_vertex_deform_dirty(&self) -> bool {
        self.is_vertex_deform_dirty
    }

    pub fn set_vertex_deform_dirty(&mut self, dirty: bool) {
        self.is_vertex_deform_dirty = dirty;
    }

    /// Releases geometry after upload.
    ///
    /// Triangles are always dropped. Vertices are kept when a deform buffer
    /// exists, since they remain the deformation baseline.
    pub fn dispose_geometry(&mut self) {
        if self.animation_deformed_vertices.is_none() {
            self.vertices = None;
        }
        self.triangles = None;
    }
}

#[inline]
fn stride_for(binding_count: usize) -> usize {
    if binding_count > 0 {
        SKINNED_VERTEX_STRIDE
    } else {
        RIGID_VERTEX_STRIDE
    }
}
