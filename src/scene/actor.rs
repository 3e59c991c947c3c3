//! Actor container.
//!
//! An [`Actor`] owns the flat node array of one loaded asset, the node tree
//! and the per-variant component maps (bones, meshes). It drives the load
//! protocol:
//!
//! 1. **Parse**: every node block is read in stream order; cross-node
//!    references stay raw flat indices.
//! 2. **Resolve**: once every node exists, parent indices and mesh bone
//!    indices are converted into [`NodeHandle`]s. Forward references are legal.
//! 3. **Evaluate**: per frame, meshes pull their bones' world transforms and
//!    rebuild their skinning matrices.
//!
//! # Stream layout
//!
//! ```text
//! "NIMA" | version: u32 | blocks...
//!   block 1 (nodes): count: u16, then `count` node blocks
//!     block 2 node | 3 bone | 4 root bone | 5 mesh
//! ```
//!
//! Flat index 0 is the implicit actor root; streamed nodes occupy `1..=count`.

use glam::Affine2;
use slotmap::SecondaryMap;

use crate::errors::{Result, Skin2dError};
use crate::io::{BlockReader, BlockWriter};
use crate::scene::NodeHandle;
use crate::scene::bone::Bone;
use crate::scene::hierarchy::{Hierarchy, WorldTransforms};
use crate::scene::mesh::SkinnedMesh;
use crate::scene::node::{Node, NodeKind};
use crate::settings::{ActorSettings, GeometryRetention};

/// File signature.
pub const SIGNATURE: &[u8; 4] = b"NIMA";
/// The only format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;
/// Top-level block holding every node block.
pub const BLOCK_NODES: u8 = 1;

/// A loaded 2D actor: node tree plus bone and mesh components.
#[derive(Debug, Clone)]
pub struct Actor {
    hierarchy: Hierarchy,
    flat_nodes: Vec<NodeHandle>,

    // ==== Component maps ====
    bones: SecondaryMap<NodeHandle, Bone>,
    meshes: SecondaryMap<NodeHandle, SkinnedMesh>,

    settings: ActorSettings,
}

impl Default for Actor {
    fn default() -> Self {
        Self::new(ActorSettings::default())
    }
}

impl Actor {
    /// Creates an actor holding only its root node.
    #[must_use]
    pub fn new(settings: ActorSettings) -> Self {
        let mut hierarchy = Hierarchy::new();
        let root = hierarchy.insert(Node::new("Root", NodeKind::Node));
        Self {
            hierarchy,
            flat_nodes: vec![root],
            bones: SecondaryMap::new(),
            meshes: SecondaryMap::new(),
            settings,
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parses and resolves a complete actor stream.
    ///
    /// Any malformed block or dangling index aborts the whole load.
    pub fn load(bytes: &[u8], settings: &ActorSettings) -> Result<Self> {
        let mut reader = BlockReader::new(bytes);

        let signature = reader.read_bytes(SIGNATURE.len(), "signature")?;
        if signature != SIGNATURE {
            return Err(Skin2dError::InvalidSignature);
        }
        let version = reader.read_u32("format version")?;
        if version != FORMAT_VERSION {
            return Err(Skin2dError::UnsupportedVersion(version));
        }

        let mut actor = Self::new(settings.clone());
        while let Some(mut block) = reader.read_block()? {
            match block.kind {
                BLOCK_NODES => actor.read_nodes(&mut block.reader)?,
                other => log::trace!("Skipping unknown actor block type {other}"),
            }
        }

        actor.resolve_references()?;

        if settings.enable_vertex_deform {
            for mesh in actor.meshes.values_mut() {
                mesh.enable_animation_deform(true);
            }
        }

        log::debug!(
            "Loaded actor: {} nodes, {} bones, {} meshes",
            actor.flat_nodes.len(),
            actor.bones.len(),
            actor.meshes.len()
        );
        Ok(actor)
    }

    fn read_nodes(&mut self, reader: &mut BlockReader<'_>) -> Result<()> {
        let count = reader.read_u16("node count")?;
        self.flat_nodes.reserve(usize::from(count));

        for _ in 0..count {
            let Some(mut block) = reader.read_block()? else {
                return Err(Skin2dError::UnexpectedEof {
                    context: "node block",
                    needed: 5,
                    remaining: 0,
                });
            };
            let r = &mut block.reader;

            let handle = match NodeKind::from_block_type(block.kind) {
                Some(NodeKind::Node) => self.hierarchy.insert(Node::read(r, NodeKind::Node)?),
                Some(kind @ (NodeKind::Bone | NodeKind::RootBone)) => {
                    let node = Node::read(r, kind)?;
                    let bone = Bone::read(r, kind == NodeKind::RootBone)?;
                    let handle = self.hierarchy.insert(node);
                    self.bones.insert(handle, bone);
                    handle
                }
                Some(NodeKind::Mesh) => {
                    let (node, mesh) = SkinnedMesh::read(r)?;
                    let handle = self.hierarchy.insert(node);
                    self.meshes.insert(handle, mesh);
                    handle
                }
                None => {
                    // Keep the slot so later indices stay aligned.
                    log::trace!("Skipping unknown node block type {}", block.kind);
                    let mut placeholder = Node::new("", NodeKind::Node);
                    placeholder.parent_index = Some(0);
                    self.hierarchy.insert(placeholder)
                }
            };
            self.flat_nodes.push(handle);
        }
        Ok(())
    }

    // ========================================================================
    // Programmatic construction
    // ========================================================================

    /// Appends a plain node under the node at flat index `parent_index`.
    /// Links take effect on the next [`resolve_references`](Self::resolve_references).
    pub fn push_node(&mut self, mut node: Node, parent_index: u16) -> NodeHandle {
        node.parent_index = Some(parent_index);
        let handle = self.hierarchy.insert(node);
        self.flat_nodes.push(handle);
        handle
    }

    pub fn push_bone(&mut self, mut node: Node, bone: Bone, parent_index: u16) -> NodeHandle {
        node.kind = if bone.is_root() {
            NodeKind::RootBone
        } else {
            NodeKind::Bone
        };
        let handle = self.push_node(node, parent_index);
        self.bones.insert(handle, bone);
        handle
    }

    pub fn push_mesh(&mut self, mut node: Node, mesh: SkinnedMesh, parent_index: u16) -> NodeHandle {
        node.kind = NodeKind::Mesh;
        let handle = self.push_node(node, parent_index);
        self.meshes.insert(handle, mesh);
        handle
    }

    // ========================================================================
    // Resolution & instancing
    // ========================================================================

    /// Links parents and resolves every mesh's bone bindings against the flat
    /// node array.
    pub fn resolve_references(&mut self) -> Result<()> {
        let len = self.flat_nodes.len();
        for &handle in self.flat_nodes.iter().skip(1) {
            let Some(index) = self.hierarchy.get(handle).and_then(Node::parent_index) else {
                continue;
            };
            let parent = *self.flat_nodes.get(usize::from(index)).ok_or(
                Skin2dError::NodeIndexOutOfBounds {
                    context: "parent index",
                    index: usize::from(index),
                    len,
                },
            )?;
            self.hierarchy.attach(handle, parent);
        }

        self.resolve_bone_bindings()
    }

    fn resolve_bone_bindings(&mut self) -> Result<()> {
        for mesh in self.meshes.values_mut() {
            mesh.resolve_references(&self.flat_nodes, &mut self.bones)?;
        }
        Ok(())
    }

    /// Creates a runtime instance of this actor.
    ///
    /// The instance shares mesh geometry with `self` but owns its node tree,
    /// bone bindings and deform buffers. Bindings are re-resolved against the
    /// instance's own node array.
    pub fn instantiate(&self) -> Result<Self> {
        let mut instance = Self {
            hierarchy: self.hierarchy.clone(),
            flat_nodes: self.flat_nodes.clone(),
            bones: self.bones.clone(),
            meshes: self
                .meshes
                .iter()
                .map(|(handle, mesh)| (handle, mesh.instantiate()))
                .collect(),
            settings: self.settings.clone(),
        };
        instance.resolve_bone_bindings()?;
        Ok(instance)
    }

    // ========================================================================
    // Per-frame evaluation
    // ========================================================================

    /// Rebuilds the skinning matrices of the mesh at `handle`.
    ///
    /// The returned slice is valid until the next call for the same mesh.
    pub fn compute_skinning_matrices(&mut self, handle: NodeHandle) -> Result<&[f32]> {
        let mesh = self.meshes.get_mut(handle).ok_or(Skin2dError::NotAMesh)?;
        mesh.compute_skinning_matrices(&mut self.hierarchy)
    }

    /// Up-to-date world transform of `handle`.
    pub fn world_transform(&mut self, handle: NodeHandle) -> Result<Affine2> {
        self.hierarchy.world_transform(handle)
    }

    /// Evaluates every node's world transform.
    pub fn update_world_transforms(&mut self) -> Result<()> {
        self.hierarchy.update_all()
    }

    /// Called by the renderer once all mesh geometry is on the GPU. Applies
    /// the configured [`GeometryRetention`].
    pub fn notify_geometry_uploaded(&mut self) {
        match self.settings.geometry_retention {
            GeometryRetention::Keep => {}
            GeometryRetention::DisposeAfterUpload => {
                for mesh in self.meshes.values_mut() {
                    mesh.dispose_geometry();
                }
            }
        }
    }

    /// Mesh handles sorted by draw order; ties keep flat-array order.
    #[must_use]
    pub fn meshes_by_draw_order(&self) -> Vec<NodeHandle> {
        let mut handles: Vec<NodeHandle> = self
            .flat_nodes
            .iter()
            .copied()
            .filter(|&h| self.meshes.contains_key(h))
            .collect();
        handles.sort_by_key(|&h| self.meshes[h].draw_order);
        handles
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.flat_nodes[0]
    }

    #[inline]
    #[must_use]
    pub fn flat_nodes(&self) -> &[NodeHandle] {
        &self.flat_nodes
    }

    #[inline]
    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<NodeHandle> {
        self.flat_nodes.get(index).copied()
    }

    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeHandle> {
        self.flat_nodes
            .iter()
            .copied()
            .find(|&h| self.hierarchy.get(h).is_some_and(|n| n.name == name))
    }

    #[inline]
    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.hierarchy.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.hierarchy.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self, handle: NodeHandle) -> Option<&SkinnedMesh> {
        self.meshes.get(handle)
    }

    #[inline]
    pub fn mesh_mut(&mut self, handle: NodeHandle) -> Option<&mut SkinnedMesh> {
        self.meshes.get_mut(handle)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeHandle, &SkinnedMesh)> {
        self.meshes.iter()
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, handle: NodeHandle) -> Option<&Bone> {
        self.bones.get(handle)
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ActorSettings {
        &self.settings
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Writes the actor back into the stream layout [`load`](Self::load) reads.
    ///
    /// Fails with [`Skin2dError::GeometryDisposed`] if a visible mesh has
    /// released its geometry, and with [`Skin2dError::TooManyNodes`] if a
    /// flat index does not fit in `u16`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let too_many = || Skin2dError::TooManyNodes(self.flat_nodes.len());
        let node_count = u16::try_from(self.flat_nodes.len() - 1).map_err(|_| too_many())?;

        let mut flat_index: SecondaryMap<NodeHandle, u16> = SecondaryMap::new();
        for (i, &handle) in self.flat_nodes.iter().enumerate() {
            flat_index.insert(handle, u16::try_from(i).map_err(|_| too_many())?);
        }

        let mut writer = BlockWriter::new();
        writer.write_bytes(SIGNATURE);
        writer.write_u32(FORMAT_VERSION)?;
        writer.write_block(BLOCK_NODES, |w| {
            w.write_u16(node_count)?;
            for &handle in &self.flat_nodes[1..] {
                let node = self.hierarchy.get(handle).ok_or(Skin2dError::StaleNodeHandle)?;
                let parent_index = node
                    .parent
                    .and_then(|p| flat_index.get(p).copied())
                    .or(node.parent_index)
                    .unwrap_or(0);

                w.write_block(node.kind.block_type(), |w| match node.kind {
                    NodeKind::Node => node.write_base(parent_index, w),
                    NodeKind::Bone | NodeKind::RootBone => {
                        node.write_base(parent_index, w)?;
                        self.bones
                            .get(handle)
                            .ok_or(Skin2dError::StaleNodeHandle)?
                            .write(w)
                    }
                    NodeKind::Mesh => self
                        .meshes
                        .get(handle)
                        .ok_or(Skin2dError::NotAMesh)?
                        .write(node, parent_index, w),
                })?;
            }
            Ok(())
        })?;

        Ok(writer.into_bytes())
    }
}
