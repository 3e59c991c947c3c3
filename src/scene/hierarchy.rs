//! Node storage and pull-based world transform evaluation.
//!
//! There is no per-frame propagation pass. A world transform is computed when
//! someone asks for it: the node's ancestor chain is walked top-down and only
//! the links whose local transform or parent world changed are recomputed.
//!
//! Change detection uses epochs. Every recomputed world matrix gets a fresh
//! value from a monotonically increasing counter, and each node remembers the
//! parent epoch it was last computed against. A node is stale when its local
//! TRS changed or its parent's epoch differs from the remembered one.

use glam::Affine2;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{Result, Skin2dError};
use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// Source of current bone world transforms for skinning evaluation.
pub trait WorldTransforms {
    /// Returns the up-to-date world transform of `handle`, recomputing it
    /// (and its ancestors) if needed.
    fn world_transform(&mut self, handle: NodeHandle) -> Result<Affine2>;
}

/// Slot-map backed node tree.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: SlotMap<NodeHandle, Node>,
    epoch: u64,
}

impl Hierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeHandle {
        self.nodes.insert(node)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    /// Makes `child` a child of `parent`, detaching it from any old parent.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(parent) {
            log::error!("Parent node not found during attach!");
            return;
        }

        // 1. Detach from old
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent
            && let Some(n) = self.nodes.get_mut(p)
            && let Some(i) = n.children.iter().position(|&x| x == child)
        {
            n.children.remove(i);
        }

        // 2. Attach to new
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }

        // 3. Update child
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    /// Evaluates every node's world transform.
    pub fn update_all(&mut self) -> Result<()> {
        let handles: Vec<NodeHandle> = self.nodes.keys().collect();
        for handle in handles {
            self.world_transform(handle)?;
        }
        Ok(())
    }

    fn ancestor_chain(&self, handle: NodeHandle) -> Result<SmallVec<[NodeHandle; 16]>> {
        let mut chain = SmallVec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            let node = self.nodes.get(h).ok_or(Skin2dError::StaleNodeHandle)?;
            chain.push(h);
            if chain.len() > self.nodes.len() {
                return Err(Skin2dError::HierarchyCycle);
            }
            current = node.parent;
        }
        Ok(chain)
    }
}

impl WorldTransforms for Hierarchy {
    fn world_transform(&mut self, handle: NodeHandle) -> Result<Affine2> {
        let chain = self.ancestor_chain(handle)?;

        let mut parent_world = Affine2::IDENTITY;
        let mut parent_epoch = 0;
        for &h in chain.iter().rev() {
            let node = &mut self.nodes[h];
            let local_changed = node.transform.update_local_matrix();

            if local_changed || node.world_epoch == 0 || node.parent_epoch_seen != parent_epoch {
                let world = match node.override_world {
                    Some(world) => world,
                    None => parent_world * node.transform.local_matrix,
                };
                node.transform.set_world_matrix(world);

                self.epoch += 1;
                node.world_epoch = self.epoch;
                node.parent_epoch_seen = parent_epoch;
            }

            parent_world = node.transform.world_matrix;
            parent_epoch = node.world_epoch;
        }

        Ok(parent_world)
    }
}
