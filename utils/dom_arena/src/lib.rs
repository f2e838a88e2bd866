//! An arena-backed DOM tree.
//!
//! Nodes live in slots of a single vector and are addressed by [`NodeId`],
//! the slot index. Destroyed slots go onto a free list and are handed out
//! again by the next [`Document::create_element`], so identifiers are reused
//! the way a real DOM reuses node addresses.
//!
//! [`Document`] implements [`DomTree`], and the [`instrumented`] module wraps
//! each mutation with the breakpoint hooks that must surround it.

#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

pub mod instrumented;

use domdebug_engine::{DomTree, NodeId};
use log::trace;
use thin_vec::ThinVec;
use thiserror::Error;

/// The name of the document node.
pub const DOCUMENT_NODE_NAME: &str = "#document";

/// Result type of tree mutations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Why a tree mutation was rejected. A rejected mutation changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The identifier does not name an existing node.
    #[error("no node with id {}", .0.get())]
    UnknownNode(NodeId),

    /// The node already has a parent and must be detached first.
    #[error("node {} already has a parent", .0.get())]
    AlreadyAttached(NodeId),

    /// The node is still in a tree and cannot be destroyed.
    #[error("node {} must be detached before it is destroyed", .0.get())]
    StillAttached(NodeId),

    /// The reference node is not a child of the parent.
    #[error("node {} is not a child of node {}", .child.get(), .parent.get())]
    NotAChild {
        /// The expected child.
        child: NodeId,
        /// The parent it was looked up under.
        parent: NodeId,
    },

    /// The node would become its own ancestor.
    #[error("inserting node {} there would create a cycle", .0.get())]
    Cycle(NodeId),

    /// The document node cannot be inserted, detached or destroyed.
    #[error("the document node cannot be moved or destroyed")]
    DocumentNode,
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: ThinVec<NodeId>,
    attributes: ThinVec<(String, String)>,
}

impl NodeData {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: ThinVec::new(),
            attributes: ThinVec::new(),
        }
    }
}

/// A document: the root node plus every node created from it.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Option<NodeData>>,
    free_list: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Some(NodeData::new(DOCUMENT_NODE_NAME.to_owned()))],
            free_list: Vec::new(),
        }
    }

    /// The document node.
    #[must_use]
    pub const fn document_node(&self) -> NodeId {
        NodeId::new(0)
    }

    fn slot(id: NodeId) -> Option<usize> {
        usize::try_from(id.get()).ok()
    }

    fn node(&self, id: NodeId) -> ArenaResult<&NodeData> {
        Self::slot(id)
            .and_then(|slot| self.slots.get(slot))
            .and_then(Option::as_ref)
            .ok_or(ArenaError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> ArenaResult<&mut NodeData> {
        Self::slot(id)
            .and_then(|slot| self.slots.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(ArenaError::UnknownNode(id))
    }

    /// Whether `id` names an existing node, attached or not.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of existing nodes, including the document node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Whether the document holds nothing but the document node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Creates a detached element. Tag names are upper-cased, as HTML
    /// reports them.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        let data = NodeData::new(tag_name.to_ascii_uppercase());
        let slot = if let Some(slot) = self.free_list.pop() {
            self.slots[slot] = Some(data);
            slot
        } else {
            self.slots.push(Some(data));
            self.slots.len() - 1
        };
        NodeId::new(slot as u64)
    }

    /// The children of `id`, in order. Empty for unknown nodes.
    #[must_use]
    pub fn child_nodes(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// `id` and every node below it, in pre-order.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            nodes.push(current);
            stack.extend(self.child_nodes(current).iter().rev());
        }
        nodes
    }

    /// Checks that `child` may be inserted under `parent` before `reference`.
    ///
    /// `AlreadyAttached` is checked last, so a caller that detaches first
    /// knows every other condition already holds.
    pub(crate) fn check_insert(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> ArenaResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if child == self.document_node() {
            return Err(ArenaError::DocumentNode);
        }
        if let Some(reference) = reference
            && !parent_node.children.contains(&reference)
        {
            return Err(ArenaError::NotAChild {
                child: reference,
                parent,
            });
        }

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(ArenaError::Cycle(child));
            }
            ancestor = self.node(current)?.parent;
        }

        if child_node.parent.is_some() {
            return Err(ArenaError::AlreadyAttached(child));
        }
        Ok(())
    }

    /// Inserts the detached `child` under `parent`, before `reference` or
    /// last when `reference` is `None`.
    ///
    /// # Errors
    ///
    /// Fails without changing the tree if a node is unknown, `child` is
    /// attached or is an ancestor of `parent`, or `reference` is not a child
    /// of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> ArenaResult<()> {
        self.check_insert(parent, child, reference)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|reference| siblings.iter().position(|&node| node == reference))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        trace!("inserted {child} under {parent} at {index}");
        Ok(())
    }

    /// Appends the detached `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// See [`insert_before`](Self::insert_before).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> ArenaResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Checks that `id` may be detached; returns its parent, if any.
    pub(crate) fn check_detach(&self, id: NodeId) -> ArenaResult<Option<NodeId>> {
        if id == self.document_node() {
            return Err(ArenaError::DocumentNode);
        }
        Ok(self.node(id)?.parent)
    }

    /// Unlinks `id` from its parent. Its own subtree stays intact. Detaching
    /// a detached node does nothing.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown or the document node.
    pub fn detach(&mut self, id: NodeId) -> ArenaResult<()> {
        let Some(parent) = self.check_detach(id)? else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&child| child != id);
        self.node_mut(id)?.parent = None;
        trace!("detached {id} from {parent}");
        Ok(())
    }

    /// Destroys the detached node `id` and its whole subtree. Their
    /// identifiers become available for reuse.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown, attached or the document node.
    pub fn destroy(&mut self, id: NodeId) -> ArenaResult<()> {
        if self.check_detach(id)?.is_some() {
            return Err(ArenaError::StillAttached(id));
        }

        for node in self.subtree(id) {
            if let Some(slot) = Self::slot(node) {
                self.slots[slot] = None;
                self.free_list.push(slot);
            }
        }
        Ok(())
    }

    /// Sets an attribute, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> ArenaResult<()> {
        let attributes = &mut self.node_mut(id)?.attributes;
        if let Some((_, old)) = attributes.iter_mut().find(|(key, _)| key == name) {
            value.clone_into(old);
        } else {
            attributes.push((name.to_owned(), value.to_owned()));
        }
        Ok(())
    }

    /// The value of an attribute.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .ok()?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl DomTree for Document {
    fn root(&self) -> Option<NodeId> {
        Some(self.document_node())
    }

    fn is_live(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            match self.node(current) {
                Ok(NodeData {
                    parent: Some(parent),
                    ..
                }) => current = *parent,
                Ok(_) => return current == self.document_node(),
                Err(_) => return false,
            }
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.child_nodes(node).first().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.child_nodes(self.parent(node)?);
        let index = siblings.iter().position(|&sibling| sibling == node)?;
        siblings.get(index + 1).copied()
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        Some(self.node(node).ok()?.name.as_str())
    }
}
