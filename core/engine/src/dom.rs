//! The read-only view of the DOM tree consulted by the breakpoint core.
//!
//! The tree itself is owned elsewhere. The core only ever addresses nodes by
//! the [`NodeId`] the owner hands out, and asks the owner about structure
//! through [`DomTree`]. No reference into the tree is ever stored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, opaque identifier of a tree node, issued by the tree owner.
///
/// Identifiers may be reused by the owner once a node is destroyed, which is
/// why every table keyed by `NodeId` is purged on the removal notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural queries the breakpoint core needs from the tree owner.
///
/// Implementations must answer for the tree as it is *right now*: the
/// instrumentation hooks are invoked at fixed points around each mutation and
/// rely on the documented before/after state (see
/// [`InstrumentationBridge`](crate::InstrumentationBridge)). Children are
/// exposed as a sibling chain; use [`children`] to iterate them.
pub trait DomTree {
    /// The document node every live node descends from.
    fn root(&self) -> Option<NodeId>;

    /// Whether `node` resolves to a node attached to the live tree.
    fn is_live(&self, node: NodeId) -> bool;

    /// The parent of `node`, if it has one.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The first child of `node`.
    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    /// The sibling following `node` under its parent.
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// The node name, e.g. `DIV` or `#text`.
    fn node_name(&self, node: NodeId) -> Option<&str>;
}

/// Iterates over the children of `node` in document order.
pub fn children(tree: &dyn DomTree, node: NodeId) -> Children<'_> {
    Children {
        tree,
        next: tree.first_child(node),
    }
}

/// Iterator over the children of a node, see [`children`].
pub struct Children<'a> {
    tree: &'a dyn DomTree,
    next: Option<NodeId>,
}

impl fmt::Debug for Children<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Children").field("next", &self.next).finish_non_exhaustive()
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Computes the path descriptor of `node`.
///
/// The descriptor is a comma separated list of `index,NAME` pairs leading from
/// the root down to `node`, where `index` is the position among the parent's
/// children. The root itself has the empty path. Returns `None` if the node is
/// not connected to the root.
#[must_use]
pub fn node_path(tree: &dyn DomTree, node: NodeId) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = node;

    while let Some(parent) = tree.parent(current) {
        let index = children(tree, parent).position(|child| child == current)?;
        let name = tree.node_name(current)?;
        segments.push(format!("{index},{name}"));
        current = parent;
    }

    if tree.root() != Some(current) {
        return None;
    }

    segments.reverse();
    Some(segments.join(","))
}

/// Resolves a path produced by [`node_path`] against the current tree.
///
/// Fails when an index is out of range or a name does not match, which is
/// the normal outcome when a stored path is replayed against a different
/// document.
#[must_use]
pub fn resolve_node_path(tree: &dyn DomTree, path: &str) -> Option<NodeId> {
    let mut node = tree.root()?;
    if path.is_empty() {
        return Some(node);
    }

    let parts: Vec<&str> = path.split(',').collect();
    if parts.len() % 2 != 0 {
        return None;
    }

    for pair in parts.chunks_exact(2) {
        let index: usize = pair[0].parse().ok()?;
        let child = children(tree, node).nth(index)?;
        if tree.node_name(child)? != pair[1] {
            return None;
        }
        node = child;
    }

    Some(node)
}
