//! Keeps inherited subtree breakpoints in step with the tree structure.
//!
//! A subtree breakpoint is stored once, as an owned bit on the node it was set
//! on, and copied as an inherited bit onto every descendant. The copies are
//! written at exactly three moments: when the breakpoint is set or removed,
//! when nodes are inserted, and when nodes are removed. Nothing rescans the
//! tree afterwards.

use crate::{
    dom::{DomTree, NodeId, children},
    mask::NodeBreakpointMask,
    set::MaskTable,
};
use log::trace;

/// Applies subtree scope to a [`MaskTable`] keyed by node.
pub struct SubtreePropagator<'a> {
    table: &'a mut MaskTable<NodeId>,
    tree: &'a dyn DomTree,
}

impl std::fmt::Debug for SubtreePropagator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtreePropagator")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<'a> SubtreePropagator<'a> {
    /// Creates a propagator over `table`, walking `tree`.
    pub fn new(table: &'a mut MaskTable<NodeId>, tree: &'a dyn DomTree) -> Self {
        Self { table, tree }
    }

    /// Adds (`set`) or withdraws the inheritable bits of `root_mask` on every
    /// descendant of `node`, not on `node` itself.
    pub fn update_descendants(&mut self, node: NodeId, root_mask: NodeBreakpointMask, set: bool) {
        let root_mask = root_mask.intersection(NodeBreakpointMask::INHERITABLE);
        if root_mask.is_empty() {
            return;
        }
        let mut stack: Vec<_> = children(self.tree, node)
            .map(|child| (child, root_mask))
            .collect();
        self.drain(&mut stack, set);
    }

    /// Adds (`set`) or withdraws the inheritable bits of `root_mask` on `node`
    /// and its descendants.
    ///
    /// Descent stops below any node that owns one of the bits itself: that
    /// node's own breakpoint already accounts for its subtree.
    pub fn update_subtree(&mut self, node: NodeId, root_mask: NodeBreakpointMask, set: bool) {
        let root_mask = root_mask.intersection(NodeBreakpointMask::INHERITABLE);
        if root_mask.is_empty() {
            return;
        }
        let mut stack = vec![(node, root_mask)];
        self.drain(&mut stack, set);
    }

    fn drain(&mut self, stack: &mut Vec<(NodeId, NodeBreakpointMask)>, set: bool) {
        let mut visited = 0usize;
        while let Some((node, root_mask)) = stack.pop() {
            visited += 1;
            let old_mask = self.table.mask(&node);
            let derived = root_mask.as_inherited();
            let new_mask = if set {
                old_mask.union(derived)
            } else {
                old_mask.difference(derived)
            };
            self.table.set_mask(node, new_mask);

            let remaining = root_mask.difference(new_mask.own());
            if remaining.is_empty() {
                continue;
            }
            stack.extend(children(self.tree, node).map(|child| (child, remaining)));
        }
        trace!("subtree propagation (set: {set}) visited {visited} nodes");
    }

    /// Reacts to `node` having been inserted: it and everything inserted
    /// along with it inherit the subtree breakpoints visible on its new parent.
    pub fn did_insert(&mut self, node: NodeId) {
        if self.table.is_empty() {
            return;
        }
        let Some(parent) = self.tree.parent(node) else {
            return;
        };
        let inheritable = self
            .table
            .effective_mask(&parent)
            .intersection(NodeBreakpointMask::INHERITABLE);
        if !inheritable.is_empty() {
            self.update_subtree(node, inheritable, true);
        }
    }

    /// Reacts to `node` having been removed: its entry and the entries of its
    /// former descendants are deleted.
    ///
    /// The removed subtree must still be linked below `node`.
    pub fn did_remove(&mut self, node: NodeId) {
        if self.table.is_empty() {
            return;
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.table.forget(&current);
            stack.extend(children(self.tree, current));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dom::fixture::FixtureTree, mask::DomBreakpointType};

    const SUBTREE: NodeBreakpointMask = NodeBreakpointMask::SUBTREE_MODIFIED;
    const INHERITED: NodeBreakpointMask = NodeBreakpointMask::INHERITED_SUBTREE_MODIFIED;

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    /// 0 ─ 1 ─┬─ 2 ─ 3
    ///        └─ 4
    fn tree() -> FixtureTree {
        let mut tree = FixtureTree::new();
        tree.add(1, 0, "HTML");
        tree.add(2, 1, "BODY");
        tree.add(3, 2, "DIV");
        tree.add(4, 1, "SPAN");
        tree
    }

    #[test]
    fn descendants_inherit_and_lose_bits() {
        let tree = tree();
        let mut table = MaskTable::new();
        table.add(id(1), SUBTREE);

        SubtreePropagator::new(&mut table, &tree).update_descendants(id(1), SUBTREE, true);
        assert_eq!(table.mask(&id(1)), SUBTREE);
        for node in [2, 3, 4] {
            assert_eq!(table.mask(&id(node)), INHERITED, "node {node}");
        }

        table.remove(id(1), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(1), SUBTREE, false);
        assert!(table.is_empty());
    }

    #[test]
    fn descent_stops_at_owner() {
        let tree = tree();
        let mut table = MaskTable::new();
        table.add(id(2), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(2), SUBTREE, true);
        table.add(id(1), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(1), SUBTREE, true);
        assert_eq!(table.mask(&id(2)), SUBTREE | INHERITED);
        assert_eq!(table.mask(&id(3)), INHERITED);

        table.remove(id(1), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(1), SUBTREE, false);
        assert_eq!(table.mask(&id(2)), SUBTREE);
        assert_eq!(table.mask(&id(3)), INHERITED, "still covered by node 2");
        assert!(!table.contains(&id(4)));
    }

    #[test]
    fn non_inheritable_bits_do_not_propagate() {
        let tree = tree();
        let mut table = MaskTable::new();
        SubtreePropagator::new(&mut table, &tree).update_descendants(
            id(1),
            DomBreakpointType::AttributeModified.bit(),
            true,
        );
        assert!(table.is_empty());
    }

    #[test]
    fn insertion_inherits_from_parent() {
        let mut tree = tree();
        let mut table = MaskTable::new();
        table.add(id(2), SUBTREE);

        tree.add(5, 2, "P");
        tree.add(6, 5, "EM");
        SubtreePropagator::new(&mut table, &tree).did_insert(id(5));
        assert_eq!(table.mask(&id(5)), INHERITED);
        assert_eq!(table.mask(&id(6)), INHERITED);
    }

    #[test]
    fn removal_purges_the_subtree() {
        let mut tree = tree();
        let mut table = MaskTable::new();
        table.add(id(1), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(1), SUBTREE, true);
        table.add(id(3), NodeBreakpointMask::NODE_REMOVED);

        tree.detach(2);
        SubtreePropagator::new(&mut table, &tree).did_remove(id(2));
        assert!(!table.contains(&id(2)));
        assert!(!table.contains(&id(3)));
        assert!(table.contains(&id(4)));
    }

    #[test]
    fn moved_node_is_recomputed() {
        let mut tree = tree();
        let mut table = MaskTable::new();
        table.add(id(2), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).update_descendants(id(2), SUBTREE, true);
        assert_eq!(table.mask(&id(3)), INHERITED);

        tree.detach(3);
        SubtreePropagator::new(&mut table, &tree).did_remove(id(3));
        tree.attach(3, 4);
        SubtreePropagator::new(&mut table, &tree).did_insert(id(3));
        assert!(!table.contains(&id(3)));
    }

    #[test]
    fn removing_unknown_node_is_a_no_op() {
        let tree = tree();
        let mut table = MaskTable::new();
        table.add(id(4), SUBTREE);
        SubtreePropagator::new(&mut table, &tree).did_remove(id(42));
        assert_eq!(table.len(), 1);
    }
}
