//! The breakpoint registry: all breakpoint categories behind one façade.

use crate::{
    dom::{DomTree, NodeId, resolve_node_path},
    error::{BreakpointError, DebugResult},
    mask::{DomBreakpointType, NodeBreakpointMask},
    propagate::SubtreePropagator,
    record::StickyBreakpointRecord,
    set::{BreakpointSet, MaskTable, XhrBreakpointSet},
};
use log::{debug, warn};

/// Outcome of [`BreakpointRegistry::bulk_restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records applied.
    pub restored: usize,
    /// Malformed records skipped.
    pub skipped: usize,
}

/// DOM, event listener and XHR breakpoints of one debugging session.
///
/// The three categories are stored independently. Every operation is total:
/// removing something that is not there succeeds without effect. The only
/// reported failure of a set or remove is a node that is not in the live tree,
/// and it is reported before any state changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointRegistry {
    dom: MaskTable<NodeId>,
    event_listeners: BreakpointSet<String>,
    xhr: XhrBreakpointSet,
}

impl BreakpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn propagator<'a>(&'a mut self, tree: &'a dyn DomTree) -> SubtreePropagator<'a> {
        SubtreePropagator::new(&mut self.dom, tree)
    }

    /// Sets a `kind` breakpoint on `node`.
    ///
    /// Subtree breakpoints become visible on every current descendant
    /// immediately, and on future ones as they are inserted.
    ///
    /// # Errors
    ///
    /// [`BreakpointError::NodeNotFound`] if `node` is not in the live tree.
    pub fn set_dom_breakpoint(
        &mut self,
        tree: &dyn DomTree,
        node: NodeId,
        kind: DomBreakpointType,
    ) -> DebugResult<()> {
        if !tree.is_live(node) {
            return Err(BreakpointError::NodeNotFound(node));
        }

        let bit = kind.bit();
        self.dom.add(node, bit);
        if kind.is_inheritable() {
            self.propagator(tree).update_descendants(node, bit, true);
        }
        Ok(())
    }

    /// Removes the `kind` breakpoint owned by `node`.
    ///
    /// Descendants only lose the inherited bit when `node` does not itself
    /// inherit the same type from further up.
    ///
    /// # Errors
    ///
    /// [`BreakpointError::NodeNotFound`] if `node` is not in the live tree.
    pub fn remove_dom_breakpoint(
        &mut self,
        tree: &dyn DomTree,
        node: NodeId,
        kind: DomBreakpointType,
    ) -> DebugResult<()> {
        if !tree.is_live(node) {
            return Err(BreakpointError::NodeNotFound(node));
        }

        let bit = kind.bit();
        if !self.dom.mask(&node).contains(bit) {
            return Ok(());
        }
        self.dom.remove(node, bit);

        let remaining = self.dom.mask(&node);
        if kind.is_inheritable() && !remaining.contains(kind.inherited_bit()) {
            self.propagator(tree).update_descendants(node, bit, false);
        }
        Ok(())
    }

    /// Whether `node` breaks on `kind`, owned or inherited.
    #[must_use]
    pub fn has_breakpoint(&self, node: NodeId, kind: DomBreakpointType) -> bool {
        self.dom.mask(&node).breaks_on(kind)
    }

    /// The raw stored mask of `node`.
    #[must_use]
    pub fn dom_mask(&self, node: NodeId) -> NodeBreakpointMask {
        self.dom.mask(&node)
    }

    /// The types `node` breaks on, folded onto the owned bit positions.
    #[must_use]
    pub fn effective_mask(&self, node: NodeId) -> NodeBreakpointMask {
        self.dom.effective_mask(&node)
    }

    /// Whether any DOM breakpoint state is held for `node`.
    #[must_use]
    pub fn tracks_node(&self, node: NodeId) -> bool {
        self.dom.contains(&node)
    }

    /// Whether any node owns a DOM breakpoint, as opposed to only inheriting
    /// one.
    #[must_use]
    pub fn owns_dom_breakpoints(&self) -> bool {
        self.dom.iter().any(|(_, mask)| !mask.own().is_empty())
    }

    /// Number of nodes with DOM breakpoint state.
    #[must_use]
    pub fn tracked_node_count(&self) -> usize {
        self.dom.len()
    }

    /// The nearest node, starting at `start` and walking up, that owns a
    /// `kind` breakpoint.
    #[must_use]
    pub fn breakpoint_owner(
        &self,
        tree: &dyn DomTree,
        start: NodeId,
        kind: DomBreakpointType,
    ) -> Option<NodeId> {
        let bit = kind.bit();
        let mut current = Some(start);
        while let Some(node) = current {
            if self.dom.mask(&node).contains(bit) {
                return Some(node);
            }
            current = tree.parent(node);
        }
        None
    }

    /// Updates DOM breakpoint state after `node` was inserted.
    pub fn did_insert_dom_node(&mut self, tree: &dyn DomTree, node: NodeId) {
        self.propagator(tree).did_insert(node);
    }

    /// Purges DOM breakpoint state after `node` was removed.
    pub fn did_remove_dom_node(&mut self, tree: &dyn DomTree, node: NodeId) {
        self.propagator(tree).did_remove(node);
    }

    /// Pauses before any listener for `event_name` is dispatched.
    ///
    /// Names are `category:event`, the key
    /// [`pause_on_native_event_if_needed`](crate::InstrumentationBridge::pause_on_native_event_if_needed)
    /// looks up.
    ///
    /// # Errors
    ///
    /// [`BreakpointError::InvalidEventName`] if either part is missing.
    pub fn set_event_listener_breakpoint(&mut self, event_name: &str) -> DebugResult<()> {
        check_event_name(event_name)?;
        if !self.event_listeners.contains(event_name) {
            self.event_listeners.add(event_name.to_owned());
        }
        Ok(())
    }

    /// Stops pausing on `event_name`.
    ///
    /// # Errors
    ///
    /// [`BreakpointError::InvalidEventName`] if either part is missing.
    pub fn remove_event_listener_breakpoint(&mut self, event_name: &str) -> DebugResult<()> {
        check_event_name(event_name)?;
        self.event_listeners.remove(event_name);
        Ok(())
    }

    /// Whether `event_name` has a breakpoint.
    #[must_use]
    pub fn has_event_listener_breakpoint(&self, event_name: &str) -> bool {
        self.event_listeners.contains(event_name)
    }

    /// Iterates over the event listener breakpoints in insertion order.
    pub fn event_listener_breakpoints(&self) -> impl ExactSizeIterator<Item = &str> {
        self.event_listeners.iter().map(String::as_str)
    }

    /// Pauses on requests whose URL contains `url`.
    ///
    /// The empty string is special: it turns on the match-any flag instead of
    /// storing an empty pattern, so every request pauses regardless of the
    /// other patterns.
    pub fn set_xhr_breakpoint(&mut self, url: &str) {
        if url.is_empty() {
            self.xhr.set_match_any_url(true);
        } else {
            self.xhr.add_pattern(url);
        }
    }

    /// Removes an XHR breakpoint; the empty string clears the match-any flag.
    pub fn remove_xhr_breakpoint(&mut self, url: &str) {
        if url.is_empty() {
            self.xhr.set_match_any_url(false);
        } else {
            self.xhr.remove_pattern(url);
        }
    }

    /// Whether the XHR breakpoint `url` is set, with the same empty-string
    /// convention as [`set_xhr_breakpoint`](Self::set_xhr_breakpoint).
    #[must_use]
    pub fn has_xhr_breakpoint(&self, url: &str) -> bool {
        if url.is_empty() {
            self.xhr.match_any_url()
        } else {
            self.xhr.contains_pattern(url)
        }
    }

    /// Whether every request pauses.
    #[must_use]
    pub fn match_any_url(&self) -> bool {
        self.xhr.match_any_url()
    }

    /// The XHR breakpoint a request to `url` hits, if any.
    #[must_use]
    pub fn xhr_match(&self, url: &str) -> Option<&str> {
        self.xhr.matching_pattern(url)
    }

    /// Iterates over the stored XHR patterns in insertion order.
    pub fn xhr_patterns(&self) -> impl ExactSizeIterator<Item = &str> {
        self.xhr.patterns()
    }

    /// Whether no breakpoint of any category is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dom.is_empty() && self.event_listeners.is_empty() && self.xhr.is_empty()
    }

    /// Drops every breakpoint of every category.
    pub fn clear(&mut self) {
        self.dom.clear();
        self.event_listeners.clear();
        self.xhr.clear();
    }

    /// Replaces the whole registry with the breakpoints in `records`.
    ///
    /// Records that cannot be applied to `tree` are skipped and logged. The
    /// new state is built aside and swapped in at the end.
    pub fn bulk_restore<I>(&mut self, tree: &dyn DomTree, records: I) -> RestoreReport
    where
        I: IntoIterator<Item = StickyBreakpointRecord>,
    {
        let mut restored = Self::new();
        let mut report = RestoreReport::default();

        for record in records {
            match restored.apply_record(tree, &record) {
                Ok(()) => report.restored += 1,
                Err(err) => {
                    warn!("skipping sticky breakpoint {record:?}: {err}");
                    report.skipped += 1;
                }
            }
        }

        debug!(
            "restored {} sticky breakpoints, skipped {}",
            report.restored, report.skipped
        );
        *self = restored;
        report
    }

    fn apply_record(
        &mut self,
        tree: &dyn DomTree,
        record: &StickyBreakpointRecord,
    ) -> DebugResult<()> {
        match record {
            StickyBreakpointRecord::Dom {
                path,
                breakpoint_type,
            } => {
                let kind = DomBreakpointType::try_from(*breakpoint_type).map_err(|_| {
                    BreakpointError::MalformedRecord(format!(
                        "unknown DOM breakpoint type {breakpoint_type}"
                    ))
                })?;
                let node = resolve_node_path(tree, path).ok_or_else(|| {
                    BreakpointError::MalformedRecord(format!("no node at path \"{path}\""))
                })?;
                self.set_dom_breakpoint(tree, node, kind)
            }
            StickyBreakpointRecord::EventListener { event_name } => {
                self.set_event_listener_breakpoint(event_name)
            }
            StickyBreakpointRecord::Xhr { url } => {
                self.set_xhr_breakpoint(url);
                Ok(())
            }
        }
    }

    /// The records that would restore the current breakpoints.
    ///
    /// Only owned DOM bits are recorded; inherited ones follow from their
    /// owner. Nodes come in identifier order so snapshots are stable.
    #[must_use]
    pub fn snapshot(&self, tree: &dyn DomTree) -> Vec<StickyBreakpointRecord> {
        let mut nodes: Vec<_> = self.dom.iter().collect();
        nodes.sort_unstable_by_key(|&(node, _)| *node);

        let dom = nodes.into_iter().flat_map(|(&node, mask)| {
            DomBreakpointType::ALL
                .into_iter()
                .filter(move |kind| mask.contains(kind.bit()))
                .filter_map(move |kind| StickyBreakpointRecord::dom(tree, node, kind))
        });
        let listeners = self
            .event_listeners
            .iter()
            .map(StickyBreakpointRecord::event_listener);
        let xhr = self
            .xhr
            .patterns()
            .map(StickyBreakpointRecord::xhr)
            .chain(
                self.xhr
                    .match_any_url()
                    .then(|| StickyBreakpointRecord::xhr("")),
            );

        dom.chain(listeners).chain(xhr).collect()
    }
}

fn check_event_name(event_name: &str) -> DebugResult<()> {
    match event_name.split_once(':') {
        Some((category, event)) if !category.is_empty() && !event.is_empty() => Ok(()),
        _ => Err(BreakpointError::InvalidEventName(event_name.to_owned())),
    }
}
