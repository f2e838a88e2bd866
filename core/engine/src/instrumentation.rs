//! Instrumentation hooks called by the DOM and network layers
//!
//! This module provides the entry points a DOM implementation must invoke
//! around its mutations, and that the network and event layers invoke before
//! sending a request or dispatching a platform event. Each hook first updates
//! the node-keyed breakpoint state, then checks the registry, and on a match
//! hands a [`PauseDescription`] to the [`PauseHandler`].
//!
//! # Call sites
//!
//! | hook                                | when                                        |
//! |-------------------------------------|---------------------------------------------|
//! | [`will_insert_dom_node`]            | before `node` is linked under `parent`       |
//! | [`did_insert_dom_node`]             | right after `node` is linked                 |
//! | [`will_remove_dom_node`]            | before `node` is unlinked                    |
//! | [`did_remove_dom_node`]             | right after `node` is unlinked, subtree intact |
//! | [`will_modify_dom_attr`]            | before an attribute of `element` changes     |
//! | [`will_send_xml_http_request`]      | before a request to `url` goes out           |
//! | [`pause_on_native_event_if_needed`] | before a named platform event is dispatched  |
//!
//! Missing any of the DOM call sites silently breaks subtree breakpoints.
//!
//! [`will_insert_dom_node`]: InstrumentationBridge::will_insert_dom_node
//! [`did_insert_dom_node`]: InstrumentationBridge::did_insert_dom_node
//! [`will_remove_dom_node`]: InstrumentationBridge::will_remove_dom_node
//! [`did_remove_dom_node`]: InstrumentationBridge::did_remove_dom_node
//! [`will_modify_dom_attr`]: InstrumentationBridge::will_modify_dom_attr
//! [`will_send_xml_http_request`]: InstrumentationBridge::will_send_xml_http_request
//! [`pause_on_native_event_if_needed`]: InstrumentationBridge::pause_on_native_event_if_needed

use crate::{
    dom::{DomTree, NodeId},
    mask::DomBreakpointType,
    pause::{BreakpointCategory, PauseDescription, PauseHandler},
    registry::BreakpointRegistry,
    store::StickyStore,
};
use log::{debug, warn};
use std::fmt;

/// Hook implementation that connects the registry with the pause mechanism
///
/// Obtained from [`DomDebugger::instrumentation`](crate::DomDebugger::instrumentation).
/// An inactive bridge (debugger disabled) still keeps the node table
/// consistent but never pauses.
///
/// With a sticky store attached, structural changes that move or drop nodes
/// owning DOM breakpoints rewrite the stored records of the inspected URL, so
/// stored node paths keep pointing at the nodes that own the breakpoints.
///
/// Every pausing hook returns whether it paused.
pub struct InstrumentationBridge<'a> {
    registry: &'a mut BreakpointRegistry,
    pause: &'a dyn PauseHandler,
    active: bool,
    sticky: Option<StickySink<'a>>,
}

/// Where the bridge writes back DOM records after structural changes.
struct StickySink<'a> {
    store: &'a mut dyn StickyStore,
    url: &'a str,
}

impl fmt::Debug for InstrumentationBridge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationBridge")
            .field("registry", &self.registry)
            .field("active", &self.active)
            .field("sticky_url", &self.sticky.as_ref().map(|sink| sink.url))
            .finish_non_exhaustive()
    }
}

impl<'a> InstrumentationBridge<'a> {
    /// Creates an active bridge over `registry`, pausing through `pause`.
    pub fn new(registry: &'a mut BreakpointRegistry, pause: &'a dyn PauseHandler) -> Self {
        Self {
            registry,
            pause,
            active: true,
            sticky: None,
        }
    }

    /// Keeps the records of `url` in `store` in step with the registry as
    /// nodes are inserted and removed.
    #[must_use]
    pub fn with_sticky_store(mut self, store: &'a mut dyn StickyStore, url: &'a str) -> Self {
        self.sticky = Some(StickySink { store, url });
        self
    }

    /// Enables or disables pausing.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Gets a reference to the registry
    #[must_use]
    pub fn registry(&self) -> &BreakpointRegistry {
        self.registry
    }

    /// `node` is about to be inserted under `parent`.
    pub fn will_insert_dom_node(
        &mut self,
        tree: &dyn DomTree,
        _node: NodeId,
        parent: NodeId,
    ) -> bool {
        if !self.active
            || !self
                .registry
                .has_breakpoint(parent, DomBreakpointType::SubtreeModified)
        {
            return false;
        }

        let description =
            self.describe_dom_event(tree, parent, DomBreakpointType::SubtreeModified, true);
        self.pause(BreakpointCategory::Dom, &description)
    }

    /// `node` has just been inserted; it and its subtree pick up the subtree
    /// breakpoints of the new parent.
    pub fn did_insert_dom_node(&mut self, tree: &dyn DomTree, node: NodeId) {
        self.registry.did_insert_dom_node(tree, node);
        if self.registry.owns_dom_breakpoints() {
            self.sync_sticky_records(tree);
        }
    }

    /// `node` is about to be removed.
    ///
    /// A node-removed breakpoint on `node` wins over a subtree breakpoint
    /// covering its parent.
    pub fn will_remove_dom_node(&mut self, tree: &dyn DomTree, node: NodeId) -> bool {
        if !self.active {
            return false;
        }

        let description = if self
            .registry
            .has_breakpoint(node, DomBreakpointType::NodeRemoved)
        {
            self.describe_dom_event(tree, node, DomBreakpointType::NodeRemoved, false)
        } else if tree.parent(node).is_some_and(|parent| {
            self.registry
                .has_breakpoint(parent, DomBreakpointType::SubtreeModified)
        }) {
            self.describe_dom_event(tree, node, DomBreakpointType::SubtreeModified, false)
        } else {
            return false;
        };

        self.pause(BreakpointCategory::Dom, &description)
    }

    /// `node` has just been removed; its subtree's breakpoint state goes
    /// with it.
    pub fn did_remove_dom_node(&mut self, tree: &dyn DomTree, node: NodeId) {
        let owned = self.registry.owns_dom_breakpoints();
        self.registry.did_remove_dom_node(tree, node);
        if owned {
            self.sync_sticky_records(tree);
        }
    }

    /// An attribute of `element` is about to change.
    pub fn will_modify_dom_attr(&mut self, tree: &dyn DomTree, element: NodeId) -> bool {
        if !self.active
            || !self
                .registry
                .has_breakpoint(element, DomBreakpointType::AttributeModified)
        {
            return false;
        }

        let description =
            self.describe_dom_event(tree, element, DomBreakpointType::AttributeModified, false);
        self.pause(BreakpointCategory::Dom, &description)
    }

    /// A request to `url` is about to be sent.
    pub fn will_send_xml_http_request(&mut self, url: &str) -> bool {
        if !self.active {
            return false;
        }
        let Some(pattern) = self.registry.xhr_match(url) else {
            return false;
        };

        let description = PauseDescription::Xhr {
            breakpoint_url: pattern.to_owned(),
            url: url.to_owned(),
        };
        self.pause(BreakpointCategory::Xhr, &description)
    }

    /// A platform event is about to be dispatched.
    ///
    /// Breakpoints are keyed by `category_type:event_name`, for instance
    /// `listener:click` or `instrumentation:setTimeout`. Synchronous events
    /// pause right away; others schedule a pause for the next statement.
    pub fn pause_on_native_event_if_needed(
        &mut self,
        category_type: &str,
        event_name: &str,
        synchronous: bool,
    ) -> bool {
        if !self.active {
            return false;
        }
        let full_event_name = format!("{category_type}:{event_name}");
        if !self.registry.has_event_listener_breakpoint(&full_event_name) {
            return false;
        }

        let description = PauseDescription::EventListener {
            event_name: full_event_name,
        };
        if synchronous {
            self.pause(BreakpointCategory::EventListener, &description)
        } else {
            debug!("scheduling pause: {description}");
            self.pause
                .schedule_pause(BreakpointCategory::EventListener, &description);
            true
        }
    }

    /// Rewrites the sticky records from the registry when node paths have
    /// drifted from what is stored.
    fn sync_sticky_records(&mut self, tree: &dyn DomTree) {
        let Some(sink) = self.sticky.as_mut() else {
            return;
        };
        let records = self.registry.snapshot(tree);
        if sink
            .store
            .load(sink.url)
            .is_ok_and(|stored| stored == records)
        {
            return;
        }
        if let Err(err) = sink.store.replace(sink.url, records) {
            warn!("failed to rewrite breakpoints for {}: {err}", sink.url);
        }
    }

    fn pause(&self, reason: BreakpointCategory, description: &PauseDescription) -> bool {
        debug!("{description}");
        self.pause.request_pause(reason, description);
        true
    }

    /// Builds the description of a DOM breakpoint hit on `target`.
    ///
    /// For inheritable types the target need not own the breakpoint: the
    /// owner is searched from `target` upwards on insertion, and from its
    /// parent on removal.
    fn describe_dom_event(
        &self,
        tree: &dyn DomTree,
        target: NodeId,
        kind: DomBreakpointType,
        insertion: bool,
    ) -> PauseDescription {
        if !kind.is_inheritable() {
            return PauseDescription::Dom {
                breakpoint_type: kind,
                node_id: target,
                target_node: None,
                insertion: None,
            };
        }

        let start = if insertion {
            Some(target)
        } else {
            tree.parent(target)
        };
        let owner = start
            .and_then(|start| self.registry.breakpoint_owner(tree, start, kind))
            .unwrap_or(target);

        PauseDescription::Dom {
            breakpoint_type: kind,
            node_id: owner,
            target_node: Some(target),
            insertion: (kind == DomBreakpointType::SubtreeModified).then_some(insertion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dom::fixture::FixtureTree, record::StickyBreakpointRecord, store::MemoryStore};
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct Recorder {
        pauses: RefCell<Vec<(BreakpointCategory, PauseDescription)>>,
        scheduled: RefCell<Vec<PauseDescription>>,
    }

    impl PauseHandler for Recorder {
        fn request_pause(&self, reason: BreakpointCategory, description: &PauseDescription) {
            self.pauses.borrow_mut().push((reason, description.clone()));
        }

        fn schedule_pause(&self, _reason: BreakpointCategory, description: &PauseDescription) {
            self.scheduled.borrow_mut().push(description.clone());
        }
    }

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    /// 0 ─ 1 ─ 2 ─ 3
    fn tree() -> FixtureTree {
        let mut tree = FixtureTree::new();
        tree.add(1, 0, "HTML");
        tree.add(2, 1, "BODY");
        tree.add(3, 2, "DIV");
        tree
    }

    #[test]
    fn insertion_names_the_owner() {
        let mut tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(1), DomBreakpointType::SubtreeModified)
            .unwrap();
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder);

        assert!(bridge.will_insert_dom_node(&tree, id(4), id(3)));
        tree.add(4, 3, "P");
        bridge.did_insert_dom_node(&tree, id(4));
        assert!(
            bridge
                .registry()
                .has_breakpoint(id(4), DomBreakpointType::SubtreeModified)
        );

        let pauses = recorder.pauses.borrow();
        assert_eq!(
            pauses[0],
            (
                BreakpointCategory::Dom,
                PauseDescription::Dom {
                    breakpoint_type: DomBreakpointType::SubtreeModified,
                    node_id: id(1),
                    target_node: Some(id(3)),
                    insertion: Some(true),
                }
            )
        );
    }

    #[test]
    fn node_removed_wins_over_subtree() {
        let tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(2), DomBreakpointType::SubtreeModified)
            .unwrap();
        registry
            .set_dom_breakpoint(&tree, id(3), DomBreakpointType::NodeRemoved)
            .unwrap();
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder);

        assert!(bridge.will_remove_dom_node(&tree, id(3)));
        assert!(!bridge.will_remove_dom_node(&tree, id(2)));

        let pauses = recorder.pauses.borrow();
        assert_eq!(pauses.len(), 1);
        assert_eq!(
            pauses[0].1,
            PauseDescription::Dom {
                breakpoint_type: DomBreakpointType::NodeRemoved,
                node_id: id(3),
                target_node: None,
                insertion: None,
            }
        );
    }

    #[test]
    fn removal_under_watched_parent() {
        let tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(1), DomBreakpointType::SubtreeModified)
            .unwrap();
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder);

        assert!(bridge.will_remove_dom_node(&tree, id(3)));
        assert_eq!(
            recorder.pauses.borrow()[0].1,
            PauseDescription::Dom {
                breakpoint_type: DomBreakpointType::SubtreeModified,
                node_id: id(1),
                target_node: Some(id(3)),
                insertion: Some(false),
            }
        );
    }

    #[test]
    fn attribute_breakpoint_is_not_inherited() {
        let tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(2), DomBreakpointType::AttributeModified)
            .unwrap();
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder);

        assert!(!bridge.will_modify_dom_attr(&tree, id(3)));
        assert!(bridge.will_modify_dom_attr(&tree, id(2)));
        assert_eq!(recorder.pauses.borrow().len(), 1);
    }

    #[test]
    fn xhr_and_events() {
        let mut registry = BreakpointRegistry::new();
        registry.set_xhr_breakpoint("/api/");
        registry.set_event_listener_breakpoint("listener:click").unwrap();
        registry.set_event_listener_breakpoint("instrumentation:setTimeout").unwrap();
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder);

        assert!(bridge.will_send_xml_http_request("/api/users"));
        assert!(!bridge.will_send_xml_http_request("/static/app.css"));
        assert!(bridge.pause_on_native_event_if_needed("listener", "click", true));
        assert!(!bridge.pause_on_native_event_if_needed("listener", "keydown", true));
        assert!(bridge.pause_on_native_event_if_needed("instrumentation", "setTimeout", false));

        let categories: Vec<_> = recorder.pauses.borrow().iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            [BreakpointCategory::Xhr, BreakpointCategory::EventListener]
        );
        assert_eq!(recorder.scheduled.borrow().len(), 1);
    }

    #[test]
    fn inactive_bridge_maintains_state_but_never_pauses() {
        let mut tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(3), DomBreakpointType::SubtreeModified)
            .unwrap();
        registry.set_xhr_breakpoint("");
        let recorder = Recorder::default();
        let mut bridge = InstrumentationBridge::new(&mut registry, &recorder).with_active(false);

        assert!(!bridge.will_insert_dom_node(&tree, id(4), id(3)));
        tree.add(4, 3, "P");
        bridge.did_insert_dom_node(&tree, id(4));
        assert!(!bridge.will_send_xml_http_request("/anything"));
        assert!(
            bridge
                .registry()
                .has_breakpoint(id(4), DomBreakpointType::SubtreeModified)
        );
        assert!(recorder.pauses.borrow().is_empty());
    }

    #[test]
    fn removal_rewrites_sticky_records() {
        const URL: &str = "https://example.test/";
        let mut tree = tree();
        tree.add(4, 2, "DIV");
        let mut registry = BreakpointRegistry::new();
        registry
            .set_dom_breakpoint(&tree, id(3), DomBreakpointType::AttributeModified)
            .unwrap();
        registry
            .set_dom_breakpoint(&tree, id(4), DomBreakpointType::NodeRemoved)
            .unwrap();
        let mut store = MemoryStore::new();
        store.replace(URL, registry.snapshot(&tree)).unwrap();

        let recorder = Recorder::default();
        let mut bridge =
            InstrumentationBridge::new(&mut registry, &recorder).with_sticky_store(&mut store, URL);
        tree.detach(3);
        bridge.did_remove_dom_node(&tree, id(3));

        // The remaining DIV moved from index 1 to index 0.
        assert_eq!(
            store.load(URL).unwrap(),
            [StickyBreakpointRecord::Dom {
                path: "0,HTML,0,BODY,0,DIV".to_owned(),
                breakpoint_type: 2,
            }]
        );
    }

    #[test]
    fn unrelated_insertions_leave_the_store_alone() {
        const URL: &str = "https://example.test/";
        let mut tree = tree();
        let mut registry = BreakpointRegistry::new();
        registry.set_event_listener_breakpoint("listener:click").unwrap();
        let mut store = MemoryStore::new();
        store
            .insert(URL, StickyBreakpointRecord::xhr("/kept/"))
            .unwrap();

        let recorder = Recorder::default();
        let mut bridge =
            InstrumentationBridge::new(&mut registry, &recorder).with_sticky_store(&mut store, URL);
        tree.add(4, 3, "P");
        bridge.did_insert_dom_node(&tree, id(4));
        tree.detach(4);
        bridge.did_remove_dom_node(&tree, id(4));

        assert_eq!(store.load(URL).unwrap(), [StickyBreakpointRecord::xhr("/kept/")]);
    }
}
