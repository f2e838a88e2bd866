//! The owning session controller.

use crate::{
    config::DebuggerConfig,
    dom::{DomTree, NodeId},
    error::DebugResult,
    instrumentation::InstrumentationBridge,
    mask::DomBreakpointType,
    pause::PauseHandler,
    record::StickyBreakpointRecord,
    registry::{BreakpointRegistry, RestoreReport},
    session::{SessionLifecycle, SessionState},
    store::StickyStore,
};
use log::warn;
use std::fmt;

/// A DOM debugger session: breakpoint registry, lifecycle and sticky store.
///
/// Breakpoint changes made while enabled are written through to the store
/// under the inspected URL, so they come back on the next [`enable`](Self::enable).
/// A failing store write is logged and does not undo the in-memory change.
pub struct DomDebugger {
    config: DebuggerConfig,
    registry: BreakpointRegistry,
    lifecycle: SessionLifecycle,
    store: Box<dyn StickyStore>,
}

impl fmt::Debug for DomDebugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomDebugger")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl DomDebugger {
    /// Creates a disabled debugger over `store`.
    #[must_use]
    pub fn new(config: DebuggerConfig, store: Box<dyn StickyStore>) -> Self {
        let lifecycle = SessionLifecycle::new(config.inspected_url.clone());
        Self {
            config,
            registry: BreakpointRegistry::new(),
            lifecycle,
            store,
        }
    }

    /// Creates a disabled debugger with the store `config` asks for.
    ///
    /// # Errors
    ///
    /// Fails if the configured store file exists but cannot be read.
    pub fn from_config(config: DebuggerConfig) -> DebugResult<Self> {
        let store = config.open_store()?;
        Ok(Self::new(config, store))
    }

    /// The configuration this debugger was created with.
    #[must_use]
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// The breakpoint registry.
    #[must_use]
    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    /// The sticky breakpoint store.
    #[must_use]
    pub fn store(&self) -> &dyn StickyStore {
        self.store.as_ref()
    }

    /// The session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    /// Whether the debugger is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lifecycle.is_enabled()
    }

    /// URL of the inspected document.
    #[must_use]
    pub fn inspected_url(&self) -> &str {
        self.lifecycle.inspected_url()
    }

    /// Enables the debugger and restores the sticky breakpoints of the
    /// inspected document. Returns `false` if already enabled.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read; the debugger stays disabled.
    pub fn enable(&mut self, tree: &dyn DomTree) -> DebugResult<bool> {
        let report = self
            .lifecycle
            .enable(&mut self.registry, self.store.as_ref(), tree)?;
        Ok(report.is_some())
    }

    /// Disables the debugger, dropping all in-memory breakpoints. Returns
    /// `false` if already disabled.
    pub fn disable(&mut self) -> bool {
        self.lifecycle.disable(&mut self.registry)
    }

    /// The inspected document was replaced by the one at `url`, now in `tree`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    pub fn inspected_url_changed(
        &mut self,
        tree: &dyn DomTree,
        url: impl Into<String>,
    ) -> DebugResult<Option<RestoreReport>> {
        self.lifecycle
            .inspected_url_changed(&mut self.registry, self.store.as_ref(), tree, url)
    }

    /// Sets a DOM breakpoint, see [`BreakpointRegistry::set_dom_breakpoint`].
    ///
    /// # Errors
    ///
    /// Fails if `node` is not in the live tree.
    pub fn set_dom_breakpoint(
        &mut self,
        tree: &dyn DomTree,
        node: NodeId,
        kind: DomBreakpointType,
    ) -> DebugResult<()> {
        self.registry.set_dom_breakpoint(tree, node, kind)?;
        if let Some(record) = StickyBreakpointRecord::dom(tree, node, kind) {
            self.persist_insert(record);
        }
        Ok(())
    }

    /// Removes a DOM breakpoint, see [`BreakpointRegistry::remove_dom_breakpoint`].
    ///
    /// # Errors
    ///
    /// Fails if `node` is not in the live tree.
    pub fn remove_dom_breakpoint(
        &mut self,
        tree: &dyn DomTree,
        node: NodeId,
        kind: DomBreakpointType,
    ) -> DebugResult<()> {
        self.registry.remove_dom_breakpoint(tree, node, kind)?;
        if let Some(record) = StickyBreakpointRecord::dom(tree, node, kind) {
            self.persist_remove(&record);
        }
        Ok(())
    }

    /// Pauses before listeners of `event_name` run.
    ///
    /// # Errors
    ///
    /// Fails if `event_name` is not of the form `category:event`; nothing is
    /// stored then.
    pub fn set_event_listener_breakpoint(&mut self, event_name: &str) -> DebugResult<()> {
        self.registry.set_event_listener_breakpoint(event_name)?;
        self.persist_insert(StickyBreakpointRecord::event_listener(event_name));
        Ok(())
    }

    /// Stops pausing on `event_name`.
    ///
    /// # Errors
    ///
    /// Fails if `event_name` is not of the form `category:event`.
    pub fn remove_event_listener_breakpoint(&mut self, event_name: &str) -> DebugResult<()> {
        self.registry.remove_event_listener_breakpoint(event_name)?;
        self.persist_remove(&StickyBreakpointRecord::event_listener(event_name));
        Ok(())
    }

    /// Pauses on requests whose URL contains `url`; the empty string matches
    /// every request.
    pub fn set_xhr_breakpoint(&mut self, url: &str) {
        self.registry.set_xhr_breakpoint(url);
        self.persist_insert(StickyBreakpointRecord::xhr(url));
    }

    /// Removes the XHR breakpoint on `url`.
    pub fn remove_xhr_breakpoint(&mut self, url: &str) {
        self.registry.remove_xhr_breakpoint(url);
        self.persist_remove(&StickyBreakpointRecord::xhr(url));
    }

    /// Replaces the sticky breakpoints stored for `url`.
    ///
    /// When `url` is the inspected document and the debugger is enabled, the
    /// registry is restored from `records` right away.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub fn set_all_breakpoints(
        &mut self,
        tree: &dyn DomTree,
        url: &str,
        records: Vec<StickyBreakpointRecord>,
    ) -> DebugResult<Option<RestoreReport>> {
        self.store.replace(url, records.clone())?;
        if !self.is_enabled() || url != self.inspected_url() {
            return Ok(None);
        }
        Ok(Some(self.registry.bulk_restore(tree, records)))
    }

    /// The hooks for the DOM and network layers, pausing through `pause`.
    ///
    /// While disabled the bridge keeps node state consistent but never pauses.
    /// While persisting, insertions and removals that touch nodes owning DOM
    /// breakpoints rewrite the stored records of the inspected URL.
    pub fn instrumentation<'a>(
        &'a mut self,
        pause: &'a dyn PauseHandler,
    ) -> InstrumentationBridge<'a> {
        let active = self.is_enabled();
        let persist = self.should_persist();
        let bridge = InstrumentationBridge::new(&mut self.registry, pause).with_active(active);
        if persist {
            bridge.with_sticky_store(self.store.as_mut(), self.lifecycle.inspected_url())
        } else {
            bridge
        }
    }

    fn should_persist(&self) -> bool {
        self.config.persist && self.is_enabled()
    }

    fn persist_insert(&mut self, record: StickyBreakpointRecord) {
        if !self.should_persist() {
            return;
        }
        let url = self.lifecycle.inspected_url();
        if let Err(err) = self.store.insert(url, record) {
            warn!("failed to persist breakpoint for {url}: {err}");
        }
    }

    fn persist_remove(&mut self, record: &StickyBreakpointRecord) {
        if !self.should_persist() {
            return;
        }
        let url = self.lifecycle.inspected_url();
        if let Err(err) = self.store.remove(url, record) {
            warn!("failed to forget breakpoint for {url}: {err}");
        }
    }
}
