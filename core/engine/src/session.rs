//! Debugger session lifecycle
//!
//! Breakpoints only live while the debugger is enabled. Enabling restores the
//! sticky breakpoints of the inspected document from the store; disabling
//! throws the in-memory state away and leaves the store as it is.

use crate::{
    dom::DomTree,
    error::DebugResult,
    registry::{BreakpointRegistry, RestoreReport},
    store::StickyStore,
};
use log::debug;

/// Whether the debugger is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No breakpoint state is held.
    #[default]
    Disabled,
    /// Breakpoints are live and changes are persisted.
    Enabled,
}

/// Drives the registry through enable/disable and document changes.
///
/// Transitions happen only through explicit calls from the owning session
/// controller; asking for the current state again does nothing.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    /// Current state
    state: SessionState,

    /// URL of the inspected document, the key of its sticky breakpoints
    inspected_url: String,
}

impl SessionLifecycle {
    /// Creates a disabled lifecycle inspecting `inspected_url`.
    #[must_use]
    pub fn new(inspected_url: impl Into<String>) -> Self {
        Self {
            state: SessionState::Disabled,
            inspected_url: inspected_url.into(),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the debugger is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state == SessionState::Enabled
    }

    /// URL of the inspected document.
    #[must_use]
    pub fn inspected_url(&self) -> &str {
        &self.inspected_url
    }

    /// Enables the session and restores the sticky breakpoints of the
    /// inspected document. Returns `None` if already enabled.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read; the session then stays disabled.
    pub fn enable(
        &mut self,
        registry: &mut BreakpointRegistry,
        store: &dyn StickyStore,
        tree: &dyn DomTree,
    ) -> DebugResult<Option<RestoreReport>> {
        if self.is_enabled() {
            return Ok(None);
        }

        let records = store.load(&self.inspected_url)?;
        let report = registry.bulk_restore(tree, records);
        self.state = SessionState::Enabled;
        debug!("debugger enabled for {}", self.inspected_url);
        Ok(Some(report))
    }

    /// Disables the session and drops every in-memory breakpoint. Returns
    /// `false` if already disabled.
    pub fn disable(&mut self, registry: &mut BreakpointRegistry) -> bool {
        if !self.is_enabled() {
            return false;
        }

        registry.clear();
        self.state = SessionState::Disabled;
        debug!("debugger disabled for {}", self.inspected_url);
        true
    }

    /// Switches to a new document at `url`.
    ///
    /// While enabled, node-keyed state of the old document is dropped and the
    /// sticky breakpoints of `url` are restored against `tree`. While
    /// disabled, only the URL is recorded.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read. The registry is then left empty,
    /// since nothing of the old document applies to the new one.
    pub fn inspected_url_changed(
        &mut self,
        registry: &mut BreakpointRegistry,
        store: &dyn StickyStore,
        tree: &dyn DomTree,
        url: impl Into<String>,
    ) -> DebugResult<Option<RestoreReport>> {
        self.inspected_url = url.into();
        if !self.is_enabled() {
            return Ok(None);
        }

        registry.clear();
        let records = store.load(&self.inspected_url)?;
        debug!("navigated to {}", self.inspected_url);
        Ok(Some(registry.bulk_restore(tree, records)))
    }
}
