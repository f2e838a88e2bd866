//! The boundary to the script engine's pause mechanism.
//!
//! The breakpoint core decides *whether* and *why* to pause. Suspending the
//! script and presenting the pause is up to the [`PauseHandler`].

use crate::{dom::NodeId, mask::DomBreakpointType};
use log::debug;
use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

/// The category of breakpoint that caused a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BreakpointCategory {
    /// A DOM mutation breakpoint.
    #[serde(rename = "DOM")]
    Dom,
    /// A named platform event breakpoint.
    EventListener,
    /// An outgoing request breakpoint.
    #[serde(rename = "XHR")]
    Xhr,
}

impl BreakpointCategory {
    /// Protocol-facing name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dom => "DOM",
            Self::EventListener => "EventListener",
            Self::Xhr => "XHR",
        }
    }
}

impl fmt::Display for BreakpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which breakpoint fired, and on what.
///
/// Serializes to the protocol's pause data; [`Display`](fmt::Display) gives
/// the human-readable sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PauseDescription {
    /// A DOM breakpoint fired.
    #[serde(rename_all = "camelCase")]
    Dom {
        /// The breakpoint type.
        #[serde(rename = "type")]
        breakpoint_type: DomBreakpointType,
        /// The node owning the breakpoint.
        node_id: NodeId,
        /// The node being mutated, for inheritable types where it may differ
        /// from the owner.
        #[serde(skip_serializing_if = "Option::is_none")]
        target_node: Option<NodeId>,
        /// For subtree modifications: insertion (`true`) or removal.
        #[serde(skip_serializing_if = "Option::is_none")]
        insertion: Option<bool>,
    },
    /// An event listener breakpoint fired.
    #[serde(rename_all = "camelCase")]
    EventListener {
        /// Fully qualified event name.
        event_name: String,
    },
    /// An XHR breakpoint fired.
    Xhr {
        /// The pattern that matched; empty for the match-any breakpoint.
        #[serde(rename = "breakpointURL")]
        breakpoint_url: String,
        /// The request URL.
        url: String,
    },
}

impl PauseDescription {
    /// The category this description belongs to.
    #[must_use]
    pub const fn category(&self) -> BreakpointCategory {
        match self {
            Self::Dom { .. } => BreakpointCategory::Dom,
            Self::EventListener { .. } => BreakpointCategory::EventListener,
            Self::Xhr { .. } => BreakpointCategory::Xhr,
        }
    }
}

impl fmt::Display for PauseDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dom {
                breakpoint_type: DomBreakpointType::SubtreeModified,
                node_id,
                target_node,
                insertion,
            } => {
                write!(f, "Paused on subtree modifications of node {node_id}")?;
                match (target_node, insertion) {
                    (Some(target), Some(true)) => write!(f, ": child added to {target}"),
                    (Some(target), _) => write!(f, ": {target} removed"),
                    (None, _) => Ok(()),
                }
            }
            Self::Dom {
                breakpoint_type: DomBreakpointType::AttributeModified,
                node_id,
                ..
            } => write!(f, "Paused on attribute modification of node {node_id}"),
            Self::Dom {
                breakpoint_type: DomBreakpointType::NodeRemoved,
                node_id,
                ..
            } => write!(f, "Paused on removal of node {node_id}"),
            Self::EventListener { event_name } => {
                write!(f, "Paused on event listener breakpoint \"{event_name}\"")
            }
            Self::Xhr {
                breakpoint_url,
                url,
            } if breakpoint_url.is_empty() => write!(f, "Paused on any XHR: {url}"),
            Self::Xhr {
                breakpoint_url,
                url,
            } => write!(f, "Paused on XHR breakpoint \"{breakpoint_url}\": {url}"),
        }
    }
}

/// Suspends script execution on behalf of the breakpoint core.
pub trait PauseHandler {
    /// Pauses now and blocks until the debugger resumes.
    fn request_pause(&self, reason: BreakpointCategory, description: &PauseDescription);

    /// Asks for a pause at the next script statement without blocking.
    ///
    /// Used for events dispatched asynchronously, where there is no script on
    /// the stack to pause right now. Defaults to pausing immediately.
    fn schedule_pause(&self, reason: BreakpointCategory, description: &PauseDescription) {
        self.request_pause(reason, description);
    }
}

/// A pause recorded by a [`PauseController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PausedAt {
    /// Why execution paused.
    pub reason: BreakpointCategory,
    /// Which breakpoint fired.
    pub description: PauseDescription,
}

#[derive(Debug, Default)]
struct PauseState {
    paused: Option<PausedAt>,
    scheduled: Option<PausedAt>,
    pause_count: u64,
}

/// A [`PauseHandler`] that parks the script thread on a condition variable
/// until another thread calls [`resume`](Self::resume).
///
/// Clones share the same state: hand one clone to the instrumentation side
/// and keep another on the protocol side.
#[derive(Debug, Clone, Default)]
pub struct PauseController {
    inner: Arc<(Mutex<PauseState>, Condvar)>,
}

impl PauseController {
    /// Creates a controller in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PauseState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resumes a paused script. Returns `false` if nothing was paused.
    pub fn resume(&self) -> bool {
        let resumed = self.state().paused.take().is_some();
        // Wake up the waiting script thread
        self.inner.1.notify_all();
        resumed
    }

    /// Whether a script is currently parked in [`request_pause`](PauseHandler::request_pause).
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state().paused.is_some()
    }

    /// The pause a script is currently parked on.
    #[must_use]
    pub fn current(&self) -> Option<PausedAt> {
        self.state().paused.clone()
    }

    /// Takes the pending scheduled pause, for the engine to honour at its
    /// next statement.
    pub fn take_scheduled(&self) -> Option<PausedAt> {
        self.state().scheduled.take()
    }

    /// How many blocking pauses have happened so far.
    #[must_use]
    pub fn pause_count(&self) -> u64 {
        self.state().pause_count
    }
}

impl PauseHandler for PauseController {
    fn request_pause(&self, reason: BreakpointCategory, description: &PauseDescription) {
        let (lock, condvar) = &*self.inner;
        let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
        state.paused = Some(PausedAt {
            reason,
            description: description.clone(),
        });
        state.pause_count += 1;
        debug!("{description}");

        while state.paused.is_some() {
            state = condvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        debug!("resumed after {reason} breakpoint");
    }

    fn schedule_pause(&self, reason: BreakpointCategory, description: &PauseDescription) {
        debug!("scheduled: {description}");
        self.state().scheduled = Some(PausedAt {
            reason,
            description: description.clone(),
        });
    }
}
