//! DOM, event listener and XHR breakpoints for script debuggers
//!
//! This crate decides when script execution should pause because of
//! something the page did rather than a line of script: a DOM node changing,
//! a platform event about to be dispatched, or a request about to be sent.
//! The script engine, the DOM and the wire protocol are collaborators behind
//! small interfaces.
//!
//! # Overview
//!
//! - [`BreakpointRegistry`]: the breakpoints of all categories, with
//!   subtree breakpoints kept visible on every descendant
//! - [`InstrumentationBridge`]: the hooks the DOM and network layers call
//! - [`DomDebugger`]: the session controller tying the registry to its
//!   lifecycle and to sticky persistence
//! - [`ProtocolServer`]: JSON request/response dispatch for remote clients
//!
//! Collaborator interfaces:
//!
//! - [`DomTree`]: structural queries on the live tree
//! - [`PauseHandler`]: suspends the script
//! - [`StickyStore`]: persists breakpoints across sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use domdebug_engine::{DebuggerConfig, DomBreakpointType, DomDebugger, PauseController};
//!
//! let mut debugger = DomDebugger::from_config(DebuggerConfig::new("https://example.test/"))?;
//! debugger.enable(&document)?;
//! debugger.set_dom_breakpoint(&document, body, DomBreakpointType::SubtreeModified)?;
//!
//! // In the DOM layer, around every insertion:
//! let pause = PauseController::new();
//! let mut hooks = debugger.instrumentation(&pause);
//! hooks.will_insert_dom_node(&document, child, body);
//! document.append_child(body, child)?;
//! hooks.did_insert_dom_node(&document, child);
//! ```

#![cfg_attr(not(test), forbid(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod dom;
pub mod error;
pub mod instrumentation;
pub mod mask;
pub mod pause;
pub mod propagate;
pub mod protocol;
pub mod record;
pub mod registry;
pub mod session;
pub mod set;
pub mod store;

pub use agent::DomDebugger;
pub use config::DebuggerConfig;
pub use dom::{DomTree, NodeId};
pub use error::{BreakpointError, DebugResult, StoreError};
pub use instrumentation::InstrumentationBridge;
pub use mask::{DomBreakpointType, NodeBreakpointMask};
pub use pause::{BreakpointCategory, PauseController, PauseDescription, PauseHandler, PausedAt};
pub use protocol::{ProtocolMessage, ProtocolServer};
pub use record::StickyBreakpointRecord;
pub use registry::{BreakpointRegistry, RestoreReport};
pub use session::{SessionLifecycle, SessionState};
pub use store::{JsonFileStore, MemoryStore, StickyStore};
