//! Protocol argument and body types
//!
//! This module defines the arguments of every command and the bodies of the
//! events sent to the client.

use crate::pause::{BreakpointCategory, PauseDescription};
use serde::{Deserialize, Serialize};

// ============================================================================
// Command names
// ============================================================================

/// `Debugger.enable`
pub const ENABLE: &str = "Debugger.enable";
/// `Debugger.disable`
pub const DISABLE: &str = "Debugger.disable";
/// `DOMDebugger.setDOMBreakpoint`
pub const SET_DOM_BREAKPOINT: &str = "DOMDebugger.setDOMBreakpoint";
/// `DOMDebugger.removeDOMBreakpoint`
pub const REMOVE_DOM_BREAKPOINT: &str = "DOMDebugger.removeDOMBreakpoint";
/// `DOMDebugger.setEventListenerBreakpoint`
pub const SET_EVENT_LISTENER_BREAKPOINT: &str = "DOMDebugger.setEventListenerBreakpoint";
/// `DOMDebugger.removeEventListenerBreakpoint`
pub const REMOVE_EVENT_LISTENER_BREAKPOINT: &str = "DOMDebugger.removeEventListenerBreakpoint";
/// `DOMDebugger.setXHRBreakpoint`
pub const SET_XHR_BREAKPOINT: &str = "DOMDebugger.setXHRBreakpoint";
/// `DOMDebugger.removeXHRBreakpoint`
pub const REMOVE_XHR_BREAKPOINT: &str = "DOMDebugger.removeXHRBreakpoint";
/// `DOMDebugger.setAllBrowserBreakpoints`
pub const SET_ALL_BROWSER_BREAKPOINTS: &str = "DOMDebugger.setAllBrowserBreakpoints";

/// `Debugger.paused`
pub const PAUSED_EVENT: &str = "Debugger.paused";

// ============================================================================
// Request Arguments
// ============================================================================

/// Arguments of `setDOMBreakpoint` and `removeDOMBreakpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomBreakpointArguments {
    /// Node the breakpoint is on.
    pub node_id: u64,
    /// Breakpoint type, as its bit position.
    #[serde(rename = "type")]
    pub breakpoint_type: u32,
}

/// Arguments of `setEventListenerBreakpoint` and `removeEventListenerBreakpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListenerBreakpointArguments {
    /// Fully qualified event name, e.g. `listener:click`.
    pub event_name: String,
}

/// Arguments of `setXHRBreakpoint` and `removeXHRBreakpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XhrBreakpointArguments {
    /// URL substring; empty for any URL.
    pub url: String,
}

/// Arguments of `setAllBrowserBreakpoints`.
///
/// Records are kept as raw JSON so one unreadable record does not fail the
/// whole command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAllBreakpointsArguments {
    /// Document the records belong to.
    pub url: String,
    /// Sticky breakpoint records.
    #[serde(default)]
    pub breakpoints: Vec<serde_json::Value>,
}

// ============================================================================
// Response Bodies
// ============================================================================

/// Body of a successful `setAllBrowserBreakpoints`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponseBody {
    /// Breakpoints restored into the live registry; zero unless the records
    /// are for the inspected document.
    pub restored: usize,
    /// Records that were unreadable or did not apply.
    pub skipped: usize,
}

// ============================================================================
// Event Bodies
// ============================================================================

/// Body of the `Debugger.paused` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEventBody {
    /// The category of breakpoint that fired.
    pub reason: BreakpointCategory,
    /// Structured pause data.
    pub data: PauseDescription,
    /// Human-readable sentence.
    pub description: String,
}
