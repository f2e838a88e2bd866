//! Request/response protocol for remote debugger clients
//!
//! This module exposes the breakpoint operations of a [`DomDebugger`] as
//! JSON messages, in the shape inspector front-ends speak.
//!
//! # Architecture
//!
//! - Protocol envelopes ([`ProtocolMessage`]): requests, responses, events
//! - Typed command arguments and event bodies ([`messages`])
//! - A transport-agnostic dispatcher ([`ProtocolServer`])
//!
//! Reading and writing the messages is up to the embedder.
//!
//! [`DomDebugger`]: crate::DomDebugger

pub mod messages;
pub mod server;

pub use messages::*;
pub use server::ProtocolServer;

use crate::error::BreakpointError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolMessage {
    /// A command from the client.
    #[serde(rename = "request")]
    Request(Request),
    /// The answer to a [`Request`].
    #[serde(rename = "response")]
    Response(Response),
    /// A notification to the client.
    #[serde(rename = "event")]
    Event(Event),
}

/// Request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Client-chosen sequence number.
    pub seq: i64,
    /// Command name, e.g. `DOMDebugger.setXHRBreakpoint`.
    pub command: String,
    /// Command arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// Response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Server sequence number.
    pub seq: i64,
    /// Sequence number of the request answered.
    pub request_seq: i64,
    /// Whether the command succeeded.
    pub success: bool,
    /// Command name of the request answered.
    pub command: String,
    /// Error string of a failed command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Result of a successful command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Event message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server sequence number.
    pub seq: i64,
    /// Event name, e.g. `Debugger.paused`.
    pub event: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ProtocolMessage {
    /// The sequence number of the message.
    #[must_use]
    pub fn seq(&self) -> i64 {
        match self {
            Self::Request(r) => r.seq,
            Self::Response(r) => r.seq,
            Self::Event(e) => e.seq,
        }
    }
}

/// Why a request failed; its `Display` is the response's `message`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The command is not known.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The arguments do not fit the command.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    /// The breakpoint operation failed.
    #[error(transparent)]
    Breakpoint(#[from] BreakpointError),
}
