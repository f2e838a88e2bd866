//! Protocol server implementation
//!
//! This module dispatches protocol requests to a [`DomDebugger`] and builds
//! the responses and events sent back to the client.

use super::{Event, ProtocolError, ProtocolMessage, Request, Response, messages::*};
use crate::{
    agent::DomDebugger,
    dom::{DomTree, NodeId},
    error::BreakpointError,
    mask::DomBreakpointType,
    pause::{BreakpointCategory, PauseDescription},
    record::parse_records,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;

type HandlerResult = Result<Option<serde_json::Value>, ProtocolError>;

/// Protocol server that turns requests into debugger operations
///
/// The server holds no debugger state of its own besides the outgoing
/// sequence number; the debugger and the tree are lent to each call.
#[derive(Debug)]
pub struct ProtocolServer {
    /// Sequence number for responses and events
    seq: i64,
}

impl Default for ProtocolServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolServer {
    /// Creates a new protocol server
    #[must_use]
    pub fn new() -> Self {
        Self { seq: 1 }
    }

    /// Gets the next sequence number
    fn next_seq(&mut self) -> i64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Handles a request and returns the messages to send back.
    ///
    /// Every request gets exactly one response; failures are reported in it
    /// with `success: false` and leave the debugger untouched.
    pub fn handle_request(
        &mut self,
        debugger: &mut DomDebugger,
        tree: &dyn DomTree,
        request: Request,
    ) -> Vec<ProtocolMessage> {
        let Request {
            seq: request_seq,
            command,
            arguments,
        } = request;
        let arguments = arguments.unwrap_or(serde_json::Value::Null);

        let result = match command.as_str() {
            ENABLE => Self::handle_enable(debugger, tree),
            DISABLE => {
                debugger.disable();
                Ok(None)
            }
            SET_DOM_BREAKPOINT => Self::handle_dom_breakpoint(debugger, tree, arguments, true),
            REMOVE_DOM_BREAKPOINT => Self::handle_dom_breakpoint(debugger, tree, arguments, false),
            SET_EVENT_LISTENER_BREAKPOINT => {
                Self::handle_event_listener_breakpoint(debugger, arguments, true)
            }
            REMOVE_EVENT_LISTENER_BREAKPOINT => {
                Self::handle_event_listener_breakpoint(debugger, arguments, false)
            }
            SET_XHR_BREAKPOINT => Self::handle_xhr_breakpoint(debugger, arguments, true),
            REMOVE_XHR_BREAKPOINT => Self::handle_xhr_breakpoint(debugger, arguments, false),
            SET_ALL_BROWSER_BREAKPOINTS => {
                Self::handle_set_all_breakpoints(debugger, tree, arguments)
            }
            _ => Err(ProtocolError::UnknownCommand(command.clone())),
        };

        match result {
            Ok(body) => vec![self.create_response(request_seq, &command, true, None, body)],
            Err(err) => {
                debug!("{command} failed: {err}");
                vec![self.create_response(
                    request_seq,
                    &command,
                    false,
                    Some(err.to_string()),
                    None,
                )]
            }
        }
    }

    fn handle_enable(debugger: &mut DomDebugger, tree: &dyn DomTree) -> HandlerResult {
        debugger.enable(tree)?;
        Ok(None)
    }

    fn handle_dom_breakpoint(
        debugger: &mut DomDebugger,
        tree: &dyn DomTree,
        arguments: serde_json::Value,
        set: bool,
    ) -> HandlerResult {
        let args: DomBreakpointArguments = parse_arguments(arguments)?;
        let kind = DomBreakpointType::try_from(args.breakpoint_type)
            .map_err(|_| BreakpointError::InvalidBreakpointType(args.breakpoint_type))?;
        let node = NodeId::new(args.node_id);

        if set {
            debugger.set_dom_breakpoint(tree, node, kind)?;
        } else {
            debugger.remove_dom_breakpoint(tree, node, kind)?;
        }
        Ok(None)
    }

    fn handle_event_listener_breakpoint(
        debugger: &mut DomDebugger,
        arguments: serde_json::Value,
        set: bool,
    ) -> HandlerResult {
        let args: EventListenerBreakpointArguments = parse_arguments(arguments)?;
        if set {
            debugger.set_event_listener_breakpoint(&args.event_name)?;
        } else {
            debugger.remove_event_listener_breakpoint(&args.event_name)?;
        }
        Ok(None)
    }

    fn handle_xhr_breakpoint(
        debugger: &mut DomDebugger,
        arguments: serde_json::Value,
        set: bool,
    ) -> HandlerResult {
        let args: XhrBreakpointArguments = parse_arguments(arguments)?;
        if set {
            debugger.set_xhr_breakpoint(&args.url);
        } else {
            debugger.remove_xhr_breakpoint(&args.url);
        }
        Ok(None)
    }

    fn handle_set_all_breakpoints(
        debugger: &mut DomDebugger,
        tree: &dyn DomTree,
        arguments: serde_json::Value,
    ) -> HandlerResult {
        let args: SetAllBreakpointsArguments = parse_arguments(arguments)?;
        let (records, unreadable) = parse_records(args.breakpoints);
        let report = debugger
            .set_all_breakpoints(tree, &args.url, records)?
            .unwrap_or_default();

        let body = RestoreResponseBody {
            restored: report.restored,
            skipped: unreadable + report.skipped,
        };
        Ok(Some(serde_json::to_value(body)?))
    }

    /// Builds the `Debugger.paused` event for a pause requested by the
    /// instrumentation hooks.
    pub fn paused_event(
        &mut self,
        reason: BreakpointCategory,
        description: &PauseDescription,
    ) -> ProtocolMessage {
        let body = PausedEventBody {
            reason,
            data: description.clone(),
            description: description.to_string(),
        };
        let body = match serde_json::to_value(body) {
            Ok(body) => Some(body),
            Err(err) => {
                warn!("failed to encode pause body: {err}");
                None
            }
        };
        self.create_event(PAUSED_EVENT, body)
    }

    /// Creates a response message
    fn create_response(
        &mut self,
        request_seq: i64,
        command: &str,
        success: bool,
        message: Option<String>,
        body: Option<serde_json::Value>,
    ) -> ProtocolMessage {
        ProtocolMessage::Response(Response {
            seq: self.next_seq(),
            request_seq,
            success,
            command: command.to_string(),
            message,
            body,
        })
    }

    /// Creates an event message
    pub fn create_event(&mut self, event: &str, body: Option<serde_json::Value>) -> ProtocolMessage {
        ProtocolMessage::Event(Event {
            seq: self.next_seq(),
            event: event.to_string(),
            body,
        })
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(arguments)?)
}
