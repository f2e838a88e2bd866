//! Replays a trace against a debugger session.

use crate::trace::{Labels, Step, Trace};
use color_eyre::eyre::{Result, WrapErr, eyre};
use dom_arena::{Document, instrumented};
use domdebug_engine::{
    BreakpointCategory, DomDebugger, PauseDescription, PauseHandler, ProtocolMessage,
    ProtocolServer, protocol::Request,
};
use log::{debug, info};
use std::{cell::RefCell, io::Write};

/// A [`PauseHandler`] that records each pause and resumes right away.
#[derive(Debug, Default)]
struct AutoResume {
    pauses: RefCell<Vec<(BreakpointCategory, PauseDescription)>>,
}

impl PauseHandler for AutoResume {
    fn request_pause(&self, reason: BreakpointCategory, description: &PauseDescription) {
        self.pauses.borrow_mut().push((reason, description.clone()));
    }
}

/// Drives one document and one debugger through the steps of a trace,
/// writing every protocol response and every pause to `out` as JSON lines.
pub(crate) struct Replayer<W> {
    doc: Document,
    labels: Labels,
    debugger: DomDebugger,
    server: ProtocolServer,
    pause: AutoResume,
    out: W,
}

impl<W: Write> Replayer<W> {
    /// Builds the initial document of `trace` and attaches `debugger` to it.
    pub(crate) fn new(debugger: DomDebugger, trace: &Trace, out: W) -> Result<Self> {
        let mut doc = Document::new();
        let labels = Labels::build(&mut doc, &trace.document)?;
        Ok(Self {
            doc,
            labels,
            debugger,
            server: ProtocolServer::new(),
            pause: AutoResume::default(),
            out,
        })
    }

    /// Runs every step. Stops at the first step that cannot be performed.
    pub(crate) fn run(&mut self, steps: Vec<Step>) -> Result<()> {
        let total = steps.len();
        for (index, step) in steps.into_iter().enumerate() {
            debug!("step {index}: {step:?}");
            self.step(index, step)
                .wrap_err_with(|| format!("step {index} failed"))?;
            self.flush_pauses()?;
        }
        info!("replayed {total} steps");
        Ok(())
    }

    /// The debugger session.
    pub(crate) fn debugger(&self) -> &DomDebugger {
        &self.debugger
    }

    fn step(&mut self, index: usize, step: Step) -> Result<()> {
        match step {
            Step::Enable => {
                self.debugger.enable(&self.doc)?;
            }
            Step::Disable => {
                self.debugger.disable();
            }
            Step::Command { command, arguments } => {
                let arguments = arguments
                    .map(|mut arguments| {
                        self.labels.substitute(&mut arguments)?;
                        Ok::<_, color_eyre::Report>(arguments)
                    })
                    .transpose()?;
                let request = Request {
                    seq: i64::try_from(index)? + 1,
                    command,
                    arguments,
                };
                let messages = self
                    .server
                    .handle_request(&mut self.debugger, &self.doc, request);
                for message in messages {
                    self.write(&message)?;
                }
            }
            Step::Insert {
                node,
                name,
                parent,
                before,
            } => {
                let child = match (self.labels.get(&node), name) {
                    (Some(child), _) => child,
                    (None, Some(name)) => {
                        let child = self.doc.create_element(&name);
                        self.labels.insert(&node, child);
                        child
                    }
                    (None, None) => return Err(eyre!("unknown node label `{node}`")),
                };
                let parent = self.labels.resolve(&parent)?;
                let before = before
                    .map(|label| self.labels.resolve(&label))
                    .transpose()?;
                let mut hooks = self.debugger.instrumentation(&self.pause);
                instrumented::insert_before(&mut self.doc, &mut hooks, parent, child, before)?;
            }
            Step::Remove { node } => {
                let node = self.labels.resolve(&node)?;
                let mut hooks = self.debugger.instrumentation(&self.pause);
                instrumented::remove_child(&mut self.doc, &mut hooks, node)?;
            }
            Step::SetAttribute { node, name, value } => {
                let node = self.labels.resolve(&node)?;
                let mut hooks = self.debugger.instrumentation(&self.pause);
                instrumented::set_attribute(&mut self.doc, &mut hooks, node, &name, &value)?;
            }
            Step::Request { url } => {
                self.debugger
                    .instrumentation(&self.pause)
                    .will_send_xml_http_request(&url);
            }
            Step::Event {
                category,
                name,
                synchronous,
            } => {
                self.debugger
                    .instrumentation(&self.pause)
                    .pause_on_native_event_if_needed(&category, &name, synchronous);
            }
            Step::Navigate { url, document } => {
                let mut doc = Document::new();
                self.labels = Labels::build(&mut doc, &document)?;
                self.doc = doc;
                self.debugger.inspected_url_changed(&self.doc, url)?;
            }
        }
        Ok(())
    }

    fn flush_pauses(&mut self) -> Result<()> {
        let pauses = self.pause.pauses.take();
        for (reason, description) in pauses {
            let event = self.server.paused_event(reason, &description);
            self.write(&event)?;
        }
        Ok(())
    }

    fn write(&mut self, message: &ProtocolMessage) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        writeln!(self.out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domdebug_engine::{DebuggerConfig, DomBreakpointType, MemoryStore};
    use indoc::indoc;
    use serde_json::Value;

    fn replay(trace: &str) -> (Vec<Value>, DomDebugger) {
        let trace: Trace = serde_json::from_str(trace).unwrap();
        let debugger = DomDebugger::new(
            DebuggerConfig::new(trace.url.clone().unwrap_or_default()),
            Box::new(MemoryStore::new()),
        );
        let mut out = Vec::new();
        let debugger = {
            let mut replayer = Replayer::new(debugger, &trace, &mut out).unwrap();
            replayer.run(trace.steps.clone()).unwrap();
            replayer.debugger
        };

        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (lines, debugger)
    }

    #[test]
    fn subtree_scenario() {
        let (lines, debugger) = replay(indoc! {r#"
            {
                "url": "https://example.test/",
                "document": [{ "name": "html", "label": "html" }],
                "steps": [
                    { "op": "enable" },
                    { "op": "command", "command": "DOMDebugger.setDOMBreakpoint",
                      "arguments": { "nodeId": "@document", "type": 0 } },
                    { "op": "insert", "node": "c1", "name": "div", "parent": "html" },
                    { "op": "insert", "node": "c2", "name": "span", "parent": "c1" },
                    { "op": "remove", "node": "c1" }
                ]
            }
        "#});

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["success"], true);
        for pause in &lines[1..] {
            assert_eq!(pause["event"], "Debugger.paused");
            assert_eq!(pause["body"]["data"]["nodeId"], 0);
        }
        assert_eq!(lines[3]["body"]["data"]["insertion"], false);
        assert_eq!(debugger.registry().tracked_node_count(), 2);
    }

    #[test]
    fn disabled_session_never_pauses() {
        let (lines, debugger) = replay(indoc! {r#"
            {
                "document": [{ "name": "div", "label": "div" }],
                "steps": [
                    { "op": "command", "command": "DOMDebugger.setXHRBreakpoint",
                      "arguments": { "url": "" } },
                    { "op": "request", "url": "/api/users" },
                    { "op": "setAttribute", "node": "div", "name": "id", "value": "x" }
                ]
            }
        "#});

        assert_eq!(lines.len(), 1);
        assert!(debugger.registry().match_any_url());
        assert!(!debugger.is_enabled());
    }

    #[test]
    fn navigation_restores_sticky_breakpoints() {
        let (lines, debugger) = replay(indoc! {r#"
            {
                "url": "https://a.test/",
                "document": [{ "name": "html", "label": "html" }],
                "steps": [
                    { "op": "enable" },
                    { "op": "command", "command": "DOMDebugger.setDOMBreakpoint",
                      "arguments": { "nodeId": "@html", "type": 1 } },
                    { "op": "navigate", "url": "https://b.test/",
                      "document": [{ "name": "body", "label": "body" }] },
                    { "op": "navigate", "url": "https://a.test/",
                      "document": [{ "name": "html", "label": "html" }] },
                    { "op": "setAttribute", "node": "html", "name": "lang", "value": "en" },
                    { "op": "event", "category": "listener", "name": "click" }
                ]
            }
        "#});

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["body"]["reason"], "DOM");
        assert!(
            debugger
                .registry()
                .has_breakpoint(1.into(), DomBreakpointType::AttributeModified)
        );
    }

    #[test]
    fn unknown_label_fails_the_step() {
        let trace: Trace = serde_json::from_str(indoc! {r#"
            { "steps": [{ "op": "remove", "node": "ghost" }] }
        "#})
        .unwrap();
        let debugger = DomDebugger::new(DebuggerConfig::default(), Box::new(MemoryStore::new()));
        let mut replayer = Replayer::new(debugger, &trace, Vec::new()).unwrap();

        let err = replayer.run(trace.steps.clone()).unwrap_err();
        assert_eq!(err.to_string(), "step 0 failed");
        assert!(replayer.debugger().registry().is_empty());
    }
}
