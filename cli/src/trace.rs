//! The replay trace format.
//!
//! A trace is a JSON object with an initial document and a list of steps.
//! Nodes are referred to by label; in protocol arguments a string `"@label"`
//! stands for the labelled node's id.
//!
//! ```json
//! {
//!   "url": "https://example.test/",
//!   "document": [{ "name": "html", "label": "html", "children": [] }],
//!   "steps": [
//!     { "op": "enable" },
//!     { "op": "command", "command": "DOMDebugger.setDOMBreakpoint",
//!       "arguments": { "nodeId": "@html", "type": 0 } },
//!     { "op": "insert", "node": "p", "name": "p", "parent": "html" }
//!   ]
//! }
//! ```

use color_eyre::eyre::{Result, eyre};
use dom_arena::Document;
use domdebug_engine::NodeId;
use serde::Deserialize;
use std::collections::HashMap;

/// Label of the document node.
pub(crate) const DOCUMENT_LABEL: &str = "document";

/// A whole trace file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Trace {
    /// URL of the initial document.
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Children of the document node.
    #[serde(default)]
    pub(crate) document: Vec<NodeDecl>,
    /// What happens, in order.
    pub(crate) steps: Vec<Step>,
}

/// An element and its subtree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NodeDecl {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) label: Option<String>,
    #[serde(default)]
    pub(crate) children: Vec<NodeDecl>,
}

/// One step of a trace.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", deny_unknown_fields)]
pub(crate) enum Step {
    /// `Debugger.enable` without going through the protocol.
    Enable,
    /// `Debugger.disable` without going through the protocol.
    Disable,
    /// A protocol request.
    Command {
        command: String,
        #[serde(default)]
        arguments: Option<serde_json::Value>,
    },
    /// Inserts (or moves) `node` under `parent`. An unknown `node` label is
    /// created as an element called `name`.
    Insert {
        node: String,
        #[serde(default)]
        name: Option<String>,
        parent: String,
        #[serde(default)]
        before: Option<String>,
    },
    /// Removes `node` from its parent.
    Remove { node: String },
    /// Sets an attribute on `node`.
    SetAttribute {
        node: String,
        name: String,
        value: String,
    },
    /// Sends a request.
    Request { url: String },
    /// Dispatches a platform event.
    #[serde(rename_all = "camelCase")]
    Event {
        category: String,
        name: String,
        #[serde(default = "default_synchronous")]
        synchronous: bool,
    },
    /// Loads a new document.
    Navigate {
        url: String,
        #[serde(default)]
        document: Vec<NodeDecl>,
    },
}

fn default_synchronous() -> bool {
    true
}

/// Label to node mapping of the current document.
#[derive(Debug, Clone, Default)]
pub(crate) struct Labels(HashMap<String, NodeId>);

impl Labels {
    /// Builds `children` under the document node of a fresh `doc`.
    pub(crate) fn build(doc: &mut Document, children: &[NodeDecl]) -> Result<Self> {
        let mut labels = Self::default();
        labels.insert(DOCUMENT_LABEL, doc.document_node());

        let mut stack: Vec<_> = children
            .iter()
            .rev()
            .map(|decl| (doc.document_node(), decl))
            .collect();
        while let Some((parent, decl)) = stack.pop() {
            let node = doc.create_element(&decl.name);
            doc.append_child(parent, node)?;
            if let Some(label) = &decl.label {
                labels.insert(label, node);
            }
            stack.extend(decl.children.iter().rev().map(|child| (node, child)));
        }
        Ok(labels)
    }

    pub(crate) fn insert(&mut self, label: &str, node: NodeId) {
        self.0.insert(label.to_owned(), node);
    }

    pub(crate) fn get(&self, label: &str) -> Option<NodeId> {
        self.0.get(label).copied()
    }

    /// The node labelled `label`.
    pub(crate) fn resolve(&self, label: &str) -> Result<NodeId> {
        self.get(label)
            .ok_or_else(|| eyre!("unknown node label `{label}`"))
    }

    /// Replaces every `"@label"` string in `value` with the labelled node id.
    pub(crate) fn substitute(&self, value: &mut serde_json::Value) -> Result<()> {
        match value {
            serde_json::Value::String(text) => {
                if let Some(label) = text.strip_prefix('@') {
                    *value = self.resolve(label)?.get().into();
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    self.substitute(item)?;
                }
            }
            serde_json::Value::Object(fields) => {
                for item in fields.values_mut() {
                    self.substitute(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domdebug_engine::DomTree;
    use indoc::indoc;
    use serde_json::json;

    #[test]
    fn parses_steps() {
        let trace: Trace = serde_json::from_str(indoc! {r#"
            {
                "document": [{ "name": "html", "label": "html" }],
                "steps": [
                    { "op": "enable" },
                    { "op": "insert", "node": "p", "name": "p", "parent": "html" },
                    { "op": "setAttribute", "node": "p", "name": "id", "value": "x" },
                    { "op": "event", "category": "listener", "name": "click" }
                ]
            }
        "#})
        .unwrap();

        assert_eq!(trace.url, None);
        assert!(matches!(trace.steps[0], Step::Enable));
        assert!(matches!(
            &trace.steps[3],
            Step::Event { synchronous: true, .. }
        ));
    }

    #[test]
    fn builds_labelled_document() {
        let decls: Vec<NodeDecl> = serde_json::from_value(json!([
            { "name": "html", "children": [
                { "name": "body", "label": "body", "children": [{ "name": "div", "label": "div" }] },
            ] },
        ]))
        .unwrap();
        let mut doc = Document::new();
        let labels = Labels::build(&mut doc, &decls).unwrap();

        let div = labels.resolve("div").unwrap();
        assert_eq!(doc.parent(div), labels.get("body"));
        assert_eq!(labels.resolve("document").unwrap(), doc.document_node());
        assert!(labels.resolve("html").is_err());
    }

    #[test]
    fn substitutes_labels() {
        let mut labels = Labels::default();
        labels.insert("body", NodeId::new(7));
        let mut arguments = json!({ "nodeId": "@body", "type": 0, "nested": ["@body", "plain"] });

        labels.substitute(&mut arguments).unwrap();
        assert_eq!(
            arguments,
            json!({ "nodeId": 7, "type": 0, "nested": [7, "plain"] })
        );
        assert!(labels.substitute(&mut json!("@missing")).is_err());
    }
}
