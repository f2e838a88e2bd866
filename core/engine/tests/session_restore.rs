//! Integration tests for sticky breakpoints and the protocol surface
//!
//! This test suite validates that:
//! - Breakpoints set while enabled survive disable/enable and a file store reopen
//! - Stored node paths follow the tree as nodes move or go away
//! - Malformed records are skipped without aborting a restore
//! - Named breakpoints (event listeners, XHR) behave as sets
//! - Protocol failures leave the session untouched

use dom_arena::{Document, instrumented};
use domdebug_engine::{
    BreakpointCategory, DebuggerConfig, DomBreakpointType, DomDebugger, DomTree, MemoryStore,
    NodeId, PauseDescription, PauseHandler, ProtocolMessage, ProtocolServer,
    StickyBreakpointRecord,
    protocol::{Request, messages},
};
use indoc::formatdoc;
use serde_json::json;
use std::{env, fs, path::PathBuf, process};

const URL: &str = "https://example.test/index.html";

/// `#document > HTML > BODY > (DIV, UL > LI)`
fn page() -> (Document, [NodeId; 5]) {
    let mut doc = Document::new();
    let nodes = ["html", "body", "div", "ul", "li"].map(|name| doc.create_element(name));
    let [html, body, div, ul, li] = nodes;
    doc.append_child(doc.document_node(), html).unwrap();
    for (parent, child) in [(html, body), (body, div), (body, ul), (ul, li)] {
        doc.append_child(parent, child).unwrap();
    }
    (doc, nodes)
}

/// `#document > HTML > (DIV, DIV)`
fn two_divs() -> (Document, NodeId, NodeId, NodeId) {
    let mut doc = Document::new();
    let html = doc.create_element("html");
    let (a, b) = (doc.create_element("div"), doc.create_element("div"));
    doc.append_child(doc.document_node(), html).unwrap();
    doc.append_child(html, a).unwrap();
    doc.append_child(html, b).unwrap();
    (doc, html, a, b)
}

#[derive(Debug)]
struct Resume;

impl PauseHandler for Resume {
    fn request_pause(&self, _: BreakpointCategory, _: &PauseDescription) {}
}

fn restart(debugger: &mut DomDebugger, doc: &Document) {
    assert!(debugger.disable());
    assert!(debugger.enable(doc).unwrap());
}

fn scratch_file(name: &str) -> PathBuf {
    env::temp_dir().join(format!("domdebug-it-{}-{name}.json", process::id()))
}

/// Every query the session answers, for comparing two sessions.
fn observable_state(debugger: &DomDebugger, doc: &Document) -> serde_json::Value {
    let registry = debugger.registry();
    let nodes: Vec<_> = dom_nodes(doc)
        .into_iter()
        .map(|node| {
            DomBreakpointType::ALL
                .map(|kind| registry.has_breakpoint(node, kind))
                .to_vec()
        })
        .collect();
    json!({
        "dom": nodes,
        "listeners": registry.event_listener_breakpoints().collect::<Vec<_>>(),
        "xhr": registry.xhr_patterns().collect::<Vec<_>>(),
        "any": registry.match_any_url(),
        "snapshot": registry.snapshot(doc),
    })
}

fn dom_nodes(doc: &Document) -> Vec<NodeId> {
    doc.subtree(doc.document_node())
}

#[test]
fn round_trip_through_disable_and_enable() {
    let (doc, [_, body, div, ul, _]) = page();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    debugger.enable(&doc).unwrap();

    debugger
        .set_dom_breakpoint(&doc, body, DomBreakpointType::SubtreeModified)
        .unwrap();
    debugger
        .set_dom_breakpoint(&doc, div, DomBreakpointType::AttributeModified)
        .unwrap();
    debugger
        .set_dom_breakpoint(&doc, ul, DomBreakpointType::NodeRemoved)
        .unwrap();
    debugger.set_event_listener_breakpoint("listener:click").unwrap();
    debugger.set_event_listener_breakpoint("instrumentation:setTimeout").unwrap();
    debugger.set_xhr_breakpoint("/api/");
    debugger.set_xhr_breakpoint("");
    let before = observable_state(&debugger, &doc);

    assert!(debugger.disable());
    assert!(debugger.registry().is_empty());
    assert!(debugger.enable(&doc).unwrap());
    assert_eq!(observable_state(&debugger, &doc), before);
}

#[test]
fn file_store_survives_a_restart() {
    let path = scratch_file("restart");
    let _ = fs::remove_file(&path);
    let (doc, [html, ..]) = page();
    let config = DebuggerConfig::new(URL).with_store_path(&path);

    {
        let mut debugger = DomDebugger::from_config(config.clone()).unwrap();
        debugger.enable(&doc).unwrap();
        debugger
            .set_dom_breakpoint(&doc, html, DomBreakpointType::SubtreeModified)
            .unwrap();
        debugger.set_xhr_breakpoint("/api/");
    }

    // A new document built from the same markup.
    let (reloaded, [_, body, ..]) = page();
    let mut debugger = DomDebugger::from_config(config).unwrap();
    debugger.enable(&reloaded).unwrap();
    assert!(
        debugger
            .registry()
            .has_breakpoint(body, DomBreakpointType::SubtreeModified)
    );
    assert_eq!(debugger.registry().xhr_match("/api/users"), Some("/api/"));
    fs::remove_file(&path).unwrap();
}

#[test]
fn malformed_records_are_skipped() {
    let path = scratch_file("malformed");
    fs::write(
        &path,
        formatdoc! {r#"
                {{
                    "{url}": [
                        {{ "category": "dom", "path": "0,HTML,0,BODY,0,DIV", "type": 1 }},
                        {{ "category": "dom", "path": "0,HTML,7,TABLE", "type": 0 }},
                        {{ "category": "dom", "path": "0,HTML", "type": 9 }},
                        {{ "category": "script", "line": 3 }},
                        {{ "category": "eventListener", "eventName": "listener:submit" }}
                    ]
                }}
            "#,
            url = URL
        },
    )
    .unwrap();

    let (doc, [_, _, div, ..]) = page();
    let mut debugger =
        DomDebugger::from_config(DebuggerConfig::new(URL).with_store_path(&path)).unwrap();
    debugger.enable(&doc).unwrap();

    let registry = debugger.registry();
    assert!(registry.has_breakpoint(div, DomBreakpointType::AttributeModified));
    assert!(registry.has_event_listener_breakpoint("listener:submit"));
    assert_eq!(registry.tracked_node_count(), 1);
    fs::remove_file(&path).unwrap();
}

#[test]
fn named_breakpoints_are_sets() {
    let (doc, _) = page();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    debugger.enable(&doc).unwrap();

    debugger.set_event_listener_breakpoint("listener:click").unwrap();
    debugger.set_event_listener_breakpoint("listener:click").unwrap();
    debugger.remove_event_listener_breakpoint("listener:click").unwrap();
    assert!(!debugger.registry().has_event_listener_breakpoint("listener:click"));

    debugger.set_xhr_breakpoint("/api/");
    assert_eq!(debugger.registry().xhr_match("/api/users"), Some("/api/"));
    assert_eq!(debugger.registry().xhr_match("/static/app.js"), None);

    debugger.set_xhr_breakpoint("");
    assert!(debugger.registry().match_any_url());
    assert_eq!(debugger.registry().xhr_match("/static/app.js"), Some(""));
    assert_eq!(debugger.registry().xhr_patterns().collect::<Vec<_>>(), ["/api/"]);

    debugger.remove_xhr_breakpoint("");
    assert_eq!(debugger.registry().xhr_match("/static/app.js"), None);
    assert_eq!(
        debugger.store().load(URL).unwrap(),
        [StickyBreakpointRecord::xhr("/api/")]
    );
}

#[test]
fn protocol_failure_changes_nothing() {
    let (doc, [html, ..]) = page();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    let mut server = ProtocolServer::new();
    let request = |seq, command: &str, arguments| Request {
        seq,
        command: command.to_owned(),
        arguments: Some(arguments),
    };

    server.handle_request(&mut debugger, &doc, request(1, messages::ENABLE, json!(null)));
    server.handle_request(
        &mut debugger,
        &doc,
        request(
            2,
            messages::SET_DOM_BREAKPOINT,
            json!({ "nodeId": html.get(), "type": 0 }),
        ),
    );
    let before = observable_state(&debugger, &doc);

    let reply = server.handle_request(
        &mut debugger,
        &doc,
        request(
            3,
            messages::REMOVE_DOM_BREAKPOINT,
            json!({ "nodeId": 404, "type": 0 }),
        ),
    );
    let [ProtocolMessage::Response(response)] = reply.as_slice() else {
        panic!("expected one response, got {reply:?}");
    };
    assert!(!response.success);
    assert_eq!(response.request_seq, 3);
    assert_eq!(
        response.message.as_deref(),
        Some("could not find node with id 404")
    );
    assert_eq!(observable_state(&debugger, &doc), before);
    assert!(doc.is_live(html));
}

#[test]
fn moved_node_does_not_hand_its_breakpoint_to_a_sibling() {
    let (mut doc, html, a, b) = two_divs();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    debugger.enable(&doc).unwrap();
    debugger
        .set_dom_breakpoint(&doc, b, DomBreakpointType::AttributeModified)
        .unwrap();

    let pause = Resume;
    let mut hooks = debugger.instrumentation(&pause);
    instrumented::insert_before(&mut doc, &mut hooks, html, b, Some(a)).unwrap();
    let before = observable_state(&debugger, &doc);

    restart(&mut debugger, &doc);
    assert_eq!(observable_state(&debugger, &doc), before);
    assert!(
        !debugger
            .registry()
            .has_breakpoint(a, DomBreakpointType::AttributeModified)
    );
}

#[test]
fn removed_node_does_not_hand_its_breakpoint_to_a_newcomer() {
    let (mut doc, html, a, _) = two_divs();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    debugger.enable(&doc).unwrap();
    debugger
        .set_dom_breakpoint(&doc, a, DomBreakpointType::NodeRemoved)
        .unwrap();

    let pause = Resume;
    let mut hooks = debugger.instrumentation(&pause);
    assert!(instrumented::remove_child(&mut doc, &mut hooks, a).unwrap());
    let fresh = doc.create_element("div");
    instrumented::append_child(&mut doc, &mut hooks, html, fresh).unwrap();
    let before = observable_state(&debugger, &doc);

    restart(&mut debugger, &doc);
    assert_eq!(observable_state(&debugger, &doc), before);
    assert!(
        !debugger
            .registry()
            .has_breakpoint(fresh, DomBreakpointType::NodeRemoved)
    );
    assert!(debugger.store().load(URL).unwrap().is_empty());
}

#[test]
fn breakpoint_follows_its_node_when_siblings_shift() {
    let (mut doc, html, a, b) = two_divs();
    let mut debugger = DomDebugger::new(DebuggerConfig::new(URL), Box::new(MemoryStore::new()));
    debugger.enable(&doc).unwrap();
    debugger
        .set_dom_breakpoint(&doc, b, DomBreakpointType::AttributeModified)
        .unwrap();

    let pause = Resume;
    let mut hooks = debugger.instrumentation(&pause);
    let first = doc.create_element("div");
    instrumented::insert_before(&mut doc, &mut hooks, html, first, Some(a)).unwrap();
    let before = observable_state(&debugger, &doc);

    restart(&mut debugger, &doc);
    assert_eq!(observable_state(&debugger, &doc), before);
    assert!(
        debugger
            .registry()
            .has_breakpoint(b, DomBreakpointType::AttributeModified)
    );
}
