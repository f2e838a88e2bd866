//! Tree mutations wrapped in their breakpoint hooks.
//!
//! Each function validates the mutation first, so a rejected mutation fires
//! no hook, then calls the `will_*` hook, mutates and calls the `did_*` hook.
//! They return whether any hook paused.

use crate::{ArenaError, ArenaResult, Document};
use domdebug_engine::{DomTree, InstrumentationBridge, NodeId};

/// Inserts `child` under `parent` before `reference`. An attached `child` is
/// removed from its old place first, firing the removal hooks, as a DOM move
/// does.
///
/// # Errors
///
/// See [`Document::insert_before`]; an attached `child` is not an error here.
pub fn insert_before(
    doc: &mut Document,
    hooks: &mut InstrumentationBridge<'_>,
    parent: NodeId,
    child: NodeId,
    reference: Option<NodeId>,
) -> ArenaResult<bool> {
    if reference == Some(child) {
        return Err(ArenaError::NotAChild { child, parent });
    }
    match doc.check_insert(parent, child, reference) {
        Ok(()) | Err(ArenaError::AlreadyAttached(_)) => {}
        Err(err) => return Err(err),
    }

    let mut paused = remove_child(doc, hooks, child)?;
    paused |= hooks.will_insert_dom_node(&*doc, child, parent);
    doc.insert_before(parent, child, reference)?;
    hooks.did_insert_dom_node(&*doc, child);
    Ok(paused)
}

/// Appends `child` as the last child of `parent`, see [`insert_before`].
///
/// # Errors
///
/// See [`Document::insert_before`].
pub fn append_child(
    doc: &mut Document,
    hooks: &mut InstrumentationBridge<'_>,
    parent: NodeId,
    child: NodeId,
) -> ArenaResult<bool> {
    insert_before(doc, hooks, parent, child, None)
}

/// Detaches `node` from its parent. Detaching a detached node fires nothing.
///
/// # Errors
///
/// See [`Document::detach`].
pub fn remove_child(
    doc: &mut Document,
    hooks: &mut InstrumentationBridge<'_>,
    node: NodeId,
) -> ArenaResult<bool> {
    if doc.check_detach(node)?.is_none() {
        return Ok(false);
    }

    let paused = hooks.will_remove_dom_node(&*doc, node);
    doc.detach(node)?;
    hooks.did_remove_dom_node(&*doc, node);
    Ok(paused)
}

/// Sets an attribute of `node`.
///
/// # Errors
///
/// See [`Document::set_attribute`].
pub fn set_attribute(
    doc: &mut Document,
    hooks: &mut InstrumentationBridge<'_>,
    node: NodeId,
    name: &str,
    value: &str,
) -> ArenaResult<bool> {
    if !doc.contains(node) {
        return Err(ArenaError::UnknownNode(node));
    }

    let paused = doc.is_live(node) && hooks.will_modify_dom_attr(&*doc, node);
    doc.set_attribute(node, name, value)?;
    Ok(paused)
}
