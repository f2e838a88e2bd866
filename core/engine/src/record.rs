//! The persisted form of sticky breakpoints.

use crate::{
    dom::{DomTree, NodeId, node_path},
    mask::DomBreakpointType,
    pause::BreakpointCategory,
};
use log::warn;
use serde::{Deserialize, Serialize};

/// One persisted breakpoint.
///
/// DOM breakpoints are stored by node path, since node identifiers do not
/// survive a reload. The type is kept as the raw integer so records written
/// by a newer producer can still be read and skipped individually.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum StickyBreakpointRecord {
    /// A DOM breakpoint.
    Dom {
        /// Path descriptor of the node, see [`node_path`].
        path: String,
        /// Bit position of the [`DomBreakpointType`].
        #[serde(rename = "type")]
        breakpoint_type: u32,
    },
    /// An event listener breakpoint.
    #[serde(rename_all = "camelCase")]
    EventListener {
        /// Fully qualified event name, e.g. `listener:click`.
        event_name: String,
    },
    /// An XHR breakpoint. The empty URL stands for "match any URL".
    Xhr {
        /// URL substring.
        url: String,
    },
}

impl StickyBreakpointRecord {
    /// Builds the record for a DOM breakpoint on `node`, if `node` has a path.
    #[must_use]
    pub fn dom(tree: &dyn DomTree, node: NodeId, kind: DomBreakpointType) -> Option<Self> {
        Some(Self::Dom {
            path: node_path(tree, node)?,
            breakpoint_type: kind.into(),
        })
    }

    /// Builds the record for an event listener breakpoint.
    #[must_use]
    pub fn event_listener(event_name: impl Into<String>) -> Self {
        Self::EventListener {
            event_name: event_name.into(),
        }
    }

    /// Builds the record for an XHR breakpoint.
    #[must_use]
    pub fn xhr(url: impl Into<String>) -> Self {
        Self::Xhr { url: url.into() }
    }

    /// The breakpoint category this record restores into.
    #[must_use]
    pub const fn category(&self) -> BreakpointCategory {
        match self {
            Self::Dom { .. } => BreakpointCategory::Dom,
            Self::EventListener { .. } => BreakpointCategory::EventListener,
            Self::Xhr { .. } => BreakpointCategory::Xhr,
        }
    }
}

/// Decodes records one by one, skipping (and logging) those that do not
/// deserialize, such as records of an unknown category.
pub fn parse_records<I>(values: I) -> (Vec<StickyBreakpointRecord>, usize)
where
    I: IntoIterator<Item = serde_json::Value>,
{
    let mut skipped = 0;
    let records = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("skipping sticky breakpoint {value}: {err}");
                skipped += 1;
                None
            }
        })
        .collect();
    (records, skipped)
}
