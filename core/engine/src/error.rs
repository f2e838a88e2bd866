//! Error types reported by the breakpoint core.

use crate::dom::NodeId;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Result type for breakpoint operations.
pub type DebugResult<T> = Result<T, BreakpointError>;

/// Failures reported to the caller of a breakpoint operation.
///
/// Removing an absent breakpoint is not an error; such calls succeed without
/// touching any state.
#[derive(Debug, Error)]
pub enum BreakpointError {
    /// The node identifier does not resolve to a node in the live tree.
    #[error("could not find node with id {}", .0.get())]
    NodeNotFound(NodeId),

    /// The integer passed as a DOM breakpoint type is not a known type.
    #[error("unknown DOM breakpoint type {0}")]
    InvalidBreakpointType(u32),

    /// An event listener breakpoint name is not of the form `category:event`.
    #[error("invalid event name \"{0}\", expected `category:event`")]
    InvalidEventName(String),

    /// A persisted record cannot be applied to the current document.
    #[error("malformed sticky breakpoint record: {0}")]
    MalformedRecord(String),

    /// The sticky breakpoint store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of a [`StickyStore`](crate::StickyStore) or of loading
/// configuration from disk.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("failed to access {}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The backing file does not contain the expected JSON.
    #[error("{} does not contain valid JSON", path.display())]
    Json {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}
