//! DOM breakpoint kinds and the per-node bitmask that stores them.
//!
//! Bit layout of a [`NodeBreakpointMask`]:
//!
//! | bits   | meaning                                                      |
//! |--------|--------------------------------------------------------------|
//! | 0..=2  | breakpoints owned by the node, bit *i* = [`DomBreakpointType`] *i* |
//! | 16..=18| the same types inherited from an ancestor's subtree breakpoint |
//!
//! Only [`DomBreakpointType::SubtreeModified`] is inheritable, so in practice
//! bit 16 is the only inherited bit ever set. Keeping inherited bits apart
//! from owned ones lets an ancestor's breakpoint be withdrawn exactly, even
//! from a descendant that owns the same type.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance between an owned bit and its inherited counterpart.
pub const INHERITED_SHIFT: u32 = 16;

/// The kinds of DOM breakpoint. The discriminant is the bit position.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u32)]
pub enum DomBreakpointType {
    /// A child is inserted into, or removed from, the node's subtree.
    SubtreeModified = 0,
    /// An attribute of the node is about to change.
    AttributeModified = 1,
    /// The node itself is about to be removed.
    NodeRemoved = 2,
}

impl DomBreakpointType {
    /// Every breakpoint type, in bit order.
    pub const ALL: [Self; 3] = [
        Self::SubtreeModified,
        Self::AttributeModified,
        Self::NodeRemoved,
    ];

    /// The owned bit for this type.
    #[must_use]
    pub const fn bit(self) -> NodeBreakpointMask {
        NodeBreakpointMask::from_bits_retain(1 << self as u32)
    }

    /// The inherited bit for this type.
    #[must_use]
    pub const fn inherited_bit(self) -> NodeBreakpointMask {
        NodeBreakpointMask::from_bits_retain(1 << (self as u32 + INHERITED_SHIFT))
    }

    /// Whether a breakpoint of this type also covers the node's descendants.
    #[must_use]
    pub const fn is_inheritable(self) -> bool {
        matches!(self, Self::SubtreeModified)
    }

    /// Protocol-facing name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubtreeModified => "subtree-modified",
            Self::AttributeModified => "attribute-modified",
            Self::NodeRemoved => "node-removed",
        }
    }
}

impl fmt::Display for DomBreakpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Breakpoints stored for a single node. An absent node has the empty mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeBreakpointMask: u32 {
        /// Owns a [`DomBreakpointType::SubtreeModified`] breakpoint.
        const SUBTREE_MODIFIED = 1 << 0;
        /// Owns a [`DomBreakpointType::AttributeModified`] breakpoint.
        const ATTRIBUTE_MODIFIED = 1 << 1;
        /// Owns a [`DomBreakpointType::NodeRemoved`] breakpoint.
        const NODE_REMOVED = 1 << 2;
        /// Inherits [`DomBreakpointType::SubtreeModified`] from an ancestor.
        const INHERITED_SUBTREE_MODIFIED = 1 << 16;
    }
}

impl NodeBreakpointMask {
    /// All owned bits.
    pub const OWN: Self = Self::SUBTREE_MODIFIED
        .union(Self::ATTRIBUTE_MODIFIED)
        .union(Self::NODE_REMOVED);

    /// Owned bits whose types propagate to descendants.
    pub const INHERITABLE: Self = Self::SUBTREE_MODIFIED;

    /// The owned part of the mask.
    #[must_use]
    pub const fn own(self) -> Self {
        self.intersection(Self::OWN)
    }

    /// The inherited part, shifted down onto the owned bit positions.
    #[must_use]
    pub const fn inherited(self) -> Self {
        Self::from_bits_retain((self.bits() >> INHERITED_SHIFT) & Self::INHERITABLE.bits())
    }

    /// Moves the inheritable owned bits of `self` onto the inherited positions.
    #[must_use]
    pub const fn as_inherited(self) -> Self {
        Self::from_bits_retain((self.bits() & Self::INHERITABLE.bits()) << INHERITED_SHIFT)
    }

    /// What the node actually breaks on: owned bits plus inherited ones, on
    /// the owned positions.
    #[must_use]
    pub const fn effective(self) -> Self {
        self.own().union(self.inherited())
    }

    /// Whether the node breaks on `kind`, either owned or inherited.
    #[must_use]
    pub const fn breaks_on(self, kind: DomBreakpointType) -> bool {
        self.intersects(kind.bit().union(kind.inherited_bit()))
    }
}

impl From<DomBreakpointType> for NodeBreakpointMask {
    fn from(kind: DomBreakpointType) -> Self {
        kind.bit()
    }
}
