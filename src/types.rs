//! Core types for dyn-forms.
//!
//! These types define the foundation that everything builds on.
//! They flow through the config resolver, the form factory and the
//! control tree, and define what a rendering collaborator understands.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// =============================================================================
// Instance Kind
// =============================================================================

/// The structural kind of a control instance.
///
/// Containers and Groups are addressable named-field aggregates, Arrays are
/// ordered homogeneous aggregates, Controls are leaf value holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlKind {
    /// Structural aggregate that groups fields for presentation purposes.
    Container,
    /// Addressable named-field aggregate.
    Group,
    /// Ordered, dynamically-sized aggregate of homogeneous items.
    Array,
    /// Leaf value holder.
    Control,
}

impl ControlKind {
    /// Whether this kind aggregates named children.
    #[inline]
    pub const fn is_group_like(self) -> bool {
        matches!(self, Self::Container | Self::Group)
    }
}

// =============================================================================
// Visibility
// =============================================================================

/// Visibility state of a tree node.
///
/// `Hidden` keeps the control registered and its value collected;
/// `Invisible` detaches it from value collection and validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Rendered and participating in the form.
    #[default]
    Visible,
    /// Not rendered, still registered and carrying its value.
    Hidden,
    /// Removed: excluded from value collection and validation.
    Invisible,
}

// =============================================================================
// Update Timing
// =============================================================================

/// When a control re-runs its validators after a value change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTiming {
    /// Validate on every value change.
    #[default]
    Change,
    /// Validate when the control is marked touched.
    Blur,
    /// Validate only on an explicit submit pass.
    Submit,
}

// =============================================================================
// Control Flags
// =============================================================================

bitflags! {
    /// Interaction/validation state tracked per control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlFlags: u8 {
        /// The control has been visited (blur happened at least once).
        const TOUCHED = 1 << 0;
        /// The value changed since the control was built.
        const DIRTY   = 1 << 1;
        /// At least one async validator has not completed yet.
        const PENDING = 1 << 2;
    }
}

// =============================================================================
// Cleanup
// =============================================================================

/// Cancellation handle for a subscription or effect.
///
/// Every subscription a node creates returns one of these; the node runs
/// all of them before it is destroyed so notifications never reach a
/// stale node.
pub type Cleanup = Box<dyn FnOnce()>;
