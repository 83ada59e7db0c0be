//! Live form control instances.
//!
//! The factory builds one of three instance shapes per resolved config:
//! groups/containers (addressable named-field aggregates), arrays
//! (ordered homogeneous aggregates) and controls (leaf value holders).
//! Instances are `Rc`-shared between the built form structure and the
//! tree nodes that own their structural position.
//!
//! Observable state (value, disabled, errors) lives in signals so
//! conditions and consumers react to changes with no explicit wiring.

mod array;
mod control;
mod factory;
mod group;

pub use array::*;
pub use control::*;
pub use factory::*;
pub use group::*;

use std::rc::Rc;

use serde_json::Value;

// =============================================================================
// Form Member
// =============================================================================

/// A live control instance of any shape.
#[derive(Clone)]
pub enum FormMember {
    /// Named-field aggregate (Group or Container config).
    Group(Rc<FormGroup>),
    /// Ordered homogeneous aggregate.
    Array(Rc<FormArray>),
    /// Leaf value holder.
    Control(Rc<FormControl>),
}

impl FormMember {
    /// The group behind this member, if it is one.
    pub fn as_group(&self) -> Option<&Rc<FormGroup>> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    /// The array behind this member, if it is one.
    pub fn as_array(&self) -> Option<&Rc<FormArray>> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The leaf control behind this member, if it is one.
    pub fn as_control(&self) -> Option<&Rc<FormControl>> {
        match self {
            Self::Control(control) => Some(control),
            _ => None,
        }
    }

    /// Identity comparison: do both members point at the same instance?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Group(a), Self::Group(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Control(a), Self::Control(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Current value. Aggregates collect their children; reading inside
    /// an effect tracks every contributing signal.
    pub fn value(&self) -> Value {
        match self {
            Self::Group(group) => group.value(),
            Self::Array(array) => array.value(),
            Self::Control(control) => control.value(),
        }
    }

    /// Set or patch the value. Objects patch named group children,
    /// lists patch array items by index, leaves take the value as-is.
    pub fn set_value(&self, value: Value) {
        match self {
            Self::Group(group) => group.patch_value(&value),
            Self::Array(array) => array.patch_value(&value),
            Self::Control(control) => control.set_value(value),
        }
    }

    /// Disable this member and every descendant.
    pub fn disable(&self) {
        match self {
            Self::Group(group) => group.disable(),
            Self::Array(array) => array.disable(),
            Self::Control(control) => control.disable(),
        }
    }

    /// Re-enable this member and every descendant.
    pub fn enable(&self) {
        match self {
            Self::Group(group) => group.enable(),
            Self::Array(array) => array.enable(),
            Self::Control(control) => control.enable(),
        }
    }

    /// Whether this member itself is disabled.
    pub fn is_disabled(&self) -> bool {
        match self {
            Self::Group(group) => group.is_disabled(),
            Self::Array(array) => array.is_disabled(),
            Self::Control(control) => control.is_disabled(),
        }
    }

    /// Validity of this member and (for aggregates) its children,
    /// ignoring tree-level visibility. Disabled members are exempt.
    pub fn valid(&self) -> bool {
        match self {
            Self::Group(group) => group.valid(),
            Self::Array(array) => array.valid(),
            Self::Control(control) => control.valid(),
        }
    }

    /// Validity of this member alone, without descending into children.
    pub fn own_valid(&self) -> bool {
        match self {
            Self::Group(group) => group.own_valid(),
            Self::Array(array) => array.own_valid(),
            Self::Control(control) => control.valid(),
        }
    }

    /// Current errors value (`Null` when clear).
    pub fn errors(&self) -> Value {
        match self {
            Self::Group(group) => group.errors(),
            Self::Array(array) => array.errors(),
            Self::Control(control) => control.errors(),
        }
    }

    /// Overwrite errors with a synthetic error object.
    pub fn set_errors(&self, errors: crate::providers::ValidationErrors) {
        match self {
            Self::Group(group) => group.set_errors(errors),
            Self::Array(array) => array.set_errors(errors),
            Self::Control(control) => control.set_errors(errors),
        }
    }

    /// Re-run the member's own validators against its current value.
    pub fn refresh_validity(&self) {
        match self {
            Self::Group(group) => group.validate(),
            Self::Array(array) => array.validate(),
            Self::Control(control) => control.validate(),
        }
    }
}

impl std::fmt::Debug for FormMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(_) => write!(f, "FormMember::Group"),
            Self::Array(_) => write!(f, "FormMember::Array"),
            Self::Control(_) => write!(f, "FormMember::Control"),
        }
    }
}
