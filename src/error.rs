//! Error taxonomy for tree construction and reconfiguration.
//!
//! All of these are deterministic functions of the configuration: they are
//! raised synchronously while building or reconfiguring a branch and abort
//! only that branch. Condition-path lookup failures are intentionally NOT
//! errors; they degrade to a fail-open `true` signal plus a warning.

use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the forms engine.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the forms engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A declaration referenced a handler id that no registry provides.
    #[error("no {kind} provider registered under '{id}'")]
    ProviderNotFound {
        /// Registry kind (Validator, Matcher, Condition, ...).
        kind: &'static str,
        /// The unresolved handler id.
        id: String,
    },

    /// An array config without a name outside of an array parent.
    /// Anonymous structural elements are only legal as direct array items.
    #[error("array control '{control}' requires a name outside an array")]
    UnnamedArrayChild {
        /// Control-type id of the offending config.
        control: String,
    },

    /// Two sibling configs declared the same name.
    #[error("duplicate control name '{name}' under '{parent}'")]
    DuplicateName {
        /// The conflicting name.
        name: String,
        /// Path of the parent aggregate.
        parent: String,
    },

    /// Attempt to attach a named control to a non-aggregate parent.
    #[error("cannot append named control '{name}' to a non-group parent")]
    UnsupportedParent {
        /// Name of the control that could not be attached.
        name: String,
    },

    /// The control-type id could not be resolved to a registered type.
    #[error("no control type registered for '{control}'")]
    BuildFailure {
        /// The unresolved control-type id.
        control: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::ProviderNotFound {
            kind: "Validator",
            id: "unknown".into(),
        };
        assert_eq!(
            err.to_string(),
            "no Validator provider registered under 'unknown'"
        );

        let err = Error::UnnamedArrayChild {
            control: "ARRAY".into(),
        };
        assert!(err.to_string().contains("requires a name"));
    }
}
