//! Control-type registry.
//!
//! Maps the `control` id of a config to the structural kind the engine
//! builds for it. Control types are the extension point for consumers:
//! the engine only cares about the kind, everything else about a type
//! (params shape, rendering) is theirs.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::ControlKind;

/// One registered control type.
#[derive(Debug, Clone)]
pub struct ControlTypeDef {
    /// Control-type id referenced from config.
    pub control: String,
    /// Structural kind the engine builds.
    pub kind: ControlKind,
}

impl ControlTypeDef {
    pub fn new(control: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            control: control.into(),
            kind,
        }
    }
}

/// Immutable control-type lookup table.
#[derive(Default)]
pub struct ControlTypeRegistry {
    entries: HashMap<String, ControlKind>,
}

impl ControlTypeRegistry {
    /// Build the table from the registered definitions. Later
    /// definitions for the same id replace earlier ones.
    pub fn new(defs: Vec<ControlTypeDef>) -> Self {
        Self {
            entries: defs
                .into_iter()
                .map(|def| (def.control, def.kind))
                .collect(),
        }
    }

    /// Structural kind for a control-type id.
    pub fn resolve(&self, control: &str) -> Result<ControlKind> {
        self.entries
            .get(control)
            .copied()
            .ok_or_else(|| Error::BuildFailure {
                control: control.to_string(),
            })
    }

    /// Whether a control-type id is registered.
    pub fn contains(&self, control: &str) -> bool {
        self.entries.contains_key(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_type() {
        let registry = ControlTypeRegistry::new(vec![
            ControlTypeDef::new("GROUP", ControlKind::Group),
            ControlTypeDef::new("INPUT", ControlKind::Control),
        ]);
        assert_eq!(registry.resolve("GROUP").unwrap(), ControlKind::Group);
        assert_eq!(registry.resolve("INPUT").unwrap(), ControlKind::Control);
    }

    #[test]
    fn test_later_definition_replaces() {
        let registry = ControlTypeRegistry::new(vec![
            ControlTypeDef::new("CARD", ControlKind::Group),
            ControlTypeDef::new("CARD", ControlKind::Container),
        ]);
        assert_eq!(registry.resolve("CARD").unwrap(), ControlKind::Container);
    }

    #[test]
    fn test_unknown_type_fails() {
        let registry = ControlTypeRegistry::default();
        let err = registry.resolve("NOPE").unwrap_err();
        assert!(matches!(err, Error::BuildFailure { .. }));
    }
}
