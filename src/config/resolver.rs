//! Effective-config resolution.
//!
//! A node's effective config is its base config with the current mode and
//! context override fragments layered on top:
//!
//! ```text
//! base (minus modes/contexts)
//!   -> config.modes[mode]     -> form-level mode fragment (by control id)
//!   -> config.contexts[ctx]   -> form-level context fragment (by control id)
//! ```
//!
//! The resolution is a pure function: inputs are never mutated and the
//! override maps are stripped from the result so they are never re-applied
//! recursively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::control::ControlConfig;
use super::merge::deep_merge;

// =============================================================================
// Form-level Defaults
// =============================================================================

/// Form-wide override fragments, keyed by mode/context and matched to a
/// config by its control-type id (each fragment carries a `control` field).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDefaults {
    /// Per-mode lists of per-control override fragments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<String, Vec<Value>>,
    /// Per-context lists of per-control override fragments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Vec<Value>>,
}

impl FormDefaults {
    fn fragment_for<'a>(
        map: &'a BTreeMap<String, Vec<Value>>,
        key: &str,
        control_id: &str,
    ) -> Option<&'a Value> {
        map.get(key)?.iter().find(|fragment| {
            fragment
                .get("control")
                .and_then(Value::as_str)
                .is_some_and(|id| id == control_id)
        })
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Compute the effective config for the given mode and context.
///
/// Absent mode/context skips the respective layer; with neither set this
/// returns the base config minus its `modes`/`contexts` maps, unchanged
/// otherwise. A fragment that merges into something no longer parseable as
/// a config is skipped with a warning rather than aborting resolution.
pub fn effective_config(
    config: &ControlConfig,
    mode: Option<&str>,
    context: Option<&str>,
    defaults: &FormDefaults,
) -> ControlConfig {
    // (1) shallow copy, stripping the override maps
    let mut base = config.clone();
    base.modes = BTreeMap::new();
    base.contexts = BTreeMap::new();

    if mode.is_none() && context.is_none() {
        return base;
    }

    let Ok(mut value) = serde_json::to_value(&base) else {
        return base;
    };

    // (2) mode layer: control fragment, then form-level fragment
    if let Some(mode) = mode {
        if let Some(fragment) = config.modes.get(mode) {
            value = deep_merge(&value, fragment);
        }
        if let Some(fragment) =
            FormDefaults::fragment_for(&defaults.modes, mode, current_control_id(&value))
        {
            value = deep_merge(&value, fragment);
        }
    }

    // (3) context layer: control fragment, then form-level fragment
    if let Some(context) = context {
        if let Some(fragment) = config.contexts.get(context) {
            value = deep_merge(&value, fragment);
        }
        if let Some(fragment) =
            FormDefaults::fragment_for(&defaults.contexts, context, current_control_id(&value))
        {
            value = deep_merge(&value, fragment);
        }
    }

    // fragments never re-introduce override maps
    if let Value::Object(map) = &mut value {
        map.remove("modes");
        map.remove("contexts");
    }

    match serde_json::from_value(value) {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(
                control = %config.control,
                %err,
                "override fragment produced an invalid config, keeping base"
            );
            base
        }
    }
}

fn current_control_id(value: &Value) -> &str {
    value
        .get("control")
        .and_then(Value::as_str)
        .unwrap_or_default()
}
