//! Control configuration records.
//!
//! The shapes here mirror what config authors write, so the serde model is
//! deliberately permissive: handler references accept a bare id, an
//! `[id, args]` pair, or an `{id: args}` mapping; matcher declarations
//! accept the same shorthand or a full `{matchers, when, negate}` record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::UpdateTiming;

// =============================================================================
// Provider References
// =============================================================================

/// A reference to a registered handler: `"required"` or `["min", 5]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderRef {
    /// Bare id, no arguments.
    Id(String),
    /// Id plus arguments. Scalar args are wrapped into a single-element
    /// list during normalization.
    WithArgs(String, Value),
}

impl ProviderRef {
    /// The referenced handler id.
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::WithArgs(id, _) => id,
        }
    }

    /// Normalize to `(id, args)` with args always a list.
    pub fn normalized(&self) -> (String, Vec<Value>) {
        match self {
            Self::Id(id) => (id.clone(), Vec::new()),
            Self::WithArgs(id, args) => (id.clone(), normalize_args(args)),
        }
    }
}

/// Normalize a raw args value: absent/null ⇒ no args, a list is passed
/// through, anything else is wrapped into a single-element list.
pub fn normalize_args(args: &Value) -> Vec<Value> {
    match args {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// A collection of handler references: either a list of [`ProviderRef`]s
/// or a mapping of id to args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderRefs {
    /// `["required", ["min", 5]]`
    List(Vec<ProviderRef>),
    /// `{"required": null, "min": 5}`
    Map(BTreeMap<String, Value>),
}

impl ProviderRefs {
    /// Flatten into normalized `(id, args)` pairs, in declaration order.
    pub fn entries(&self) -> Vec<(String, Vec<Value>)> {
        match self {
            Self::List(refs) => refs.iter().map(ProviderRef::normalized).collect(),
            Self::Map(map) => map
                .iter()
                .map(|(id, args)| (id.clone(), normalize_args(args)))
                .collect(),
        }
    }
}

// =============================================================================
// Conditions & Matchers
// =============================================================================

/// Declarative condition fragment evaluated against another control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCondition {
    /// Path of the referenced control, relative to the declaring node.
    pub path: String,
    /// Expected value; a list means membership. Absent means "true on any
    /// change at `path`".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Invert the comparison result.
    #[serde(default)]
    pub negate: bool,
}

/// One condition inside a matcher's `when` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionConfig {
    /// Inline `{path, value?, negate?}` handled by the DEFAULT condition.
    Fragment(MatchCondition),
    /// Reference to a registered condition handler.
    Handler(ProviderRef),
}

/// Full matcher record: effects to run plus the AND-composed conditions
/// that drive them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Effects applied with the composed condition result.
    pub matchers: Vec<ProviderRef>,
    /// Conditions, AND-composed. Empty means "always matched".
    #[serde(default)]
    pub when: Vec<ConditionConfig>,
    /// Invert the composed result before applying the matchers.
    #[serde(default)]
    pub negate: bool,
}

/// Matcher declaration as written in config: either the full record or the
/// `["DISABLE", {path, value}]` shorthand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatcherDecl {
    /// Full `{matchers, when, negate}` record.
    Full(MatcherConfig),
    /// Shorthand: a single matcher ref whose args are condition fragments.
    Short(ProviderRef),
}

impl MatcherDecl {
    /// Normalize to the full record. Shorthand args become `when` entries:
    /// each arg is an inline condition fragment.
    pub fn normalized(&self) -> MatcherConfig {
        match self {
            Self::Full(config) => config.clone(),
            Self::Short(provider) => {
                let (id, args) = provider.normalized();
                let when = args
                    .into_iter()
                    .filter_map(|arg| serde_json::from_value::<MatchCondition>(arg).ok())
                    .map(ConditionConfig::Fragment)
                    .collect();
                MatcherConfig {
                    matchers: vec![ProviderRef::Id(id)],
                    when,
                    negate: false,
                }
            }
        }
    }
}

// =============================================================================
// Control Options
// =============================================================================

/// Control-creation options applied when the live instance is built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlOptions {
    /// Synchronous validator declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validators: Option<ProviderRefs>,
    /// Async validator declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_validators: Option<ProviderRefs>,
    /// When validators re-run after a value change.
    #[serde(default)]
    pub update_on: UpdateTiming,
}

// =============================================================================
// Control Config
// =============================================================================

/// Declarative description of one node in the control tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Control-type id, resolved through the control-type registry.
    pub control: String,

    /// Field name; unique among the parent's immediate named children.
    /// Unnamed group-like configs are structural pass-throughs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Behavior params, opaque to the engine and owned by the control type.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,

    /// Ordered child configs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<ControlConfig>,

    /// Matcher declarations driving enable/visibility/validity effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherDecl>,

    /// Error-message lookup: error id to display message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msgs: Option<BTreeMap<String, String>>,

    /// Per-context override fragments, merged by the resolver and never
    /// re-applied recursively.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Value>,

    /// Per-mode override fragments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<String, Value>,

    /// Control-creation options (validators, update timing).
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: ControlOptions,

    /// Factory/render descriptor, opaque to the engine; a change here
    /// forces a structural rebuild.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub factory: Value,
}

fn is_default_options(options: &ControlOptions) -> bool {
    *options == ControlOptions::default()
}

impl ControlConfig {
    /// Shorthand for a config with just a type and an optional name.
    pub fn control(control: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            control: control.into(),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    /// Normalized matcher records.
    pub fn matcher_configs(&self) -> Vec<MatcherConfig> {
        self.matchers.iter().map(MatcherDecl::normalized).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_provider_ref_shapes() {
        let bare: ProviderRef = serde_json::from_value(json!("required")).unwrap();
        assert_eq!(bare.normalized(), ("required".into(), vec![]));

        let pair: ProviderRef = serde_json::from_value(json!(["min", 5])).unwrap();
        assert_eq!(pair.normalized(), ("min".into(), vec![json!(5)]));

        let listed: ProviderRef =
            serde_json::from_value(json!(["between", [1, 10]])).unwrap();
        assert_eq!(
            listed.normalized(),
            ("between".into(), vec![json!(1), json!(10)])
        );
    }

    #[test]
    fn test_provider_refs_map() {
        let refs: ProviderRefs =
            serde_json::from_value(json!({ "required": null, "min": 5 })).unwrap();
        let entries = refs.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&("required".into(), vec![])));
        assert!(entries.contains(&("min".into(), vec![json!(5)])));
    }

    #[test]
    fn test_matcher_shorthand() {
        let decl: MatcherDecl =
            serde_json::from_value(json!(["DISABLE", { "path": "b", "value": "X" }]))
                .unwrap();
        let config = decl.normalized();
        assert_eq!(config.matchers, vec![ProviderRef::Id("DISABLE".into())]);
        assert_eq!(config.when.len(), 1);
        match &config.when[0] {
            ConditionConfig::Fragment(cond) => {
                assert_eq!(cond.path, "b");
                assert_eq!(cond.value, Some(json!("X")));
                assert!(!cond.negate);
            }
            other => panic!("expected inline fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_config_roundtrip_is_structural() {
        let config: ControlConfig = serde_json::from_value(json!({
            "control": "GROUP",
            "name": "profile",
            "controls": [
                { "control": "TEXT", "name": "first" },
                { "control": "TEXT", "name": "last" }
            ],
            "options": { "validators": ["required"] },
            "contexts": { "compact": { "params": { "dense": true } } }
        }))
        .unwrap();

        let value = serde_json::to_value(&config).unwrap();
        let back: ControlConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config, back);
    }
}
