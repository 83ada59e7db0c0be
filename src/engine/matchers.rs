//! Matcher wiring.
//!
//! Each matcher record of a config becomes one effect: the AND of its
//! condition getters, inverted by `negate`, applied through its matcher
//! effects whenever a tracked dependency changes. Conditions bind their
//! observed control once, at wiring time, so matchers must be wired
//! after the surrounding subtree exists.

use std::rc::Rc;

use serde_json::Value;
use spark_signals::effect;

use crate::config::{ConditionConfig, ControlConfig, ProviderRef};
use crate::error::Result;
use crate::providers::ConditionGetter;
use crate::tree::NodeId;

use super::scope::FormScope;

/// Wire every matcher record of a config to its node. The effects run
/// immediately once and re-run on dependency changes; their stops are
/// registered as node cleanups.
pub(crate) fn wire_matchers(
    scope: &Rc<FormScope>,
    node: NodeId,
    config: &ControlConfig,
) -> Result<()> {
    for record in config.matcher_configs() {
        let mut matcher_fns = Vec::with_capacity(record.matchers.len());
        for reference in &record.matchers {
            matcher_fns.push(scope.matcher(reference)?);
        }

        let mut getters: Vec<ConditionGetter> = Vec::with_capacity(record.when.len());
        for condition in &record.when {
            let bind = match condition {
                ConditionConfig::Fragment(fragment) => {
                    let args = serde_json::to_value(fragment).unwrap_or(Value::Null);
                    scope.condition(&ProviderRef::WithArgs("DEFAULT".into(), args))?
                }
                ConditionConfig::Handler(reference) => scope.condition(reference)?,
            };
            getters.push(bind(scope.tree(), node));
        }

        let tree = scope.tree().clone();
        let negate = record.negate;
        let stop = effect(move || {
            if !tree.contains(node) {
                return;
            }
            // every getter is evaluated so each one stays a tracked
            // dependency, even once an earlier one turns false
            let results: Vec<bool> = getters.iter().map(|getter| getter()).collect();
            let matched = results.into_iter().all(|result| result) != negate;
            for matcher in &matcher_fns {
                matcher(&tree, node, matched);
            }
        });
        scope.tree().add_cleanup(node, Box::new(stop));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::providers::ProviderEntry;
    use crate::types::{ControlKind, Visibility};

    use super::*;

    fn scope() -> Rc<FormScope> {
        FormScope::builder()
            .control_type("FORM", ControlKind::Group)
            .control_type("INPUT", ControlKind::Control)
            .build()
    }

    fn build_pair(scope: &Rc<FormScope>) -> (NodeId, NodeId, NodeId) {
        let root_config = ControlConfig::control("FORM", None);
        let root_member = scope
            .factory()
            .build(ControlKind::Group, &root_config)
            .unwrap();
        let root = scope
            .tree()
            .create_node(None, ControlKind::Group, &root_config, root_member.clone())
            .unwrap();

        let mut nodes = Vec::new();
        for name in ["target", "driver"] {
            let config = ControlConfig::control("INPUT", Some(name));
            let member = scope
                .factory()
                .register(ControlKind::Control, &config, name, &root_member)
                .unwrap();
            nodes.push(
                scope
                    .tree()
                    .create_node(Some(root), ControlKind::Control, &config, member)
                    .unwrap(),
            );
        }
        (root, nodes[0], nodes[1])
    }

    fn set(scope: &Rc<FormScope>, node: NodeId, value: Value) {
        scope.tree().member(node).unwrap().set_value(value);
    }

    #[test]
    fn test_disable_follows_sibling_value() {
        let scope = scope();
        let (_root, target, _driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [["DISABLE", { "path": "driver", "value": "off" }]]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        let member = scope.tree().member(target).unwrap();
        assert!(!member.is_disabled(), "initial state: condition unmatched");

        set(&scope, _driver, json!("off"));
        assert!(member.is_disabled());

        set(&scope, _driver, json!("on"));
        assert!(!member.is_disabled());
    }

    #[test]
    fn test_record_negate_inverts_composition() {
        let scope = scope();
        let (_root, target, driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [{
                "matchers": ["HIDE"],
                "when": [{ "path": "driver", "value": "ready" }],
                "negate": true
            }]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        // unmatched condition, negated: hidden until driver is ready
        assert_eq!(scope.tree().visibility(target), Some(Visibility::Hidden));

        set(&scope, driver, json!("ready"));
        assert_eq!(scope.tree().visibility(target), Some(Visibility::Visible));
    }

    #[test]
    fn test_empty_when_applies_once() {
        let scope = scope();
        let (_root, target, _driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [{ "matchers": ["INVISIBLE"], "when": [] }]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        assert_eq!(scope.tree().visibility(target), Some(Visibility::Invisible));
    }

    #[test]
    fn test_conditions_are_and_composed() {
        let scope = scope();
        let (_root, target, driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [{
                "matchers": ["DISABLE"],
                "when": [
                    { "path": "driver", "value": "off" },
                    { "path": "target", "value": "x" }
                ]
            }]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        let member = scope.tree().member(target).unwrap();
        set(&scope, driver, json!("off"));
        assert!(!member.is_disabled(), "one of two conditions is not enough");

        set(&scope, target, json!("x"));
        assert!(member.is_disabled());
    }

    #[test]
    fn test_custom_condition_handler() {
        use std::rc::Rc as StdRc;

        use crate::providers::{ConditionFactory, ConditionFn};

        let always: ConditionFactory = StdRc::new(|_args: &[Value]| {
            StdRc::new(|_tree: &crate::tree::FormTree, _node: NodeId| {
                StdRc::new(|| true) as ConditionGetter
            }) as ConditionFn
        });

        let scope = FormScope::builder()
            .control_type("FORM", ControlKind::Group)
            .control_type("INPUT", ControlKind::Control)
            .provide_condition(ProviderEntry::new("ALWAYS", always))
            .build();
        let (_root, target, _driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [{ "matchers": ["DISABLE"], "when": ["ALWAYS"] }]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        assert!(scope.tree().member(target).unwrap().is_disabled());
    }

    #[test]
    fn test_validate_without_argument_defaults_to_required() {
        let scope = scope();
        let (_root, target, driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": [{
                "matchers": ["VALIDATE"],
                "when": [{ "path": "driver", "value": "strict" }]
            }]
        }))
        .unwrap();
        wire_matchers(&scope, target, &config).unwrap();

        let member = scope.tree().member(target).unwrap();
        assert!(member.valid());

        set(&scope, driver, json!("strict"));
        assert!(!member.valid(), "bare VALIDATE applies required");
        assert_eq!(member.errors(), json!({ "required": true }));

        set(&scope, driver, json!("lenient"));
        assert!(member.valid());
    }

    #[test]
    fn test_unknown_matcher_fails_wiring() {
        let scope = scope();
        let (_root, target, _driver) = build_pair(&scope);

        let config: ControlConfig = serde_json::from_value(json!({
            "control": "INPUT",
            "name": "target",
            "matchers": ["NOT_A_MATCHER"]
        }))
        .unwrap();
        let err = wire_matchers(&scope, target, &config).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::ProviderNotFound { kind: "Matcher", .. }
        ));
    }
}
