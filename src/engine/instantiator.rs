//! Config instantiation and reconciliation.
//!
//! `instantiate` turns a config into a live branch: members built and
//! attached, tree nodes created, matchers wired once the whole subtree
//! exists (a condition may point at a sibling declared later). Every
//! node also gets a reconcile effect watching the mode/context
//! selectors: a params-only difference in the effective config is
//! pushed into the existing instance, anything structural tears the
//! branch down and rebuilds it in place.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use spark_signals::effect;
use tracing::{debug, error};

use crate::config::ControlConfig;
use crate::error::{Error, Result};
use crate::form::{FormGroup, FormMember};
use crate::providers::ResolvedOptions;
use crate::tree::{FormTree, NodeId};
use crate::types::{Cleanup, ControlKind};

use super::matchers::wire_matchers;
use super::scope::FormScope;

// =============================================================================
// Form Handle
// =============================================================================

/// Owner handle for an instantiated branch. Dropping the handle leaves
/// the branch alive; call [`FormHandle::destroy`] to tear it down.
pub struct FormHandle {
    tree: FormTree,
    node: Rc<Cell<Option<NodeId>>>,
    stop: Rc<RefCell<Option<Cleanup>>>,
}

impl FormHandle {
    /// Current node of the branch root. `None` after destruction or
    /// when the last reconfiguration aborted the branch.
    pub fn node(&self) -> Option<NodeId> {
        self.node.get().filter(|node| self.tree.contains(*node))
    }

    /// The branch root's live member.
    pub fn member(&self) -> Option<FormMember> {
        self.tree.member(self.node()?)
    }

    /// Visibility-aware value of the branch.
    pub fn value(&self) -> Option<Value> {
        self.tree.value_of(self.node()?)
    }

    /// Visibility-aware validity of the branch.
    pub fn valid(&self) -> bool {
        match self.node() {
            Some(node) => self.tree.valid_of(node),
            None => true,
        }
    }

    /// Submit pass: every validator re-runs (including `Submit`-timed
    /// controls), then the branch validity is reported.
    pub fn submit(&self) -> bool {
        match self.node() {
            Some(node) => {
                self.tree.validate_subtree(node);
                self.tree.valid_of(node)
            }
            None => true,
        }
    }

    /// Stop reconciliation and destroy the branch. Idempotent.
    pub fn destroy(&self) {
        if let Some(stop) = self.stop.borrow_mut().take() {
            stop();
        }
        if let Some(node) = self.node.take() {
            self.tree.destroy(node);
        }
    }
}

impl fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHandle")
            .field("node", &self.node.get())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Instantiation
// =============================================================================

/// Instantiate a config under `parent` (or as a root branch).
pub fn instantiate(
    scope: &Rc<FormScope>,
    config: &ControlConfig,
    parent: Option<NodeId>,
) -> Result<FormHandle> {
    let mut pending = Vec::new();
    let handle = instantiate_node(scope, config, parent, &mut pending)?;
    if let Err(err) = wire_pending(scope, &pending) {
        handle.destroy();
        return Err(err);
    }
    Ok(handle)
}

/// Build one config's node plus its reconcile effect. Matcher wiring is
/// deferred into `pending` so the caller wires the complete subtree.
fn instantiate_node(
    scope: &Rc<FormScope>,
    config: &ControlConfig,
    parent: Option<NodeId>,
    pending: &mut Vec<(NodeId, ControlConfig)>,
) -> Result<FormHandle> {
    let effective = scope.effective(config);
    let node = build_node(scope, &effective, parent, pending)?;

    let node_cell = Rc::new(Cell::new(Some(node)));
    let current = Rc::new(RefCell::new(effective));
    let stop_cell: Rc<RefCell<Option<Cleanup>>> = Rc::new(RefCell::new(None));

    let tree = scope.tree().clone();
    let weak = Rc::downgrade(scope);
    let base = config.clone();
    let effect_node = node_cell.clone();
    let effect_current = current.clone();
    let stop = effect(move || {
        reconcile(&weak, &base, parent, &effect_node, &effect_current);
    });
    *stop_cell.borrow_mut() = Some(Box::new(stop));

    Ok(FormHandle {
        tree,
        node: node_cell,
        stop: stop_cell,
    })
}

/// One reconcile pass: recompute the effective config (tracking the
/// mode/context signals) and apply the difference.
fn reconcile(
    scope: &Weak<FormScope>,
    base: &ControlConfig,
    parent: Option<NodeId>,
    node_cell: &Rc<Cell<Option<NodeId>>>,
    current: &Rc<RefCell<ControlConfig>>,
) {
    let Some(scope) = scope.upgrade() else {
        return;
    };
    let fresh = scope.effective(base);

    let tree = scope.tree().clone();
    let Some(node) = node_cell.get() else {
        return;
    };
    if !tree.contains(node) {
        // branch torn down externally
        node_cell.set(None);
        return;
    }

    if fresh == *current.borrow() {
        return;
    }

    // params-only difference: push into the live node, keep identity
    let mut fresh_rest = fresh.clone();
    fresh_rest.params = Value::Null;
    let mut current_rest = current.borrow().clone();
    current_rest.params = Value::Null;
    if fresh_rest == current_rest {
        debug!(control = %fresh.control, "pushing params in place");
        tree.set_params(node, fresh.params.clone());
        tree.set_config(node, fresh.clone());
        *current.borrow_mut() = fresh;
        return;
    }

    // structural difference: rebuild the branch in place
    debug!(control = %fresh.control, "structural change, rebuilding branch");
    tree.destroy(node);
    node_cell.set(None);

    let mut pending = Vec::new();
    match build_node(&scope, &fresh, parent, &mut pending) {
        Ok(node) => {
            if let Err(err) = wire_pending(&scope, &pending) {
                tree.destroy(node);
                error!(control = %fresh.control, %err, "rebuild failed, branch aborted");
                return;
            }
            node_cell.set(Some(node));
            *current.borrow_mut() = fresh;
        }
        Err(err) => {
            error!(control = %fresh.control, %err, "rebuild failed, branch aborted");
        }
    }
}

fn wire_pending(scope: &Rc<FormScope>, pending: &[(NodeId, ControlConfig)]) -> Result<()> {
    for (node, config) in pending {
        wire_matchers(scope, *node, config)?;
    }
    Ok(())
}

/// Build the member and node for an effective config, then descend into
/// group-like children. Child branches get their own reconcile effects;
/// their teardown is tied to this node's cleanups.
fn build_node(
    scope: &Rc<FormScope>,
    effective: &ControlConfig,
    parent: Option<NodeId>,
    pending: &mut Vec<(NodeId, ControlConfig)>,
) -> Result<NodeId> {
    let tree = scope.tree();
    let kind = scope.resolve_kind(&effective.control)?;

    if kind == ControlKind::Array && effective.name.is_none() && parent.is_some() {
        return Err(Error::UnnamedArrayChild {
            control: effective.control.clone(),
        });
    }

    let member = match parent {
        Some(parent_node) => {
            let parent_member =
                tree.member(parent_node)
                    .ok_or_else(|| Error::UnsupportedParent {
                        name: effective.name.clone().unwrap_or_default(),
                    })?;
            match &effective.name {
                Some(name) => scope
                    .factory()
                    .register(kind, effective, name, &parent_member)?,
                // unnamed group-likes are structural pass-throughs
                None if kind.is_group_like() => parent_member,
                // unnamed leaves stand alone and contribute no value
                None => scope.factory().build(kind, effective)?,
            }
        }
        None => scope.factory().build(kind, effective)?,
    };

    let node = tree.create_node(parent, kind, effective, member)?;
    pending.push((node, effective.clone()));
    debug!(control = %effective.control, ?node, "node initialized");

    // arrays hold their configs as an item template; only group-likes
    // instantiate children eagerly
    if kind.is_group_like() {
        for child_config in &effective.controls {
            match instantiate_node(scope, child_config, Some(node), pending) {
                Ok(child) => tree.add_cleanup(node, Box::new(move || child.destroy())),
                Err(err) => {
                    // a failing child aborts the whole branch, not just itself
                    tree.destroy(node);
                    return Err(err);
                }
            }
        }
    }

    Ok(node)
}

// =============================================================================
// Array items
// =============================================================================

/// Append an item to an instantiated array node: a group built from the
/// array config's item template, with its subtree parented to the item
/// node. Returns the item node.
pub fn add_array_item(scope: &Rc<FormScope>, array: NodeId) -> Result<NodeId> {
    let tree = scope.tree();
    let config = tree.config(array).ok_or_else(|| Error::BuildFailure {
        control: "<destroyed array>".to_string(),
    })?;
    let array_member = tree
        .member(array)
        .and_then(|member| member.as_array().cloned())
        .ok_or_else(|| Error::UnsupportedParent {
            name: config.name.clone().unwrap_or_default(),
        })?;

    // item nodes stay unnamed: path queries address them by position,
    // so removals never leave stale index names behind
    let item_member = FormMember::Group(FormGroup::new(ResolvedOptions::default()));
    let item_config = ControlConfig::control(config.control.clone(), None);
    let item = tree.create_node(Some(array), ControlKind::Group, &item_config, item_member.clone())?;
    array_member.push(item_member);

    let mut pending = Vec::new();
    let built: Result<()> = (|| {
        for child_config in &config.controls {
            let child = instantiate_node(scope, child_config, Some(item), &mut pending)?;
            tree.add_cleanup(item, Box::new(move || child.destroy()));
        }
        wire_pending(scope, &pending)
    })();
    if let Err(err) = built {
        tree.destroy(item);
        return Err(err);
    }

    debug!(control = %config.control, ?item, "array item added");
    Ok(item)
}

/// Remove the item at `index` from an instantiated array node.
pub fn remove_array_item(scope: &Rc<FormScope>, array: NodeId, index: usize) -> bool {
    let children = scope.tree().children(array);
    match children.get(index) {
        Some(item) => {
            scope.tree().destroy(*item);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::types::Visibility;

    use super::*;

    fn scope() -> Rc<FormScope> {
        FormScope::builder()
            .control_type("FORM", ControlKind::Group)
            .control_type("ROW", ControlKind::Container)
            .control_type("INPUT", ControlKind::Control)
            .control_type("ITEMS", ControlKind::Array)
            .build()
    }

    fn config(value: serde_json::Value) -> ControlConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_instantiate_builds_subtree() {
        let scope = scope();
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "FORM",
                "controls": [
                    { "control": "INPUT", "name": "first" },
                    { "control": "ROW", "controls": [
                        { "control": "INPUT", "name": "nested" }
                    ]}
                ]
            })),
            None,
        )
        .unwrap();

        let root = handle.node().unwrap();
        let tree = scope.tree();
        assert_eq!(tree.children(root).len(), 2);

        // pass-through container: nested registers on the root group
        let group = tree.member(root).unwrap();
        assert!(group.as_group().unwrap().get("first").is_some());
        assert!(group.as_group().unwrap().get("nested").is_some());
        assert_eq!(handle.value(), Some(json!({ "first": null, "nested": null })));
    }

    #[test]
    fn test_matchers_wired_after_whole_subtree() {
        let scope = scope();
        // the matcher on `first` points at a sibling declared later
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "FORM",
                "controls": [
                    {
                        "control": "INPUT",
                        "name": "first",
                        "matchers": [["HIDE", { "path": "second", "value": "hide-it" }]]
                    },
                    { "control": "INPUT", "name": "second" }
                ]
            })),
            None,
        )
        .unwrap();

        let tree = scope.tree();
        let root = handle.node().unwrap();
        let first = tree.query(root, "first").unwrap();
        let second = tree.query(root, "second").unwrap();
        assert_eq!(tree.visibility(first), Some(Visibility::Visible));

        tree.member(second).unwrap().set_value(json!("hide-it"));
        assert_eq!(tree.visibility(first), Some(Visibility::Hidden));
    }

    #[test]
    fn test_mode_params_push_keeps_identity() {
        let scope = scope();
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "INPUT",
                "name": "email",
                "params": { "label": "Email" },
                "modes": { "display": { "params": { "readonly": true } } }
            })),
            None,
        )
        .unwrap();

        let node = handle.node().unwrap();
        let member = handle.member().unwrap();

        scope.set_mode(Some("display"));
        assert_eq!(handle.node(), Some(node), "params push keeps the node");
        assert!(handle.member().unwrap().ptr_eq(&member));
        let params = scope.tree().params(node).unwrap();
        assert_eq!(params["readonly"], json!(true));
        assert_eq!(params["label"], json!("Email"));

        scope.set_mode(None::<String>);
        assert_eq!(handle.node(), Some(node));
        assert!(scope.tree().params(node).unwrap().get("readonly").is_none());
    }

    #[test]
    fn test_mode_structural_change_rebuilds() {
        let scope = scope();
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "INPUT",
                "name": "email",
                "factory": "editable",
                "modes": { "display": { "factory": "readonly" } }
            })),
            None,
        )
        .unwrap();

        let node = handle.node().unwrap();
        let member = handle.member().unwrap();

        scope.set_mode(Some("display"));
        let rebuilt = handle.node().unwrap();
        assert_ne!(rebuilt, node, "factory change forces a rebuild");
        assert!(!handle.member().unwrap().ptr_eq(&member));
        assert_eq!(
            scope.tree().config(rebuilt).unwrap().factory,
            json!("readonly")
        );
    }

    #[test]
    fn test_rebuild_preserves_sibling_values_in_parent() {
        let scope = scope();
        let root = instantiate(&scope, &config(json!({ "control": "FORM" })), None).unwrap();
        let root_node = root.node().unwrap();

        let stable = instantiate(
            &scope,
            &config(json!({ "control": "INPUT", "name": "stable" })),
            Some(root_node),
        )
        .unwrap();
        let switching = instantiate(
            &scope,
            &config(json!({
                "control": "INPUT",
                "name": "switching",
                "modes": { "display": { "factory": "readonly" } }
            })),
            Some(root_node),
        )
        .unwrap();

        stable.member().unwrap().set_value(json!("kept"));
        scope.set_mode(Some("display"));

        // only the switching branch was rebuilt
        assert_eq!(stable.member().unwrap().value(), json!("kept"));
        assert!(switching.node().is_some());
        assert_eq!(
            root.value(),
            Some(json!({ "stable": "kept", "switching": null }))
        );
    }

    #[test]
    fn test_handle_destroy_is_idempotent() {
        let scope = scope();
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "FORM",
                "controls": [{ "control": "INPUT", "name": "field" }]
            })),
            None,
        )
        .unwrap();

        let node = handle.node().unwrap();
        handle.destroy();
        assert!(handle.node().is_none());
        assert!(!scope.tree().contains(node));
        handle.destroy();
    }

    #[test]
    fn test_unknown_control_type_aborts_branch() {
        let scope = scope();
        let err = instantiate(&scope, &config(json!({ "control": "MYSTERY" })), None)
            .unwrap_err();
        assert!(matches!(err, Error::BuildFailure { .. }));
    }

    #[test]
    fn test_unnamed_array_child_rejected() {
        let scope = scope();
        let err = instantiate(
            &scope,
            &config(json!({
                "control": "FORM",
                "controls": [{ "control": "ITEMS" }]
            })),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnnamedArrayChild { .. }));
    }

    #[test]
    fn test_array_items_lifecycle() {
        let scope = scope();
        let handle = instantiate(
            &scope,
            &config(json!({
                "control": "FORM",
                "controls": [{
                    "control": "ITEMS",
                    "name": "phones",
                    "controls": [
                        { "control": "INPUT", "name": "number" },
                        { "control": "INPUT", "name": "kind" }
                    ]
                }]
            })),
            None,
        )
        .unwrap();

        let tree = scope.tree();
        let root = handle.node().unwrap();
        let phones = tree.query(root, "phones").unwrap();

        let first = add_array_item(&scope, phones).unwrap();
        add_array_item(&scope, phones).unwrap();

        // item subtrees parent to the item node, paths go through it
        let number = tree.query(root, "phones.0.number").unwrap();
        assert_eq!(tree.parent(number), Some(first));
        tree.member(number).unwrap().set_value(json!("555-0100"));

        assert_eq!(
            handle.value(),
            Some(json!({ "phones": [
                { "number": "555-0100", "kind": null },
                { "number": null, "kind": null }
            ]}))
        );

        assert!(remove_array_item(&scope, phones, 1));
        assert!(!remove_array_item(&scope, phones, 5));
        assert_eq!(
            handle.value(),
            Some(json!({ "phones": [{ "number": "555-0100", "kind": null }] }))
        );
        assert_eq!(
            tree.member(phones).unwrap().as_array().unwrap().len(),
            1
        );
    }
}
