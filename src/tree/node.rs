//! Node arena.
//!
//! The structural tree lives in a slab of nodes addressed by `NodeId`.
//! Nodes own the structural position of a control: parent/children
//! links, the dotted path, per-node visibility and params signals, the
//! config the node was built from, and the cleanups to run on destroy.
//! The live control instance itself is `Rc`-shared with the form
//! structure, so pass-through nodes can point at their parent's member.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::{Signal, signal};
use tracing::trace;

use crate::config::ControlConfig;
use crate::error::{Error, Result};
use crate::form::FormMember;
use crate::types::{Cleanup, ControlKind, Visibility};

// =============================================================================
// Node Id
// =============================================================================

/// Stable handle to a tree node.
///
/// Slot storage is recycled, so the id carries a generation: an id held
/// across its node's destruction never resolves to the slot's next
/// occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    slot: usize,
    generation: u32,
}

// =============================================================================
// Node Data
// =============================================================================

pub(super) struct NodeData {
    pub(super) kind: ControlKind,
    pub(super) name: Option<String>,
    pub(super) control_type: String,
    pub(super) path: Vec<String>,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) member: FormMember,
    pub(super) visibility: Signal<Visibility>,
    pub(super) params: Signal<Value>,
    pub(super) config: ControlConfig,
    pub(super) hooks: HashMap<String, Vec<(usize, Rc<dyn Fn(&Value)>)>>,
    pub(super) next_hook: usize,
    pub(super) cleanups: Vec<Cleanup>,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Default)]
pub(super) struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Arena {
    pub(super) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.slot)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    pub(super) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.slot)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.data = Some(data);
                NodeId {
                    slot: index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    slot: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn take(&mut self, id: NodeId) -> Option<NodeData> {
        let slot = self
            .slots
            .get_mut(id.slot)
            .filter(|slot| slot.generation == id.generation)?;
        let data = slot.data.take()?;
        // invalidate every outstanding copy of this id before the slot
        // is handed out again
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        Some(data)
    }
}

// =============================================================================
// Form Tree
// =============================================================================

/// Shared handle to the node arena.
#[derive(Clone, Default)]
pub struct FormTree {
    pub(super) inner: Rc<RefCell<Arena>>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node for a built member under `parent`. Named nodes
    /// extend the parent path; unnamed nodes inherit it. A named node
    /// whose name collides with a direct sibling is rejected.
    pub fn create_node(
        &self,
        parent: Option<NodeId>,
        kind: ControlKind,
        config: &ControlConfig,
        member: FormMember,
    ) -> Result<NodeId> {
        let mut arena = self.inner.borrow_mut();

        let parent_path = match parent {
            Some(parent) => match arena.get(parent) {
                Some(node) => node.path.clone(),
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        if let (Some(name), Some(parent)) = (config.name.as_deref(), parent) {
            let collision = arena
                .get(parent)
                .map(|node| {
                    node.children.iter().any(|child| {
                        arena
                            .get(*child)
                            .and_then(|child| child.name.as_deref())
                            == Some(name)
                    })
                })
                .unwrap_or(false);
            if collision {
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    parent: if parent_path.is_empty() {
                        "<root>".to_string()
                    } else {
                        parent_path.join(".")
                    },
                });
            }
        }

        let mut path = parent_path;
        if let Some(name) = &config.name {
            path.push(name.clone());
        }

        let id = arena.insert(NodeData {
            kind,
            name: config.name.clone(),
            control_type: config.control.clone(),
            path,
            parent,
            children: Vec::new(),
            member,
            visibility: signal(Visibility::Visible),
            params: signal(config.params.clone()),
            config: config.clone(),
            hooks: HashMap::new(),
            next_hook: 0,
            cleanups: Vec::new(),
        });

        if let Some(parent) = parent
            && let Some(parent_node) = arena.get_mut(parent)
        {
            parent_node.children.push(id);
        }

        trace!(?id, control = %config.control, "node created");
        Ok(id)
    }

    /// Destroy a node and its whole subtree: children first, then the
    /// node's cleanups, then detachment of its member from the parent
    /// instance. Safe to call on an already-destroyed id.
    pub fn destroy(&self, id: NodeId) {
        let parent_member = self.parent(id).and_then(|parent| self.member(parent));
        self.destroy_with(id, parent_member.as_ref());
    }

    // the parent member is threaded down because the parent node may
    // already be out of the arena while its subtree unwinds
    fn destroy_with(&self, id: NodeId, parent_member: Option<&FormMember>) {
        let Some(mut node) = ({
            let mut arena = self.inner.borrow_mut();
            let node = arena.take(id);
            if let Some(node) = &node
                && let Some(parent) = node.parent
                && let Some(parent_node) = arena.get_mut(parent)
            {
                parent_node.children.retain(|child| *child != id);
            }
            node
        }) else {
            return;
        };

        for child in node.children.clone() {
            self.destroy_with(child, Some(&node.member));
        }

        for cleanup in node.cleanups.drain(..) {
            cleanup();
        }

        if let Some(parent_member) = parent_member
            && !parent_member.ptr_eq(&node.member)
        {
            match parent_member {
                FormMember::Group(group) => {
                    if let Some(name) = &node.name {
                        group.remove_control(name, &node.member);
                    }
                }
                FormMember::Array(array) => {
                    array.remove_item(&node.member);
                }
                FormMember::Control(_) => {}
            }
        }

        trace!(?id, control = %node.control_type, "node destroyed");
    }

    /// Whether the node still exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.borrow().get(id).is_some()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self, id: NodeId) -> Option<ControlKind> {
        self.with(id, |node| node.kind)
    }

    pub fn name(&self, id: NodeId) -> Option<String> {
        self.with(id, |node| node.name.clone()).flatten()
    }

    pub fn control_type(&self, id: NodeId) -> Option<String> {
        self.with(id, |node| node.control_type.clone())
    }

    /// Dotted-path segments from the root to this node.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        self.with(id, |node| node.path.clone()).unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.with(id, |node| node.parent).flatten()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.with(id, |node| node.children.clone())
            .unwrap_or_default()
    }

    /// The live control instance at this node.
    pub fn member(&self, id: NodeId) -> Option<FormMember> {
        self.with(id, |node| node.member.clone())
    }

    /// The config the node was built from (the effective config at the
    /// time of the last build or params push).
    pub fn config(&self, id: NodeId) -> Option<ControlConfig> {
        self.with(id, |node| node.config.clone())
    }

    pub(crate) fn set_config(&self, id: NodeId, config: ControlConfig) {
        let mut arena = self.inner.borrow_mut();
        if let Some(node) = arena.get_mut(id) {
            node.config = config;
        }
    }

    /// Current visibility (reactive read).
    pub fn visibility(&self, id: NodeId) -> Option<Visibility> {
        self.with(id, |node| node.visibility.clone())
            .map(|visibility| visibility.get())
    }

    pub fn set_visibility(&self, id: NodeId, visibility: Visibility) {
        if let Some(current) = self.with(id, |node| node.visibility.clone()) {
            current.set(visibility);
        }
    }

    /// Current presentation params (reactive read).
    pub fn params(&self, id: NodeId) -> Option<Value> {
        self.with(id, |node| node.params.clone())
            .map(|params| params.get())
    }

    pub fn set_params(&self, id: NodeId, params: Value) {
        if let Some(current) = self.with(id, |node| node.params.clone()) {
            current.set(params);
        }
    }

    /// The params signal itself, for bindings.
    pub fn params_signal(&self, id: NodeId) -> Option<Signal<Value>> {
        self.with(id, |node| node.params.clone())
    }

    /// Register a teardown to run when the node is destroyed.
    pub fn add_cleanup(&self, id: NodeId, cleanup: Cleanup) {
        let mut arena = self.inner.borrow_mut();
        if let Some(node) = arena.get_mut(id) {
            node.cleanups.push(cleanup);
        }
    }

    // =========================================================================
    // Path queries
    // =========================================================================

    /// Resolve a dotted path relative to `from`, climbing ancestor
    /// scopes until one resolves. Numeric segments address array items.
    pub fn query(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Some(from);
        }

        let mut scope = Some(from);
        while let Some(node) = scope {
            if let Some(found) = self.resolve_segments(node, &segments) {
                return Some(found);
            }
            scope = self.parent(node);
        }
        None
    }

    fn resolve_segments(&self, from: NodeId, segments: &[&str]) -> Option<NodeId> {
        let mut current = from;
        for segment in segments {
            current = self.named_child(current, segment)?;
        }
        Some(current)
    }

    // searches through unnamed structural nodes, which are transparent
    // for pathing; numeric segments on arrays address items by position
    fn named_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        if self.kind(id) == Some(ControlKind::Array)
            && let Ok(index) = name.parse::<usize>()
        {
            return self.children(id).get(index).copied();
        }
        for child in self.children(id) {
            match self.name(child) {
                Some(child_name) if child_name == name => return Some(child),
                Some(_) => {}
                None => {
                    if let Some(found) = self.named_child(child, name) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    // =========================================================================
    // Visibility-aware collection
    // =========================================================================

    /// Value of the subtree at `id`, excluding `Invisible` branches.
    /// `Hidden` branches still contribute. Returns `None` when the node
    /// is gone or invisible.
    pub fn value_of(&self, id: NodeId) -> Option<Value> {
        if self.visibility(id)? == Visibility::Invisible {
            return None;
        }

        match self.kind(id)? {
            ControlKind::Control => self.member(id).map(|member| member.value()),
            ControlKind::Array => {
                let mut list = Vec::new();
                for child in self.children(id) {
                    if let Some(value) = self.value_of(child) {
                        list.push(value);
                    }
                }
                Some(Value::Array(list))
            }
            ControlKind::Group | ControlKind::Container => {
                let mut object = Map::new();
                self.collect_object(id, &mut object);
                Some(Value::Object(object))
            }
        }
    }

    fn collect_object(&self, id: NodeId, object: &mut Map<String, Value>) {
        for child in self.children(id) {
            if self.visibility(child) == Some(Visibility::Invisible) {
                continue;
            }
            match self.name(child) {
                Some(name) => {
                    if let Some(value) = self.value_of(child) {
                        object.insert(name, value);
                    }
                }
                // unnamed structural children merge into this object;
                // unnamed leaf controls contribute nothing
                None => {
                    if self.kind(child).is_some_and(ControlKind::is_group_like) {
                        self.collect_object(child, object);
                    }
                }
            }
        }
    }

    /// Validity of the subtree at `id`. `Invisible` branches and
    /// disabled members are exempt.
    pub fn valid_of(&self, id: NodeId) -> bool {
        match self.visibility(id) {
            None | Some(Visibility::Invisible) => return true,
            Some(_) => {}
        }

        let Some(member) = self.member(id) else {
            return true;
        };

        match self.kind(id) {
            Some(ControlKind::Control) => member.valid(),
            _ => {
                if member.is_disabled() {
                    return true;
                }
                member.own_valid()
                    && self
                        .children(id)
                        .iter()
                        .all(|child| self.valid_of(*child))
            }
        }
    }

    /// Re-run every member's validators in the subtree, regardless of
    /// update timing (a submit pass).
    pub fn validate_subtree(&self, id: NodeId) {
        let Some(member) = self.member(id) else {
            return;
        };
        for child in self.children(id) {
            self.validate_subtree(child);
        }
        member.refresh_validity();
    }

    // =========================================================================
    // Internal
    // =========================================================================

    pub(super) fn with<R>(&self, id: NodeId, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let arena = self.inner.borrow();
        arena.get(id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::form::{FormControl, FormGroup};
    use crate::providers::ResolvedOptions;

    use super::*;

    fn group_member() -> FormMember {
        FormMember::Group(FormGroup::new(ResolvedOptions::default()))
    }

    fn control_member() -> FormMember {
        FormMember::Control(FormControl::new(ResolvedOptions::default()))
    }

    fn attach_control(tree: &FormTree, parent: NodeId, name: &str) -> NodeId {
        let config = ControlConfig::control("INPUT", Some(name));
        let member = control_member();
        if let Some(group) = tree.member(parent).unwrap().as_group() {
            group.add_control(name, member.clone());
        }
        tree.create_node(Some(parent), ControlKind::Control, &config, member)
            .unwrap()
    }

    fn root(tree: &FormTree) -> NodeId {
        let config = ControlConfig::control("FORM", None);
        tree.create_node(None, ControlKind::Group, &config, group_member())
            .unwrap()
    }

    #[test]
    fn test_paths_and_links() {
        let tree = FormTree::new();
        let root = root(&tree);

        let address_config = ControlConfig::control("GROUP", Some("address"));
        let address_member = group_member();
        tree.member(root)
            .unwrap()
            .as_group()
            .unwrap()
            .add_control("address", address_member.clone());
        let address = tree
            .create_node(Some(root), ControlKind::Group, &address_config, address_member)
            .unwrap();
        let street = attach_control(&tree, address, "street");

        assert!(tree.path(root).is_empty());
        assert_eq!(tree.path(street), vec!["address", "street"]);
        assert_eq!(tree.parent(street), Some(address));
        assert_eq!(tree.children(root), vec![address]);
    }

    #[test]
    fn test_duplicate_sibling_name_rejected() {
        let tree = FormTree::new();
        let root = root(&tree);
        attach_control(&tree, root, "email");

        let config = ControlConfig::control("INPUT", Some("email"));
        let err = tree
            .create_node(Some(root), ControlKind::Control, &config, control_member())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
    }

    #[test]
    fn test_destroy_detaches_member_and_tolerates_repeat() {
        let tree = FormTree::new();
        let root = root(&tree);
        let email = attach_control(&tree, root, "email");

        let group = tree.member(root).unwrap();
        assert!(group.as_group().unwrap().get("email").is_some());

        tree.destroy(email);
        assert!(!tree.contains(email));
        assert!(group.as_group().unwrap().get("email").is_none());
        assert!(tree.children(root).is_empty());

        // second destroy is a no-op
        tree.destroy(email);
    }

    #[test]
    fn test_destroy_runs_cleanups_bottom_up() {
        use std::cell::RefCell;

        let tree = FormTree::new();
        let root = root(&tree);
        let child = attach_control(&tree, root, "field");

        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let root_order = order.clone();
        let child_order = order.clone();
        tree.add_cleanup(root, Box::new(move || root_order.borrow_mut().push("root")));
        tree.add_cleanup(child, Box::new(move || child_order.borrow_mut().push("child")));

        tree.destroy(root);
        assert_eq!(*order.borrow(), vec!["child", "root"]);
    }

    #[test]
    fn test_destroyed_id_does_not_alias_replacement() {
        let tree = FormTree::new();
        let root = root(&tree);
        let old = attach_control(&tree, root, "email");
        tree.destroy(old);

        // the replacement reuses the storage slot under a fresh id
        let replacement = attach_control(&tree, root, "email");
        assert_ne!(old, replacement);
        assert!(!tree.contains(old));
        assert!(tree.contains(replacement));
        assert!(tree.name(old).is_none());
        assert_eq!(tree.name(replacement).as_deref(), Some("email"));
    }

    #[test]
    fn test_query_climbs_scopes() {
        let tree = FormTree::new();
        let root = root(&tree);

        let address_config = ControlConfig::control("GROUP", Some("address"));
        let address_member = group_member();
        tree.member(root)
            .unwrap()
            .as_group()
            .unwrap()
            .add_control("address", address_member.clone());
        let address = tree
            .create_node(Some(root), ControlKind::Group, &address_config, address_member)
            .unwrap();
        let street = attach_control(&tree, address, "street");
        let country = attach_control(&tree, root, "country");

        // sibling within the same scope
        assert_eq!(tree.query(street, "street"), Some(street));
        // climbs to the root scope
        assert_eq!(tree.query(street, "country"), Some(country));
        // dotted path from the root scope
        assert_eq!(tree.query(country, "address.street"), Some(street));
        // unknown never errors
        assert_eq!(tree.query(street, "missing.path"), None);
    }

    #[test]
    fn test_query_through_unnamed_structural_nodes() {
        let tree = FormTree::new();
        let root = root(&tree);

        // unnamed container sharing the root group (pass-through)
        let row_config = ControlConfig::control("ROW", None);
        let row = tree
            .create_node(
                Some(root),
                ControlKind::Container,
                &row_config,
                tree.member(root).unwrap(),
            )
            .unwrap();
        let inner = attach_control(&tree, row, "inner");

        assert_eq!(tree.query(root, "inner"), Some(inner));
        assert_eq!(tree.path(inner), vec!["inner"]);

        // destroying the pass-through detaches its registered children
        // but leaves the shared group instance alone
        tree.destroy(row);
        let group = tree.member(root).unwrap();
        assert!(group.as_group().unwrap().get("inner").is_none());
        assert!(tree.contains(root));
    }

    #[test]
    fn test_value_of_respects_visibility() {
        let tree = FormTree::new();
        let root = root(&tree);
        let name = attach_control(&tree, root, "name");
        let secret = attach_control(&tree, root, "secret");

        tree.member(name).unwrap().set_value(json!("ada"));
        tree.member(secret).unwrap().set_value(json!("hunter2"));

        assert_eq!(
            tree.value_of(root),
            Some(json!({ "name": "ada", "secret": "hunter2" }))
        );

        // hidden stays in the value, invisible drops out
        tree.set_visibility(secret, Visibility::Hidden);
        assert_eq!(
            tree.value_of(root),
            Some(json!({ "name": "ada", "secret": "hunter2" }))
        );

        tree.set_visibility(secret, Visibility::Invisible);
        assert_eq!(tree.value_of(root), Some(json!({ "name": "ada" })));
    }

    #[test]
    fn test_valid_of_exempts_invisible_branches() {
        let tree = FormTree::new();
        let root = root(&tree);

        let config = ControlConfig::control("INPUT", Some("code"));
        let member = FormMember::Control(FormControl::new(ResolvedOptions {
            validators: Some(vec![Rc::new(|value: &Value| {
                if value.is_null() {
                    let mut errors = crate::providers::ValidationErrors::new();
                    errors.insert("required".into(), json!(true));
                    Some(errors)
                } else {
                    None
                }
            })]),
            ..Default::default()
        }));
        tree.member(root)
            .unwrap()
            .as_group()
            .unwrap()
            .add_control("code", member.clone());
        let code = tree
            .create_node(Some(root), ControlKind::Control, &config, member.clone())
            .unwrap();
        member.refresh_validity();

        assert!(!tree.valid_of(root));

        tree.set_visibility(code, Visibility::Invisible);
        assert!(tree.valid_of(root));
    }
}
