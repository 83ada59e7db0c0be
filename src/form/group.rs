//! Named-field aggregate.
//!
//! A `FormGroup` backs both Group and Container configs: an ordered set
//! of named child members whose collective value is a JSON object.
//! Groups may carry their own validators, which run against the
//! collected object value.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::{Signal, signal};

use crate::providers::{ResolvedOptions, ValidationErrors, ValidatorFn};

use super::FormMember;

/// A group instance: named children plus group-level validation state.
pub struct FormGroup {
    children: RefCell<Vec<(String, FormMember)>>,
    disabled: Signal<bool>,
    errors: Signal<Value>,
    validators: RefCell<Option<Vec<ValidatorFn>>>,
}

impl FormGroup {
    /// Build an empty group with the resolved validator options.
    pub fn new(options: ResolvedOptions) -> Rc<Self> {
        Rc::new(Self {
            children: RefCell::new(Vec::new()),
            disabled: signal(false),
            errors: signal(Value::Null),
            validators: RefCell::new(options.validators),
        })
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Child member by name.
    pub fn get(&self, name: &str) -> Option<FormMember> {
        self.children
            .borrow()
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, member)| member.clone())
    }

    /// Whether a child with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.children
            .borrow()
            .iter()
            .any(|(child, _)| child == name)
    }

    /// Attach a named child. Returns `false` when the name is taken,
    /// leaving the existing child in place.
    pub fn add_control(&self, name: &str, member: FormMember) -> bool {
        if self.contains(name) {
            return false;
        }
        self.children
            .borrow_mut()
            .push((name.to_string(), member));
        true
    }

    /// Detach a named child, but only when it is the given instance.
    /// A rebuilt sibling that reused the name must not be torn off by
    /// the old instance's cleanup.
    pub fn remove_control(&self, name: &str, member: &FormMember) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|(child, existing)| child != name || !existing.ptr_eq(member));
        children.len() != before
    }

    /// Child names in attachment order.
    pub fn names(&self) -> Vec<String> {
        self.children
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of named children.
    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    /// Whether the group has no children.
    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    // =========================================================================
    // Value
    // =========================================================================

    /// Collected object value of every child (reactive read).
    pub fn value(&self) -> Value {
        let children = self.children.borrow().clone();
        let mut object = Map::new();
        for (name, member) in children {
            object.insert(name, member.value());
        }
        Value::Object(object)
    }

    /// Patch named children from an object value. Keys without a
    /// matching child are ignored; children without a key keep their
    /// value. Non-object values are ignored entirely.
    pub fn patch_value(&self, value: &Value) {
        let Value::Object(object) = value else {
            return;
        };
        let children = self.children.borrow().clone();
        for (name, member) in children {
            if let Some(child_value) = object.get(&name) {
                member.set_value(child_value.clone());
            }
        }
        self.validate_if_needed();
    }

    // =========================================================================
    // Enablement
    // =========================================================================

    /// Disable the group and every descendant.
    pub fn disable(&self) {
        self.disabled.set(true);
        let children = self.children.borrow().clone();
        for (_, member) in children {
            member.disable();
        }
    }

    /// Re-enable the group and every descendant.
    pub fn enable(&self) {
        self.disabled.set(false);
        let children = self.children.borrow().clone();
        for (_, member) in children {
            member.enable();
        }
    }

    /// Whether the group itself is disabled (reactive read).
    pub fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Run the group's own validators against the collected value.
    pub fn validate(&self) {
        let Some(validators) = self.validators.borrow().as_ref().cloned() else {
            self.errors.set(Value::Null);
            return;
        };

        let value = self.value();
        let mut merged = ValidationErrors::new();
        for validator in &validators {
            if let Some(errors) = validator(&value) {
                merged.extend(errors);
            }
        }
        self.errors.set(if merged.is_empty() {
            Value::Null
        } else {
            Value::Object(merged)
        });
    }

    /// Group-level errors (`Null` when clear; reactive read).
    pub fn errors(&self) -> Value {
        self.errors.get()
    }

    /// Overwrite group-level errors with a synthetic error object.
    pub fn set_errors(&self, errors: ValidationErrors) {
        self.errors.set(if errors.is_empty() {
            Value::Null
        } else {
            Value::Object(errors)
        });
    }

    /// Validity of the group and all descendants. Disabled groups are
    /// exempt wholesale.
    pub fn valid(&self) -> bool {
        if self.disabled.get() {
            return true;
        }
        if !self.errors.get().is_null() {
            return false;
        }
        let children = self.children.borrow().clone();
        children.iter().all(|(_, member)| member.valid())
    }

    /// Validity of group-level errors alone, ignoring children.
    pub fn own_valid(&self) -> bool {
        self.disabled.get() || self.errors.get().is_null()
    }

    fn validate_if_needed(&self) {
        if self.validators.borrow().is_some() {
            self.validate();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::form::FormControl;

    use super::*;

    fn control() -> FormMember {
        FormMember::Control(FormControl::new(ResolvedOptions::default()))
    }

    #[test]
    fn test_add_and_get_children() {
        let group = FormGroup::new(ResolvedOptions::default());
        assert!(group.add_control("first", control()));
        assert!(group.add_control("last", control()));
        assert!(
            !group.add_control("first", control()),
            "duplicate names must be rejected"
        );

        assert!(group.get("first").is_some());
        assert!(group.get("missing").is_none());
        assert_eq!(group.names(), vec!["first", "last"]);
    }

    #[test]
    fn test_value_collects_object() {
        let group = FormGroup::new(ResolvedOptions::default());
        group.add_control("name", control());
        group.add_control("age", control());

        group.get("name").unwrap().set_value(json!("ada"));
        group.get("age").unwrap().set_value(json!(36));

        assert_eq!(group.value(), json!({ "name": "ada", "age": 36 }));
    }

    #[test]
    fn test_patch_value_partial() {
        let group = FormGroup::new(ResolvedOptions::default());
        group.add_control("name", control());
        group.add_control("age", control());
        group.get("age").unwrap().set_value(json!(36));

        group.patch_value(&json!({ "name": "ada" }));
        assert_eq!(group.value(), json!({ "name": "ada", "age": 36 }));

        // non-objects are ignored
        group.patch_value(&json!("nope"));
        assert_eq!(group.value(), json!({ "name": "ada", "age": 36 }));
    }

    #[test]
    fn test_remove_control_requires_identity() {
        let group = FormGroup::new(ResolvedOptions::default());
        let original = control();
        group.add_control("field", original.clone());

        let imposter = control();
        assert!(!group.remove_control("field", &imposter));
        assert!(group.get("field").is_some());

        assert!(group.remove_control("field", &original));
        assert!(group.get("field").is_none());
    }

    #[test]
    fn test_disable_recurses_and_exempts_validity() {
        let group = FormGroup::new(ResolvedOptions::default());
        let child = FormControl::new(ResolvedOptions::default());
        group.add_control("field", FormMember::Control(child.clone()));

        group.disable();
        assert!(child.is_disabled());
        assert!(group.valid());

        group.enable();
        assert!(!child.is_disabled());
    }

    #[test]
    fn test_group_level_validator() {
        let both_required: ValidatorFn = Rc::new(|value: &Value| {
            let filled = value
                .get("a")
                .is_some_and(|a| !a.is_null())
                && value.get("b").is_some_and(|b| !b.is_null());
            if filled {
                None
            } else {
                let mut errors = ValidationErrors::new();
                errors.insert("bothRequired".into(), json!(true));
                Some(errors)
            }
        });

        let group = FormGroup::new(ResolvedOptions {
            validators: Some(vec![both_required]),
            ..Default::default()
        });
        group.add_control("a", control());
        group.add_control("b", control());

        group.validate();
        assert!(!group.valid());

        group.patch_value(&json!({ "a": 1, "b": 2 }));
        assert!(group.valid());
    }
}
