//! Ordered homogeneous aggregate.
//!
//! A `FormArray` holds an ordered list of item members built from the
//! array config's item template. Its collective value is a JSON list.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use spark_signals::{Signal, signal};

use crate::providers::{ResolvedOptions, ValidationErrors, ValidatorFn};

use super::FormMember;

/// An array instance: ordered items plus array-level validation state.
pub struct FormArray {
    items: RefCell<Vec<FormMember>>,
    disabled: Signal<bool>,
    errors: Signal<Value>,
    validators: RefCell<Option<Vec<ValidatorFn>>>,
}

impl FormArray {
    /// Build an empty array with the resolved validator options.
    pub fn new(options: ResolvedOptions) -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(Vec::new()),
            disabled: signal(false),
            errors: signal(Value::Null),
            validators: RefCell::new(options.validators),
        })
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Append an item member.
    pub fn push(&self, member: FormMember) {
        self.items.borrow_mut().push(member);
        self.validate_if_needed();
    }

    /// Item by index.
    pub fn at(&self, index: usize) -> Option<FormMember> {
        self.items.borrow().get(index).cloned()
    }

    /// Remove the item at an index, returning it.
    pub fn remove_at(&self, index: usize) -> Option<FormMember> {
        let mut items = self.items.borrow_mut();
        if index >= items.len() {
            return None;
        }
        let removed = items.remove(index);
        drop(items);
        self.validate_if_needed();
        Some(removed)
    }

    /// Detach a specific item instance (identity match).
    pub fn remove_item(&self, member: &FormMember) -> bool {
        let mut items = self.items.borrow_mut();
        let before = items.len();
        items.retain(|existing| !existing.ptr_eq(member));
        let removed = items.len() != before;
        drop(items);
        if removed {
            self.validate_if_needed();
        }
        removed
    }

    /// Index of a specific item instance.
    pub fn index_of(&self, member: &FormMember) -> Option<usize> {
        self.items
            .borrow()
            .iter()
            .position(|existing| existing.ptr_eq(member))
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether the array has no items.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    // =========================================================================
    // Value
    // =========================================================================

    /// Collected list value of every item (reactive read).
    pub fn value(&self) -> Value {
        let items = self.items.borrow().clone();
        Value::Array(items.iter().map(FormMember::value).collect())
    }

    /// Patch items by index from a list value. Extra entries are
    /// ignored; items beyond the list keep their value. Non-lists are
    /// ignored entirely.
    pub fn patch_value(&self, value: &Value) {
        let Value::Array(list) = value else {
            return;
        };
        let items = self.items.borrow().clone();
        for (item, item_value) in items.iter().zip(list) {
            item.set_value(item_value.clone());
        }
        self.validate_if_needed();
    }

    // =========================================================================
    // Enablement
    // =========================================================================

    /// Disable the array and every item.
    pub fn disable(&self) {
        self.disabled.set(true);
        let items = self.items.borrow().clone();
        for item in items {
            item.disable();
        }
    }

    /// Re-enable the array and every item.
    pub fn enable(&self) {
        self.disabled.set(false);
        let items = self.items.borrow().clone();
        for item in items {
            item.enable();
        }
    }

    /// Whether the array itself is disabled (reactive read).
    pub fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Run the array's own validators against the collected value.
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

    /// Array-level errors (`Null` when clear; reactive read).
    pub fn errors(&self) -> Value {
        self.errors.get()
    }

    /// Overwrite array-level errors with a synthetic error object.
    pub fn set_errors(&self, errors: ValidationErrors) {
        self.errors.set(if errors.is_empty() {
            Value::Null
        } else {
            Value::Object(errors)
        });
    }

    /// Validity of the array and all items. Disabled arrays are exempt.
    pub fn valid(&self) -> bool {
        if self.disabled.get() {
            return true;
        }
        if !self.errors.get().is_null() {
            return false;
        }
        let items = self.items.borrow().clone();
        items.iter().all(FormMember::valid)
    }

    /// Validity of array-level errors alone, ignoring items.
    pub fn own_valid(&self) -> bool {
        self.disabled.get() || self.errors.get().is_null()
    }

    fn validate_if_needed(&self) {
        if self.validators.borrow().is_some() {
            self.validate();
        }
    }
}
