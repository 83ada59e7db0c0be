//! Leaf value holder.
//!
//! A `FormControl` owns a value signal, a disabled signal and an errors
//! signal, plus the validators resolved from its config. Reading any of
//! these inside an effect creates the dependency that drives conditions
//! and consumers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use spark_signals::{Signal, signal};

use crate::providers::{AsyncValidatorFn, ResolvedOptions, ValidationErrors, ValidatorFn};
use crate::types::{ControlFlags, UpdateTiming};

/// A leaf control instance.
pub struct FormControl {
    value: Signal<Value>,
    disabled: Signal<bool>,
    errors: Signal<Value>,
    flags: Cell<ControlFlags>,
    update_on: UpdateTiming,
    validators: RefCell<Option<Vec<ValidatorFn>>>,
    async_validators: RefCell<Option<Vec<AsyncValidatorFn>>>,
    pending_runs: Rc<Cell<usize>>,
}

impl FormControl {
    /// Build a control with the resolved validator options.
    pub fn new(options: ResolvedOptions) -> Rc<Self> {
        Rc::new(Self {
            value: signal(Value::Null),
            disabled: signal(false),
            errors: signal(Value::Null),
            flags: Cell::new(ControlFlags::empty()),
            update_on: options.update_on,
            validators: RefCell::new(options.validators),
            async_validators: RefCell::new(options.async_validators),
            pending_runs: Rc::new(Cell::new(0)),
        })
    }

    // =========================================================================
    // Value
    // =========================================================================

    /// Current value (reactive read).
    pub fn value(&self) -> Value {
        self.value.get()
    }

    /// The value signal, for deriveds and bindings.
    pub fn value_signal(&self) -> Signal<Value> {
        self.value.clone()
    }

    /// Set the value, mark the control dirty, and re-validate when the
    /// update timing is `Change`.
    pub fn set_value(self: &Rc<Self>, value: Value) {
        self.set_flag(ControlFlags::DIRTY, true);
        self.value.set(value);
        if self.update_on == UpdateTiming::Change {
            self.validate();
        }
    }

    /// Mark the control touched (blur); validates under `Blur` timing.
    pub fn mark_touched(self: &Rc<Self>) {
        self.set_flag(ControlFlags::TOUCHED, true);
        if self.update_on == UpdateTiming::Blur {
            self.validate();
        }
    }

    // =========================================================================
    // Enablement
    // =========================================================================

    /// Disable the control. Disabled controls are exempt from validity.
    pub fn disable(&self) {
        self.disabled.set(true);
    }

    /// Re-enable the control.
    pub fn enable(&self) {
        self.disabled.set(false);
    }

    /// Whether the control is disabled (reactive read).
    pub fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Run every validator against the current value and replace the
    /// errors signal with the merged result. Async validators run last;
    /// the control stays PENDING until each completion callback fires.
    pub fn validate(self: &Rc<Self>) {
        let value = self.value.get();

        let mut merged = ValidationErrors::new();
        if let Some(validators) = self.validators.borrow().as_ref() {
            for validator in validators {
                if let Some(errors) = validator(&value) {
                    merged.extend(errors);
                }
            }
        }
        self.errors.set(errors_value(merged));

        let async_validators = self.async_validators.borrow().clone();
        if let Some(validators) = async_validators {
            for validator in &validators {
                self.begin_pending();
                let control = Rc::clone(self);
                validator(
                    &value,
                    Box::new(move |result| control.finish_pending(result)),
                );
            }
        }
    }

    /// Current errors (`Null` when clear; reactive read).
    pub fn errors(&self) -> Value {
        self.errors.get()
    }

    /// The errors signal, for deriveds and bindings.
    pub fn errors_signal(&self) -> Signal<Value> {
        self.errors.clone()
    }

    /// Overwrite the errors with a synthetic error object.
    pub fn set_errors(&self, errors: ValidationErrors) {
        self.errors.set(errors_value(errors));
    }

    /// Validity: disabled controls are always valid; otherwise the
    /// control is valid when clear of errors and not pending.
    pub fn valid(&self) -> bool {
        if self.disabled.get() {
            return true;
        }
        self.errors.get().is_null() && !self.is_pending()
    }

    // =========================================================================
    // Flags
    // =========================================================================

    /// Interaction/validation flags.
    pub fn flags(&self) -> ControlFlags {
        self.flags.get()
    }

    /// Whether the value changed since the control was built.
    pub fn is_dirty(&self) -> bool {
        self.flags.get().contains(ControlFlags::DIRTY)
    }

    /// Whether the control has been visited.
    pub fn is_touched(&self) -> bool {
        self.flags.get().contains(ControlFlags::TOUCHED)
    }

    /// Whether async validation is outstanding.
    pub fn is_pending(&self) -> bool {
        self.flags.get().contains(ControlFlags::PENDING)
    }

    fn set_flag(&self, flag: ControlFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    fn begin_pending(&self) {
        self.pending_runs.set(self.pending_runs.get() + 1);
        self.set_flag(ControlFlags::PENDING, true);
    }

    fn finish_pending(&self, result: Option<ValidationErrors>) {
        if let Some(errors) = result {
            let mut current = match self.errors.get() {
                Value::Object(map) => map,
                _ => ValidationErrors::new(),
            };
            current.extend(errors);
            self.errors.set(Value::Object(current));
        }

        let remaining = self.pending_runs.get().saturating_sub(1);
        self.pending_runs.set(remaining);
        if remaining == 0 {
            self.set_flag(ControlFlags::PENDING, false);
        }
    }
}

/// `Null` for an empty error set, an object otherwise.
fn errors_value(errors: ValidationErrors) -> Value {
    if errors.is_empty() {
        Value::Null
    } else {
        Value::Object(errors)
    }
}
