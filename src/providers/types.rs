//! Handler function and factory type aliases.
//!
//! Factories take the normalized arguments declared in config and produce
//! the concrete handler function. Handlers are `Rc` closures so resolved
//! options can be shared between the registry and the live controls.

use std::rc::Rc;

use serde_json::Value;

use crate::tree::{FormTree, NodeId};

/// Error object produced by a validator: error id to detail.
pub type ValidationErrors = serde_json::Map<String, Value>;

/// Synchronous validator: inspects a value, returns errors or `None`.
pub type ValidatorFn = Rc<dyn Fn(&Value) -> Option<ValidationErrors>>;

/// Factory producing a [`ValidatorFn`] from config arguments.
pub type ValidatorFactory = Rc<dyn Fn(&[Value]) -> ValidatorFn>;

/// Completion callback handed to an async validator.
pub type AsyncDone = Box<dyn FnOnce(Option<ValidationErrors>)>;

/// Async validator: receives the value and a completion callback. The
/// control stays PENDING until the callback is invoked.
pub type AsyncValidatorFn = Rc<dyn Fn(&Value, AsyncDone)>;

/// Factory producing an [`AsyncValidatorFn`] from config arguments.
pub type AsyncValidatorFactory = Rc<dyn Fn(&[Value]) -> AsyncValidatorFn>;

/// Matcher effect: applied with the composed condition result.
pub type MatcherFn = Rc<dyn Fn(&FormTree, NodeId, bool)>;

/// Factory producing a [`MatcherFn`] from config arguments.
pub type MatcherFactory = Rc<dyn Fn(&[Value]) -> MatcherFn>;

/// Reactive boolean getter; reading it inside an effect tracks the
/// signals it depends on.
pub type ConditionGetter = Rc<dyn Fn() -> bool>;

/// Condition bound to a node: yields the live boolean getter.
pub type ConditionFn = Rc<dyn Fn(&FormTree, NodeId) -> ConditionGetter>;

/// Factory producing a [`ConditionFn`] from config arguments.
pub type ConditionFactory = Rc<dyn Fn(&[Value]) -> ConditionFn>;

/// Error handler: maps a node's current errors to a display message.
pub type ErrorHandlerFn = Rc<dyn Fn(&FormTree, NodeId) -> Option<String>>;

/// Factory producing an [`ErrorHandlerFn`] from config arguments.
pub type ErrorHandlerFactory = Rc<dyn Fn(&[Value]) -> ErrorHandlerFn>;

/// Params function: computes a display value from a node.
pub type FunctionFn = Rc<dyn Fn(&FormTree, NodeId) -> Value>;

/// Factory producing a [`FunctionFn`] from config arguments.
pub type FunctionFactory = Rc<dyn Fn(&[Value]) -> FunctionFn>;
