//! # dyn-forms
//!
//! Reactive, runtime-configurable dynamic forms engine.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! Forms are described by declarative [`config::ControlConfig`] trees and
//! instantiated into two linked structures: the live control instances
//! ([`form::FormMember`]: groups, arrays and leaf controls holding value,
//! enablement and error signals) and the structural [`tree::FormTree`]
//! (paths, visibility, params, hook dispatch). Cross-cutting behavior is
//! provided through priority-resolved registries of named handlers:
//! validators, matchers, conditions, error handlers and params functions.
//!
//! Reconfiguration is reactive:
//! ```text
//! ControlConfig -> effective config (mode/context layered)
//!   -> params-only diff: pushed into the live node
//!   -> structural diff:  branch destroyed and rebuilt in place
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (ControlKind, Visibility, ControlFlags, ...)
//! - [`config`] - Declarative config records and effective-config resolution
//! - [`providers`] - Handler registries and the built-in providers
//! - [`form`] - Live control instances and the instance factory
//! - [`tree`] - Structural tree, path queries, hook dispatch
//! - [`engine`] - Form scope, instantiation, reconciliation

pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod providers;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{
    ConditionConfig, ControlConfig, ControlOptions, FormDefaults, MatchCondition, MatcherConfig,
    MatcherDecl, ProviderRef, ProviderRefs, deep_merge, effective_config,
};

pub use error::{Error, Result};

pub use providers::{
    AsyncDone, AsyncValidatorFactory, AsyncValidatorFn, ConditionFactory, ConditionFn,
    ConditionGetter, ErrorHandlerFactory, ErrorHandlerFn, FormValidators, FunctionFactory,
    FunctionFn, MatcherFactory, MatcherFn, ProviderEntry, ProviderRegistry, ResolvedOptions,
    ValidationErrors, ValidatorFactory, ValidatorFn,
};

pub use form::{FormArray, FormControl, FormFactory, FormGroup, FormMember};

pub use tree::{FormTree, HookEvent, NodeId};

pub use engine::{
    ControlTypeDef, ControlTypeRegistry, FormHandle, FormScope, FormScopeBuilder,
    add_array_item, instantiate, remove_array_item,
};
