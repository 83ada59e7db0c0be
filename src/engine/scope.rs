//! Form scope - the shared construction context.
//!
//! Everything a branch needs while being built or rewired lives here:
//! the tree, the control-type table, the resolved provider registries,
//! the instance factory, and the reactive mode/context selectors.
//! Registries are resolved once at build time; afterwards the scope is
//! immutable except for the mode/context signals.

use std::rc::Rc;

use serde_json::Value;
use spark_signals::{Signal, signal};

use crate::config::{ControlConfig, FormDefaults, ProviderRef, effective_config};
use crate::error::Result;
use crate::form::FormFactory;
use crate::providers::{
    AsyncValidatorFactory, ConditionFactory, ConditionFn, ErrorHandlerFactory, FormValidators,
    FunctionFactory, MatcherFactory, MatcherFn, ProviderEntry, ProviderRegistry,
    ValidatorFactory, default_conditions, default_error_handlers, default_functions,
    default_matchers,
};
use crate::tree::{FormTree, NodeId};
use crate::types::ControlKind;

use super::registry::{ControlTypeDef, ControlTypeRegistry};

// =============================================================================
// Form Scope
// =============================================================================

/// Shared context for one form: tree, registries, factory, selectors.
pub struct FormScope {
    tree: FormTree,
    control_types: ControlTypeRegistry,
    factory: FormFactory,
    validators: Rc<FormValidators>,
    matchers: ProviderRegistry<MatcherFactory>,
    conditions: ProviderRegistry<ConditionFactory>,
    error_handlers: ProviderRegistry<ErrorHandlerFactory>,
    functions: ProviderRegistry<FunctionFactory>,
    mode: Signal<Option<String>>,
    context: Signal<Option<String>>,
    defaults: FormDefaults,
}

impl FormScope {
    /// Start building a scope.
    pub fn builder() -> FormScopeBuilder {
        FormScopeBuilder::default()
    }

    /// The structural tree of this form.
    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    /// The control-instance factory.
    pub fn factory(&self) -> &FormFactory {
        &self.factory
    }

    /// The resolved validator registries.
    pub fn validators(&self) -> &Rc<FormValidators> {
        &self.validators
    }

    /// Structural kind for a control-type id.
    pub fn resolve_kind(&self, control: &str) -> Result<ControlKind> {
        self.control_types.resolve(control)
    }

    /// Resolve a matcher reference into its effect function.
    pub fn matcher(&self, reference: &ProviderRef) -> Result<MatcherFn> {
        let (id, args) = reference.normalized();
        Ok(self.matchers.get(&id)?(&args))
    }

    /// Resolve a condition reference into its node-binding function.
    pub fn condition(&self, reference: &ProviderRef) -> Result<ConditionFn> {
        let (id, args) = reference.normalized();
        Ok(self.conditions.get(&id)?(&args))
    }

    /// Call a params function for a node.
    pub fn call_function(&self, reference: &ProviderRef, node: NodeId) -> Result<Value> {
        let (id, args) = reference.normalized();
        let function = self.functions.get(&id)?(&args);
        Ok(function(&self.tree, node))
    }

    /// Display message for a node's current errors, routed through the
    /// `CONTROL` error handler with the node's configured messages.
    pub fn error_message(&self, node: NodeId) -> Option<String> {
        let messages = self
            .tree
            .config(node)
            .and_then(|config| config.error_msgs)
            .map(|messages| {
                Value::Object(
                    messages
                        .into_iter()
                        .map(|(key, text)| (key, Value::String(text)))
                        .collect(),
                )
            })
            .unwrap_or(Value::Null);

        let factory = self.error_handlers.get("CONTROL").ok()?;
        factory(&[messages])(&self.tree, node)
    }

    // =========================================================================
    // Mode & Context
    // =========================================================================

    /// Current mode (reactive read).
    pub fn mode(&self) -> Option<String> {
        self.mode.get()
    }

    /// Switch the mode; instantiated branches reconcile reactively.
    pub fn set_mode(&self, mode: Option<impl Into<String>>) {
        self.mode.set(mode.map(Into::into));
    }

    /// Current context (reactive read).
    pub fn context(&self) -> Option<String> {
        self.context.get()
    }

    /// Switch the context; instantiated branches reconcile reactively.
    pub fn set_context(&self, context: Option<impl Into<String>>) {
        self.context.set(context.map(Into::into));
    }

    /// Effective config for the current mode and context. Reading this
    /// inside an effect tracks both selector signals.
    pub fn effective(&self, config: &ControlConfig) -> ControlConfig {
        effective_config(
            config,
            self.mode.get().as_deref(),
            self.context.get().as_deref(),
            &self.defaults,
        )
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Collects control types and provider registrations, then resolves
/// them into an immutable [`FormScope`].
#[derive(Default)]
pub struct FormScopeBuilder {
    control_types: Vec<ControlTypeDef>,
    validators: Vec<ProviderEntry<ValidatorFactory>>,
    async_validators: Vec<ProviderEntry<AsyncValidatorFactory>>,
    matchers: Vec<ProviderEntry<MatcherFactory>>,
    conditions: Vec<ProviderEntry<ConditionFactory>>,
    error_handlers: Vec<ProviderEntry<ErrorHandlerFactory>>,
    functions: Vec<ProviderEntry<FunctionFactory>>,
    defaults: FormDefaults,
    mode: Option<String>,
    context: Option<String>,
}

impl FormScopeBuilder {
    /// Register a control type.
    pub fn control_type(mut self, control: impl Into<String>, kind: ControlKind) -> Self {
        self.control_types.push(ControlTypeDef::new(control, kind));
        self
    }

    /// Register a validator provider.
    pub fn provide_validator(mut self, entry: ProviderEntry<ValidatorFactory>) -> Self {
        self.validators.push(entry);
        self
    }

    /// Register an async validator provider.
    pub fn provide_async_validator(
        mut self,
        entry: ProviderEntry<AsyncValidatorFactory>,
    ) -> Self {
        self.async_validators.push(entry);
        self
    }

    /// Register a matcher provider.
    pub fn provide_matcher(mut self, entry: ProviderEntry<MatcherFactory>) -> Self {
        self.matchers.push(entry);
        self
    }

    /// Register a condition provider.
    pub fn provide_condition(mut self, entry: ProviderEntry<ConditionFactory>) -> Self {
        self.conditions.push(entry);
        self
    }

    /// Register an error-handler provider.
    pub fn provide_error_handler(mut self, entry: ProviderEntry<ErrorHandlerFactory>) -> Self {
        self.error_handlers.push(entry);
        self
    }

    /// Register a params-function provider.
    pub fn provide_function(mut self, entry: ProviderEntry<FunctionFactory>) -> Self {
        self.functions.push(entry);
        self
    }

    /// Form-wide mode/context override fragments.
    pub fn defaults(mut self, defaults: FormDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Initial mode.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Initial context.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Resolve every registry and produce the scope.
    pub fn build(self) -> Rc<FormScope> {
        let validators = Rc::new(FormValidators::new(self.validators, self.async_validators));

        Rc::new(FormScope {
            tree: FormTree::new(),
            control_types: ControlTypeRegistry::new(self.control_types),
            factory: FormFactory::new(validators.clone()),
            matchers: ProviderRegistry::resolve(
                "Matcher",
                self.matchers,
                default_matchers(validators.clone()),
            ),
            conditions: ProviderRegistry::resolve(
                "Condition",
                self.conditions,
                default_conditions(),
            ),
            error_handlers: ProviderRegistry::resolve(
                "ErrorHandler",
                self.error_handlers,
                default_error_handlers(),
            ),
            functions: ProviderRegistry::resolve(
                "Function",
                self.functions,
                default_functions(),
            ),
            validators,
            mode: signal(self.mode),
            context: signal(self.context),
            defaults: self.defaults,
        })
    }
}
