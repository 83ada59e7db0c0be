//! Validator resolution - registry specialization + argument normalization.
//!
//! Translates the validator declarations of a config into concrete
//! validator functions by normalizing every reference to `(id, args)` and
//! invoking the resolved factory. Declaring nothing yields `None` rather
//! than an empty list: downstream merging needs to distinguish "no
//! constraint" from "empty constraint list".

use std::fmt;

use crate::config::{ControlOptions, ProviderRef, ProviderRefs};
use crate::error::Result;
use crate::types::UpdateTiming;

use super::defaults::default_validators;
use super::registry::{ProviderEntry, ProviderRegistry};
use super::types::{AsyncValidatorFactory, AsyncValidatorFn, ValidatorFactory, ValidatorFn};

// =============================================================================
// Resolved Options
// =============================================================================

/// The concrete validation setup applied when a control is built.
pub struct ResolvedOptions {
    /// Synchronous validators, `None` when none were declared.
    pub validators: Option<Vec<ValidatorFn>>,
    /// Async validators, `None` when none were declared.
    pub async_validators: Option<Vec<AsyncValidatorFn>>,
    /// When validators re-run after a value change.
    pub update_on: UpdateTiming,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            validators: None,
            async_validators: None,
            update_on: UpdateTiming::Change,
        }
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("validators", &self.validators.as_ref().map(Vec::len))
            .field("async_validators", &self.async_validators.as_ref().map(Vec::len))
            .field("update_on", &self.update_on)
            .finish()
    }
}

// =============================================================================
// Form Validators
// =============================================================================

/// Resolved validator registries shared by the whole form.
pub struct FormValidators {
    validators: ProviderRegistry<ValidatorFactory>,
    async_validators: ProviderRegistry<AsyncValidatorFactory>,
}

impl FormValidators {
    /// Resolve the provided entries against the built-in validators.
    pub fn new(
        provided: Vec<ProviderEntry<ValidatorFactory>>,
        provided_async: Vec<ProviderEntry<AsyncValidatorFactory>>,
    ) -> Self {
        Self {
            validators: ProviderRegistry::resolve("Validator", provided, default_validators()),
            async_validators: ProviderRegistry::resolve("AsyncValidator", provided_async, vec![]),
        }
    }

    /// Translate a config's options into concrete validator functions.
    pub fn resolve_options(&self, options: &ControlOptions) -> Result<ResolvedOptions> {
        Ok(ResolvedOptions {
            validators: self.resolve_sync(options.validators.as_ref())?,
            async_validators: self.resolve_async(options.async_validators.as_ref())?,
            update_on: options.update_on,
        })
    }

    /// Resolve a single validator reference (used by the VALIDATE matcher).
    pub fn validator(&self, reference: &ProviderRef) -> Result<ValidatorFn> {
        let (id, args) = reference.normalized();
        Ok(self.validators.get(&id)?(&args))
    }

    /// Whether a sync validator id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.validators.contains(id)
    }

    fn resolve_sync(&self, refs: Option<&ProviderRefs>) -> Result<Option<Vec<ValidatorFn>>> {
        let Some(refs) = refs else {
            return Ok(None);
        };

        let mut resolved = Vec::new();
        for (id, args) in refs.entries() {
            let factory = self.validators.get(&id)?;
            resolved.push(factory(&args));
        }

        // declared-but-empty also degrades to None
        Ok(if resolved.is_empty() { None } else { Some(resolved) })
    }

    fn resolve_async(
        &self,
        refs: Option<&ProviderRefs>,
    ) -> Result<Option<Vec<AsyncValidatorFn>>> {
        let Some(refs) = refs else {
            return Ok(None);
        };

        let mut resolved = Vec::new();
        for (id, args) in refs.entries() {
            let factory = self.async_validators.get(&id)?;
            resolved.push(factory(&args));
        }

        Ok(if resolved.is_empty() { None } else { Some(resolved) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn validators() -> FormValidators {
        FormValidators::new(vec![], vec![])
    }

    #[test]
    fn test_no_declaration_yields_none() {
        let resolved = validators()
            .resolve_options(&ControlOptions::default())
            .unwrap();
        assert!(resolved.validators.is_none());
        assert!(resolved.async_validators.is_none());
        assert_eq!(resolved.update_on, UpdateTiming::Change);
    }

    #[test]
    fn test_empty_declaration_yields_none() {
        let options: ControlOptions =
            serde_json::from_value(json!({ "validators": [] })).unwrap();
        let resolved = validators().resolve_options(&options).unwrap();
        assert!(resolved.validators.is_none());
    }

    #[test]
    fn test_list_and_map_declarations() {
        let options: ControlOptions = serde_json::from_value(json!({
            "validators": ["required", ["minLength", 3]]
        }))
        .unwrap();
        let resolved = validators().resolve_options(&options).unwrap();
        assert_eq!(resolved.validators.as_ref().map(Vec::len), Some(2));

        let options: ControlOptions = serde_json::from_value(json!({
            "validators": { "required": null, "minLength": 3 }
        }))
        .unwrap();
        let resolved = validators().resolve_options(&options).unwrap();
        assert_eq!(resolved.validators.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_unknown_validator_id() {
        let options: ControlOptions =
            serde_json::from_value(json!({ "validators": ["nonsense"] })).unwrap();
        let err = validators().resolve_options(&options).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::ProviderNotFound { kind: "Validator", .. }
        ));
    }

    #[test]
    fn test_resolved_validator_runs() {
        let options: ControlOptions = serde_json::from_value(json!({
            "validators": [["minLength", 3]]
        }))
        .unwrap();
        let resolved = validators().resolve_options(&options).unwrap();
        let list = resolved.validators.unwrap();

        assert!(list[0](&json!("ab")).is_some());
        assert!(list[0](&json!("abc")).is_none());
    }
}
