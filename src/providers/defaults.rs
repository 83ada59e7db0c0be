//! Built-in providers.
//!
//! The stock validators, matchers, conditions, error handlers and
//! params functions every form starts with. All of them register at
//! priority 0, so an explicit registration under the same id replaces
//! them.

use std::rc::Rc;

use regex::Regex;
use serde_json::{Value, json};
use tracing::warn;

use crate::config::{MatchCondition, ProviderRef};
use crate::types::Visibility;

use super::registry::ProviderEntry;
use super::types::{
    ConditionFactory, ConditionFn, ErrorHandlerFactory, ErrorHandlerFn, FunctionFactory,
    FunctionFn, MatcherFactory, MatcherFn, ValidationErrors, ValidatorFactory, ValidatorFn,
};
use super::validators::FormValidators;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

// =============================================================================
// Validators
// =============================================================================

fn single_error(key: &str, detail: Value) -> Option<ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.insert(key.to_string(), detail);
    Some(errors)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(list) => list.is_empty(),
        _ => false,
    }
}

fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(list) => Some(list.len()),
        _ => None,
    }
}

/// Validator that never reports an error; the fallback for factories
/// handed unusable arguments.
fn pass() -> ValidatorFn {
    Rc::new(|_value| None)
}

fn number_arg(args: &[Value], id: &str) -> Option<f64> {
    let limit = args.first().and_then(Value::as_f64);
    if limit.is_none() {
        warn!(id, "validator needs a numeric argument, disabling");
    }
    limit
}

fn required() -> ValidatorFn {
    Rc::new(|value| {
        if is_empty_value(value) {
            single_error("required", json!(true))
        } else {
            None
        }
    })
}

fn required_true() -> ValidatorFn {
    Rc::new(|value| {
        if value == &json!(true) {
            None
        } else {
            single_error("required", json!(true))
        }
    })
}

fn email() -> ValidatorFn {
    let Ok(pattern) = Regex::new(EMAIL_PATTERN) else {
        return pass();
    };
    Rc::new(move |value| {
        if is_empty_value(value) {
            return None;
        }
        match value.as_str() {
            Some(s) if pattern.is_match(s) => None,
            _ => single_error("email", json!(true)),
        }
    })
}

fn min(args: &[Value]) -> ValidatorFn {
    let Some(limit) = number_arg(args, "min") else {
        return pass();
    };
    Rc::new(move |value| match value.as_f64() {
        Some(actual) if actual < limit => {
            single_error("min", json!({ "min": limit, "actual": actual }))
        }
        _ => None,
    })
}

fn max(args: &[Value]) -> ValidatorFn {
    let Some(limit) = number_arg(args, "max") else {
        return pass();
    };
    Rc::new(move |value| match value.as_f64() {
        Some(actual) if actual > limit => {
            single_error("max", json!({ "max": limit, "actual": actual }))
        }
        _ => None,
    })
}

fn min_length(args: &[Value]) -> ValidatorFn {
    let Some(limit) = number_arg(args, "minLength") else {
        return pass();
    };
    let limit = limit as usize;
    Rc::new(move |value| {
        if is_empty_value(value) {
            return None;
        }
        match value_length(value) {
            Some(actual) if actual < limit => single_error(
                "minLength",
                json!({ "requiredLength": limit, "actualLength": actual }),
            ),
            _ => None,
        }
    })
}

fn max_length(args: &[Value]) -> ValidatorFn {
    let Some(limit) = number_arg(args, "maxLength") else {
        return pass();
    };
    let limit = limit as usize;
    Rc::new(move |value| match value_length(value) {
        Some(actual) if actual > limit => single_error(
            "maxLength",
            json!({ "requiredLength": limit, "actualLength": actual }),
        ),
        _ => None,
    })
}

fn pattern(args: &[Value]) -> ValidatorFn {
    let Some(source) = args.first().and_then(Value::as_str) else {
        warn!("pattern validator needs a pattern argument, disabling");
        return pass();
    };
    // anchor unanchored patterns so the whole value must match
    let anchored = if source.starts_with('^') && source.ends_with('$') {
        source.to_string()
    } else {
        format!("^{source}$")
    };
    let source = source.to_string();
    match Regex::new(&anchored) {
        Ok(regex) => Rc::new(move |value| {
            if is_empty_value(value) {
                return None;
            }
            match value.as_str() {
                Some(s) if regex.is_match(s) => None,
                _ => single_error(
                    "pattern",
                    json!({ "requiredPattern": source, "actualValue": value }),
                ),
            }
        }),
        Err(error) => {
            warn!(pattern = %source, %error, "invalid pattern, disabling validator");
            pass()
        }
    }
}

/// The stock validator set.
pub fn default_validators() -> Vec<ProviderEntry<ValidatorFactory>> {
    vec![
        ProviderEntry::new("required", Rc::new(|_: &[Value]| required()) as ValidatorFactory),
        ProviderEntry::new("requiredTrue", Rc::new(|_: &[Value]| required_true()) as _),
        ProviderEntry::new("email", Rc::new(|_: &[Value]| email()) as _),
        ProviderEntry::new("min", Rc::new(|args: &[Value]| min(args)) as _),
        ProviderEntry::new("max", Rc::new(|args: &[Value]| max(args)) as _),
        ProviderEntry::new("minLength", Rc::new(|args: &[Value]| min_length(args)) as _),
        ProviderEntry::new("maxLength", Rc::new(|args: &[Value]| max_length(args)) as _),
        ProviderEntry::new("pattern", Rc::new(|args: &[Value]| pattern(args)) as _),
    ]
}

// =============================================================================
// Matchers
// =============================================================================

fn enablement_matcher(disable_when_matched: bool) -> MatcherFn {
    Rc::new(move |tree, node, matched| {
        if let Some(member) = tree.member(node) {
            if matched == disable_when_matched {
                member.disable();
            } else {
                member.enable();
            }
        }
    })
}

fn visibility_matcher(on_match: Visibility, otherwise: Visibility) -> MatcherFn {
    Rc::new(move |tree, node, matched| {
        tree.set_visibility(node, if matched { on_match } else { otherwise });
    })
}

fn validate_matcher(validators: &Rc<FormValidators>, args: &[Value]) -> MatcherFn {
    // no argument means the stock `required` validator
    let extra: Option<ValidatorFn> = match args.first() {
        None => validators.validator(&ProviderRef::Id("required".into())).ok(),
        Some(arg) => {
            let reference: Option<ProviderRef> = match serde_json::from_value(arg.clone()) {
                Ok(reference) => Some(reference),
                Err(error) => {
                    warn!(%error, "VALIDATE matcher has an unusable validator argument");
                    None
                }
            };
            reference.and_then(|reference| match validators.validator(&reference) {
                Ok(validator) => Some(validator),
                Err(error) => {
                    warn!(%error, "VALIDATE matcher references an unknown validator");
                    None
                }
            })
        }
    };

    Rc::new(move |tree, node, matched| {
        let Some(member) = tree.member(node) else {
            return;
        };
        if matched && let Some(validator) = &extra {
            match validator(&member.value()) {
                Some(errors) => member.set_errors(errors),
                None => member.refresh_validity(),
            }
            return;
        }
        member.refresh_validity();
    })
}

/// The stock matcher set. `VALIDATE` resolves its optional validator
/// argument against the form's validator registry.
pub fn default_matchers(validators: Rc<FormValidators>) -> Vec<ProviderEntry<MatcherFactory>> {
    vec![
        ProviderEntry::new(
            "DISABLE",
            Rc::new(|_: &[Value]| enablement_matcher(true)) as MatcherFactory,
        ),
        ProviderEntry::new("ENABLE", Rc::new(|_: &[Value]| enablement_matcher(false)) as _),
        ProviderEntry::new(
            "SHOW",
            Rc::new(|_: &[Value]| visibility_matcher(Visibility::Visible, Visibility::Hidden))
                as _,
        ),
        ProviderEntry::new(
            "HIDE",
            Rc::new(|_: &[Value]| visibility_matcher(Visibility::Hidden, Visibility::Visible))
                as _,
        ),
        ProviderEntry::new(
            "INVISIBLE",
            Rc::new(|_: &[Value]| {
                visibility_matcher(Visibility::Invisible, Visibility::Visible)
            }) as _,
        ),
        ProviderEntry::new(
            "VALIDATE",
            Rc::new(move |args: &[Value]| validate_matcher(&validators, args)) as _,
        ),
    ]
}

// =============================================================================
// Conditions
// =============================================================================

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn constant(result: bool) -> super::types::ConditionGetter {
    Rc::new(move || result)
}

fn default_condition(args: &[Value]) -> ConditionFn {
    let condition: Option<MatchCondition> = args.first().and_then(|arg| {
        match serde_json::from_value(arg.clone()) {
            Ok(condition) => Some(condition),
            Err(error) => {
                warn!(%error, "unusable condition fragment, matching unconditionally");
                None
            }
        }
    });

    Rc::new(move |tree, node| {
        let Some(condition) = condition.clone() else {
            return constant(true);
        };

        // the observed control is bound once, at wiring time
        let Some(target) = tree.query(node, &condition.path) else {
            warn!(path = %condition.path, "condition path did not resolve, matching unconditionally");
            return constant(true);
        };
        let Some(member) = tree.member(target) else {
            return constant(true);
        };

        Rc::new(move || {
            // the read keeps the observed value a tracked dependency
            let current = member.value();
            match &condition.value {
                // no expected value: any change at the path counts as
                // a match, negate included
                None => true,
                Some(Value::Array(options)) => options.contains(&current) != condition.negate,
                Some(expected) => (&current == expected) != condition.negate,
            }
        })
    })
}

/// The stock condition set: the `DEFAULT` value-match condition used
/// for fragment shorthand.
pub fn default_conditions() -> Vec<ProviderEntry<ConditionFactory>> {
    vec![ProviderEntry::new(
        "DEFAULT",
        Rc::new(|args: &[Value]| default_condition(args)) as ConditionFactory,
    )]
}

// =============================================================================
// Error handlers
// =============================================================================

fn control_error_handler(args: &[Value]) -> ErrorHandlerFn {
    let messages = match args.first() {
        Some(Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };

    Rc::new(move |tree, node| {
        let errors = tree.member(node)?.errors();
        let Value::Object(errors) = errors else {
            return None;
        };
        errors
            .keys()
            .find_map(|key| messages.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

/// The stock error-handler set: `CONTROL` maps error ids to the
/// configured messages.
pub fn default_error_handlers() -> Vec<ProviderEntry<ErrorHandlerFactory>> {
    vec![ProviderEntry::new(
        "CONTROL",
        Rc::new(|args: &[Value]| control_error_handler(args)) as ErrorHandlerFactory,
    )]
}

// =============================================================================
// Params functions
// =============================================================================

fn format_yes_no(args: &[Value]) -> FunctionFn {
    let is_binary = args.first().and_then(Value::as_bool).unwrap_or(true);
    Rc::new(move |tree, node| {
        let value = tree
            .member(node)
            .map(|member| member.value())
            .unwrap_or(Value::Null);
        // only `true` reads as "Yes"; binary mode folds everything else
        // into "No", otherwise only an explicit `false` does
        if value == Value::Bool(true) {
            json!("Yes")
        } else if is_binary || value == Value::Bool(false) {
            json!("No")
        } else {
            json!("-")
        }
    })
}

fn get_option_text() -> FunctionFn {
    Rc::new(|tree, node| {
        let Some(member) = tree.member(node) else {
            return Value::Null;
        };
        let current = member.value();
        let options = tree
            .params(node)
            .and_then(|params| params.get("options").cloned());
        if truthy(&current)
            && let Some(Value::Array(options)) = options
        {
            for option in &options {
                if option.get("value") == Some(&current)
                    && let Some(text) = option.get("text").or_else(|| option.get("label"))
                {
                    return text.clone();
                }
            }
        }
        // no matching option: the raw value stands in for its own text
        current
    })
}

fn get_params_field(args: &[Value]) -> FunctionFn {
    let field = args
        .first()
        .and_then(Value::as_str)
        .unwrap_or("label")
        .to_string();
    let fallback = args.get(1).cloned().unwrap_or(json!("-"));
    Rc::new(move |tree, node| {
        tree.params(node)
            .and_then(|params| params.get(&field).cloned())
            .unwrap_or_else(|| fallback.clone())
    })
}

/// The stock params-function set.
pub fn default_functions() -> Vec<ProviderEntry<FunctionFactory>> {
    vec![
        ProviderEntry::new(
            "formatYesNo",
            Rc::new(|args: &[Value]| format_yes_no(args)) as FunctionFactory,
        ),
        ProviderEntry::new("getOptionText", Rc::new(|_: &[Value]| get_option_text()) as _),
        ProviderEntry::new(
            "getParamsField",
            Rc::new(|args: &[Value]| get_params_field(args)) as _,
        ),
    ]
}
