//! Form engine - scope, instantiation, reconciliation.
//!
//! The engine ties the layers together:
//! - ControlTypeRegistry: control-type id to structural kind
//! - FormScope: shared construction context with resolved registries
//! - Instantiator: config to live branch, reconciled on mode/context
//! - Matcher wiring: condition effects driving enable/visibility/validity

mod instantiator;
mod matchers;
mod registry;
mod scope;

pub use instantiator::*;
pub use registry::*;
pub use scope::*;
