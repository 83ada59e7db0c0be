//! Provider registries - priority-resolved behavior handlers.
//!
//! Every cross-cutting behavior (validation, enable/disable, visibility,
//! error messages, computed display values) is a named handler factory
//! registered with a priority. One resolution algorithm serves all six
//! registries: validators, async validators, matchers, conditions, error
//! handlers and params functions - only the entry set differs.
//!
//! Registries are resolved once when the form scope is built and are
//! immutable afterwards; the whole tree shares them read-only.

mod defaults;
mod registry;
mod types;
mod validators;

pub use defaults::*;
pub use registry::*;
pub use types::*;
pub use validators::*;
