//! Declarative configuration model.
//!
//! A form is described by a tree of [`ControlConfig`] records: pure data,
//! never executable code. Behaviors are referenced by registry id plus
//! arguments and resolved later through the provider registries.
//!
//! The resolver in this module derives the *effective* config of a node
//! from its base config and the current mode/context, by deep-merging
//! override fragments. Effective configs are recomputed, never mutated.

mod control;
mod merge;
mod resolver;

pub use control::*;
pub use merge::*;
pub use resolver::*;
