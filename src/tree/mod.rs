//! Structural form tree.
//!
//! The tree records where every built control sits: parent/child links,
//! dotted paths, visibility, presentation params and per-node cleanups.
//! It is the addressing layer for path queries, visibility-aware value
//! and validity collection, and hook dispatch.

mod hooks;
mod node;

pub use hooks::*;
pub use node::*;
