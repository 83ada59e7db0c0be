//! Hook dispatch.
//!
//! Hooks are named events walked down the tree. Every node invokes its
//! own listeners for the event name, then forwards the payload to its
//! children. Groups and containers forward it unchanged; arrays slice a
//! targeted list payload by index, and children beyond the payload's
//! length receive nothing. Plain events forward unchanged everywhere.

use std::rc::Rc;

use serde_json::Value;

use crate::types::{Cleanup, ControlKind};

use super::{FormTree, NodeId};

// =============================================================================
// Hook Event
// =============================================================================

/// A named event dispatched down the tree.
#[derive(Clone, Debug)]
pub struct HookEvent {
    /// Event name listeners subscribe under.
    pub name: String,
    /// Event payload, sliced by index at array nodes unless the event
    /// is plain.
    pub payload: Value,
    /// Plain events forward the whole payload to every descendant.
    pub plain: bool,
}

impl HookEvent {
    /// A targeted event: array nodes slice the payload per item while
    /// descending.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            plain: false,
        }
    }

    /// A plain event: every descendant receives the full payload.
    pub fn plain(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            plain: true,
        }
    }

    fn with_payload(&self, payload: Value) -> Self {
        Self {
            name: self.name.clone(),
            payload,
            plain: self.plain,
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

impl FormTree {
    /// Dispatch an event at a node and walk it down the subtree.
    pub fn dispatch_hook(&self, id: NodeId, event: &HookEvent) {
        let listeners: Vec<Rc<dyn Fn(&Value)>> = self
            .with(id, |node| {
                node.hooks
                    .get(&event.name)
                    .map(|hooks| hooks.iter().map(|(_, listener)| listener.clone()).collect())
            })
            .flatten()
            .unwrap_or_default();
        for listener in listeners {
            listener(&event.payload);
        }

        let Some(kind) = self.kind(id) else {
            return;
        };
        let children = self.children(id);

        if event.plain {
            for child in children {
                self.dispatch_hook(child, event);
            }
            return;
        }

        match kind {
            // aggregates of named fields forward the payload unchanged
            ControlKind::Group | ControlKind::Container => {
                for child in children {
                    self.dispatch_hook(child, event);
                }
            }
            ControlKind::Array => {
                if let Value::Array(parts) = &event.payload {
                    for (index, child) in children.into_iter().enumerate() {
                        if let Some(part) = parts.get(index) {
                            self.dispatch_hook(child, &event.with_payload(part.clone()));
                        }
                    }
                }
            }
            ControlKind::Control => {}
        }
    }

    /// Subscribe a listener to an event name at a node. The returned
    /// cleanup unsubscribes; it is also safe after the node is gone.
    pub fn on_hook(
        &self,
        id: NodeId,
        name: impl Into<String>,
        listener: impl Fn(&Value) + 'static,
    ) -> Cleanup {
        let name = name.into();
        let hook_id = {
            let mut arena = self.inner.borrow_mut();
            match arena.get_mut(id) {
                Some(node) => {
                    let hook_id = node.next_hook;
                    node.next_hook += 1;
                    node.hooks
                        .entry(name.clone())
                        .or_default()
                        .push((hook_id, Rc::new(listener)));
                    Some(hook_id)
                }
                None => None,
            }
        };

        let tree = self.clone();
        Box::new(move || {
            let Some(hook_id) = hook_id else {
                return;
            };
            let mut arena = tree.inner.borrow_mut();
            if let Some(node) = arena.get_mut(id)
                && let Some(listeners) = node.hooks.get_mut(&name)
            {
                listeners.retain(|(existing, _)| *existing != hook_id);
            }
        })
    }
}
