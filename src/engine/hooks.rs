//! Hook registry and the effects collaborator seam
//!
//! Markup refers to transforms and callbacks by dotted name only; the
//! engine stores and forwards names, never resolving them against any
//! ambient scope. Callers register `name → callable` here. Visual
//! effects are likewise a collaborator: the engine notifies an
//! [`Effects`] implementation and performs its structural mutation in
//! the (synchronous by default) completion path.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::EngineError;
use crate::markup::{Document, NodeId};

use super::Engine;

/// Pre-injection hook: may rewrite the raw model.
pub type TransformFn = Rc<dyn Fn(&mut Value)>;

/// Post-injection hook: receives the engine and the populated node.
/// Dispatched after the tree walk settles, so it may freely create or
/// destroy sibling instances.
pub type CallbackFn = Rc<dyn Fn(&mut Engine, NodeId)>;

/// The explicit function table callers register hooks into.
#[derive(Default)]
pub struct Hooks {
    transforms: HashMap<String, TransformFn>,
    callbacks: HashMap<String, CallbackFn>,
}

impl Hooks {
    pub fn register_transform(&mut self, name: &str, hook: impl Fn(&mut Value) + 'static) {
        self.transforms.insert(name.to_string(), Rc::new(hook));
    }

    pub fn register_callback(&mut self, name: &str, hook: impl Fn(&mut Engine, NodeId) + 'static) {
        self.callbacks.insert(name.to_string(), Rc::new(hook));
    }

    pub fn transform(&self, name: &str) -> Result<TransformFn, EngineError> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::CallbackUnresolved {
                name: name.to_string(),
            })
    }

    pub fn callback(&self, name: &str) -> Result<CallbackFn, EngineError> {
        self.callbacks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::CallbackUnresolved {
                name: name.to_string(),
            })
    }
}

/// Visual effects collaborator. The default implementation is inert and
/// completes synchronously; an animated implementation may schedule real
/// transitions, but the engine's structural mutation has already been
/// sequenced for it.
pub trait Effects {
    fn fade_in(&self, doc: &mut Document, node: NodeId) {
        let _ = (doc, node);
    }

    fn fade_out(&self, doc: &mut Document, node: NodeId) {
        let _ = (doc, node);
    }
}

/// The inert default effects collaborator.
pub struct NoEffects;

impl Effects for NoEffects {}

/// Work queued during a tree walk and dispatched after it completes.
pub(crate) enum Deferred {
    /// A node-level `data-callback` rule
    NodeCallback { name: String, node: NodeId },
    /// Registered initializers and option callbacks for a new clone
    CloneCallback { name: String, clone: NodeId },
    /// Fade-in handoff to the effects collaborator
    FadeIn { node: NodeId },
}
