//! The engine: an explicit registry of templates, hooks, and the live
//! document, constructed per caller — no ambient global state.

mod hooks;
mod inject;
mod lifecycle;
mod options;
pub(crate) mod store;

use std::rc::Rc;

use serde_json::Value;

use crate::compile::compiler;
use crate::compile::rules::marker;
use crate::error::EngineError;
use crate::markup::{Document, NodeId};

pub use hooks::{Effects, NoEffects};
pub use options::{CloneOptions, DestroyOptions, EmptyOptions, RefreshOptions};
pub use store::{CompiledTemplate, TemplateStore};

/// Status summary returned by [`Engine::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub templates: usize,
    pub clones: usize,
    pub subs: usize,
    pub names: Vec<String>,
}

/// The template-compilation and data-injection engine.
///
/// Owns the live document, the compiled-template store, the hook
/// registry, and the list of initializers. Every operation is
/// synchronous and runs to completion; re-entrant engine calls from
/// hooks are safe because hooks dispatch after tree walks settle.
pub struct Engine {
    pub(crate) doc: Document,
    pub(crate) store: TemplateStore,
    pub(crate) hooks: hooks::Hooks,
    pub(crate) initializers: Vec<String>,
    pub(crate) effects: Rc<dyn Effects>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine over an empty document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// An engine over a parsed document. Templates marked up in the
    /// document compile lazily on first reference.
    pub fn from_markup(markup: &str) -> Self {
        Self::with_document(Document::from_markup(markup))
    }

    pub fn with_document(doc: Document) -> Self {
        Self {
            doc,
            store: TemplateStore::new(),
            hooks: hooks::Hooks::default(),
            initializers: Vec::new(),
            effects: Rc::new(NoEffects),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Serialize the live document.
    pub fn markup(&self) -> String {
        self.doc.markup()
    }

    /// Register a template from a markup string, appended under `holder`
    /// (the document root by default) and compiled immediately.
    pub fn create_template(
        &mut self,
        name: &str,
        markup: &str,
        holder: Option<NodeId>,
    ) -> Result<CompiledTemplate, EngineError> {
        let holder = holder.unwrap_or_else(|| self.doc.root());
        let nodes = self.doc.parse_fragment(markup);
        for node in nodes {
            if let Some(elem) = self.doc.elem_mut(node) {
                elem.set_attr("id", name);
                elem.add_class(marker::TEMPLATE);
            }
            self.doc.append(holder, node);
        }
        self.get_template(name)
    }

    /// True when the name is registered or a template definition with
    /// that id is present in the document.
    pub fn template_exists(&self, name: &str) -> bool {
        if self.store.contains(name) {
            return true;
        }
        self.doc
            .find_by_id(name)
            .is_some_and(|n| self.doc.has_class(n, marker::TEMPLATE))
    }

    /// The memoized compiled template, compiling on first lookup.
    pub fn get_template(&mut self, name: &str) -> Result<CompiledTemplate, EngineError> {
        if !self.store.contains(name) {
            compiler::compile(&mut self.doc, &mut self.store, name)?;
        }
        self.store
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Register a pre-injection transform hook.
    pub fn register_transform(&mut self, name: &str, hook: impl Fn(&mut Value) + 'static) {
        self.hooks.register_transform(name, hook);
    }

    /// Register a post-injection callback hook.
    pub fn register_callback(&mut self, name: &str, hook: impl Fn(&mut Engine, NodeId) + 'static) {
        self.hooks.register_callback(name, hook);
    }

    /// Run the named callback hook against every subsequently created
    /// clone.
    pub fn register_initializer(&mut self, callback: &str) {
        self.initializers.push(callback.to_string());
    }

    /// Swap in a visual-effects collaborator.
    pub fn set_effects(&mut self, effects: Rc<dyn Effects>) {
        self.effects = effects;
    }

    /// Status information about the engine's templates and live clones.
    pub fn info(&self) -> EngineInfo {
        let mut clones = 0;
        let mut subs = 0;
        for node in self.doc.subtree(self.doc.root()) {
            if self.doc.has_class(node, marker::SUB_CLONE) {
                subs += 1;
            } else if self.doc.has_class(node, marker::CLONE) {
                clones += 1;
            }
        }
        EngineInfo {
            templates: self.store.len(),
            clones,
            subs,
            names: self.store.names().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Dispatch hook work queued during a tree walk.
    pub(crate) fn drain(&mut self, deferred: Vec<hooks::Deferred>) -> Result<(), EngineError> {
        for item in deferred {
            match item {
                hooks::Deferred::NodeCallback { name, node }
                | hooks::Deferred::CloneCallback { name, clone: node } => {
                    let callback = self.hooks.callback(&name)?;
                    callback(self, node);
                }
                hooks::Deferred::FadeIn { node } => {
                    let effects = self.effects.clone();
                    effects.fade_in(&mut self.doc, node);
                }
            }
        }
        Ok(())
    }
}
