//! Template storage and the stash pass
//!
//! A compiled template is detached from the live document and registered
//! by name. Stashing also records where instances get inserted: the
//! template's container, whether the template was its sole child
//! (`wrapped`), and whether that container lives inside another clone
//! (`nested`).

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::compile::compiler;
use crate::compile::rules::{marker, LoopRule};
use crate::error::EngineError;
use crate::markup::{Document, NodeId};

/// A compiled, reusable stencil.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub name: String,
    /// Detached rule-tree root
    pub root: NodeId,
    /// Where new instances are inserted
    pub container: NodeId,
    /// The container lives inside another template's clone; instances may
    /// only be produced with an explicit container
    pub nested: bool,
    /// The template was the sole child of its container
    pub wrapped: bool,
    /// Number of separator marker nodes in the tree
    pub separators: usize,
}

/// Name-keyed registry of compiled templates, owned by one engine.
#[derive(Default)]
pub struct TemplateStore {
    templates: HashMap<String, CompiledTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CompiledTemplate> {
        self.templates.get(name)
    }

    /// Register a template. Re-stashing a name overwrites silently —
    /// callers guarantee uniqueness.
    pub fn insert(&mut self, template: CompiledTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Sub-template naming convention: holder name plus array field.
pub(crate) fn sub_template_name(holder: &str, array_field: &str) -> String {
    format!("{holder}-{array_field}-instance")
}

/// Detach and register the compiled tree rooted at `root`, along with any
/// nested template roots and loop sub-templates inside it.
pub(crate) fn stash(
    doc: &mut Document,
    store: &mut TemplateStore,
    root: NodeId,
) -> Result<String, EngineError> {
    let name = template_name_of(doc, root).ok_or_else(|| EngineError::TemplateNotFound {
        name: "<unnamed>".to_string(),
    })?;

    let mut to_move = vec![root];
    to_move.extend(doc.descendants_with_class(root, marker::TEMPLATE));
    for node in to_move {
        stash_one(doc, store, node);
    }

    // loop sub-templates: tag the enclosing node with the loop rule, then
    // detach and register each sub-tree like any other template
    let sub_clones = doc.descendants_with_class(root, marker::SUB_CLONE);
    for sub in &sub_clones {
        prep_loop(doc, &name, *sub);
    }
    for sub in &sub_clones {
        stash_one(doc, store, *sub);
    }

    Ok(name)
}

fn template_name_of(doc: &Document, node: NodeId) -> Option<String> {
    doc.elem(node)
        .and_then(|e| e.rules.as_ref())
        .and_then(|r| r.template.clone())
}

/// Convert a `data-array` node into a registered sub-template: name it by
/// convention, put the loop rule on its parent, and record the array
/// field on the nearest enclosing clone root.
fn prep_loop(doc: &mut Document, holder_name: &str, sub: NodeId) {
    let Some(field) = doc
        .elem(sub)
        .and_then(|e| e.rules.as_ref())
        .and_then(|r| r.array.clone())
    else {
        return;
    };
    let sub_name = sub_template_name(holder_name, &field);
    doc.elem_mut(sub).unwrap().rules_mut().template = Some(sub_name.clone());

    let Some(parent) = doc.parent(sub) else { return };
    let parent_elem = doc.elem_mut(parent).unwrap();
    parent_elem.add_class(marker::NODE);
    parent_elem.add_class(marker::ARRAY);
    parent_elem.rules_mut().set_loop(LoopRule {
        template: sub_name,
        field: field.clone(),
    });

    let owner = doc.closest(parent, |e| {
        e.has_class(marker::CLONE) || e.has_class(marker::SUB_CLONE)
    });
    if let Some(owner) = owner {
        doc.elem_mut(owner).unwrap().rules_mut().subs.push(field);
    }
}

fn stash_one(doc: &mut Document, store: &mut TemplateStore, node: NodeId) {
    let Some(name) = template_name_of(doc, node) else {
        warn!("skipping unnamed template node");
        return;
    };
    let Some(container) = doc.parent(node) else {
        warn!(template = name.as_str(), "template has no container");
        return;
    };

    let wrapped = doc.element_children(container).len() == 1
        && !doc.has_class(container, marker::CONTAINER);
    if !wrapped && container_contents(doc, container).is_none() {
        record_siblings(doc, store, container, node, &name);
    }

    {
        let container_elem = doc.elem_mut(container).unwrap();
        container_elem.add_class(marker::CONTAINER);
        container_elem.add_class(&format!("{}{}", marker::HOLDS_PREFIX, name));
    }
    let nested = doc
        .closest(container, |e| e.has_class(marker::CLONE))
        .is_some();
    let separators = doc.descendants_with_class(node, marker::SEPARATOR).len()
        + doc
            .descendants_with_class(node, marker::LAST_SEPARATOR)
            .len();

    debug!(
        template = name.as_str(),
        nested, wrapped, separators, "stashing template"
    );
    store.insert(CompiledTemplate {
        name: name.clone(),
        root: node,
        container,
        nested,
        wrapped,
        separators,
    });

    let elem = doc.elem_mut(node).unwrap();
    elem.remove_class(marker::TEMPLATE);
    elem.add_class(marker::CLONE);
    elem.add_class(&name);
    doc.detach(node);
}

fn container_contents(doc: &Document, container: NodeId) -> Option<&Vec<Option<String>>> {
    doc.elem(container)?.state.contents.as_ref()
}

/// Record the ordered interleaving of template names in an unwrapped
/// container so a brand-new clone type can find its position among
/// existing siblings. Sibling template definitions compile on the spot.
fn record_siblings(
    doc: &mut Document,
    store: &mut TemplateStore,
    container: NodeId,
    current: NodeId,
    current_name: &str,
) {
    // placeholder first: the sibling compile below re-enters stash_one
    // for this same container and must not recurse into the recording
    doc.elem_mut(container).unwrap().state.contents = Some(Vec::new());

    let kids = doc.element_children(container);
    let mut list: Vec<Option<String>> = Vec::with_capacity(kids.len());
    for kid in kids {
        let entry = if kid == current {
            Some(current_name.to_string())
        } else if doc.has_class(kid, marker::TEMPLATE) {
            match doc.elem(kid).and_then(|e| e.attr("id")).map(str::to_string) {
                Some(id) => match compiler::compile(doc, store, &id) {
                    Ok(()) => Some(id),
                    Err(err) => {
                        warn!(error = %err, "sibling template failed to compile");
                        None
                    }
                },
                None => Some(current_name.to_string()),
            }
        } else if doc.has_class(kid, marker::SUB_CLONE) {
            template_name_of(doc, kid)
        } else {
            None
        };
        list.push(entry);
    }
    doc.elem_mut(container).unwrap().state.contents = Some(list);
}
