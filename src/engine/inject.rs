//! The injection engine
//!
//! Walks an instance's rule tree depth-first and applies every rule in
//! canonical order. Sub-clone subtrees are never entered directly — the
//! loop reconciliation path owns them, patching in place when the array
//! length is unchanged and rebuilding the whole group otherwise.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::compile::rules::{
    marker, AttrRule, BindingRule, ClassRule, FieldRef, LoopRule, PropRule,
};
use crate::error::EngineError;
use crate::model;
use crate::markup::NodeId;

use super::hooks::Deferred;
use super::options::CloneOptions;
use super::Engine;

impl Engine {
    /// Apply every rule in the tree rooted at `clone` to `model`, then
    /// record the model and ordinal on the instance. Injection never
    /// fails for well-formed rule trees; the only error sources are
    /// unresolved hook names and a missing sub-template.
    pub(crate) fn inject(
        &mut self,
        clone: NodeId,
        data: &mut Value,
        count: u32,
        html: bool,
        transform: Option<&str>,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), EngineError> {
        if let Some(name) = transform {
            let hook = self.hooks.transform(name)?;
            hook(data);
        }
        self.walk(clone, data, count, html, deferred)?;
        let elem = self.doc.elem_mut(clone).unwrap();
        elem.state.model = Some(data.clone());
        elem.state.count = count;
        Ok(())
    }

    fn walk(
        &mut self,
        node: NodeId,
        data: &mut Value,
        count: u32,
        html: bool,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), EngineError> {
        let rules = self.doc.elem(node).and_then(|e| e.rules.clone());
        if let Some(rules) = rules {
            for rule in rules.rules() {
                match rule {
                    BindingRule::Transform(name) => {
                        let hook = self.hooks.transform(name)?;
                        hook(data);
                    }
                    BindingRule::Loop(loop_rule) => {
                        self.reconcile_loop(node, loop_rule, data, html, deferred)?;
                    }
                    BindingRule::Text(field) => self.inject_text(node, field, data, count, html),
                    BindingRule::Value(field) => self.inject_value(node, field, data, count),
                    BindingRule::Props(props) => self.apply_props(node, props, data),
                    BindingRule::Attrs(attrs) => self.apply_attrs(node, attrs, data, count),
                    BindingRule::Classes(classes) => self.apply_classes(node, classes, data),
                    BindingRule::Require(field) => {
                        let present = model::value(data, field).is_some();
                        self.set_visible(node, present);
                    }
                    BindingRule::Missing(field) => {
                        let present = model::value(data, field).is_some();
                        self.set_visible(node, !present);
                    }
                    BindingRule::Truthy(field) => {
                        self.set_visible(node, truth_of(data, field));
                    }
                    BindingRule::Falsy(field) => {
                        self.set_visible(node, !truth_of(data, field));
                    }
                    BindingRule::Callback(name) => deferred.push(Deferred::NodeCallback {
                        name: name.clone(),
                        node,
                    }),
                }
            }
        }

        for child in self.doc.children(node).to_vec() {
            if !self.doc.is_element(child) {
                continue;
            }
            // sub-clone instances are reconciled, never walked into
            if self.doc.has_class(child, marker::SUB_CLONE) {
                continue;
            }
            self.walk(child, data, count, html, deferred)?;
        }
        Ok(())
    }

    /// Align a loop container's sub-clones with the model's array field.
    /// Equal lengths patch element-for-element, preserving node identity;
    /// any length change discards and rebuilds the whole group. This
    /// length-only heuristic is deliberate — there is no identity key, so
    /// a reorder is observed as a rebuild.
    fn reconcile_loop(
        &mut self,
        container: NodeId,
        loop_rule: &LoopRule,
        data: &mut Value,
        html: bool,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), EngineError> {
        let current = model::value(data, &loop_rule.field).cloned();
        let mut items = match current {
            None => {
                // repair the missing field; existing sub-clones stay put
                model::assign(data, &loop_rule.field, Value::Array(Vec::new()));
                return Ok(());
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!(
                    field = loop_rule.field.as_str(),
                    value = %other,
                    "loop field is not an array"
                );
                return Ok(());
            }
        };

        let existing = self.clone_children(container, &loop_rule.template);
        if existing.len() == items.len() {
            trace!(
                template = loop_rule.template.as_str(),
                len = items.len(),
                "patching loop in place"
            );
            for (i, sub) in existing.iter().enumerate() {
                self.inject(*sub, &mut items[i], (i + 1) as u32, html, None, deferred)?;
            }
        } else {
            debug!(
                template = loop_rule.template.as_str(),
                from = existing.len(),
                to = items.len(),
                "rebuilding loop"
            );
            for sub in existing {
                self.doc.detach(sub);
            }
            // rebuilt instances are numbered 1..M
            self.doc
                .elem_mut(container)
                .unwrap()
                .state
                .counts
                .insert(loop_rule.template.clone(), 0);
            let template = self.store.get(&loop_rule.template).cloned().ok_or_else(|| {
                EngineError::TemplateNotFound {
                    name: loop_rule.template.clone(),
                }
            })?;
            let opts = CloneOptions::new().with_container(container).with_html(html);
            for item in items.iter_mut() {
                self.replicate(&template, item, &opts, deferred)?;
            }
        }
        model::assign(data, &loop_rule.field, Value::Array(items));
        Ok(())
    }

    fn inject_text(&mut self, node: NodeId, field: &FieldRef, data: &Value, count: u32, html: bool) {
        let Some(value) = resolve_field(data, count, field) else {
            return;
        };
        if !model::is_primitive(&value) {
            return;
        }
        let rendered = model::to_display(&value);
        self.doc.clear_children(node);
        if html {
            let content = self.doc.parse_fragment(&rendered);
            for child in content {
                self.doc.append(node, child);
            }
        } else {
            let text = self.doc.create_text(rendered);
            self.doc.append(node, text);
        }
    }

    fn inject_value(&mut self, node: NodeId, field: &FieldRef, data: &Value, count: u32) {
        let Some(value) = resolve_field(data, count, field) else {
            return;
        };
        if !model::is_primitive(&value) {
            return;
        }
        let rendered = model::to_display(&value);
        let elem = self.doc.elem_mut(node).unwrap();
        if elem.control_value.as_deref() != Some(rendered.as_str()) {
            elem.control_value = Some(rendered);
        }
    }

    fn apply_props(&mut self, node: NodeId, props: &[PropRule], data: &Value) {
        for prop in props {
            let on = truth_of(data, &prop.field);
            self.doc.elem_mut(node).unwrap().set_prop(&prop.name, on);
        }
    }

    fn apply_attrs(&mut self, node: NodeId, attrs: &[AttrRule], data: &Value, count: u32) {
        for attr in attrs {
            let core = resolve_field(data, count, &attr.field)
                .map(|v| model::to_display(&v))
                .unwrap_or_default();
            let value = format!("{}{}{}", attr.prefix, core, attr.suffix);
            let elem = self.doc.elem_mut(node).unwrap();
            elem.set_attr(&attr.name, value.clone());
            // keep a bound value attribute in sync with the live control
            if attr.name == "value" && elem.control_value.as_deref() != Some(value.as_str()) {
                elem.control_value = Some(value);
            }
        }
    }

    fn apply_classes(&mut self, node: NodeId, classes: &[ClassRule], data: &Value) {
        for rule in classes {
            match rule {
                ClassRule::Literal { field } => {
                    if let Some(value) = model::value(data, field) {
                        let class = model::to_display(value);
                        self.doc.elem_mut(node).unwrap().add_class(&class);
                    }
                }
                ClassRule::Toggle { field, on, off } => {
                    let truth = truth_of(data, field);
                    let elem = self.doc.elem_mut(node).unwrap();
                    elem.toggle_class(on, truth);
                    if let Some(off) = off {
                        elem.toggle_class(off, !truth);
                    }
                }
            }
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        self.doc.elem_mut(node).unwrap().visible = visible;
    }

    /// Direct children that are instances of the named template.
    pub(crate) fn clone_children(&self, container: NodeId, name: &str) -> Vec<NodeId> {
        self.doc
            .children(container)
            .iter()
            .copied()
            .filter(|c| self.doc.has_class(*c, marker::CLONE) && self.doc.has_class(*c, name))
            .collect()
    }
}

fn truth_of(data: &Value, field: &str) -> bool {
    model::value(data, field).map(model::real_truth).unwrap_or(false)
}

/// Resolve a field reference to an owned value: the ordinal, the whole
/// model, or the value at the dotted path.
fn resolve_field(data: &Value, count: u32, field: &FieldRef) -> Option<Value> {
    match field {
        FieldRef::Count => Some(Value::from(count)),
        FieldRef::Value => Some(data.clone()),
        FieldRef::Path(path) => model::value(data, path).cloned(),
    }
}
