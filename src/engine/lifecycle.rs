//! Clone lifecycle: creation, refresh, reordering, and removal
//!
//! All structural mutation of the live tree funnels through here. Each
//! operation runs to completion before returning; hook callbacks queued
//! during a tree walk are dispatched afterwards, so they may freely
//! create or destroy sibling instances.

use serde_json::Value;
use tracing::debug;

use crate::compile::rules::marker;
use crate::error::EngineError;
use crate::markup::NodeId;
use crate::model;

use super::hooks::Deferred;
use super::options::{CloneOptions, DestroyOptions, EmptyOptions, RefreshOptions};
use super::store::{sub_template_name, CompiledTemplate};
use super::Engine;

impl Engine {
    /// Produce one populated instance per supplied model, inserted into
    /// the template's container (or the explicit one for nested
    /// templates). Returns the new clone roots in creation order.
    pub fn clone_template(
        &mut self,
        name: &str,
        models: Vec<Value>,
        options: CloneOptions,
    ) -> Result<Vec<NodeId>, EngineError> {
        let template = self.get_template(name)?;
        if template.nested && options.container.is_none() {
            return Err(EngineError::ContainerMissing {
                name: name.to_string(),
            });
        }
        if options.empty {
            self.empty(name, EmptyOptions::new())?;
        }

        let mut list = Vec::with_capacity(models.len() * options.clones);
        for _ in 0..options.clones {
            list.extend(models.iter().cloned());
        }

        let mut deferred = Vec::new();
        let mut created = Vec::with_capacity(list.len());
        for mut model in list {
            created.push(self.replicate(&template, &mut model, &options, &mut deferred)?);
        }
        self.refresh_placeholders();
        self.drain(deferred)?;
        debug!(template = name, created = created.len(), "cloned");
        Ok(created)
    }

    /// Clone a sub-template into a holder clone's loop container and
    /// rewrite the holder model's array field from the live children.
    pub fn clone_sub(
        &mut self,
        holder: NodeId,
        array_field: &str,
        models: Vec<Value>,
        options: CloneOptions,
    ) -> Result<Vec<NodeId>, EngineError> {
        let name = self.sub_name_for(holder, array_field)?;
        let holds = format!("{}{}", marker::HOLDS_PREFIX, name);
        let container = if self.doc.has_class(holder, &holds) {
            holder
        } else {
            self.doc
                .descendants_with_class(holder, &holds)
                .first()
                .copied()
                .ok_or_else(|| EngineError::ContainerMissing { name: name.clone() })?
        };
        let clones = self.clone_template(&name, models, options.with_container(container))?;
        if let Some(first) = clones.first() {
            self.update_array(*first);
        }
        Ok(clones)
    }

    /// Re-run injection on an existing instance, with a caller-supplied
    /// model or the instance's stored one, at its stored ordinal.
    pub fn refresh(&mut self, clone: NodeId, options: RefreshOptions) -> Result<NodeId, EngineError> {
        let Some(clone) = self.get_clone_node(clone, options.main) else {
            return Ok(clone);
        };
        let stored = self
            .doc
            .elem(clone)
            .and_then(|e| e.state.model.clone());
        let mut data = options.model.clone().or(stored).unwrap_or(Value::Null);
        let count = self.doc.elem(clone).map(|e| e.state.count).unwrap_or(0);
        let mut deferred = Vec::new();
        self.inject(clone, &mut data, count, options.html, None, &mut deferred)?;
        self.drain(deferred)?;
        Ok(clone)
    }

    /// Refresh every live instance of a template, in document order.
    pub fn refresh_all(&mut self, name: &str, options: RefreshOptions) -> Result<(), EngineError> {
        for clone in self.get_clones(name)? {
            self.refresh(clone, options.clone())?;
        }
        Ok(())
    }

    /// Update the first instance if one exists, otherwise create it.
    pub fn insert(
        &mut self,
        name: &str,
        model: Value,
        options: CloneOptions,
    ) -> Result<NodeId, EngineError> {
        match self.get_clones(name)?.first().copied() {
            Some(first) => self.refresh(
                first,
                RefreshOptions::new().with_model(model).with_html(options.html),
            ),
            None => {
                let created = self.clone_template(name, vec![model], options)?;
                Ok(created[0])
            }
        }
    }

    /// Renumber ordinals 1..N for every sibling instance of the clone's
    /// template in current document order, refreshing each.
    pub fn recount(&mut self, clone: NodeId, options: RefreshOptions) -> Result<NodeId, EngineError> {
        let Some(clone) = self.get_clone_node(clone, false) else {
            return Ok(clone);
        };
        let Some(name) = self.template_name(clone) else {
            return Ok(clone);
        };
        let Some(container) = self.doc.parent(clone) else {
            return Ok(clone);
        };
        let siblings = self.clone_children(container, &name);
        for (i, sibling) in siblings.iter().enumerate() {
            self.doc.elem_mut(*sibling).unwrap().state.count = (i + 1) as u32;
            self.refresh(*sibling, options.clone())?;
        }
        self.doc
            .elem_mut(container)
            .unwrap()
            .state
            .counts
            .insert(name, siblings.len() as u32);
        Ok(clone)
    }

    /// Remove an instance. A sub-clone's entry is spliced out of the
    /// holder model's array field; empty-state placeholders refresh.
    pub fn destroy(&mut self, clone: NodeId, options: DestroyOptions) -> Result<NodeId, EngineError> {
        let Some(clone) = self.get_clone_node(clone, options.main) else {
            return Ok(clone);
        };
        let array_field = self.array_field(clone);
        if let Some(field) = &array_field {
            self.splice_holder_array(clone, field);
        }
        if options.fade {
            let effects = self.effects.clone();
            effects.fade_out(&mut self.doc, clone);
        }
        self.remove_clone(clone, array_field)?;
        Ok(clone)
    }

    /// Delete every clone in the template's container and reset the
    /// template's instance counter.
    pub fn empty(&mut self, name: &str, options: EmptyOptions) -> Result<Vec<NodeId>, EngineError> {
        let template = self.get_template(name)?;
        let clones = self
            .doc
            .children_with_class(template.container, marker::CLONE);
        self.doc
            .elem_mut(template.container)
            .unwrap()
            .state
            .counts
            .insert(name.to_string(), 0);
        for clone in &clones {
            if options.fade {
                let effects = self.effects.clone();
                effects.fade_out(&mut self.doc, *clone);
            }
            let array_field = self.array_field(*clone);
            self.remove_clone(*clone, array_field)?;
        }
        Ok(clones)
    }

    /// All live instances of a template, in document order.
    pub fn get_clones(&mut self, name: &str) -> Result<Vec<NodeId>, EngineError> {
        let template = self.get_template(name)?;
        Ok(self.clone_children(template.container, name))
    }

    /// The model bound to the clone owning `node`.
    pub fn get_model(&self, node: NodeId) -> Option<&Value> {
        let clone = self.get_clone_node(node, false)?;
        self.doc.elem(clone)?.state.model.as_ref()
    }

    /// The models of every live instance of a template.
    pub fn get_models(&mut self, name: &str) -> Result<Vec<Value>, EngineError> {
        let clones = self.get_clones(name)?;
        Ok(clones
            .iter()
            .filter_map(|c| self.doc.elem(*c))
            .filter_map(|e| e.state.model.clone())
            .collect())
    }

    /// Position of the clone among same-named siblings.
    pub fn get_index(&self, node: NodeId) -> Option<usize> {
        let clone = self.get_clone_node(node, false)?;
        let name = self.template_name(clone)?;
        let container = self.doc.parent(clone)?;
        self.clone_children(container, &name)
            .iter()
            .position(|c| *c == clone)
    }

    /// Resolve any node to its owning clone root; with `main`, to the
    /// outermost clone rather than the nearest sub-clone.
    pub fn get_clone_node(&self, node: NodeId, main: bool) -> Option<NodeId> {
        self.doc.closest(node, |e| {
            e.has_class(marker::CLONE) && (!main || !e.has_class(marker::SUB_CLONE))
        })
    }

    /// The single write-back entry point for the external event layer:
    /// store `value` at the control's bound field on its clone's model
    /// and sync the control state.
    pub fn update_field(&mut self, control: NodeId, value: Value) {
        let Some(field) = self
            .doc
            .elem(control)
            .and_then(|e| e.rules.as_ref())
            .and_then(|r| r.edit_field.clone())
        else {
            return;
        };
        {
            let elem = self.doc.elem_mut(control).unwrap();
            let checkable = elem.tag == "input"
                && matches!(elem.attr("type"), Some("checkbox") | Some("radio"));
            if checkable {
                elem.set_prop("checked", model::real_truth(&value));
            } else if matches!(elem.tag.as_str(), "input" | "select" | "textarea") {
                elem.control_value = Some(model::to_display(&value));
            }
        }
        if let Some(clone) = self.get_clone_node(control, false) {
            let mut data = self
                .doc
                .elem(clone)
                .and_then(|e| e.state.model.clone())
                .unwrap_or(Value::Null);
            model::assign(&mut data, &field, value);
            self.doc.elem_mut(clone).unwrap().state.model = Some(data);
        }
    }

    /// Swap the clone with its previous sibling. The animated variant
    /// belongs to the UI collaborator; this is the structural move.
    pub fn move_up(&mut self, clone: NodeId) -> Option<NodeId> {
        self.move_clone(clone, true)
    }

    /// Swap the clone with its next sibling.
    pub fn move_down(&mut self, clone: NodeId) -> Option<NodeId> {
        self.move_clone(clone, false)
    }

    fn move_clone(&mut self, node: NodeId, up: bool) -> Option<NodeId> {
        let clone = self.get_clone_node(node, false)?;
        let container = self.doc.parent(clone)?;
        let siblings = self.doc.element_children(container);
        let pos = siblings.iter().position(|c| *c == clone)?;
        if up {
            let target = *siblings.get(pos.checked_sub(1)?)?;
            self.doc.insert_before(target, clone);
        } else {
            let target = *siblings.get(pos + 1)?;
            self.doc.insert_after(target, clone);
        }
        Some(clone)
    }

    // ---- creation internals ----

    /// Clone the rule tree, assign the next ordinal, inject, insert into
    /// the container, and queue post-walk hooks.
    pub(crate) fn replicate(
        &mut self,
        template: &CompiledTemplate,
        data: &mut Value,
        options: &CloneOptions,
        deferred: &mut Vec<Deferred>,
    ) -> Result<NodeId, EngineError> {
        let container = match options.container {
            Some(provided) => self.resolve_container(provided, &template.name),
            None => template.container,
        };
        let clone = self.doc.deep_copy(template.root);
        let count = {
            let state = &mut self.doc.elem_mut(container).unwrap().state;
            let counter = state.counts.entry(template.name.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        self.inject(
            clone,
            data,
            count,
            options.html,
            options.transform.as_deref(),
            deferred,
        )?;

        if !template.wrapped {
            self.insert_unwrapped(container, &template.name, clone, options.top);
        } else if options.top {
            self.doc.prepend(container, clone);
        } else {
            self.doc.append(container, clone);
        }

        if template.separators > 0 {
            self.display_separators(container, &template.name);
        }
        for name in self.initializers.clone() {
            deferred.push(Deferred::CloneCallback { name, clone });
        }
        if let Some(name) = &options.callback {
            deferred.push(Deferred::CloneCallback {
                name: name.clone(),
                clone,
            });
        }
        if options.fade {
            deferred.push(Deferred::FadeIn { node: clone });
        }
        Ok(clone)
    }

    /// An explicit container may be the holding element itself or an
    /// ancestor of it; resolve to the node tagged for this template.
    fn resolve_container(&self, provided: NodeId, name: &str) -> NodeId {
        let holds = format!("{}{}", marker::HOLDS_PREFIX, name);
        if self.doc.has_class(provided, &holds) {
            return provided;
        }
        self.doc
            .descendants_with_class(provided, &holds)
            .first()
            .copied()
            .unwrap_or(provided)
    }

    /// Insert a clone into a container its template shares with other
    /// templates. The first clone of a name lands at the position implied
    /// by the recorded sibling ordering; later ones join their kin.
    fn insert_unwrapped(&mut self, container: NodeId, name: &str, clone: NodeId, top: bool) {
        let same = self.clone_children(container, name);
        if let Some(first) = same.first().copied() {
            if top {
                self.doc.insert_before(first, clone);
            } else {
                let last = *same.last().unwrap();
                self.doc.insert_after(last, clone);
            }
            return;
        }

        let contents = self
            .doc
            .elem(container)
            .and_then(|e| e.state.contents.clone());
        let Some(contents) = contents else {
            self.doc.append(container, clone);
            return;
        };
        let Some(slot) = contents.iter().position(|e| e.as_deref() == Some(name)) else {
            self.doc.append(container, clone);
            return;
        };
        // each earlier template occupies one recorded slot but
        // contributes its current clone count to the child list
        let mut adjustment: i64 = 0;
        for entry in &contents {
            let Some(entry_name) = entry else { continue };
            let first_slot = contents
                .iter()
                .position(|e| e.as_ref() == Some(entry_name))
                .unwrap_or(usize::MAX);
            if first_slot < slot {
                adjustment += self.clone_children(container, entry_name).len() as i64 - 1;
            }
        }
        let target = slot as i64 + adjustment;
        let kids = self.doc.element_children(container);
        if target >= 0 && (target as usize) < kids.len() {
            let anchor = kids[target as usize];
            self.doc.insert_before(anchor, clone);
        } else {
            self.doc.append(container, clone);
        }
    }

    /// Every clone shows its separator except the last; the
    /// last-separator shows only on the second-to-last clone, replacing
    /// its regular separator.
    fn display_separators(&mut self, container: NodeId, name: &str) {
        let clones = self.clone_children(container, name);
        for clone in &clones {
            for sep in self.doc.descendants_with_class(*clone, marker::SEPARATOR) {
                self.doc.elem_mut(sep).unwrap().visible = true;
            }
        }
        if let Some(last) = clones.last() {
            for sep in self.doc.descendants_with_class(*last, marker::SEPARATOR) {
                self.doc.elem_mut(sep).unwrap().visible = false;
            }
        }
        for clone in &clones {
            for sep in self
                .doc
                .descendants_with_class(*clone, marker::LAST_SEPARATOR)
            {
                self.doc.elem_mut(sep).unwrap().visible = false;
            }
        }
        if clones.len() >= 2 {
            let second_last = clones[clones.len() - 2];
            let last_seps = self
                .doc
                .descendants_with_class(second_last, marker::LAST_SEPARATOR);
            if !last_seps.is_empty() {
                for sep in last_seps {
                    self.doc.elem_mut(sep).unwrap().visible = true;
                }
                for sep in self
                    .doc
                    .descendants_with_class(second_last, marker::SEPARATOR)
                {
                    self.doc.elem_mut(sep).unwrap().visible = false;
                }
            }
        }
    }

    // ---- removal internals ----

    fn array_field(&self, clone: NodeId) -> Option<String> {
        if !self.doc.has_class(clone, marker::SUB_CLONE) {
            return None;
        }
        self.doc
            .elem(clone)?
            .rules
            .as_ref()?
            .array
            .clone()
    }

    fn template_name(&self, clone: NodeId) -> Option<String> {
        self.doc
            .elem(clone)?
            .rules
            .as_ref()?
            .template
            .clone()
    }

    /// Remove the sub-clone's entry from its holder model's array field.
    fn splice_holder_array(&mut self, clone: NodeId, field: &str) {
        let Some(index) = self.get_index(clone) else { return };
        let Some(container) = self.doc.parent(clone) else { return };
        let Some(holder) = self.get_clone_node(container, false) else {
            return;
        };
        let Some(elem) = self.doc.elem_mut(holder) else { return };
        if let Some(model) = &mut elem.state.model {
            if let Some(Value::Array(items)) = model.get_mut(field) {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
    }

    /// Structural removal shared by destroy/empty: detach, resync the
    /// holder's array field, refresh placeholders.
    pub(crate) fn remove_clone(
        &mut self,
        clone: NodeId,
        array_field: Option<String>,
    ) -> Result<(), EngineError> {
        let container = self.doc.parent(clone);
        self.doc.detach(clone);
        if let (Some(container), Some(field)) = (container, array_field) {
            self.update_array_by_name(container, &field);
        }
        self.refresh_placeholders();
        Ok(())
    }

    /// Rebuild a holder model's array field from the live sub-clones.
    pub(crate) fn update_array(&mut self, sub_clone: NodeId) {
        let Some(clone) = self.get_clone_node(sub_clone, false) else {
            return;
        };
        let Some(parent) = self.doc.parent(clone) else { return };
        let field = self.array_field(clone);
        if let Some(field) = field {
            self.update_array_by_name(parent, &field);
        }
    }

    fn update_array_by_name(&mut self, node: NodeId, field: &str) {
        let Some(holder) = self.get_clone_node(node, false) else {
            return;
        };
        let owns_field = self
            .doc
            .elem(holder)
            .and_then(|e| e.rules.as_ref())
            .is_some_and(|r| r.subs.iter().any(|s| s == field));
        if !owns_field {
            return;
        }
        let Some(main) = self.get_clone_node(holder, true) else { return };
        let Some(main_name) = self.template_name(main) else { return };
        let sub_name = sub_template_name(&main_name, field);
        let models: Vec<Value> = self
            .doc
            .descendants_with_class(holder, &sub_name)
            .iter()
            .filter_map(|n| self.doc.elem(*n))
            .map(|e| e.state.model.clone().unwrap_or(Value::Null))
            .collect();
        let mut data = self
            .doc
            .elem(holder)
            .and_then(|e| e.state.model.clone())
            .unwrap_or(Value::Null);
        model::assign(&mut data, field, Value::Array(models));
        self.doc.elem_mut(holder).unwrap().state.model = Some(data);
    }

    /// A node with `data-placeholder={name}` is visible exactly when the
    /// named template has no live clones.
    pub(crate) fn refresh_placeholders(&mut self) {
        let placeholders: Vec<(NodeId, String)> = self
            .doc
            .subtree(self.doc.root())
            .into_iter()
            .filter_map(|n| {
                let name = self.doc.elem(n)?.attr("data-placeholder")?.to_string();
                Some((n, name))
            })
            .collect();
        for (node, name) in placeholders {
            let occupied = self
                .store
                .get(&name)
                .map(|t| !self.clone_children(t.container, &name).is_empty())
                .unwrap_or(false);
            self.doc.elem_mut(node).unwrap().visible = !occupied;
        }
    }

    fn sub_name_for(&self, holder: NodeId, array_field: &str) -> Result<String, EngineError> {
        let main = self
            .get_clone_node(holder, true)
            .ok_or_else(|| EngineError::TemplateNotFound {
                name: format!("<holder of {array_field}>"),
            })?;
        let name = self
            .template_name(main)
            .ok_or_else(|| EngineError::TemplateNotFound {
                name: format!("<holder of {array_field}>"),
            })?;
        Ok(sub_template_name(&name, array_field))
    }
}
