//! Arena-backed markup tree
//!
//! Nodes live in one flat arena and address each other by index, so a
//! compiled template can be instantiated by deep-copying its subtree
//! without any shared handles. Detached subtrees (compiled templates,
//! removed clones) stay in the arena but are unreachable from the root.

use std::collections::HashMap;

use serde_json::Value;

use crate::compile::rules::RuleSet;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single arena node: element or text.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

/// Runtime state attached to element nodes.
///
/// Clone roots carry a model and ordinal; containers carry per-template
/// counters and the recorded interleaving of sibling template names.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    /// Bound data for a clone root
    pub model: Option<Value>,
    /// 1-based ordinal for a clone root
    pub count: u32,
    /// Per-template-name rolling instance counters (containers)
    pub counts: HashMap<String, u32>,
    /// Ordered template names interleaved in this container; `None` marks
    /// a child that is not a template
    pub contents: Option<Vec<Option<String>>>,
}

/// An element node.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    /// Attributes in tokenizer order, `class` excluded
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    /// Boolean properties applied by property rules
    props: Vec<(String, bool)>,
    /// Visibility toggled by the require/missing/true/false rules
    pub visible: bool,
    /// Live value of a form control, overriding any static attribute
    pub control_value: Option<String>,
    /// Compiled binding rules, present only on rule-carrying nodes
    pub rules: Option<Box<RuleSet>>,
    pub state: NodeState,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            classes: Vec::new(),
            props: Vec::new(),
            visible: true,
            control_value: None,
            rules: None,
            state: NodeState::default(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(n, _)| n != name);
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn prop(&self, name: &str) -> bool {
        self.props
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .unwrap_or(false)
    }

    pub fn set_prop(&mut self, name: &str, value: bool) {
        match self.props.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.props.push((name.to_string(), value)),
        }
    }

    pub fn props(&self) -> &[(String, bool)] {
        &self.props
    }

    /// Rules accessor that creates an empty set on first use.
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        self.rules.get_or_insert_with(Default::default)
    }
}

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// The live markup document: an arena plus a synthetic root element that
/// holds the parsed top-level nodes.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.push(NodeKind::Element(Element::new("#document")));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Element(_))
    }

    pub fn elem(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    pub fn elem_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Text(t) => Some(t.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.nodes[id.index()].kind {
            *t = text.into();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.index()].children.insert(0, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` immediately before `anchor` among its siblings.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        self.detach(child);
        let pos = self.nodes[parent.index()]
            .children
            .iter()
            .position(|c| *c == anchor)
            .unwrap_or(0);
        self.nodes[parent.index()].children.insert(pos, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` immediately after `anchor` among its siblings.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        self.detach(child);
        let pos = self.nodes[parent.index()]
            .children
            .iter()
            .position(|c| *c == anchor)
            .map(|p| p + 1)
            .unwrap_or(self.nodes[parent.index()].children.len());
        self.nodes[parent.index()].children.insert(pos, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Remove `id` from its parent's child list. The subtree stays intact
    /// and can be re-attached later.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
    }

    /// Deep-copy a subtree, returning the detached copy's root. Rules and
    /// runtime state are cloned along with structure.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.index()].kind.clone();
        let copy = self.push(kind);
        let children: Vec<NodeId> = self.nodes[id.index()].children.clone();
        for child in children {
            let child_copy = self.deep_copy(child);
            self.nodes[copy.index()].children.push(child_copy);
            self.nodes[child_copy.index()].parent = Some(copy);
        }
        copy
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            out.push(*child);
            self.collect_descendants(*child, out);
        }
    }

    /// `id` and all its descendants in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        self.collect_descendants(id, &mut out);
        out
    }

    /// Nearest ancestor-or-self element matching the predicate.
    pub fn closest(
        &self,
        id: NodeId,
        pred: impl Fn(&Element) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(elem) = self.elem(node) {
                if pred(elem) {
                    return Some(node);
                }
            }
            current = self.parent(node);
        }
        None
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.elem(id).is_some_and(|e| e.has_class(class))
    }

    /// Direct element children, text nodes excluded.
    pub fn element_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Direct element children carrying the given class, in order.
    pub fn children_with_class(&self, parent: NodeId, class: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| self.has_class(*c, class))
            .collect()
    }

    /// Descendant elements carrying the given class, in document order.
    pub fn descendants_with_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.has_class(*d, class))
            .collect()
    }

    /// First element in the live document whose `id` attribute matches.
    pub fn find_by_id(&self, name: &str) -> Option<NodeId> {
        self.subtree(self.root).into_iter().find(|n| {
            self.elem(*n)
                .is_some_and(|e| e.attr("id") == Some(name))
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn deep_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.subtree(id) {
            if let Some(t) = self.text(node) {
                out.push_str(t);
            }
        }
        out
    }
}
