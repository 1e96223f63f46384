//! The one-shot rule compiler
//!
//! Scans a template's markup once, tags every relevant node with its
//! binding rules, and hands the annotated tree to the store for
//! stashing. Compiling the same markup twice produces structurally
//! identical rule trees.

use tracing::{debug, warn};

use crate::engine::store::{self, TemplateStore};
use crate::error::EngineError;
use crate::markup::{Document, NodeId};
use crate::model::to_kebab;

use super::rules::{marker, AttrRule, BindingRule, ClassRule, FieldRef, PropRule};
use super::scan::{is_token, split_token, strip_markers};

/// Compile the template rooted at the element whose `id` attribute equals
/// `name`, registering it (and any sub-templates and interleaved sibling
/// templates it discovers) in the store.
pub(crate) fn compile(
    doc: &mut Document,
    store: &mut TemplateStore,
    name: &str,
) -> Result<(), EngineError> {
    if store.contains(name) {
        return Ok(());
    }
    let root = doc
        .find_by_id(name)
        .filter(|id| doc.is_element(*id))
        .ok_or_else(|| EngineError::TemplateNotFound {
            name: name.to_string(),
        })?;
    debug!(template = name, "compiling");

    // record each template root's identity, then strip the public id so
    // the live document cannot re-select it as a definition
    let mut template_roots = vec![root];
    template_roots.extend(doc.descendants_with_class(root, marker::TEMPLATE));
    for node in &template_roots {
        let id = doc.elem(*node).and_then(|e| e.attr("id")).map(str::to_string);
        let elem = doc.elem_mut(*node).unwrap();
        elem.remove_attr("id");
        let rules = elem.rules_mut();
        rules.template = id;
        rules.subs = Vec::new();
    }

    let elements: Vec<NodeId> = doc
        .subtree(root)
        .into_iter()
        .filter(|n| doc.is_element(*n))
        .collect();

    for node in &elements {
        if is_field_node(doc, *node) {
            compile_field(doc, *node);
        }
    }

    compile_array_rule(doc, &elements);
    compile_class_rule(doc, &elements);
    compile_visibility_rule(doc, &elements, "data-require", BindingRule::Require);
    compile_visibility_rule(doc, &elements, "data-missing", BindingRule::Missing);
    compile_visibility_rule(doc, &elements, "data-true", BindingRule::Truthy);
    compile_visibility_rule(doc, &elements, "data-false", BindingRule::Falsy);

    for node in &elements {
        compile_props_and_attrs(doc, *node);
    }

    compile_separators(doc, root);

    store::stash(doc, store, root)?;
    Ok(())
}

/// CSS-safe hook class for a field path: camelCase flattened to kebab,
/// index brackets removed, dots turned into dashes.
pub(crate) fn field_class(field: &str) -> String {
    let mangled: String = to_kebab(field)
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .map(|c| if c == '.' { '-' } else { c })
        .collect();
    format!("{}{}", marker::FIELD_PREFIX, mangled)
}

/// A field node's first child is a text node whose whole content is one
/// placeholder token.
fn is_field_node(doc: &Document, node: NodeId) -> bool {
    doc.children(node)
        .first()
        .and_then(|first| doc.text(*first))
        .is_some_and(is_token)
}

fn compile_field(doc: &mut Document, node: NodeId) {
    let field = strip_markers(&doc.deep_text(node));
    if field.is_empty() {
        warn!(
            "{}",
            EngineError::MalformedRule {
                directive: "field".to_string(),
                value: doc.deep_text(node),
            }
        );
        return;
    }
    let field_ref = FieldRef::parse(&field);
    doc.clear_children(node);
    let hook = field_class(field_ref.as_str());
    let elem = doc.elem_mut(node).unwrap();
    elem.add_class(marker::NODE);
    elem.add_class(marker::FIELD);
    elem.add_class(&hook);
    if elem.tag == "textarea" {
        elem.add_class(marker::EDITABLE);
        let rules = elem.rules_mut();
        rules.edit_field = Some(field);
        rules.push(BindingRule::Value(field_ref));
    } else {
        elem.rules_mut().push(BindingRule::Text(field_ref));
    }
}

/// `data-array=~~field~~` marks the repeating-group root; the loop rule
/// itself lands on the parent when the tree is stashed.
fn compile_array_rule(doc: &mut Document, elements: &[NodeId]) {
    for node in elements {
        let Some(value) = attr_value(doc, *node, "data-array") else {
            continue;
        };
        let field = strip_markers(&value);
        doc.elem_mut(*node).unwrap().remove_attr("data-array");
        if field.is_empty() {
            warn!(
                "{}",
                EngineError::MalformedRule {
                    directive: "data-array".to_string(),
                    value,
                }
            );
            continue;
        }
        let elem = doc.elem_mut(*node).unwrap();
        elem.add_class(marker::NODE);
        elem.add_class(marker::SUB_CLONE);
        let rules = elem.rules_mut();
        rules.array = Some(field);
        rules.subs = Vec::new();
    }
}

fn compile_class_rule(doc: &mut Document, elements: &[NodeId]) {
    for node in elements {
        let Some(value) = attr_value(doc, *node, "data-class") else {
            continue;
        };
        doc.elem_mut(*node).unwrap().remove_attr("data-class");
        let stripped = strip_markers(&value);
        let mut list = Vec::new();
        for entry in stripped.split(';') {
            let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
            match parts.as_slice() {
                [field] if !field.is_empty() => list.push(ClassRule::Literal {
                    field: (*field).to_string(),
                }),
                [field, on, rest @ ..] if !field.is_empty() => list.push(ClassRule::Toggle {
                    field: (*field).to_string(),
                    on: (*on).to_string(),
                    off: rest.first().map(|s| (*s).to_string()),
                }),
                _ => warn!(
                    "{}",
                    EngineError::MalformedRule {
                        directive: "data-class".to_string(),
                        value: entry.to_string(),
                    }
                ),
            }
        }
        if !list.is_empty() {
            let elem = doc.elem_mut(*node).unwrap();
            elem.add_class(marker::NODE);
            elem.rules_mut().push(BindingRule::Classes(list));
        }
    }
}

fn compile_visibility_rule(
    doc: &mut Document,
    elements: &[NodeId],
    directive: &str,
    make: fn(String) -> BindingRule,
) {
    for node in elements {
        let Some(value) = attr_value(doc, *node, directive) else {
            continue;
        };
        doc.elem_mut(*node).unwrap().remove_attr(directive);
        let field = strip_markers(&value);
        if field.is_empty() {
            warn!(
                "{}",
                EngineError::MalformedRule {
                    directive: directive.to_string(),
                    value,
                }
            );
            continue;
        }
        let elem = doc.elem_mut(*node).unwrap();
        elem.add_class(marker::NODE);
        elem.rules_mut().push(make(field));
    }
}

/// Scan every attribute once: `data-prop-*` directives become property
/// rules, any other attribute embedding exactly one token becomes an
/// attribute rule, and value-style bindings mark the control two-way.
fn compile_props_and_attrs(doc: &mut Document, node: NodeId) {
    let Some(elem) = doc.elem(node) else { return };
    let tag = elem.tag.clone();
    let input_type = elem.attr("type").unwrap_or("text").to_string();
    let snapshot: Vec<(String, String)> = elem.attrs().to_vec();
    let transform = elem.attr("data-transform").map(str::to_string);
    let callback = elem.attr("data-callback").map(str::to_string);

    let mut props: Vec<PropRule> = Vec::new();
    let mut attrs: Vec<AttrRule> = Vec::new();
    let mut removed: Vec<String> = Vec::new();
    let mut edit_field: Option<String> = None;
    let mut value_rule: Option<FieldRef> = None;

    for (name, value) in &snapshot {
        if let Some(prop_name) = name.strip_prefix("data-prop-") {
            let field = strip_markers(value);
            removed.push(name.clone());
            if field.is_empty() {
                warn!(
                    "{}",
                    EngineError::MalformedRule {
                        directive: name.clone(),
                        value: value.clone(),
                    }
                );
                continue;
            }
            let prop_name = prop_name.to_ascii_lowercase();
            if prop_name == "checked" && tag == "input" {
                edit_field = Some(field.clone());
            }
            props.push(PropRule {
                name: prop_name,
                field,
            });
        } else if let Some((prefix, field, suffix)) = split_token(value) {
            let field_ref = FieldRef::parse(&field);
            let attr_name = name
                .strip_prefix("data-attr-")
                .unwrap_or(name.as_str())
                .to_string();
            let text_input =
                tag == "input" && input_type != "checkbox" && input_type != "radio";
            let bare_value = attr_name == "value" && prefix.is_empty() && suffix.is_empty();
            if (text_input && bare_value) || (tag == "select" && name == "data-option") {
                edit_field = Some(field.clone());
                value_rule = Some(field_ref.clone());
            }
            attrs.push(AttrRule {
                name: attr_name,
                prefix,
                field: field_ref,
                suffix,
            });
            removed.push(name.clone());
        }
    }

    if props.is_empty()
        && attrs.is_empty()
        && edit_field.is_none()
        && transform.is_none()
        && callback.is_none()
    {
        return;
    }

    let hook = edit_field.as_deref().map(field_class);
    let elem = doc.elem_mut(node).unwrap();
    elem.add_class(marker::NODE);
    if !props.is_empty() {
        elem.rules_mut().push(BindingRule::Props(props));
    }
    if !attrs.is_empty() {
        elem.rules_mut().push(BindingRule::Attrs(attrs));
    }
    if let Some(field) = edit_field {
        elem.add_class(marker::EDITABLE);
        if let Some(hook) = &hook {
            elem.add_class(hook);
        }
        elem.rules_mut().edit_field = Some(field);
    }
    if let Some(field_ref) = value_rule {
        elem.rules_mut().push(BindingRule::Value(field_ref));
    }
    if let Some(name) = transform {
        elem.rules_mut().push(BindingRule::Transform(name));
    }
    if let Some(name) = callback {
        elem.rules_mut().push(BindingRule::Callback(name));
    }
    for name in removed {
        doc.elem_mut(node).unwrap().remove_attr(&name);
    }
}

/// Convert `data-separator` / `data-last-separator` text into appended
/// marker spans on the template root and every sub-template root.
fn compile_separators(doc: &mut Document, root: NodeId) {
    let mut roots = vec![root];
    roots.extend(doc.descendants_with_class(root, marker::TEMPLATE));
    roots.extend(doc.descendants_with_class(root, marker::SUB_CLONE));
    for node in roots {
        append_separator(doc, node, "data-separator", marker::SEPARATOR);
        append_separator(doc, node, "data-last-separator", marker::LAST_SEPARATOR);
    }
}

fn append_separator(doc: &mut Document, node: NodeId, directive: &str, class: &str) {
    let Some(text) = attr_value(doc, node, directive) else {
        return;
    };
    if text.is_empty() {
        return;
    }
    // drop a trailing whitespace-only text node so the separator hugs
    // the last real child
    if let Some(last) = doc.children(node).last().copied() {
        if doc
            .text(last)
            .is_some_and(|t| t.chars().all(char::is_whitespace))
        {
            doc.detach(last);
        }
    }
    let span = doc.create_element("span");
    doc.elem_mut(span).unwrap().add_class(class);
    let content = doc.parse_fragment(&text);
    for child in content {
        doc.append(span, child);
    }
    doc.append(node, span);
}

fn attr_value(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.elem(node).and_then(|e| e.attr(name)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_class_mangling() {
        assert_eq!(field_class("title"), "stencil-field-title");
        assert_eq!(field_class("book.title"), "stencil-field-book-title");
        assert_eq!(field_class("displayName"), "stencil-field-display-name");
        assert_eq!(field_class("[count]"), "stencil-field-count");
    }

    #[test]
    fn test_is_field_node() {
        let doc = Document::from_markup("<p>~~name~~</p><p>plain</p><p>x ~~name~~</p>");
        let kids = doc.children(doc.root());
        assert!(is_field_node(&doc, kids[0]));
        assert!(!is_field_node(&doc, kids[1]));
        assert!(!is_field_node(&doc, kids[2]));
    }
}
