//! Serializing the arena tree back to markup
//!
//! Output is the observable surface of the engine: tests and callers
//! compare rendered markup, so serialization is deterministic — classes
//! first, attributes in stored order, boolean properties last.

use super::arena::{Document, Element, NodeId, NodeKind};
use super::parse::is_void_element;

impl Document {
    /// Serialize the whole document (children of the synthetic root).
    pub fn markup(&self) -> String {
        self.inner_markup(self.root())
    }

    /// Serialize the children of `id`.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element(elem) => self.write_element(id, elem, out),
        }
    }

    fn write_element(&self, id: NodeId, elem: &Element, out: &mut String) {
        out.push('<');
        out.push_str(&elem.tag);

        if !elem.classes().is_empty() {
            out.push_str(" class=\"");
            out.push_str(&escape_attr(&elem.classes().join(" ")));
            out.push('"');
        }

        let value_override = elem.control_value.is_some() && elem.tag == "input";
        for (name, value) in elem.attrs() {
            // live control value and boolean props shadow static attributes
            if elem.props().iter().any(|(n, _)| n == name) {
                continue;
            }
            if value_override && name == "value" {
                continue;
            }
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }

        if value_override {
            out.push_str(" value=\"");
            out.push_str(&escape_attr(elem.control_value.as_deref().unwrap_or("")));
            out.push('"');
        }

        for (name, on) in elem.props() {
            if *on {
                out.push(' ');
                out.push_str(name);
            }
        }

        if !elem.visible {
            out.push_str(" hidden");
        }

        out.push('>');

        if is_void_element(&elem.tag) {
            return;
        }

        if elem.tag == "textarea" {
            if let Some(value) = &elem.control_value {
                out.push_str(&escape_text(value));
            } else {
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
            }
        } else {
            for child in self.children(id) {
                self.write_node(*child, out);
            }
        }

        out.push_str("</");
        out.push_str(&elem.tag);
        out.push('>');
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            other => out.push(other),
        }
    }
    out
}
