//! Lenient fragment parsing from the html5gum token stream
//!
//! The engine assumes trusted markup authors, so parsing never fails:
//! stray end tags are ignored, unclosed elements are closed at end of
//! input, and comments/doctypes are dropped.

use html5gum::{State, Token, Tokenizer};

use super::arena::{Document, NodeId};

/// Void elements that cannot have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

impl Document {
    /// Parse a complete document. Top-level nodes become children of the
    /// synthetic root.
    pub fn from_markup(markup: &str) -> Self {
        let mut doc = Document::new();
        let roots = doc.parse_fragment(markup);
        let root = doc.root();
        for node in roots {
            doc.append(root, node);
        }
        doc
    }

    /// Parse a markup fragment into detached nodes, returned in source
    /// order. Text between top-level elements is preserved.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let mut tokenizer = Tokenizer::new(markup);
        let mut stack: Vec<NodeId> = Vec::new();
        let mut roots: Vec<NodeId> = Vec::new();

        while let Some(token_result) = tokenizer.next() {
            let Ok(token) = token_result else { continue };
            match token {
                Token::StartTag(tag) => {
                    let name = String::from_utf8_lossy(&tag.name).to_ascii_lowercase();
                    let node = self.create_element(name.clone());
                    for (key, value) in tag.attributes.iter() {
                        let key = String::from_utf8_lossy(key).into_owned();
                        let value = String::from_utf8_lossy(value).into_owned();
                        let elem = self.elem_mut(node).unwrap();
                        if key == "class" {
                            for class in value.split_whitespace() {
                                elem.add_class(class);
                            }
                        } else {
                            elem.set_attr(&key, value);
                        }
                    }
                    if tag.self_closing || is_void_element(&name) {
                        attach(self, &stack, &mut roots, node);
                    } else {
                        // raw-text element states per the HTML5 tokenizer spec
                        match name.as_str() {
                            "script" | "style" => tokenizer.set_state(State::ScriptData),
                            "textarea" | "title" => tokenizer.set_state(State::RcData),
                            _ => {}
                        }
                        stack.push(node);
                    }
                }
                Token::EndTag(tag) => {
                    let end_name = String::from_utf8_lossy(&tag.name).to_ascii_lowercase();
                    let matching = stack
                        .iter()
                        .rposition(|id| self.elem(*id).is_some_and(|e| e.tag == end_name));
                    if let Some(idx) = matching {
                        while stack.len() > idx {
                            let node = stack.pop().unwrap();
                            attach(self, &stack, &mut roots, node);
                        }
                    }
                    // stray end tag: ignore
                }
                Token::String(text) => {
                    let text = String::from_utf8_lossy(&text).into_owned();
                    if text.is_empty() {
                        continue;
                    }
                    match stack.last() {
                        Some(parent) => self.push_text(*parent, &text),
                        None => {
                            let node = self.create_text(text);
                            roots.push(node);
                        }
                    }
                }
                Token::Comment(_) | Token::Doctype(_) | Token::Error(_) => {}
            }
        }

        while let Some(node) = stack.pop() {
            attach(self, &stack, &mut roots, node);
        }

        roots
    }

    /// Append text to `parent`, merging with a trailing text node.
    fn push_text(&mut self, parent: NodeId, text: &str) {
        if let Some(last) = self.children(parent).last().copied() {
            if let Some(existing) = self.text(last) {
                let merged = format!("{existing}{text}");
                self.set_text(last, merged);
                return;
            }
        }
        let node = self.create_text(text);
        self.append(parent, node);
    }
}

fn attach(doc: &mut Document, stack: &[NodeId], roots: &mut Vec<NodeId>, node: NodeId) {
    match stack.last() {
        Some(parent) => doc.append(*parent, node),
        None => roots.push(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let doc = Document::from_markup("<div>hello</div>");
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.elem(div).unwrap().tag, "div");
        let text = doc.children(div)[0];
        assert_eq!(doc.text(text), Some("hello"));
    }

    #[test]
    fn test_attributes_and_classes() {
        let doc = Document::from_markup(r#"<p id=x class="a b" data-tag=y></p>"#);
        let p = doc.children(doc.root())[0];
        let elem = doc.elem(p).unwrap();
        assert_eq!(elem.attr("id"), Some("x"));
        assert_eq!(elem.attr("data-tag"), Some("y"));
        assert!(elem.has_class("a"));
        assert!(elem.has_class("b"));
        assert_eq!(elem.attr("class"), None);
    }

    #[test]
    fn test_nested_and_mixed_content() {
        let doc = Document::from_markup("<p>Hello <b>world</b> there</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(doc.deep_text(p), "Hello world there");
    }

    #[test]
    fn test_void_elements() {
        let doc = Document::from_markup("<div><br><input type=text></div>");
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.children(div).len(), 2);
        let input = doc.children(div)[1];
        assert_eq!(doc.elem(input).unwrap().tag, "input");
        assert!(doc.children(input).is_empty());
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = Document::from_markup("<div></span>text</div>");
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.deep_text(div), "text");
    }

    #[test]
    fn test_unclosed_elements_closed_at_eof() {
        let doc = Document::from_markup("<ul><li>one<li>two");
        let ul = doc.children(doc.root())[0];
        // without an end tag the second li nests inside the first
        assert_eq!(doc.elem(ul).unwrap().tag, "ul");
        assert!(!doc.children(ul).is_empty());
    }

    #[test]
    fn test_fragment_with_top_level_text() {
        let mut doc = Document::new();
        let roots = doc.parse_fragment(", ");
        assert_eq!(roots.len(), 1);
        assert_eq!(doc.text(roots[0]), Some(", "));
    }

    #[test]
    fn test_textarea_preserves_raw_text() {
        let doc = Document::from_markup("<textarea>~~address~~</textarea>");
        let ta = doc.children(doc.root())[0];
        assert_eq!(doc.deep_text(ta), "~~address~~");
    }
}
