//! Markup tree: arena storage, lenient parsing, and serialization

mod arena;
mod parse;
mod write;

pub use arena::{Document, Element, NodeId, NodeKind, NodeState};
