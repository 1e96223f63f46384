//! stencil - a declarative template compilation and data injection engine
//!
//! A markup fragment containing placeholder tokens compiles once into a
//! reusable stencil; the engine then produces and maintains live clone
//! instances bound to arbitrary data, including nested repeating
//! sub-templates reconciled incrementally on every update.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use stencil::{CloneOptions, Engine};
//!
//! let mut engine = Engine::from_markup(
//!     r#"<div id=books><p id=book class=stencil-template>~~title~~</p></div>"#,
//! );
//! engine
//!     .clone_template("book", vec![json!({ "title": "The DOM" })], CloneOptions::new())
//!     .unwrap();
//! assert!(engine.markup().contains("The DOM"));
//! ```

pub mod compile;
pub mod engine;
pub mod error;
pub mod markup;
pub mod model;
pub mod settings;

pub use compile::{marker, BindingRule, FieldRef, RuleSet};
pub use engine::{
    CloneOptions, CompiledTemplate, DestroyOptions, Effects, EmptyOptions, Engine, EngineInfo,
    NoEffects, RefreshOptions, TemplateStore,
};
pub use error::EngineError;
pub use markup::{Document, NodeId};
pub use settings::RunSettings;
