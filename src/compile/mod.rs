//! Rule compiler: placeholder scanning, binding rules, and the one-shot
//! compile pass

pub(crate) mod compiler;
pub mod rules;
pub mod scan;

pub use rules::{marker, AttrRule, BindingRule, ClassRule, FieldRef, LoopRule, PropRule, RuleSet};
