//! Compiled binding rules
//!
//! Each rule-carrying node holds a [`RuleSet`]: a closed, ordered set of
//! [`BindingRule`] variants. Injection processes the set with exhaustive
//! pattern matching, so adding a variant forces every consumer to handle
//! it.

use super::scan::{COUNT_FIELD, VALUE_FIELD};

/// Engine-owned class vocabulary, also the external stylistic hooks.
pub mod marker {
    /// Marks an element as a template definition awaiting compilation
    pub const TEMPLATE: &str = "stencil-template";
    /// Compiled template roots and their live instances
    pub const CLONE: &str = "stencil-clone";
    /// Roots of loop-driven sub-templates and their instances
    pub const SUB_CLONE: &str = "stencil-sub-clone";
    /// Any node carrying compiled rules
    pub const NODE: &str = "stencil-node";
    /// Nodes bound by a text or value rule
    pub const FIELD: &str = "stencil-field";
    /// Prefix for the per-field hook class, e.g. `stencil-field-book-title`
    pub const FIELD_PREFIX: &str = "stencil-field-";
    /// Elements holding clone instances
    pub const CONTAINER: &str = "stencil-container";
    /// Container tag for one template name, e.g. `stencil-holds-book`
    pub const HOLDS_PREFIX: &str = "stencil-holds-";
    /// Loop containers
    pub const ARRAY: &str = "stencil-array";
    /// Inter-instance separator span
    pub const SEPARATOR: &str = "stencil-separator";
    /// Separator shown only before the final instance
    pub const LAST_SEPARATOR: &str = "stencil-last-separator";
    /// Controls whose live value writes back into the model
    pub const EDITABLE: &str = "stencil-editable";
}

/// A field reference resolved at injection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// The clone's 1-based ordinal (`[count]`)
    Count,
    /// The whole data object (`[value]`)
    Value,
    /// A dotted path into the data object
    Path(String),
}

impl FieldRef {
    pub fn parse(field: &str) -> Self {
        match field {
            COUNT_FIELD => FieldRef::Count,
            VALUE_FIELD => FieldRef::Value,
            path => FieldRef::Path(path.to_string()),
        }
    }

    /// The raw field text, used for the CSS hook class.
    pub fn as_str(&self) -> &str {
        match self {
            FieldRef::Count => COUNT_FIELD,
            FieldRef::Value => VALUE_FIELD,
            FieldRef::Path(p) => p,
        }
    }
}

/// One attribute binding: literal prefix + resolved field + literal suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRule {
    pub name: String,
    pub prefix: String,
    pub field: FieldRef,
    pub suffix: String,
}

/// One boolean property binding, truthiness-coerced at injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropRule {
    pub name: String,
    pub field: String,
}

/// One class binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRule {
    /// Single-entry form: add a class equal to the field's string value
    Literal { field: String },
    /// Toggle `on` by the field's truthiness, and `off` the opposite way
    Toggle {
        field: String,
        on: String,
        off: Option<String>,
    },
}

/// A repeating-group binding: the sub-template and its source array field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopRule {
    pub template: String,
    pub field: String,
}

/// The closed set of bindings a node may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingRule {
    /// Pre-injection hook run against the raw data
    Transform(String),
    /// Repeating sub-template container
    Loop(LoopRule),
    /// Replace text content
    Text(FieldRef),
    /// Set a form control's current value
    Value(FieldRef),
    /// Boolean properties
    Props(Vec<PropRule>),
    /// Attribute bindings
    Attrs(Vec<AttrRule>),
    /// Class bindings
    Classes(Vec<ClassRule>),
    /// Visible while the field is present and non-null
    Require(String),
    /// Visible while the field is absent or null
    Missing(String),
    /// Visible while the field is truthy
    Truthy(String),
    /// Visible while the field is falsy
    Falsy(String),
    /// Post-injection hook run against the populated node
    Callback(String),
}

impl BindingRule {
    /// Canonical processing position. Injection relies on rules being
    /// stored in this order.
    fn rank(&self) -> u8 {
        match self {
            BindingRule::Transform(_) => 0,
            BindingRule::Loop(_) => 1,
            BindingRule::Text(_) => 2,
            BindingRule::Value(_) => 3,
            BindingRule::Props(_) => 4,
            BindingRule::Attrs(_) => 5,
            BindingRule::Classes(_) => 6,
            BindingRule::Require(_) => 7,
            BindingRule::Missing(_) => 8,
            BindingRule::Truthy(_) => 9,
            BindingRule::Falsy(_) => 10,
            BindingRule::Callback(_) => 11,
        }
    }
}

/// Everything compiled onto one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    /// Template name, set on clone roots
    pub template: Option<String>,
    /// Source array field, set on sub-template roots
    pub array: Option<String>,
    /// Array fields that have sub-templates under this clone root
    pub subs: Vec<String>,
    /// Bound field of a two-way-editable control
    pub edit_field: Option<String>,
    rules: Vec<BindingRule>,
}

impl RuleSet {
    /// Insert a rule at its canonical position (stable among equals).
    pub fn push(&mut self, rule: BindingRule) {
        let pos = self
            .rules
            .iter()
            .position(|r| r.rank() > rule.rank())
            .unwrap_or(self.rules.len());
        self.rules.insert(pos, rule);
    }

    pub fn rules(&self) -> &[BindingRule] {
        &self.rules
    }

    /// Install a loop rule, replacing any previous one — a node holds at
    /// most one repeating group.
    pub fn set_loop(&mut self, rule: LoopRule) {
        self.rules.retain(|r| !matches!(r, BindingRule::Loop(_)));
        self.push(BindingRule::Loop(rule));
    }

    pub fn loop_rule(&self) -> Option<&LoopRule> {
        self.rules.iter().find_map(|r| match r {
            BindingRule::Loop(l) => Some(l),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
            && self.template.is_none()
            && self.array.is_none()
            && self.subs.is_empty()
            && self.edit_field.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_canonical_order() {
        let mut set = RuleSet::default();
        set.push(BindingRule::Callback("app.done".to_string()));
        set.push(BindingRule::Text(FieldRef::Path("title".to_string())));
        set.push(BindingRule::Transform("app.prep".to_string()));
        let ranks: Vec<u8> = set.rules().iter().map(BindingRule::rank).collect();
        assert_eq!(ranks, vec![0, 2, 11]);
    }

    #[test]
    fn test_field_ref_parse() {
        assert_eq!(FieldRef::parse("[count]"), FieldRef::Count);
        assert_eq!(FieldRef::parse("[value]"), FieldRef::Value);
        assert_eq!(
            FieldRef::parse("a.b"),
            FieldRef::Path("a.b".to_string())
        );
    }

    #[test]
    fn test_loop_rule_lookup() {
        let mut set = RuleSet::default();
        assert!(set.loop_rule().is_none());
        set.push(BindingRule::Loop(LoopRule {
            template: "book-authors-instance".to_string(),
            field: "authors".to_string(),
        }));
        assert_eq!(set.loop_rule().unwrap().field, "authors");
    }
}
