//! Model access contracts shared with the engine's collaborators
//!
//! The core reads and writes caller-supplied data through three narrow
//! contracts: a dotted-path value reader/writer over [`serde_json::Value`],
//! a truthiness predicate, and kebab/camel case conversion. Event layers
//! and other collaborators use the same functions, so their semantics are
//! part of the public surface.

use serde_json::Value;

/// Read the value at a dotted field path.
///
/// Path segments index into objects by key and into arrays by numeric
/// position. A missing segment, a `null` along the way, or an
/// unindexable value yields `None`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// let data = json!({ "a": { "b": 7 } });
/// assert_eq!(stencil::model::value(&data, "a.b"), Some(&json!(7)));
/// assert_eq!(stencil::model::value(&data, "a.x"), None);
/// ```
pub fn value<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        if current.is_null() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Write `new_value` at a dotted field path, creating intermediate objects
/// as needed. A non-object value in the way (including the root) is
/// replaced by an object.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// let mut data = json!({ "a": { "b": 7 } });
/// stencil::model::assign(&mut data, "a.b", json!(21));
/// assert_eq!(data, json!({ "a": { "b": 21 } }));
/// ```
pub fn assign(data: &mut Value, path: &str, new_value: Value) {
    let mut current = data;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        let map = current.as_object_mut().unwrap();
        if i == segments.len() - 1 {
            map.insert((*segment).to_string(), new_value);
            return;
        }
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
}

/// The "real" boolean truth of a value.
///
/// Empty strings, empty arrays, `null`, zero, and the negative words
/// ("f", "false", "n", "no", "0", any case) are false; everything else,
/// including empty objects and `0.5`, is true.
pub fn real_truth(data: &Value) -> bool {
    match data {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && !is_falsey_word(s),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn is_falsey_word(s: &str) -> bool {
    ["f", "false", "n", "no", "0"]
        .iter()
        .any(|w| s.eq_ignore_ascii_case(w))
}

/// Convert a kebab-case code to camelCase: `ready-set-go` → `readySetGo`.
pub fn to_camel(kebab: &str) -> String {
    let mut out = String::with_capacity(kebab.len());
    let mut upper_next = false;
    for ch in kebab.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a camelCase string to kebab-case: `readySetGo` → `ready-set-go`.
///
/// Runs of uppercase letters collapse into one dash segment and
/// whitespace is dropped, matching the behavior of the conversion used by
/// the markup-facing field-class mangling.
pub fn to_kebab(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    let mut prev_upper = false;
    for ch in camel.chars() {
        if ch.is_whitespace() {
            prev_upper = false;
            continue;
        }
        if ch.is_uppercase() {
            if !prev_upper {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_upper = true;
        } else {
            out.push(ch);
            prev_upper = false;
        }
    }
    out.trim_start_matches('-').to_string()
}

/// Render a primitive value the way it is injected into text and
/// attributes. Non-primitives fall back to compact JSON.
pub fn to_display(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// True for string, number, and boolean values — the only types the
/// text and value rules will inject.
pub fn is_primitive(data: &Value) -> bool {
    matches!(data, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_nested() {
        let data = json!({ "a": { "b": { "c": "deep" } } });
        assert_eq!(value(&data, "a.b.c"), Some(&json!("deep")));
        assert_eq!(value(&data, "a.b"), Some(&json!({ "c": "deep" })));
    }

    #[test]
    fn test_value_array_index() {
        let data = json!({ "items": [{ "name": "first" }, { "name": "second" }] });
        assert_eq!(value(&data, "items.1.name"), Some(&json!("second")));
        assert_eq!(value(&data, "items.7.name"), None);
    }

    #[test]
    fn test_value_missing_and_null() {
        let data = json!({ "price": null });
        assert_eq!(value(&data, "price"), None);
        assert_eq!(value(&data, "absent"), None);
        assert_eq!(value(&data, "absent.deeper"), None);
    }

    #[test]
    fn test_assign_creates_intermediates() {
        let mut data = json!({});
        assign(&mut data, "a.b.c", json!(1));
        assert_eq!(data, json!({ "a": { "b": { "c": 1 } } }));
    }

    #[test]
    fn test_assign_overwrites_leaf() {
        let mut data = json!({ "a": { "b": 7 } });
        assign(&mut data, "a.b", json!(21));
        assert_eq!(value(&data, "a.b"), Some(&json!(21)));
    }

    #[test]
    fn test_real_truth_table() {
        let trues = [
            json!(true),
            json!(1),
            json!("1"),
            json!("t"),
            json!("TRue"),
            json!("Colbert"),
            json!(77),
            json!([5]),
            json!({}),
        ];
        let falses = [
            json!(false),
            json!(0),
            json!("0"),
            json!("f"),
            json!("F"),
            json!("faLSE"),
            json!("N"),
            json!("no"),
            json!(""),
            json!([]),
            json!(null),
        ];
        for v in &trues {
            assert!(real_truth(v), "expected truthy: {v}");
        }
        for v in &falses {
            assert!(!real_truth(v), "expected falsy: {v}");
        }
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(to_camel("ready-set-go"), "readySetGo");
        assert_eq!(to_kebab("readySetGo"), "ready-set-go");
        assert_eq!(to_kebab("HTMLCase"), "htmlcase");
        assert_eq!(to_kebab("Ready Set"), "ready-set");
    }

    #[test]
    fn test_to_display() {
        assert_eq!(to_display(&json!("x")), "x");
        assert_eq!(to_display(&json!(3)), "3");
        assert_eq!(to_display(&json!(true)), "true");
    }
}
