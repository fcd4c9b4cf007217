//! TEI element tree to JSON
//!
//! Every element becomes a JSON object:
//!
//! - attributes as `@name` keys (prefix dropped, `xml:id` → `@xmlId`,
//!   `xml:lang` → `@xmlLang`, namespace declarations omitted)
//! - children grouped by tag, in order of first appearance, as a single object
//!   or as an array when repeated or listed in [`TagRules::always_list`]
//! - the element's own text under `value`, unless a `<value>` child took the key
//!
//! Elements eligible for mixed content handling are written instead as
//! `{"@attr": ..., "content": [segments]}`, deciding eligibility once per
//! element during the same walk.

use serde_json::{Map, Value};

use crate::mixed_content::{TagRules, attribute_entries, serialize_mixed_content};
use crate::xml_tree::{Document, Element};

pub const VALUE_KEY: &str = "value";
pub const CONTENT_KEY: &str = "content";

/// Converts a whole document, wrapped as `{"<root tag>": ...}`.
pub fn document_to_json(doc: &Document, rules: &TagRules) -> Value {
    wrap_root(&doc.root, rules, element_to_json(&doc.root, rules))
}

pub fn element_to_json(element: &Element, rules: &TagRules) -> Value {
    if rules.is_eligible(element) {
        return serialize_mixed_content(element).to_json();
    }
    generic_node(element, rules, &|child| element_to_json(child, rules))
}

/// The order-blind conversion, applying no mixed content handling.
pub fn generic_document_to_json(doc: &Document, rules: &TagRules) -> Value {
    wrap_root(&doc.root, rules, generic_element_to_json(&doc.root, rules))
}

pub fn generic_element_to_json(element: &Element, rules: &TagRules) -> Value {
    generic_node(element, rules, &|child| generic_element_to_json(child, rules))
}

fn wrap_root(root: &Element, rules: &TagRules, node: Value) -> Value {
    let tag = root.local_name();
    let node = if rules.is_always_list(tag) {
        Value::Array(vec![node])
    } else {
        node
    };
    let mut obj = Map::new();
    obj.insert(tag.to_string(), node);
    Value::Object(obj)
}

fn generic_node(element: &Element, rules: &TagRules, convert_child: &dyn Fn(&Element) -> Value) -> Value {
    let mut obj = Map::new();

    for (key, value) in attribute_entries(element) {
        obj.insert(format!("@{}", key), Value::String(value));
    }

    let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
    for child in &element.children {
        let tag = child.local_name();
        let converted = convert_child(child);
        match groups.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, values)) => values.push(converted),
            None => groups.push((tag, vec![converted])),
        }
    }

    for (tag, mut values) in groups {
        let value = if rules.is_always_list(tag) || values.len() > 1 {
            Value::Array(values)
        } else {
            values.pop().unwrap_or(Value::Null)
        };
        obj.insert(tag.to_string(), value);
    }

    let text = element.direct_text();
    if !text.is_empty() {
        if obj.contains_key(VALUE_KEY) {
            tracing::debug!("<{}> has a <value> child, its direct text is not kept", element.local_name());
        } else {
            obj.insert(VALUE_KEY.to_string(), Value::String(text));
        }
    }

    Value::Object(obj)
}
