//! Annotate, convert generically, reconcile
//!
//! The three-pass route to the same JSON tree that [`crate::tei_json`] builds
//! in one walk. The ordered segments of each eligible element are encoded as
//! JSON into a temporary `mixed-content-json` attribute, the document goes
//! through the order-blind generic conversion, and the reconciliation pass
//! merges the encoded segments back and drops the unordered duplicates.
//!
//! [`reconcile`] also repairs generic trees produced elsewhere, as long as
//! they carry the `@mixed-content-json` key.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::mixed_content::{Segment, TagRules, serialize_mixed_content};
use crate::tei_json::{CONTENT_KEY, VALUE_KEY, generic_document_to_json};
use crate::xml_tree::{Document, Element};

pub const MIXED_CONTENT_ATTR: &str = "mixed-content-json";
pub const MIXED_CONTENT_KEY: &str = "@mixed-content-json";

/// Marking pass. Sets the encoded segments on every eligible element and
/// returns how many were marked.
pub fn mark_mixed_content(doc: &mut Document, rules: &TagRules) -> usize {
    let mut marked = 0;
    mark_element(&mut doc.root, rules, &mut marked);
    marked
}

// Parents are encoded before their children are marked, so no encoding
// contains another element's auxiliary attribute.
fn mark_element(element: &mut Element, rules: &TagRules, marked: &mut usize) {
    if rules.is_eligible(element) {
        let encoded = serialize_mixed_content(element).to_json().to_string();
        element.set_attribute(MIXED_CONTENT_ATTR, encoded);
        *marked += 1;
    }
    for child in element.children.iter_mut() {
        mark_element(child, rules, marked);
    }
}

/// Reconciliation pass over a generic tree, depth-first.
///
/// At each object the encoded segments are merged in and the auxiliary key
/// removed. An unreadable encoding is dropped and the node keeps its generic
/// shape. Children are reconciled before the parent's duplicate check.
pub fn reconcile(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            merge_mixed_content(obj);
            for child in obj.values_mut() {
                reconcile(child);
            }
            remove_unordered_duplicates(obj);
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                reconcile(item);
            }
        }
        _ => {}
    }
}

fn merge_mixed_content(obj: &mut Map<String, Value>) {
    let Some(encoded) = obj.shift_remove(MIXED_CONTENT_KEY) else {
        return;
    };

    let parsed = encoded.as_str().and_then(|s| serde_json::from_str::<Value>(s).ok());
    let mixed = match parsed {
        Some(Value::Object(mixed)) if has_readable_segments(&mixed) => mixed,
        _ => {
            tracing::debug!("Skipping unreadable mixed content encoding");
            return;
        }
    };

    for (key, value) in mixed {
        obj.insert(key, value);
    }
}

fn has_readable_segments(mixed: &Map<String, Value>) -> bool {
    mixed
        .get(CONTENT_KEY)
        .and_then(Value::as_array)
        .is_some_and(|segments| segments.iter().all(|seg| Segment::from_json(seg).is_some()))
}

/// With an ordered `content` list present, the generic text and every child
/// key whose tag appears as a segment type are redundant.
fn remove_unordered_duplicates(obj: &mut Map<String, Value>) {
    let Some(Value::Array(content)) = obj.get(CONTENT_KEY) else {
        return;
    };

    let segment_types: HashSet<String> = content
        .iter()
        .filter_map(|seg| seg.get("type").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    obj.retain(|key, _| {
        if key.starts_with('@') || key == CONTENT_KEY || key == "type" {
            return true;
        }
        key != VALUE_KEY && !segment_types.contains(key)
    });
}

/// All three passes on a copy of the document.
pub fn convert_via_side_channel(doc: &Document, rules: &TagRules) -> Value {
    let mut marked_doc = doc.clone();
    let marked = mark_mixed_content(&mut marked_doc, rules);
    tracing::debug!("Marked {} mixed content element(s)", marked);

    let mut value = generic_document_to_json(&marked_doc, rules);
    reconcile(&mut value);
    value
}
