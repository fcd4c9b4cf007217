//! Mixed content classification and order-preserving serialization
//!
//! An element has mixed content when character data and child elements are
//! interleaved, e.g. `<note>see <ref>x</ref> and <ref>y</ref></note>`. For those
//! elements the child order carries meaning, so they are written as an ordered
//! list of [`Segment`]s instead of the keyed generic shape.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::xml_tree::{Attribute, Element, XML_NS};

/// Tags always converted to a JSON array, whatever their count.
pub const ALWAYS_LIST_TAGS: &[&str] = &["form", "sense", "cit", "usg", "ref", "bibl", "placeName", "note"];

/// Tags that carry explanatory prose and may hold mixed content.
pub const MIXED_CONTENT_TAGS: &[&str] = &["note", "def", "quote", "cit", "bibl", "etym", "sense"];

pub const TEXT_SEGMENT_TYPE: &str = "text";

/// The two tag sets steering the conversion. They are independent: membership
/// in one never implies anything about the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules {
    pub mixed_content: BTreeSet<String>,
    pub always_list: BTreeSet<String>,
}

impl Default for TagRules {
    fn default() -> Self {
        TagRules::new(MIXED_CONTENT_TAGS.iter().copied(), ALWAYS_LIST_TAGS.iter().copied())
    }
}

impl TagRules {
    pub fn new<'a, M, L>(mixed_content: M, always_list: L) -> Self
    where
        M: IntoIterator<Item = &'a str>,
        L: IntoIterator<Item = &'a str>,
    {
        TagRules {
            mixed_content: mixed_content.into_iter().map(str::to_string).collect(),
            always_list: always_list.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_mixed_content_tag(&self, local: &str) -> bool {
        self.mixed_content.contains(local)
    }

    pub fn is_always_list(&self, local: &str) -> bool {
        self.always_list.contains(local)
    }

    /// An element gets ordered-segment treatment when it is a TEI element
    /// whose tag is of interest and it actually holds mixed content.
    pub fn is_eligible(&self, element: &Element) -> bool {
        self.is_mixed_content_tag(element.local_name())
            && element.in_tei_namespace()
            && has_mixed_content(element)
    }
}

fn is_blank(text: Option<&str>) -> bool {
    text.is_none_or(|t| t.trim().is_empty())
}

/// Leading text together with at least one child, or any child with tail text.
pub fn has_mixed_content(element: &Element) -> bool {
    let has_text = !is_blank(element.text.as_deref());
    let has_children = !element.children.is_empty();
    let has_tail = element.children.iter().any(|c| !is_blank(c.tail.as_deref()));

    (has_text && has_children) || has_tail
}

/// Output key for an attribute: namespace prefix dropped, with `xml:id` and
/// `xml:lang` renamed so they stay distinct from plain `id` / `lang`.
pub fn attribute_key(attr: &Attribute) -> String {
    match (attr.namespace.as_deref(), attr.name.local.as_str()) {
        (Some(XML_NS), "id") => "xmlId".to_string(),
        (Some(XML_NS), "lang") => "xmlLang".to_string(),
        (_, local) => local.to_string(),
    }
}

/// Data attributes of an element as `(key, value)`, namespace declarations
/// excluded.
pub fn attribute_entries(element: &Element) -> Vec<(String, String)> {
    element
        .attributes
        .iter()
        .filter(|a| !a.is_namespace_declaration())
        .map(|a| (attribute_key(a), a.value.clone()))
        .collect()
}

/// One ordered unit of mixed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text {
        value: String,
    },
    Element {
        tag: String,
        /// The child's own leading text only.
        value: String,
        attributes: Vec<(String, String)>,
    },
}

impl Segment {
    pub fn segment_type(&self) -> &str {
        match self {
            Segment::Text { .. } => TEXT_SEGMENT_TYPE,
            Segment::Element { tag, .. } => tag,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        match self {
            Segment::Text { value } => {
                obj.insert("type".to_string(), Value::from(TEXT_SEGMENT_TYPE));
                obj.insert("value".to_string(), Value::from(value.as_str()));
            }
            Segment::Element { tag, value, attributes } => {
                obj.insert("type".to_string(), Value::from(tag.as_str()));
                obj.insert("value".to_string(), Value::from(value.as_str()));
                for (key, val) in attributes {
                    obj.insert(segment_attribute_key(key), Value::from(val.as_str()));
                }
            }
        }
        Value::Object(obj)
    }

    /// Reads back a segment written by [`Segment::to_json`].
    pub(crate) fn from_json(value: &Value) -> Option<Segment> {
        let obj = value.as_object()?;
        let seg_type = obj.get("type")?.as_str()?;
        let seg_value = obj.get("value").and_then(Value::as_str).unwrap_or_default().to_string();

        let attributes: Vec<(String, String)> = obj
            .iter()
            .filter(|(k, _)| *k != "type" && *k != "value")
            .map(|(k, v)| {
                let key = match k.strip_prefix('@') {
                    Some(stripped) if stripped == "type" || stripped == "value" => stripped.to_string(),
                    _ => k.clone(),
                };
                (key, v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            })
            .collect();

        if seg_type == TEXT_SEGMENT_TYPE && attributes.is_empty() {
            return Some(Segment::Text { value: seg_value });
        }
        Some(Segment::Element {
            tag: seg_type.to_string(),
            value: seg_value,
            attributes,
        })
    }
}

// `type` and `value` are the segment's own keys
fn segment_attribute_key(key: &str) -> String {
    if key == "type" || key == "value" {
        format!("@{}", key)
    } else {
        key.to_string()
    }
}

/// The ordered form of one eligible element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedContent {
    /// The element's own attributes, carried beside the segments.
    pub attributes: Vec<(String, String)>,
    pub content: Vec<Segment>,
}

impl MixedContent {
    /// `{"@attr": ..., "content": [...]}`
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (key, val) in &self.attributes {
            obj.insert(format!("@{}", key), Value::from(val.as_str()));
        }
        let content: Vec<Value> = self.content.iter().map(Segment::to_json).collect();
        obj.insert("content".to_string(), Value::Array(content));
        Value::Object(obj)
    }
}

/// Writes an element's content as segments in document order.
///
/// Leading text and child tails become `Text` segments when not blank, each
/// child becomes an `Element` segment carrying its own leading text and
/// attributes. Text values keep their whitespace as written.
pub fn serialize_mixed_content(element: &Element) -> MixedContent {
    let mut content = Vec::new();

    if let Some(text) = element.text.as_deref().filter(|t| !t.trim().is_empty()) {
        content.push(Segment::Text { value: text.to_string() });
    }

    for child in &element.children {
        content.push(Segment::Element {
            tag: child.local_name().to_string(),
            value: child.text.clone().unwrap_or_default(),
            attributes: attribute_entries(child),
        });

        if let Some(tail) = child.tail.as_deref().filter(|t| !t.trim().is_empty()) {
            content.push(Segment::Text { value: tail.to_string() });
        }
    }

    MixedContent {
        attributes: attribute_entries(element),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml_tree::Document;
    use serde_json::json;

    fn root(xml: &str) -> Element {
        Document::parse(xml).unwrap().root
    }

    #[test]
    fn test_text_with_child_is_mixed() {
        assert!(has_mixed_content(&root("<note>Pre <hi>3</hi></note>")));
    }

    #[test]
    fn test_tail_alone_is_mixed() {
        assert!(has_mixed_content(&root("<note><hi>3</hi> after</note>")));
    }

    #[test]
    fn test_text_only_is_not_mixed() {
        assert!(!has_mixed_content(&root("<def>Simple text only</def>")));
    }

    #[test]
    fn test_whitespace_around_children_is_not_mixed() {
        let el = root("<sense>\n  <def>a</def>\n  <cit>b</cit>\n</sense>");
        assert!(!has_mixed_content(&el));
    }

    #[test]
    fn test_eligible_requires_tag_of_interest() {
        let rules = TagRules::default();
        assert!(rules.is_eligible(&root("<note>a <hi>b</hi></note>")));
        assert!(!rules.is_eligible(&root("<p>a <hi>b</hi></p>")));
    }

    #[test]
    fn test_foreign_namespace_not_eligible() {
        let rules = TagRules::default();
        let doc = Document::parse(r#"<note xmlns:x="urn:other">a <x:note>b <hi>c</hi></x:note></note>"#).unwrap();
        assert!(rules.is_eligible(&doc.root));
        assert!(!rules.is_eligible(&doc.root.children[0]));

        let tei = Document::parse(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><note>a <hi>b</hi></note></TEI>"#).unwrap();
        assert!(rules.is_eligible(&tei.root.children[0]));
    }

    #[test]
    fn test_tag_sets_are_independent() {
        let rules = TagRules::new(["def", "p"], ["form"]);
        assert!(rules.is_mixed_content_tag("p"));
        assert!(!rules.is_always_list("p"));
        assert!(rules.is_always_list("form"));
        assert!(!rules.is_mixed_content_tag("form"));
    }

    #[test]
    fn test_order_preserved() {
        let el = root("<note>A<x>1</x>B<y>2</y></note>");
        let mixed = serialize_mixed_content(&el);
        let types: Vec<&str> = mixed.content.iter().map(Segment::segment_type).collect();
        assert_eq!(types, vec!["text", "x", "text", "y"]);
        assert_eq!(mixed.content[0], Segment::Text { value: "A".to_string() });
        assert_eq!(mixed.content[2], Segment::Text { value: "B".to_string() });
    }

    #[test]
    fn test_serialize_note_example() {
        let el = root(r#"<note>Pre <hi rend="sup">3</hi>Post</note>"#);
        let value = serialize_mixed_content(&el).to_json();
        assert_eq!(
            value,
            json!({
                "content": [
                    {"type": "text", "value": "Pre "},
                    {"type": "hi", "rend": "sup", "value": "3"},
                    {"type": "text", "value": "Post"}
                ]
            })
        );
    }

    #[test]
    fn test_own_attributes_carried_separately() {
        let el = root(r##"<note type="editorial" xml:lang="de">a <ref target="#x">b</ref></note>"##);
        let value = serialize_mixed_content(&el).to_json();
        assert_eq!(value["@type"], json!("editorial"));
        assert_eq!(value["@xmlLang"], json!("de"));
        assert_eq!(value["content"][1]["target"], json!("#x"));
    }

    #[test]
    fn test_clashing_child_attribute_prefixed() {
        let el = root(r#"<note>see <usg type="geographic">Bav.</usg></note>"#);
        let mixed = serialize_mixed_content(&el);
        let seg = mixed.content[1].to_json();
        assert_eq!(seg["type"], json!("usg"));
        assert_eq!(seg["@type"], json!("geographic"));
        assert_eq!(Segment::from_json(&seg), Some(mixed.content[1].clone()));
    }

    #[test]
    fn test_blank_tails_skipped_and_whitespace_kept() {
        let el = root("<note>  lead  <hi>a</hi> <hi>b</hi> end </note>");
        let mixed = serialize_mixed_content(&el);
        assert_eq!(mixed.content.len(), 4);
        assert_eq!(mixed.content[0], Segment::Text { value: "  lead  ".to_string() });
        assert_eq!(mixed.content[3], Segment::Text { value: " end ".to_string() });
    }

    #[test]
    fn test_empty_child_has_empty_value() {
        let el = root("<note>x<lb/>y</note>");
        let mixed = serialize_mixed_content(&el);
        assert_eq!(
            mixed.content[1],
            Segment::Element { tag: "lb".to_string(), value: String::new(), attributes: vec![] }
        );
    }

    #[test]
    fn test_namespace_declarations_not_attributes() {
        let el = root(r#"<note xmlns="http://www.tei-c.org/ns/1.0" n="1">a<hi>b</hi></note>"#);
        assert_eq!(attribute_entries(&el), vec![("n".to_string(), "1".to_string())]);
    }
}
