//! One dictionary entry, as stored and indexed
//!
//! Flat index columns are read straight from the element tree, independent of
//! the JSON conversion; the converted tree goes into `data`.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::encoding::read_xml_file;
use crate::mixed_content::TagRules;
use crate::tei_json::document_to_json;
use crate::xml_tree::{Document, Element, XmlTreeError};

/// Separator between the dictionary code and the rest of an entry id.
pub const WB_SEPARATOR: &str = "__";
pub const UNKNOWN_WB: &str = "unknown";
pub const MAX_SEARCH_EXAMPLES: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("No entry ID found")]
    MissingId,
    #[error(transparent)]
    Xml(#[from] XmlTreeError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeiEntry {
    pub id: String,
    pub wb: String,
    pub lemma: String,
    pub lemma_variants: Vec<String>,
    pub definitions: Vec<String>,
    pub regions: Vec<String>,
    pub data: Value,
    pub tei_xml: String,
    pub search_text: String,
}

/// Dictionary code from an entry id: `DWB__wort1` → `DWB`.
pub fn wb_code(entry_id: &str) -> String {
    match entry_id.split_once(WB_SEPARATOR) {
        Some((code, _)) => code.to_string(),
        None => UNKNOWN_WB.to_string(),
    }
}

pub fn parse_tei_entry(xml: &str, rules: &TagRules) -> Result<TeiEntry, EntryError> {
    let doc = Document::parse(xml)?;
    entry_from_document(&doc, rules)
}

pub fn parse_tei_file(path: &Path, rules: &TagRules) -> Result<TeiEntry> {
    let xml = read_xml_file(path)?;
    parse_tei_entry(&xml, rules).with_context(|| format!("Failed to parse TEI entry: {}", path.display()))
}

pub fn entry_from_document(doc: &Document, rules: &TagRules) -> Result<TeiEntry, EntryError> {
    let root = &doc.root;

    let id = root
        .descendants()
        .filter(|e| e.is_tei("entry"))
        .find_map(|e| e.xml_attribute("id").filter(|id| !id.is_empty()))
        .ok_or(EntryError::MissingId)?
        .to_string();

    let wb = wb_code(&id);

    let lemma = orth_texts(root, "lemma").into_iter().next().unwrap_or_default();

    let mut variants = orth_texts(root, "variant");
    variants.extend(orth_texts(root, "search"));
    let lemma_variants = unique(variants);

    let definitions: Vec<String> = root
        .descendants()
        .filter(|e| e.is_tei("sense"))
        .flat_map(|sense| sense.children_named("def"))
        .flat_map(owned_text_nodes)
        .collect();

    let regions = unique(
        root.descendants()
            .filter(|e| e.is_tei("usg") && e.attribute("type") == Some("geographic"))
            .flat_map(owned_text_nodes)
            .collect(),
    );

    let examples: Vec<String> = root
        .descendants()
        .filter(|e| e.is_tei("cit") && e.attribute("type") == Some("example"))
        .flat_map(|cit| cit.children_named("quote"))
        .flat_map(owned_text_nodes)
        .take(MAX_SEARCH_EXAMPLES)
        .collect();

    let mut search_parts: Vec<&str> = vec![lemma.as_str()];
    search_parts.extend(lemma_variants.iter().map(String::as_str));
    search_parts.extend(definitions.iter().map(String::as_str));
    search_parts.extend(examples.iter().map(String::as_str));
    let search_text = search_parts.join(" ");

    Ok(TeiEntry {
        id,
        wb,
        lemma,
        lemma_variants,
        definitions,
        regions,
        data: document_to_json(doc, rules),
        tei_xml: doc.to_xml(),
        search_text,
    })
}

/// Text nodes of `form[@type=form_type]/orth`, anywhere in the document.
fn orth_texts(root: &Element, form_type: &str) -> Vec<String> {
    root.descendants()
        .filter(|e| e.is_tei("form") && e.attribute("type") == Some(form_type))
        .flat_map(|form| form.children_named("orth"))
        .flat_map(owned_text_nodes)
        .collect()
}

fn owned_text_nodes(element: &Element) -> Vec<String> {
    element.text_nodes().into_iter().map(str::to_string).collect()
}

/// Deduplicates keeping first occurrences.
fn unique(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
