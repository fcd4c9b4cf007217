use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde_json::Value;

use crate::db::entries_schema::*;
use crate::tei_entry::TeiEntry;

// List columns hold JSON arrays as text
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Entry {
    pub id: String,
    pub wb: String,
    pub lemma: String,
    pub lemma_variants: String,
    pub definitions: String,
    pub regions: String,
    pub data: String,
    pub tei_xml: String,
    pub search_text: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entry {
    pub fn lemma_variants_list(&self) -> Vec<String> {
        serde_json::from_str(&self.lemma_variants).unwrap_or_default()
    }

    pub fn definitions_list(&self) -> Vec<String> {
        serde_json::from_str(&self.definitions).unwrap_or_default()
    }

    pub fn regions_list(&self) -> Vec<String> {
        serde_json::from_str(&self.regions).unwrap_or_default()
    }

    pub fn data_json(&self) -> Value {
        serde_json::from_str(&self.data).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = entries)]
pub struct NewEntry {
    pub id: String,
    pub wb: String,
    pub lemma: String,
    pub lemma_variants: String,
    pub definitions: String,
    pub regions: String,
    pub data: String,
    pub tei_xml: String,
    pub search_text: String,
}

impl From<&TeiEntry> for NewEntry {
    fn from(entry: &TeiEntry) -> Self {
        NewEntry {
            id: entry.id.clone(),
            wb: entry.wb.clone(),
            lemma: entry.lemma.clone(),
            lemma_variants: Value::from(entry.lemma_variants.clone()).to_string(),
            definitions: Value::from(entry.definitions.clone()).to_string(),
            regions: Value::from(entry.regions.clone()).to_string(),
            data: entry.data.to_string(),
            tei_xml: entry.tei_xml.clone(),
            search_text: entry.search_text.clone(),
        }
    }
}
