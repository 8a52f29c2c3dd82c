//! Agent and listing records as they appear in the data files.
//!
//! Only the key and display fields are typed; everything else is carried
//! through to the stored document untouched.

use jiga_store::{Document, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsFile {
    pub agents: Vec<AgentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingsFile {
    pub listings: Vec<ListingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AgentRecord {
    /// The record as a raw document; date fields are still strings here.
    pub fn raw_document(&self) -> Document {
        raw_document(&self.id, ("name", &self.name), &self.fields)
    }
}

impl ListingRecord {
    pub fn raw_document(&self) -> Document {
        raw_document(&self.id, ("title", &self.title), &self.fields)
    }
}

fn raw_document(id: &str, display: (&str, &str), fields: &Map<String, Value>) -> Document {
    let mut document: Document = fields
        .iter()
        .map(|(key, value)| (key.clone(), FieldValue::from(value.clone())))
        .collect();
    document.insert("id".to_string(), FieldValue::from(id));
    document.insert(display.0.to_string(), FieldValue::from(display.1));
    document
}
