use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// A single row-oriented record: field name to cell value.
///
/// Field names are not fixed across sources. One distinguished field holds
/// the period label and any number of metadata fields may ride along; both
/// are identified by configuration at reshape time, not by the record
/// itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    /// Zip header names against row cells by position, truncated to the
    /// shorter side.
    pub fn from_zipped(headers: &[String], cells: &[String]) -> Self {
        let mut record = Self::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            record.insert(header.clone(), cell.clone());
        }
        record
    }

    /// Flatten a JSON document into a record. Scalars become their string
    /// form, null becomes a blank cell, nested values keep their compact
    /// JSON text. Non-object documents have no record form.
    pub fn from_document(document: &Value) -> Option<Self> {
        let object = document.as_object()?;
        let mut record = Self::new();
        for (field, value) in object {
            let cell = match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            record.insert(field.clone(), cell);
        }
        Some(record)
    }

    pub fn to_document(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(field, value)| (field.clone(), Value::String(value.clone())))
                .collect(),
        )
    }
}
