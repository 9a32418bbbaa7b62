//! Flat relational records with a closed set of value kinds.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Row, Statement};
use serde_json::{Number, Value};

/// One field value, classified into the kinds the codec knows how to render.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Timestamp(DateTime<Utc>),
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    /// Anything else (raw bytes); rendered as a hex string.
    Other(Vec<u8>),
}

impl FieldValue {
    /// Converts to JSON with one rule per kind.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Timestamp(at) => Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Integer(value) => Value::Number(Number::from(*value)),
            Self::Real(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(value.to_string())),
            Self::Text(value) => Value::String(value.clone()),
            Self::Boolean(value) => Value::Bool(*value),
            Self::Other(bytes) => Value::String(hex::encode(bytes)),
        }
    }
}

/// Column type hint derived from the declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    Boolean,
    Timestamp,
}

/// Maps a declared SQL column type to a decoding hint.
///
/// Expression columns carry no declared type and decode by storage class.
pub fn column_kind(decl_type: Option<&str>) -> ColumnKind {
    match decl_type.map(|value| value.trim().to_ascii_uppercase()) {
        Some(value) if value == "BOOLEAN" || value == "BOOL" => ColumnKind::Boolean,
        Some(value) if value.starts_with("TIMESTAMP") || value == "DATETIME" => {
            ColumnKind::Timestamp
        }
        _ => ColumnKind::Plain,
    }
}

/// Field-name-to-value mapping that preserves column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, replacing an earlier field of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Removes a field and returns its value.
    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(key, _)| key == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.push(name, value);
        }
        record
    }
}

/// Decodes rows of one prepared statement into [`Record`]s.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    columns: Vec<(String, ColumnKind)>,
}

impl RowDecoder {
    /// Captures column names and declared types of `stmt`.
    pub fn for_statement(stmt: &Statement<'_>) -> Self {
        let columns = stmt
            .columns()
            .iter()
            .map(|column| (column.name().to_string(), column_kind(column.decl_type())))
            .collect();
        Self { columns }
    }

    pub fn decode(&self, row: &Row<'_>) -> rusqlite::Result<Record> {
        let mut record = Record::new();
        for (index, (name, kind)) in self.columns.iter().enumerate() {
            let value = classify(row.get_ref(index)?, *kind);
            record.push(name.clone(), value);
        }
        Ok(record)
    }
}

fn classify(value: ValueRef<'_>, kind: ColumnKind) -> FieldValue {
    match (value, kind) {
        (ValueRef::Null, _) => FieldValue::Null,
        (ValueRef::Integer(value), ColumnKind::Boolean) => FieldValue::Boolean(value != 0),
        (ValueRef::Integer(value), ColumnKind::Timestamp) => DateTime::from_timestamp_millis(value)
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::Integer(value)),
        (ValueRef::Integer(value), ColumnKind::Plain) => FieldValue::Integer(value),
        (ValueRef::Real(value), _) => FieldValue::Real(value),
        (ValueRef::Text(bytes), kind) => match std::str::from_utf8(bytes) {
            Ok(text) if kind == ColumnKind::Timestamp => parse_timestamp(text)
                .map(FieldValue::Timestamp)
                .unwrap_or_else(|| FieldValue::Text(text.to_string())),
            Ok(text) => FieldValue::Text(text.to_string()),
            Err(_) => FieldValue::Other(bytes.to_vec()),
        },
        (ValueRef::Blob(bytes), _) => FieldValue::Other(bytes.to_vec()),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
