//! The contract a table is written against: its schema, the hydrate
//! operations it provides, and the per-query data handed to them.

use crate::core::NamedResource;
use crate::utils::error::{PluginError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Int,
    Json,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "STRING",
            ColumnType::Int => "INT",
            ColumnType::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// Which hydrate result a column reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateSource {
    List,
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    FromColumnName,
    FromField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    String(String),
    Int(i64),
    Json(Value),
}

impl ColumnValue {
    /// Text form used by flat output formats; JSON values are compacted.
    pub fn to_text(&self) -> String {
        match self {
            ColumnValue::Null => String::new(),
            ColumnValue::String(s) => s.clone(),
            ColumnValue::Int(i) => i.to_string(),
            ColumnValue::Json(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub description: &'static str,
    pub column_type: ColumnType,
    pub hydrate: HydrateSource,
    pub transform: Transform,
}

impl Column {
    pub fn new(name: &'static str, column_type: ColumnType, description: &'static str) -> Self {
        Self {
            name,
            description,
            column_type,
            hydrate: HydrateSource::List,
            transform: Transform::FromColumnName,
        }
    }

    pub fn hydrate(mut self, hydrate: HydrateSource) -> Self {
        self.hydrate = hydrate;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Extracts and type-checks this column's value from a hydrate result.
    pub fn value(&self, source: &Value) -> Result<ColumnValue> {
        let field = match &self.transform {
            Transform::FromColumnName => self.name,
            Transform::FromField(field) => field,
        };

        let raw = match source.get(field) {
            None | Some(Value::Null) => return Ok(ColumnValue::Null),
            Some(raw) => raw,
        };

        match (self.column_type, raw) {
            (ColumnType::String, Value::String(s)) => Ok(ColumnValue::String(s.clone())),
            (ColumnType::Int, Value::Number(n)) if n.is_i64() => {
                Ok(ColumnValue::Int(n.as_i64().unwrap_or_default()))
            }
            (ColumnType::Json, value) => Ok(ColumnValue::Json(value.clone())),
            (expected, actual) => Err(PluginError::ColumnTypeMismatch {
                column: self.name.to_string(),
                expected: expected.to_string(),
                actual: json_kind(actual).to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyColumnSet {
    AnyColumn(Vec<&'static str>),
    AllColumns(Vec<&'static str>),
}

impl KeyColumnSet {
    pub fn columns(&self) -> &[&'static str] {
        match self {
            KeyColumnSet::AnyColumn(columns) | KeyColumnSet::AllColumns(columns) => columns,
        }
    }

    pub fn satisfied_by(&self, quals: &HashMap<String, String>) -> bool {
        match self {
            KeyColumnSet::AnyColumn(columns) => columns.iter().any(|c| quals.contains_key(*c)),
            KeyColumnSet::AllColumns(columns) => columns.iter().all(|c| quals.contains_key(*c)),
        }
    }
}

pub type ErrorPredicate = Arc<dyn Fn(&PluginError) -> bool + Send + Sync>;

/// Treats a 404, or a body that failed to decode and starts with one of
/// `markers`, as "no such row".
pub fn is_not_found_error(markers: &[&str]) -> ErrorPredicate {
    let markers: Vec<String> = markers.iter().map(|m| m.to_string()).collect();
    Arc::new(move |err: &PluginError| match err {
        PluginError::NotFound { .. } => true,
        PluginError::DecodeError { body_preview, .. } => markers
            .iter()
            .any(|marker| body_preview.trim_start().starts_with(marker.as_str())),
        _ => false,
    })
}

#[derive(Clone)]
pub struct GetConfig {
    pub key_columns: KeyColumnSet,
    pub should_ignore_error: Option<ErrorPredicate>,
}

impl GetConfig {
    pub fn ignores(&self, err: &PluginError) -> bool {
        self.should_ignore_error
            .as_ref()
            .map(|predicate| predicate(err))
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct TableDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub get: GetConfig,
    pub columns: Vec<Column>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Debug for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDefinition")
            .field("name", &self.name)
            .field("get_key_columns", &self.get.key_columns)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Per-query state handed to hydrate operations.
#[derive(Debug, Default)]
pub struct QueryData {
    key_column_quals: HashMap<String, String>,
    sink: Option<mpsc::Sender<NamedResource>>,
}

impl QueryData {
    pub fn new(key_column_quals: HashMap<String, String>) -> Self {
        Self {
            key_column_quals,
            sink: None,
        }
    }

    pub fn with_sink(
        key_column_quals: HashMap<String, String>,
        sink: mpsc::Sender<NamedResource>,
    ) -> Self {
        Self {
            key_column_quals,
            sink: Some(sink),
        }
    }

    pub fn key_column_qual(&self, column: &str) -> Option<&str> {
        self.key_column_quals.get(column).map(String::as_str)
    }

    /// Sends one list item downstream. Returns `false` once nobody is
    /// listening any more, which tells the list operation to stop paging.
    pub async fn stream_list_item(&self, item: NamedResource) -> bool {
        match &self.sink {
            Some(sink) => sink.send(item).await.is_ok(),
            None => false,
        }
    }
}

/// The list item a row was produced from, if any.
#[derive(Debug, Clone, Default)]
pub struct HydrateData {
    pub item: Option<NamedResource>,
}

#[async_trait]
pub trait Table: Send + Sync {
    fn definition(&self) -> &TableDefinition;

    async fn list(&self, query: &QueryData) -> Result<()>;

    async fn get(&self, query: &QueryData, hydrate: &HydrateData) -> Result<Value>;
}
