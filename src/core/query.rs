use crate::core::table::{Column, ColumnValue, HydrateData, HydrateSource, QueryData, Table};
use crate::core::NamedResource;
use crate::utils::error::{PluginError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

const LIST_BUFFER: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Columns to return, in order. Empty means every column.
    pub columns: Vec<String>,
    pub quals: HashMap<String, String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<(String, ColumnValue)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Drives a table the way a host would: picks the get or list path from the
/// quals, then hydrates only what the requested columns need.
pub struct QueryExecutor<T: Table> {
    table: T,
    concurrency: usize,
}

impl<T: Table> QueryExecutor<T> {
    pub fn new(table: T, concurrency: usize) -> Self {
        Self {
            table,
            concurrency: concurrency.max(1),
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub async fn execute(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let columns = self.resolve_columns(&request.columns)?;
        let definition = self.table.definition();

        if request.limit == Some(0) {
            return Ok(Vec::new());
        }

        if definition.get.key_columns.satisfied_by(&request.quals) {
            tracing::debug!("{}: get path for quals {:?}", definition.name, request.quals);
            return self.execute_get(&columns, request).await;
        }

        tracing::debug!("{}: list path", definition.name);
        self.execute_list(&columns, request).await
    }

    fn resolve_columns(&self, requested: &[String]) -> Result<Vec<Column>> {
        let definition = self.table.definition();
        if requested.is_empty() {
            return Ok(definition.columns.clone());
        }

        requested
            .iter()
            .map(|name| {
                definition
                    .column(name)
                    .cloned()
                    .ok_or_else(|| PluginError::UnknownColumn {
                        table: definition.name.to_string(),
                        column: name.clone(),
                    })
            })
            .collect()
    }

    async fn execute_get(&self, columns: &[Column], request: &QueryRequest) -> Result<Vec<Row>> {
        let query = QueryData::new(request.quals.clone());
        let definition = self.table.definition();

        match self.table.get(&query, &HydrateData::default()).await {
            // A get result doubles as the list item for non-hydrated columns.
            Ok(item) => Ok(vec![build_row(columns, &item, Some(&item))?]),
            Err(e) if definition.get.ignores(&e) => {
                tracing::debug!("{}: ignoring get error: {}", definition.name, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn execute_list(&self, columns: &[Column], request: &QueryRequest) -> Result<Vec<Row>> {
        let items = self.collect_list_items(request).await?;
        tracing::debug!("Listed {} items", items.len());

        let needs_get = columns.iter().any(|c| c.hydrate == HydrateSource::Get);
        let query = QueryData::new(request.quals.clone());
        let query = &query;

        stream::iter(items)
            .map(|item| async move {
                let item_value = serde_json::to_value(&item)?;
                if !needs_get {
                    return build_row(columns, &item_value, None);
                }
                let hydrate = HydrateData { item: Some(item) };
                let hydrated = self.table.get(query, &hydrate).await?;
                build_row(columns, &item_value, Some(&hydrated))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn collect_list_items(&self, request: &QueryRequest) -> Result<Vec<NamedResource>> {
        let (tx, mut rx) = mpsc::channel(LIST_BUFFER);
        let query = QueryData::with_sink(request.quals.clone(), tx);

        let producer = async move { self.table.list(&query).await };

        let consumer = async {
            let mut items = Vec::new();
            while let Some(item) = rx.recv().await {
                items.push(item);
                if request.limit.is_some_and(|limit| items.len() >= limit) {
                    break;
                }
            }
            // Closing the receiver lets the producer stop paging.
            drop(rx);
            items
        };

        let (listed, items) = tokio::join!(producer, consumer);
        match listed {
            Ok(()) => Ok(items),
            // Pages fetched after the limit was reached don't affect the result.
            Err(e) if request.limit.is_some_and(|limit| items.len() >= limit) => {
                tracing::debug!("Ignoring list error after limit reached: {}", e);
                Ok(items)
            }
            Err(e) => Err(e),
        }
    }
}

fn build_row(columns: &[Column], item: &Value, hydrated: Option<&Value>) -> Result<Row> {
    let values = columns
        .iter()
        .map(|column| {
            let value = match (column.hydrate, hydrated) {
                (HydrateSource::List, _) => column.value(item)?,
                (HydrateSource::Get, Some(hydrated)) => column.value(hydrated)?,
                (HydrateSource::Get, None) => ColumnValue::Null,
            };
            Ok((column.name.to_string(), value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Row { values })
}
