use crate::core::table::{
    is_not_found_error, Column, ColumnType, GetConfig, HydrateData, HydrateSource, KeyColumnSet,
    QueryData, Table, TableDefinition, Transform,
};
use crate::core::{Location, PokeApi};
use crate::utils::error::{PluginError, Result};
use serde_json::Value;
use url::Url;

pub const TABLE_NAME: &str = "pokemon_location";

/// Body the upstream API serves for unknown names.
const NOT_FOUND_MARKERS: &[&str] = &["Not Found"];

pub fn table_pokemon_location() -> TableDefinition {
    TableDefinition {
        name: TABLE_NAME,
        description: "Locations that can be visited within the games. Locations make up sizable portions of regions, like cities or routes.",
        get: GetConfig {
            key_columns: KeyColumnSet::AnyColumn(vec!["name"]),
            should_ignore_error: Some(is_not_found_error(NOT_FOUND_MARKERS)),
        },
        columns: vec![
            Column::new("name", ColumnType::String, "The name for this resource."),
            Column::new(
                "areas",
                ColumnType::Json,
                "Areas that can be found in this location",
            )
            .hydrate(HydrateSource::Get),
            Column::new(
                "game_indices",
                ColumnType::Json,
                "A list of game indices relevant to location item by generation",
            )
            .hydrate(HydrateSource::Get),
            Column::new("id", ColumnType::Int, "The identifier for this resource.")
                .hydrate(HydrateSource::Get),
            Column::new(
                "names",
                ColumnType::Json,
                "Name of the region in different languages",
            )
            .hydrate(HydrateSource::Get),
            // Standard columns
            Column::new("title", ColumnType::String, "Title of the resource.")
                .transform(Transform::FromField("name")),
        ],
    }
}

/// Pages through `/location`, streaming every reference in the order the
/// API returns them.
pub async fn list_locations<A: PokeApi + ?Sized>(api: &A, query: &QueryData) -> Result<()> {
    tracing::trace!("listLocations");

    let mut offset = 0;

    loop {
        let page = api.resource("location", offset).await.map_err(|e| {
            tracing::error!(query_error = %e, "pokemon_location.listLocations");
            e
        })?;

        for location in page.results.iter().cloned() {
            if !query.stream_list_item(location).await {
                tracing::debug!("List consumer closed at offset {}, stopping", offset);
                return Ok(());
            }
        }

        // No next URL returned
        let Some(next) = page.next_url() else {
            break;
        };

        let next_offset = extract_url_offset(next).and_then(|next_offset| {
            if next_offset <= offset {
                return Err(PluginError::InvalidNextUrl {
                    url: next.to_string(),
                    reason: format!("offset {} does not advance past {}", next_offset, offset),
                });
            }
            Ok(next_offset)
        });

        offset = next_offset.map_err(|e| {
            tracing::error!(extract_url_offset_error = %e, "pokemon_location.listLocations");
            e
        })?;
    }

    Ok(())
}

/// Fetches one location, keyed by the list item when hydrating a listed row
/// and by the `name` qual otherwise.
pub async fn get_location<A: PokeApi + ?Sized>(
    api: &A,
    query: &QueryData,
    hydrate: &HydrateData,
) -> Result<Location> {
    tracing::trace!("getLocation");

    let name = match &hydrate.item {
        Some(item) => item.name.clone(),
        None => query
            .key_column_qual("name")
            .map(str::to_string)
            .ok_or_else(|| {
                let definition = table_pokemon_location();
                PluginError::MissingKeyColumn {
                    table: definition.name.to_string(),
                    columns: definition
                        .get
                        .key_columns
                        .columns()
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                }
            })?,
    };

    tracing::debug!(name = %name, "getLocation");

    // `/location/` is the collection endpoint, not a location.
    if name.is_empty() {
        return Err(PluginError::NotFound {
            resource: "location".to_string(),
            name,
        });
    }

    api.location(&name).await.map_err(|e| {
        tracing::error!(query_error = %e, "pokemon_location.getLocation");
        e
    })
}

/// Reads the `offset` query parameter from a `next` page URL.
pub fn extract_url_offset(next: &str) -> Result<usize> {
    let url = Url::parse(next).map_err(|e| PluginError::InvalidNextUrl {
        url: next.to_string(),
        reason: e.to_string(),
    })?;

    let (_, offset) = url
        .query_pairs()
        .find(|(key, _)| key == "offset")
        .ok_or_else(|| PluginError::InvalidNextUrl {
            url: next.to_string(),
            reason: "missing offset parameter".to_string(),
        })?;

    offset.parse().map_err(|_| PluginError::InvalidNextUrl {
        url: next.to_string(),
        reason: format!("offset '{}' is not a number", offset),
    })
}

pub struct LocationTable<A: PokeApi> {
    api: A,
    definition: TableDefinition,
}

impl<A: PokeApi> LocationTable<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            definition: table_pokemon_location(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait::async_trait]
impl<A: PokeApi> Table for LocationTable<A> {
    fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    async fn list(&self, query: &QueryData) -> Result<()> {
        list_locations(&self.api, query).await
    }

    async fn get(&self, query: &QueryData, hydrate: &HydrateData) -> Result<Value> {
        let location = get_location(&self.api, query, hydrate).await?;
        Ok(serde_json::to_value(location)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NamedResource, ResourcePage};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Serves canned pages keyed by offset and records every call.
    struct MockApi {
        pages: HashMap<usize, ResourcePage>,
        fail_at: Option<usize>,
        calls: Mutex<Vec<String>>,
    }

    impl MockApi {
        fn with_pages(pages: Vec<(usize, ResourcePage)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                fail_at: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PokeApi for MockApi {
        async fn resource(&self, endpoint: &str, offset: usize) -> Result<ResourcePage> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}@{}", endpoint, offset));
            if self.fail_at == Some(offset) {
                return Err(PluginError::UnexpectedStatus {
                    url: endpoint.to_string(),
                    status: 503,
                    body: String::new(),
                });
            }
            Ok(self.pages[&offset].clone())
        }

        async fn location(&self, name: &str) -> Result<Location> {
            self.calls.lock().unwrap().push(format!("location/{}", name));
            if name == "nowhere" {
                return Err(PluginError::NotFound {
                    resource: "location".to_string(),
                    name: name.to_string(),
                });
            }
            Ok(Location {
                id: 7,
                name: name.to_string(),
                areas: vec![],
                game_indices: vec![],
                names: vec![],
                region: None,
            })
        }
    }

    fn page(names: &[&str], next: Option<&str>) -> ResourcePage {
        ResourcePage {
            count: 0,
            next: next.map(str::to_string),
            previous: None,
            results: names.iter().map(|n| NamedResource::new(*n, "")).collect(),
        }
    }

    async fn collect_list(api: &MockApi, buffer: usize) -> (Result<()>, Vec<String>) {
        let (tx, mut rx) = mpsc::channel(buffer);
        let query = QueryData::with_sink(HashMap::new(), tx);
        let result = list_locations(api, &query).await;
        drop(query);
        let mut names = Vec::new();
        while let Some(item) = rx.recv().await {
            names.push(item.name);
        }
        (result, names)
    }

    #[test]
    fn test_extract_url_offset() {
        let offset =
            extract_url_offset("https://pokeapi.co/api/v2/location?offset=20&limit=20").unwrap();
        assert_eq!(offset, 20);
        assert_eq!(
            extract_url_offset("https://pokeapi.co/api/v2/location?limit=20&offset=780").unwrap(),
            780
        );
    }

    #[test]
    fn test_extract_url_offset_rejects_bad_urls() {
        assert!(extract_url_offset("not a url").is_err());
        assert!(extract_url_offset("https://pokeapi.co/api/v2/location?limit=20").is_err());
        assert!(extract_url_offset("https://pokeapi.co/api/v2/location?offset=abc").is_err());
    }

    #[tokio::test]
    async fn test_list_follows_next_until_empty() {
        let api = MockApi::with_pages(vec![
            (0, page(&["a", "b"], Some("http://x/location?offset=2&limit=2"))),
            (2, page(&["c", "d"], Some("http://x/location?offset=4&limit=2"))),
            (4, page(&["e"], Some(""))),
        ]);

        let (result, names) = collect_list(&api, 16).await;

        assert!(result.is_ok());
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(api.calls(), vec!["location@0", "location@2", "location@4"]);
    }

    #[tokio::test]
    async fn test_list_error_aborts_remaining_pages() {
        let mut api = MockApi::with_pages(vec![
            (0, page(&["a"], Some("http://x/location?offset=1&limit=1"))),
            (2, page(&["c"], None)),
        ]);
        api.fail_at = Some(1);

        let (result, names) = collect_list(&api, 16).await;

        assert!(matches!(
            result,
            Err(PluginError::UnexpectedStatus { status: 503, .. })
        ));
        assert_eq!(names, vec!["a"]);
        assert_eq!(api.calls(), vec!["location@0", "location@1"]);
    }

    #[tokio::test]
    async fn test_list_bad_next_url_is_error() {
        let api = MockApi::with_pages(vec![(0, page(&["a"], Some("http://x/location?limit=1")))]);

        let (result, _) = collect_list(&api, 16).await;

        assert!(matches!(result, Err(PluginError::InvalidNextUrl { .. })));
    }

    #[tokio::test]
    async fn test_list_rejects_next_url_that_does_not_advance() {
        let api = MockApi::with_pages(vec![
            (0, page(&["a"], Some("http://x/location?offset=2&limit=2"))),
            (2, page(&["b"], Some("http://x/location?offset=2&limit=2"))),
        ]);

        let (result, names) = collect_list(&api, 16).await;

        assert!(matches!(result, Err(PluginError::InvalidNextUrl { .. })));
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(api.calls(), vec!["location@0", "location@2"]);
    }

    #[tokio::test]
    async fn test_list_stops_when_consumer_is_gone() {
        let api = MockApi::with_pages(vec![(
            0,
            page(&["a", "b"], Some("http://x/location?offset=2&limit=2")),
        )]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let query = QueryData::with_sink(HashMap::new(), tx);

        assert!(list_locations(&api, &query).await.is_ok());
        assert_eq!(api.calls(), vec!["location@0"]);
    }

    #[tokio::test]
    async fn test_get_prefers_list_item_over_qual() {
        let api = MockApi::with_pages(vec![]);
        let mut quals = HashMap::new();
        quals.insert("name".to_string(), "from-qual".to_string());
        let query = QueryData::new(quals);
        let hydrate = HydrateData {
            item: Some(NamedResource::new("from-item", "")),
        };

        let location = get_location(&api, &query, &hydrate).await.unwrap();

        assert_eq!(location.name, "from-item");
        assert_eq!(api.calls(), vec!["location/from-item"]);
    }

    #[tokio::test]
    async fn test_get_uses_qual_without_item() {
        let api = MockApi::with_pages(vec![]);
        let mut quals = HashMap::new();
        quals.insert("name".to_string(), "oreburgh-city".to_string());

        let location = get_location(&api, &QueryData::new(quals), &HydrateData::default())
            .await
            .unwrap();

        assert_eq!(location.name, "oreburgh-city");
    }

    #[tokio::test]
    async fn test_get_without_name_is_missing_key_column() {
        let api = MockApi::with_pages(vec![]);
        let err = get_location(&api, &QueryData::default(), &HydrateData::default())
            .await
            .unwrap_err();

        match err {
            PluginError::MissingKeyColumn { table, columns } => {
                assert_eq!(table, "pokemon_location");
                assert_eq!(columns, vec!["name"]);
            }
            other => panic!("expected missing key column, got {:?}", other),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_empty_name_is_not_found_without_request() {
        let api = MockApi::with_pages(vec![]);
        let mut quals = HashMap::new();
        quals.insert("name".to_string(), String::new());

        let err = get_location(&api, &QueryData::new(quals), &HydrateData::default())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(table_pokemon_location().get.ignores(&err));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_name_is_ignored_by_table() {
        let table = LocationTable::new(MockApi::with_pages(vec![]));
        let mut quals = HashMap::new();
        quals.insert("name".to_string(), "nowhere".to_string());

        let err = table
            .get(&QueryData::new(quals), &HydrateData::default())
            .await
            .unwrap_err();

        assert!(table.definition().get.ignores(&err));
    }

    #[test]
    fn test_table_schema() {
        let table = table_pokemon_location();
        let columns: Vec<(&str, ColumnType)> =
            table.columns.iter().map(|c| (c.name, c.column_type)).collect();

        assert_eq!(table.name, "pokemon_location");
        assert_eq!(
            columns,
            vec![
                ("name", ColumnType::String),
                ("areas", ColumnType::Json),
                ("game_indices", ColumnType::Json),
                ("id", ColumnType::Int),
                ("names", ColumnType::Json),
                ("title", ColumnType::String),
            ]
        );
        assert_eq!(table.get.key_columns, KeyColumnSet::AnyColumn(vec!["name"]));
        assert_eq!(
            table.column("title").unwrap().transform,
            Transform::FromField("name")
        );
    }
}
