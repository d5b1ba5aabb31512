use serde::{Deserialize, Serialize};

/// Minimal identity returned by a listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One page of `GET /{endpoint}?offset=N&limit=L`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

impl ResourcePage {
    /// The next page URL, treating `null` and `""` alike.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameIndex {
    pub game_index: i64,
    pub generation: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub name: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub areas: Vec<NamedResource>,
    #[serde(default)]
    pub game_indices: Vec<GameIndex>,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub region: Option<NamedResource>,
}
