use crate::core::{ConfigProvider, Location, PokeApi, ResourcePage};
use crate::utils::error::{PluginError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const BODY_PREVIEW_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct PokeApiClient {
    client: Client,
    base_url: Url,
    page_size: usize,
}

impl PokeApiClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        let base_url = Url::parse(config.base_url()).map_err(|e| {
            PluginError::InvalidConfigValueError {
                field: "base_url".to_string(),
                value: config.base_url().to_string(),
                reason: format!("Invalid URL format: {}", e),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PluginError::InvalidConfigValueError {
                field: "base_url".to_string(),
                value: config.base_url().to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size(),
        })
    }

    /// Appends each segment to the base path, percent-encoding `/`, `?` and `#`.
    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        resource: &str,
        name: &str,
    ) -> Result<T> {
        tracing::debug!("Making API request to: {} {:?}", url, query);
        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(PluginError::NotFound {
                resource: resource.to_string(),
                name: name.to_string(),
            });
        }

        if !status.is_success() {
            return Err(PluginError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| PluginError::DecodeError {
            url: url.to_string(),
            message: e.to_string(),
            body_preview: preview(&body),
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LEN).collect()
}

#[async_trait::async_trait]
impl PokeApi for PokeApiClient {
    async fn resource(&self, endpoint: &str, offset: usize) -> Result<ResourcePage> {
        let url = self.endpoint_url(&[endpoint]);
        let query = [
            ("offset", offset.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        self.fetch(url, &query, endpoint, "").await
    }

    async fn location(&self, name: &str) -> Result<Location> {
        // Dot segments are dropped when pushed, which would address the collection.
        if matches!(name, "" | "." | "..") {
            return Err(PluginError::NotFound {
                resource: "location".to_string(),
                name: name.to_string(),
            });
        }

        let url = self.endpoint_url(&["location", name]);
        self.fetch(url, &[], "location", name).await
    }
}
