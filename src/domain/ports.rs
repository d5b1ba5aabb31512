use crate::domain::model::{Location, ResourcePage};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The slice of the PokéAPI the table needs.
#[async_trait]
pub trait PokeApi: Send + Sync {
    async fn resource(&self, endpoint: &str, offset: usize) -> Result<ResourcePage>;
    async fn location(&self, name: &str) -> Result<Location>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn page_size(&self) -> usize;
    fn timeout(&self) -> Duration;
    fn concurrency(&self) -> usize;
    fn user_agent(&self) -> &str;
}
