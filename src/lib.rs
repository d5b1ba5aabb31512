pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ConnectionConfig;

pub use core::{
    client::PokeApiClient,
    location::{table_pokemon_location, LocationTable},
    query::{QueryExecutor, QueryRequest, Row},
};
pub use utils::error::{PluginError, Result};
