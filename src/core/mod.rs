pub mod client;
pub mod location;
pub mod query;
pub mod render;
pub mod table;

pub use crate::domain::model::{GameIndex, LocalizedName, Location, NamedResource, ResourcePage};
pub use crate::domain::ports::{ConfigProvider, PokeApi};
pub use crate::utils::error::Result;
