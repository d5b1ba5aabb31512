use crate::config::connection::ConnectionConfig;
use crate::core::render::OutputFormat;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "pokemon-location")]
#[command(about = "Query the pokemon_location table backed by the PokéAPI")]
pub struct CliConfig {
    /// TOML file with a [connection] table
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub page_size: Option<usize>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Rows hydrated at once on the list path
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Columns to return; all columns when omitted
    #[arg(long, value_delimiter = ',', global = true)]
    pub columns: Vec<String>,

    #[arg(long, default_value = "json", global = true)]
    pub format: OutputFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Page through every location
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fetch one location by name
    Get {
        #[arg(long)]
        name: String,
    },
    /// Print the table schema
    Describe,
}

impl CliConfig {
    /// File settings (or defaults) with command line overrides applied.
    pub fn connection(&self) -> Result<ConnectionConfig> {
        let mut connection = match &self.config {
            Some(path) => ConnectionConfig::from_file(path)?,
            None => ConnectionConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            connection.base_url = base_url.clone();
        }
        if let Some(page_size) = self.page_size {
            connection.page_size = page_size;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            connection.timeout_seconds = timeout_seconds;
        }
        if let Some(concurrency) = self.concurrency {
            connection.concurrency = concurrency;
        }

        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "pokemon-location",
            "--base-url",
            "http://localhost:8080/api/v2",
            "--page-size",
            "50",
            "list",
            "--limit",
            "10",
            "--columns",
            "name,id",
            "--format",
            "csv",
        ]);

        let connection = cli.connection().unwrap();
        assert_eq!(connection.base_url, "http://localhost:8080/api/v2");
        assert_eq!(connection.page_size, 50);
        assert_eq!(cli.columns, vec!["name", "id"]);
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(matches!(cli.command, Command::List { limit: Some(10) }));
    }

    #[test]
    fn test_get_requires_name() {
        assert!(CliConfig::try_parse_from(["pokemon-location", "get"]).is_err());
        let cli = CliConfig::try_parse_from(["pokemon-location", "get", "--name", "eterna-city"])
            .unwrap();
        assert!(matches!(cli.command, Command::Get { ref name } if name == "eterna-city"));
    }
}
