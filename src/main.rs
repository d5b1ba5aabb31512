use clap::Parser;
use pokemon_location::config::Command;
use pokemon_location::core::render::write_rows;
use pokemon_location::core::table::Table;
use pokemon_location::utils::error::{ErrorSeverity, PluginError};
use pokemon_location::utils::{logger, validation::Validate};
use pokemon_location::{CliConfig, LocationTable, PokeApiClient, QueryExecutor, QueryRequest};
use std::collections::HashMap;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_host_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = run(config).await {
        tracing::error!(
            "Query failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: CliConfig) -> Result<(), PluginError> {
    let connection = config.connection()?;
    connection.validate()?;

    let client = PokeApiClient::new(&connection)?;
    let executor = QueryExecutor::new(LocationTable::new(client), connection.concurrency);
    let definition = executor.table().definition();

    let request = match config.command {
        Command::Describe => {
            for column in &definition.columns {
                println!(
                    "{:<14} {:<6} {}",
                    column.name,
                    column.column_type.to_string(),
                    column.description
                );
            }
            return Ok(());
        }
        Command::List { limit } => QueryRequest {
            columns: config.columns.clone(),
            quals: HashMap::new(),
            limit,
        },
        Command::Get { name } => QueryRequest {
            columns: config.columns.clone(),
            quals: HashMap::from([("name".to_string(), name)]),
            limit: None,
        },
    };

    tracing::info!("Querying {} from {}", definition.name, connection.base_url);
    let rows = executor.execute(&request).await?;
    tracing::info!("Returned {} rows", rows.len());

    let columns: Vec<String> = if request.columns.is_empty() {
        definition.columns.iter().map(|c| c.name.to_string()).collect()
    } else {
        request.columns
    };

    write_rows(std::io::stdout().lock(), &columns, &rows, config.format)
}
