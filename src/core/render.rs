use crate::core::query::Row;
use crate::utils::error::{PluginError, Result};
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(PluginError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: json, csv".to_string(),
            }),
        }
    }
}

/// Writes rows as JSON lines or as CSV with a header row.
pub fn write_rows<W: Write>(
    writer: W,
    columns: &[String],
    rows: &[Row],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json_lines(writer, rows),
        OutputFormat::Csv => write_csv(writer, columns, rows),
    }
}

fn write_json_lines<W: Write>(mut writer: W, rows: &[Row]) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_csv<W: Write>(writer: W, columns: &[String], rows: &[Row]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns)?;

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| row.get(column).map(|v| v.to_text()).unwrap_or_default())
            .collect();
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}
