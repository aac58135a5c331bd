use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::dataset::{Dataset, Record};
use crate::etl::{DataSource, ETLError, Loader, Parameters, Result};

const PARAM_PATH: &str = "path";
const PARAM_SEPARATOR: &str = "separator";

fn separator_from(stage: &str, params: &Parameters) -> Result<u8> {
    let separator = params.get_str_or(PARAM_SEPARATOR, ",");
    match separator.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ETLError::Configuration(format!(
            "separator of '{}' must be a single byte, got {:?}",
            stage, separator
        ))),
    }
}

/// Reads a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    name: String,
    path: PathBuf,
    separator: u8,
}

impl CsvFileSource {
    pub fn new(name: impl Into<String>) -> Self {
        CsvFileSource {
            name: name.into(),
            path: PathBuf::new(),
            separator: b',',
        }
    }
}

#[async_trait]
impl DataSource for CsvFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "CsvFileSource"
    }

    fn initialize(&mut self, params: &Parameters) -> Result<()> {
        self.path = PathBuf::from(params.require_str(&self.name, PARAM_PATH)?);
        self.separator = separator_from(&self.name, params)?;
        Ok(())
    }

    async fn read(&self) -> Result<Dataset> {
        let content = tokio::fs::read(&self.path).await?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.separator)
            .from_reader(content.as_slice());

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .collect::<Record>(),
            );
        }
        info!(
            stage = self.name.as_str(),
            path = %self.path.display(),
            rows = rows.len(),
            "CSV file read"
        );
        Ok(Dataset::from_records(rows))
    }
}

/// Writes a dataset to a CSV file, header row first.
///
/// Columns follow [`Dataset::columns`]; a row lacking a column gets an empty
/// field.
#[derive(Debug, Clone)]
pub struct CsvFileLoader {
    name: String,
    path: PathBuf,
    separator: u8,
}

impl CsvFileLoader {
    pub fn new(name: impl Into<String>) -> Self {
        CsvFileLoader {
            name: name.into(),
            path: PathBuf::new(),
            separator: b',',
        }
    }
}

#[async_trait]
impl Loader for CsvFileLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "CsvFileLoader"
    }

    fn initialize(&mut self, params: &Parameters) -> Result<()> {
        self.path = PathBuf::from(params.require_str(&self.name, PARAM_PATH)?);
        self.separator = separator_from(&self.name, params)?;
        Ok(())
    }

    async fn write(&self, dataset: &Dataset) -> Result<()> {
        let columns = dataset.columns();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.separator)
            .from_writer(Vec::new());

        writer.write_record(&columns)?;
        for row in dataset.rows() {
            writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))?;
        }
        let content = writer
            .into_inner()
            .map_err(|e| ETLError::Io(e.into_error()))?;

        tokio::fs::write(&self.path, content).await?;
        info!(
            stage = self.name.as_str(),
            path = %self.path.display(),
            rows = dataset.count(),
            "CSV file written"
        );
        Ok(())
    }
}
