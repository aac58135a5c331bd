use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dataset::{Dataset, Record};
use crate::etl::{DataSource, ETLError, Loader, Parameters, Result};

const PARAM_ROWS: &str = "rows";
const PARAM_REJECT: &str = "reject";

/// Data source serving rows held in memory.
///
/// Rows are given at construction or through the `rows` parameter, an array
/// of flat JSON objects. Non-string values are stringified, `null` becomes an
/// empty string.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    rows: Vec<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, rows: Vec<Record>) -> Self {
        MemorySource {
            name: name.into(),
            rows,
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "MemorySource"
    }

    fn initialize(&mut self, params: &Parameters) -> Result<()> {
        if let Some(rows) = params.get(PARAM_ROWS) {
            self.rows = records_from_json(&self.name, rows)?;
        }
        Ok(())
    }

    async fn read(&self) -> Result<Dataset> {
        debug!(stage = self.name.as_str(), rows = self.rows.len(), "Serving rows from memory");
        Ok(Dataset::from_records(self.rows.clone()))
    }
}

fn records_from_json(stage: &str, rows: &Value) -> Result<Vec<Record>> {
    let Value::Array(items) = rows else {
        return Err(ETLError::Configuration(format!(
            "parameter <{}> of '{}' must be an array",
            PARAM_ROWS, stage
        )));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(fields) => Ok(fields
                .iter()
                .map(|(column, value)| (column.clone(), json_to_string(value)))
                .collect()),
            _ => Err(ETLError::Configuration(format!(
                "every row of '{}' must be a JSON object",
                stage
            ))),
        })
        .collect()
}

fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loader keeping every written dataset in a shared, inspectable list.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    name: String,
    written: Arc<Mutex<Vec<Dataset>>>,
    reject: bool,
}

impl MemoryLoader {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryLoader {
            name: name.into(),
            written: Arc::new(Mutex::new(Vec::new())),
            reject: false,
        }
    }

    /// A loader whose writes always fail.
    pub fn rejecting(name: impl Into<String>) -> Self {
        MemoryLoader {
            reject: true,
            ..MemoryLoader::new(name)
        }
    }

    /// Shared handle on the written datasets, usable after the loader has
    /// been handed to a pipeline.
    pub fn handle(&self) -> Arc<Mutex<Vec<Dataset>>> {
        Arc::clone(&self.written)
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "MemoryLoader"
    }

    fn initialize(&mut self, params: &Parameters) -> Result<()> {
        self.reject = params.get_bool_or(PARAM_REJECT, self.reject);
        Ok(())
    }

    async fn write(&self, dataset: &Dataset) -> Result<()> {
        if self.reject {
            return Err(ETLError::LoadRejected(self.name.clone()));
        }
        self.written.lock().await.push(dataset.clone());
        Ok(())
    }
}
