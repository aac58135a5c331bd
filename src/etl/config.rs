// src/etl/config.rs

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::types::{ETLError, Result};

/// Runtime settings of the pipeline orchestrator.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Config {
    /// Name used in log lines for this pipeline run
    #[builder(default = "\"pipelite\".to_string()")]
    pub(crate) name: String,

    /// Whether `terminate()` logs the rendered report
    #[builder(default = "true")]
    pub(crate) log_report: bool,
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Config {
            name: name.into(),
            log_report: true,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn log_report(&self) -> bool {
        self.log_report
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new("pipelite")
    }
}

impl From<ConfigBuilderError> for ETLError {
    fn from(err: ConfigBuilderError) -> Self {
        ETLError::Build(err.to_string())
    }
}

/// Free-form parameters handed to a stage's `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`; empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn require_str(&self, stage: &str, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| ETLError::missing_parameter(stage, key))
    }
}

/// Configuration entry of a data source or loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub classname: String,
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    pub name: String,
    pub classname: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// A pipeline document: which stages run, in which order, with which
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extractors: Vec<StageConfig>,
    #[serde(default)]
    pub transformers: Vec<TransformerConfig>,
    #[serde(default)]
    pub loaders: Vec<StageConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ETLError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn pipeline_config(&self) -> Config {
        match &self.name {
            Some(name) => Config::new(name.clone()),
            None => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "name": "daily",
        "extractors": [
            { "name": "orders", "classname": "CsvFileSource",
              "parameters": { "path": "orders.csv", "separator": ";" } }
        ],
        "transformers": [
            { "name": "copy", "classname": "DoNothing",
              "inputs": ["orders"], "outputs": ["orders_out"] }
        ],
        "loaders": [
            { "name": "orders_out", "classname": "MemoryLoader" }
        ],
        "logging": { "level": "debug" }
    }"#;

    #[test]
    fn test_config_builder_defaults() {
        let config = ConfigBuilder::default().build().unwrap();
        assert_eq!(config.name(), "pipelite");
        assert!(config.log_report());

        let config = ConfigBuilder::default()
            .name("nightly")
            .log_report(false)
            .build()
            .unwrap();
        assert_eq!(config.name(), "nightly");
        assert!(!config.log_report());
    }

    #[test]
    fn test_builder_error_converts() {
        let err: ETLError = ConfigBuilderError::UninitializedField("name").into();
        assert!(matches!(err, ETLError::Build(_)));
    }

    #[test]
    fn test_parse_pipeline_document() {
        let config = PipelineConfig::from_json_str(DOCUMENT).unwrap();

        assert_eq!(config.pipeline_config().name(), "daily");
        assert_eq!(config.extractors.len(), 1);
        assert_eq!(
            config.extractors[0].parameters.get_str("separator"),
            Some(";")
        );
        assert_eq!(config.transformers[0].inputs, vec!["orders"]);
        assert_eq!(config.transformers[0].outputs, vec!["orders_out"]);
        assert_eq!(config.loaders[0].parameters, Parameters::new());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config = PipelineConfig::from_json_str("{}").unwrap();

        assert!(config.extractors.is_empty());
        assert!(config.transformers.is_empty());
        assert!(config.loaders.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pipeline_config().name(), "pipelite");
    }

    #[test]
    fn test_invalid_document_is_json_error() {
        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ETLError::Json(_)));
    }

    #[test]
    fn test_parameters_accessors() {
        let params = Parameters::new()
            .with("path", "data.csv")
            .with("blank", "")
            .with("header", false);

        assert_eq!(params.require_str("src", "path").unwrap(), "data.csv");
        assert_eq!(params.get_str("blank"), None);
        assert_eq!(params.get_str_or("separator", ","), ",");
        assert!(!params.get_bool_or("header", true));

        let err = params.require_str("src", "table").unwrap_err();
        assert!(matches!(
            err,
            ETLError::MissingParameter { ref stage, ref parameter }
                if stage == "src" && parameter == "table"
        ));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        tokio::fs::write(&path, DOCUMENT).await.unwrap();

        let config = PipelineConfig::from_file(&path).await.unwrap();
        assert_eq!(config.name.as_deref(), Some("daily"));

        let err = PipelineConfig::from_file(dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ETLError::Configuration(_)));
    }
}
