//! Runs a pipeline described by a JSON document.
//!
//! Without argument, a built-in document is used: it reads two in-memory
//! datasets, copies one of them with the `DoNothing` transformer and writes
//! the copy to `orders_copy.csv` in the system temp directory.
//!
//! Run with: cargo run --example csv_pipeline [pipeline.json]

use pipelite::etl::PipelineConfig;
use pipelite::{logging, StageFactory};
use std::error::Error;

const DEFAULT_DOCUMENT: &str = r#"{
    "name": "demo",
    "extractors": [
        { "name": "orders", "classname": "MemorySource",
          "parameters": { "rows": [
              { "id": 1, "customer": "ann", "amount": 12.5 },
              { "id": 2, "customer": "bob", "amount": 7 },
              { "id": 3, "customer": "ann", "amount": 30 }
          ] } },
        { "name": "returns", "classname": "MemorySource",
          "parameters": { "rows": [] } }
    ],
    "transformers": [
        { "name": "copy", "classname": "DoNothing",
          "inputs": ["orders"], "outputs": ["orders_copy"] }
    ],
    "loaders": [
        { "name": "orders_copy", "classname": "CsvFileLoader",
          "parameters": { "path": "${OUTPUT}" } },
        { "name": "returns", "classname": "MemoryLoader" }
    ],
    "logging": { "level": "info" }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_file(path).await?,
        None => {
            let output = std::env::temp_dir().join("orders_copy.csv");
            let document = DEFAULT_DOCUMENT.replace(
                "${OUTPUT}",
                &output.to_string_lossy().replace('\\', "/"),
            );
            PipelineConfig::from_json_str(&document)?
        }
    };

    logging::init(&config.logging.level);

    let mut pipeline = StageFactory::with_builtins().build(&config)?;
    let report = pipeline.execute().await;

    println!("{}", report.full_report());
    if !pipeline.succeeded() {
        return Err(format!("pipeline ended in state {}", pipeline.state()).into());
    }
    Ok(())
}
