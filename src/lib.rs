//! # pipelite
//!
//! A batch ETL (Extract-Transform-Load) pipeline runner built on Tokio.
//!
//! ## Features
//!
//! - **Named datasets** shared between stages through an in-memory stack
//! - **Pluggable stages** via the [`DataSource`], [`Transformer`] and [`Loader`] traits
//! - **Execution report** with per-stage order, timing and row counts
//! - **JSON configuration** resolved to stages by a [`StageFactory`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipelite::connectors::{MemoryLoader, MemorySource};
//! use pipelite::dataset::Record;
//! use pipelite::etl::{Config, EtlPipeline};
//!
//! let mut pipeline = EtlPipeline::new(Config::new("orders"));
//! pipeline.add_extractor(Box::new(MemorySource::new(
//!     "orders",
//!     vec![Record::from([("id", "1")])],
//! )));
//! pipeline.add_loader(Box::new(MemoryLoader::new("orders")));
//!
//! let report = pipeline.execute().await;
//! println!("{}", report.full_report());
//! ```
//!
//! ## Modules
//!
//! - [`dataset`] - Records, datasets and the name-keyed dataset collection
//! - [`etl`] - Stage contracts, configuration and the pipeline orchestrator
//! - [`report`] - Per-stage execution report
//! - [`connectors`] - CSV and in-memory data sources and loaders
//! - [`transformers`] - Built-in transformers
//! - [`factory`] - Pipeline construction from configuration documents

pub mod connectors;
pub mod dataset;
pub mod etl;
pub mod factory;
pub mod logging;
pub mod report;
pub mod transformers;

pub use dataset::{Dataset, Datasets, Record};
pub use etl::{DataSource, ETLError, EtlPipeline, Loader, Transformer};
pub use factory::StageFactory;
pub use report::Report;
