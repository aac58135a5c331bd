//! Builds pipelines from configuration documents.
//!
//! Each stage entry names a `classname`; the factory maps it to a
//! constructor, creates the stage and initializes it with its parameters.

use std::collections::HashMap;
use tracing::debug;

use crate::connectors::{CsvFileLoader, CsvFileSource, MemoryLoader, MemorySource};
use crate::etl::{
    DataSource, ETLError, EtlPipeline, Loader, PipelineConfig, Result, Transformer,
};
use crate::transformers::DoNothing;

type SourceCtor = Box<dyn Fn(&str) -> Box<dyn DataSource> + Send + Sync>;
type TransformerCtor =
    Box<dyn Fn(&str, Vec<String>, Vec<String>) -> Box<dyn Transformer> + Send + Sync>;
type LoaderCtor = Box<dyn Fn(&str) -> Box<dyn Loader> + Send + Sync>;

#[derive(Default)]
pub struct StageFactory {
    sources: HashMap<String, SourceCtor>,
    transformers: HashMap<String, TransformerCtor>,
    loaders: HashMap<String, LoaderCtor>,
}

impl StageFactory {
    /// An empty factory, without any known classname.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory knowing every stage shipped with the crate.
    pub fn with_builtins() -> Self {
        let mut factory = StageFactory::new();
        factory.register_source("CsvFileSource", |name| Box::new(CsvFileSource::new(name)));
        factory.register_source("MemorySource", |name| {
            Box::new(MemorySource::new(name, Vec::new()))
        });
        factory.register_transformer("DoNothing", |name, inputs, outputs| {
            Box::new(DoNothing::new(name, inputs, outputs))
        });
        factory.register_loader("CsvFileLoader", |name| Box::new(CsvFileLoader::new(name)));
        factory.register_loader("MemoryLoader", |name| Box::new(MemoryLoader::new(name)));
        factory
    }

    pub fn register_source<F>(&mut self, classname: impl Into<String>, ctor: F)
    where
        F: Fn(&str) -> Box<dyn DataSource> + Send + Sync + 'static,
    {
        self.sources.insert(classname.into(), Box::new(ctor));
    }

    pub fn register_transformer<F>(&mut self, classname: impl Into<String>, ctor: F)
    where
        F: Fn(&str, Vec<String>, Vec<String>) -> Box<dyn Transformer> + Send + Sync + 'static,
    {
        self.transformers.insert(classname.into(), Box::new(ctor));
    }

    pub fn register_loader<F>(&mut self, classname: impl Into<String>, ctor: F)
    where
        F: Fn(&str) -> Box<dyn Loader> + Send + Sync + 'static,
    {
        self.loaders.insert(classname.into(), Box::new(ctor));
    }

    /// Creates and initializes every stage of `config`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ETLError::UnknownStage`] for an unregistered classname and
    /// [`ETLError::Initialization`] when a stage rejects its parameters.
    pub fn build(&self, config: &PipelineConfig) -> Result<EtlPipeline> {
        let mut pipeline = EtlPipeline::new(config.pipeline_config());

        for entry in &config.extractors {
            let ctor = self
                .sources
                .get(&entry.classname)
                .ok_or_else(|| unknown("data source", &entry.classname))?;
            let mut source = ctor(entry.name.as_str());
            source
                .initialize(&entry.parameters)
                .map_err(|e| initialization_failed(&entry.name, e))?;
            debug!(stage = entry.name.as_str(), classname = entry.classname.as_str(), "Data source ready");
            pipeline.add_extractor(source);
        }

        for entry in &config.transformers {
            let ctor = self
                .transformers
                .get(&entry.classname)
                .ok_or_else(|| unknown("transformer", &entry.classname))?;
            let mut transformer = ctor(entry.name.as_str(), entry.inputs.clone(), entry.outputs.clone());
            transformer
                .initialize(&entry.parameters)
                .map_err(|e| initialization_failed(&entry.name, e))?;
            debug!(stage = entry.name.as_str(), classname = entry.classname.as_str(), "Transformer ready");
            pipeline.add_transformer(transformer);
        }

        for entry in &config.loaders {
            let ctor = self
                .loaders
                .get(&entry.classname)
                .ok_or_else(|| unknown("loader", &entry.classname))?;
            let mut loader = ctor(entry.name.as_str());
            loader
                .initialize(&entry.parameters)
                .map_err(|e| initialization_failed(&entry.name, e))?;
            debug!(stage = entry.name.as_str(), classname = entry.classname.as_str(), "Loader ready");
            pipeline.add_loader(loader);
        }

        Ok(pipeline)
    }
}

fn unknown(kind: &str, classname: &str) -> ETLError {
    ETLError::UnknownStage {
        kind: kind.to_string(),
        classname: classname.to_string(),
    }
}

fn initialization_failed(stage: &str, err: ETLError) -> ETLError {
    ETLError::Initialization(format!("stage '{}': {}", stage, err))
}
