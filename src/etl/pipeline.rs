use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use super::config::Config;
use super::stage::{DataSource, Loader, Transformer};
use super::types::{ETLError, Result};
use crate::dataset::Datasets;
use crate::report::{Report, StageKind};

/// Where a pipeline run stands. `Error` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Initialized,
    Extracted,
    Transformed,
    Loaded,
    Terminated,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Runs configured data sources, transformers and loaders against an
/// in-memory dataset stack.
///
/// # Lifecycle
///
/// 1. `initialize()` - Validate stages and register report entries
/// 2. `extract()` - Read every data source onto the stack
/// 3. `transform()` - Run every transformer on datasets from the stack
/// 4. `load()` - Write stacked datasets to the loaders with the same name
/// 5. `terminate()` - Render the report
///
/// Stages run one at a time in configured order. Each stage method logs its
/// own failures and returns `false`, which stops the run.
pub struct EtlPipeline {
    config: Config,
    extractors: Vec<Box<dyn DataSource>>,
    transformers: Vec<Box<dyn Transformer>>,
    loaders: Vec<Box<dyn Loader>>,
    registry: Datasets,
    report: Report,
    order_index: usize,
    state: PipelineState,
}

impl EtlPipeline {
    pub fn new(config: Config) -> Self {
        EtlPipeline {
            config,
            extractors: Vec::new(),
            transformers: Vec::new(),
            loaders: Vec::new(),
            registry: Datasets::new(),
            report: Report::new(),
            order_index: 0,
            state: PipelineState::Created,
        }
    }

    pub fn add_extractor(&mut self, source: Box<dyn DataSource>) {
        self.extractors.push(source);
    }

    pub fn add_transformer(&mut self, transformer: Box<dyn Transformer>) {
        self.transformers.push(transformer);
    }

    pub fn add_loader(&mut self, loader: Box<dyn Loader>) {
        self.loaders.push(loader);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Datasets currently on the stack.
    pub fn registry(&self) -> &Datasets {
        &self.registry
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// True once a run went through every stage and terminated.
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Terminated
    }

    /// Runs initialize, extract, transform and load in sequence, stopping at
    /// the first failing stage, then terminates and returns the report.
    ///
    /// A panic raised by a stage is caught here; the report accumulated up
    /// to that point is still returned.
    pub async fn execute(&mut self) -> Report {
        let outcome = AssertUnwindSafe(self.run_stages()).catch_unwind().await;
        if let Err(panic) = outcome {
            let err = ETLError::Panicked(panic_message(panic.as_ref()));
            error!(pipeline = self.config.name(), error = %err, "Error when processing the data");
            self.report.fail_running();
            self.state = PipelineState::Error;
        }
        self.terminate();
        self.report.clone()
    }

    async fn run_stages(&mut self) {
        if !self.initialize() {
            error!(
                pipeline = self.config.name(),
                "The data pipeline has not been initialized properly"
            );
            return;
        }
        info!(pipeline = self.config.name(), "Pipeline initialized successfully");

        info!("--- EXTRACT ---");
        if !self.extract().await {
            return;
        }
        info!("Data extracted successfully");

        info!("--- TRANSFORM ---");
        if !self.transform().await {
            return;
        }
        info!("Data transformed successfully");

        info!("--- LOAD ---");
        if self.load().await {
            info!("Data loaded successfully");
        }
    }

    /// Validates the configured stages and registers one report entry per
    /// stage. Resets the order index, the dataset stack and the report, so a
    /// terminated or failed pipeline can run again. Refused while a run is
    /// in progress.
    pub fn initialize(&mut self) -> bool {
        match self.try_initialize() {
            Ok(()) => {
                self.state = PipelineState::Initialized;
                true
            }
            Err(e) => self.fail("initialize", &e),
        }
    }

    fn try_initialize(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            PipelineState::Created | PipelineState::Terminated | PipelineState::Error
        ) {
            return Err(ETLError::InvalidState {
                operation: "initialize",
                state: self.state.to_string(),
            });
        }
        self.order_index = 0;
        self.registry.clear();
        self.report = Report::new();

        if self.extractors.is_empty() {
            return Err(ETLError::Initialization(
                "no data source is configured".to_string(),
            ));
        }
        check_names(
            StageKind::DataSource,
            self.extractors.iter().map(|s| s.name()),
        )?;
        check_names(
            StageKind::Transformer,
            self.transformers.iter().map(|t| t.name()),
        )?;
        check_names(StageKind::Loader, self.loaders.iter().map(|l| l.name()))?;

        for source in &self.extractors {
            self.report.get_from_name(StageKind::DataSource, source.name());
        }
        for transformer in &self.transformers {
            self.report
                .get_from_name(StageKind::Transformer, transformer.name());
        }
        for loader in &self.loaders {
            self.report.get_from_name(StageKind::Loader, loader.name());
        }
        debug!(
            extractors = self.extractors.len(),
            transformers = self.transformers.len(),
            loaders = self.loaders.len(),
            "Stages registered"
        );
        Ok(())
    }

    /// Reads every data source onto the stack, in configured order.
    ///
    /// Sources returning no rows are reported but not stacked, so later
    /// stages see them as absent. The first failing source stops the
    /// extraction and discards what was already extracted.
    pub async fn extract(&mut self) -> bool {
        if let Err(e) = self.expect_state(PipelineState::Initialized, "extract") {
            return self.fail("extract", &e);
        }
        match self.try_extract().await {
            Ok(()) => {
                self.state = PipelineState::Extracted;
                true
            }
            Err(e) => {
                self.registry.clear();
                self.fail("extract", &e)
            }
        }
    }

    async fn try_extract(&mut self) -> Result<()> {
        for source in &self.extractors {
            let name = source.name();
            info!(stage = name, "Extracting data from the data source");
            let order = next_order_index(&mut self.order_index);
            let description = format!("{} -> Output: [{}]", source.kind(), name);
            self.report
                .get_from_name(StageKind::DataSource, name)
                .start(order, description);

            let mut dataset = match source.read().await {
                Ok(dataset) => dataset,
                Err(e) => {
                    self.report.get_from_name(StageKind::DataSource, name).fail();
                    return Err(match e {
                        ETLError::Extract { .. } => e,
                        other => ETLError::extract(name, other),
                    });
                }
            };
            dataset.set_name(name);
            let rows = dataset.count();
            self.report
                .get_from_name(StageKind::DataSource, name)
                .end(rows);

            if rows > 0 {
                info!(stage = name, rows, columns = ?dataset.columns(), "Dataset extracted");
                self.registry.add(dataset);
            } else {
                warn!(stage = name, "The data source returned no rows, it is not stacked");
            }
        }
        Ok(())
    }

    /// Runs every transformer, in configured order, on the datasets its
    /// inputs resolve to.
    ///
    /// Inputs missing from the stack are left out. A transformer is bypassed
    /// only when nothing it resolved has rows.
    pub async fn transform(&mut self) -> bool {
        if let Err(e) = self.expect_state(PipelineState::Extracted, "transform") {
            return self.fail("transform", &e);
        }
        match self.try_transform().await {
            Ok(()) => {
                self.state = PipelineState::Transformed;
                true
            }
            Err(e) => self.fail("transform", &e),
        }
    }

    async fn try_transform(&mut self) -> Result<()> {
        for transformer in &self.transformers {
            let name = transformer.name();
            let order = next_order_index(&mut self.order_index);
            let description = format!(
                "{} -> Inputs: [{}] / Outputs: [{}]",
                transformer.kind(),
                transformer.inputs().join(","),
                transformer.outputs().join(",")
            );
            self.report
                .get_from_name(StageKind::Transformer, name)
                .start(order, description);

            let mut inputs = Datasets::new();
            for input in transformer.inputs() {
                match self.registry.get_from_name(input) {
                    Some(dataset) => inputs.add(dataset.clone()),
                    None => debug!(stage = name, input = input.as_str(), "Input is not on the stack"),
                }
            }

            let rows = inputs.total_row_count();
            if inputs.is_empty() {
                warn!(stage = name, "The transformer has no input, bypass it");
                self.report
                    .get_from_name(StageKind::Transformer, name)
                    .skip();
                continue;
            }

            match transformer.process(inputs).await {
                Ok((outputs, transformed)) => {
                    debug!(stage = name, outputs = ?outputs.names(), "Merging outputs on the stack");
                    self.registry.merge(outputs);
                    info!(stage = name, rows, transformed, "Rows processed by the transformer");
                    self.report
                        .get_from_name(StageKind::Transformer, name)
                        .end(rows);
                }
                Err(e) => {
                    self.report
                        .get_from_name(StageKind::Transformer, name)
                        .fail();
                    return Err(match e {
                        ETLError::Transform { .. } => e,
                        other => ETLError::transform(name, other),
                    });
                }
            }
        }
        Ok(())
    }

    /// Writes stacked datasets to the loaders sharing their name, in
    /// configured order.
    ///
    /// A loader without a matching dataset is skipped. A failed write stops
    /// the remaining loaders.
    pub async fn load(&mut self) -> bool {
        if let Err(e) = self.expect_state(PipelineState::Transformed, "load") {
            return self.fail("load", &e);
        }
        match self.try_load().await {
            Ok(()) => {
                self.state = PipelineState::Loaded;
                true
            }
            Err(e) => self.fail("load", &e),
        }
    }

    async fn try_load(&mut self) -> Result<()> {
        for loader in &self.loaders {
            let name = loader.name();
            let Some(dataset) = self.registry.get_from_name(name) else {
                warn!(stage = name, "There are no data to load into the data source");
                self.report.get_from_name(StageKind::Loader, name).skip();
                continue;
            };

            info!(stage = name, "Loading content to the data source");
            let order = next_order_index(&mut self.order_index);
            let description = format!("{} -> Input: [{}]", loader.kind(), name);
            self.report
                .get_from_name(StageKind::Loader, name)
                .start(order, description);

            if let Err(e) = loader.write(dataset).await {
                self.report.get_from_name(StageKind::Loader, name).fail();
                return Err(match e {
                    ETLError::Load { .. } | ETLError::LoadRejected(_) => e,
                    other => ETLError::load(name, other),
                });
            }

            let rows = dataset.count();
            self.report.get_from_name(StageKind::Loader, name).end(rows);
            info!(stage = name, rows, columns = ?dataset.columns(), "Dataset loaded");
        }
        Ok(())
    }

    /// Logs the execution report. Always succeeds.
    pub fn terminate(&mut self) -> bool {
        if self.config.log_report() {
            info!(
                pipeline = self.config.name(),
                "Pipeline report\n\n{}\n",
                self.report.full_report()
            );
        }
        info!(pipeline = self.config.name(), "*** End of job treatment ***");
        if self.state != PipelineState::Error {
            self.state = PipelineState::Terminated;
        }
        true
    }

    fn expect_state(&self, expected: PipelineState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ETLError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, operation: &str, err: &ETLError) -> bool {
        error!(
            pipeline = self.config.name(),
            operation,
            error = %error_chain(err),
            "Pipeline stage failed"
        );
        self.state = PipelineState::Error;
        false
    }
}

fn next_order_index(counter: &mut usize) -> usize {
    *counter += 1;
    *counter
}

fn check_names<'a>(kind: StageKind, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(ETLError::Initialization(format!(
                "empty name for a {} stage",
                kind
            )));
        }
        if !seen.insert(name) {
            return Err(ETLError::Initialization(format!(
                "{} stage name '{}' is used twice",
                kind, name
            )));
        }
    }
    Ok(())
}

fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
