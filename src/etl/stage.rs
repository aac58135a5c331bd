use async_trait::async_trait;

use super::config::Parameters;
use super::types::Result;
use crate::dataset::{Dataset, Datasets};

/// Produces a dataset from an external system.
///
/// The pipeline stores the returned dataset under [`DataSource::name`],
/// whatever name the source gave it.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name of the dataset this source produces.
    fn name(&self) -> &str;

    /// Type of source, shown in the execution report.
    fn kind(&self) -> &str;

    /// Validates and stores configuration parameters.
    fn initialize(&mut self, _params: &Parameters) -> Result<()> {
        Ok(())
    }

    /// Reads the whole source into memory.
    async fn read(&self) -> Result<Dataset>;
}

/// Derives new datasets from datasets already on the stack.
///
/// # Lifecycle
///
/// 1. The pipeline resolves every name of [`Transformer::inputs`] that is
///    present on the stack. Missing names are left out.
/// 2. If at least one resolved dataset has rows, [`Transformer::process`] is
///    called with them.
/// 3. The outputs are merged back into the stack.
#[async_trait]
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &str;

    /// Dataset names looked up on the stack, in order.
    fn inputs(&self) -> &[String];

    /// Names given to the produced datasets, in order.
    fn outputs(&self) -> &[String];

    fn initialize(&mut self, _params: &Parameters) -> Result<()> {
        Ok(())
    }

    /// Business logic: returns the produced datasets and the number of
    /// transformed rows.
    async fn transform(&self, inputs: Datasets) -> Result<(Datasets, usize)>;

    /// Runs [`Transformer::transform`] and names its outputs.
    ///
    /// A produced dataset still named after the i-th declared input takes
    /// the i-th declared output name, so an input missing from the stack
    /// never shifts the names of the others. Any other produced dataset
    /// takes the output name at its own position, unless that name is
    /// already claimed. Datasets left without a declared name keep theirs.
    async fn process(&self, inputs: Datasets) -> Result<(Datasets, usize)> {
        let (produced, transformed) = self.transform(inputs).await?;
        let declared = self.outputs();
        let input_position = |name: &str| self.inputs().iter().position(|input| input == name);

        let claimed: Vec<&String> = produced
            .iter()
            .filter_map(|d| input_position(d.name()).and_then(|pos| declared.get(pos)))
            .collect();

        let mut outputs = Datasets::new();
        for (i, mut dataset) in produced.into_iter().enumerate() {
            let target = match input_position(dataset.name()) {
                Some(pos) => declared.get(pos),
                None => declared.get(i).filter(|name| !claimed.contains(name)),
            };
            if let Some(name) = target {
                dataset.set_name(name.clone());
            }
            outputs.add(dataset);
        }
        Ok((outputs, transformed))
    }
}

/// Writes a dataset to an external system.
///
/// A loader only runs when a dataset with its name is on the stack.
#[async_trait]
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &str;

    fn initialize(&mut self, _params: &Parameters) -> Result<()> {
        Ok(())
    }

    /// Persists `dataset`. Rejections are reported as
    /// [`ETLError::LoadRejected`](super::types::ETLError::LoadRejected).
    async fn write(&self, dataset: &Dataset) -> Result<()>;
}
