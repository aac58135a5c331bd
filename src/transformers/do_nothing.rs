use async_trait::async_trait;

use crate::dataset::Datasets;
use crate::etl::{Result, Transformer};

/// Identity transformer: hands its inputs back untouched.
///
/// Through [`Transformer::process`] the inputs are renamed to the declared
/// outputs, which makes it the simplest way to copy a dataset under a new
/// name (for instance to feed a loader).
#[derive(Debug, Clone)]
pub struct DoNothing {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl DoNothing {
    pub fn new(name: impl Into<String>, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        DoNothing {
            name: name.into(),
            inputs,
            outputs,
        }
    }
}

#[async_trait]
impl Transformer for DoNothing {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "DoNothing"
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    async fn transform(&self, inputs: Datasets) -> Result<(Datasets, usize)> {
        Ok((inputs, 0))
    }
}
