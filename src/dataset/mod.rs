pub mod dataset;
pub mod datasets;

pub use dataset::{Dataset, Record};
pub use datasets::Datasets;
