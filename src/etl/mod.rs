pub mod config;
pub mod pipeline;
pub mod stage;
pub mod types;

pub use config::{
    Config, ConfigBuilder, LoggingConfig, Parameters, PipelineConfig, StageConfig,
    TransformerConfig,
};
pub use pipeline::{EtlPipeline, PipelineState};
pub use stage::{DataSource, Loader, Transformer};
pub use types::{ETLError, Result};
