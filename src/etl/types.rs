/// Errors that can occur while configuring or running a pipeline
#[derive(Debug, thiserror::Error)]
pub enum ETLError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mandatory parameter <{parameter}> is missing for stage '{stage}'")]
    MissingParameter { stage: String, parameter: String },

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Unknown {kind} classname '{classname}'")]
    UnknownStage { kind: String, classname: String },

    #[error("Data source '{stage}' failed to extract")]
    Extract {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Transformer '{stage}' failed")]
    Transform {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Loader '{stage}' failed")]
    Load {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("The data source {0} could not be loaded properly")]
    LoadRejected(String),

    #[error("Cannot {operation} while pipeline is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Stage panicked: {0}")]
    Panicked(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ETLError {
    /// Wraps any error raised while a data source was reading.
    pub fn extract<E>(stage: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ETLError::Extract {
            stage: stage.into(),
            source: source.into(),
        }
    }

    /// Wraps any error raised while a transformer was processing.
    pub fn transform<E>(stage: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ETLError::Transform {
            stage: stage.into(),
            source: source.into(),
        }
    }

    /// Wraps any error raised while a loader was writing.
    pub fn load<E>(stage: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ETLError::Load {
            stage: stage.into(),
            source: source.into(),
        }
    }

    pub fn missing_parameter(stage: impl Into<String>, parameter: impl Into<String>) -> Self {
        ETLError::MissingParameter {
            stage: stage.into(),
            parameter: parameter.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ETLError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_extract_error_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ETLError::extract("orders", source);

        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Data source 'orders' failed to extract");
    }

    #[test]
    fn test_transform_error_from_message() {
        let err = ETLError::transform("join", "key column missing");

        assert_eq!(err.to_string(), "Transformer 'join' failed");
        assert_eq!(err.source().unwrap().to_string(), "key column missing");
    }

    #[test]
    fn test_error_display() {
        let err = ETLError::missing_parameter("orders", "path");
        assert_eq!(
            err.to_string(),
            "Mandatory parameter <path> is missing for stage 'orders'"
        );

        let err = ETLError::LoadRejected("orders".to_string());
        assert_eq!(
            err.to_string(),
            "The data source orders could not be loaded properly"
        );

        let err = ETLError::InvalidState {
            operation: "load",
            state: "Created".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot load while pipeline is Created");
    }
}
