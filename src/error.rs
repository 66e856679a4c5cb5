//! Service-level error types

use crate::model::ModelError;

/// Errors raised while assembling or running the service.
///
/// Request handlers never return these; they convert every failure into a
/// well-formed JSON body. These surface at startup (configuration, binding,
/// client construction) and bubble up to `main`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model client error: {0}")]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let err: ServiceError = config::ConfigError::Message("bad port".to_string()).into();
        assert!(matches!(err, ServiceError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }

    #[test]
    fn test_model_error_conversion() {
        let err: ServiceError = ModelError::MissingCredential.into();
        assert!(err.to_string().starts_with("Model client error"));
    }
}
