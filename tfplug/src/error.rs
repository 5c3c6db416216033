//! Framework errors
//!
//! Provider, resource and data source calls report problems to Terraform as
//! diagnostics. `TfplugError` covers the rest: factory lookups, value
//! encoding and path navigation inside `DynamicValue`.

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("no resource registered as {0}")]
    ResourceNotFound(String),

    #[error("no data source registered as {0}")]
    DataSourceNotFound(String),

    #[error("provider has not been configured")]
    ProviderNotConfigured,

    /// Diagnostics raised while configuring a factory-built object
    #[error("configuration rejected: {0}")]
    InvalidConfiguration(String),

    #[error("encoding failed: {0}")]
    EncodingError(String),

    #[error("decoding failed: {0}")]
    DecodingError(String),

    #[error("expected {expected} value, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("cannot follow path {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        assert_eq!(
            TfplugError::ResourceNotFound("apstra_blueprint".into()).to_string(),
            "no resource registered as apstra_blueprint"
        );
        assert_eq!(
            TfplugError::TypeMismatch {
                expected: "string".into(),
                actual: "number".into(),
            }
            .to_string(),
            "expected string value, found number"
        );
    }
}
