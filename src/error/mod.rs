mod upstream_error;
mod parser;

use thiserror::Error;

pub use upstream_error::UpstreamError;
pub use parser::{parse_http_error, from_reqwest, ErrorContext};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("API key is required")]
    InvalidCredential,

    #[error("Error fetching users: {0}")]
    DirectoryUnavailable(UpstreamError),

    #[error("Error fetching tables: {0}")]
    CatalogUnavailable(UpstreamError),

    #[error("{0}")]
    LogWrite(String),

    #[error("Error fetching logs: {0}")]
    LogRead(UpstreamError),

    #[error("Scan timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Short message handed back to scan callers. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuditError::InvalidCredential => "API key is required".to_string(),
            AuditError::DirectoryUnavailable(_) => "Error fetching users".to_string(),
            AuditError::CatalogUnavailable(_) => "Error fetching tables".to_string(),
            AuditError::LogRead(_) => "Error fetching logs".to_string(),
            AuditError::Timeout { .. } => "Compliance check timed out".to_string(),
            other => other.to_string(),
        }
    }

    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            AuditError::DirectoryUnavailable(e)
            | AuditError::CatalogUnavailable(e)
            | AuditError::LogRead(e) => Some(e),
            _ => None,
        }
    }

    /// Caller mistakes as opposed to failures of the scanned project or the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AuditError::InvalidCredential | AuditError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
