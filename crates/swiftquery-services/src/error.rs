use swiftquery_core::SwiftQueryError;
use swiftquery_query::WorkbenchError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workbench(#[from] WorkbenchError),

    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    #[error("Schema object not found: {0}")]
    ObjectNotFound(String),
}

impl From<SwiftQueryError> for ServiceError {
    fn from(err: SwiftQueryError) -> Self {
        Self::SchemaLoadFailed(err.user_message())
    }
}
