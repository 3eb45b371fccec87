use crate::model::{ElementKind, ElementRef};
use crate::xml::XmlError;

/// Request-level failures. Each variant maps to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Gone(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(kind: ElementKind, id: i64) -> Self {
        ApiError::NotFound(format!("The {kind} with the id {id} was not found"))
    }

    pub fn gone(kind: ElementKind, id: i64) -> Self {
        ApiError::Gone(format!("The {kind} with the id {id} has already been deleted"))
    }

    pub fn changeset_missing() -> Self {
        ApiError::BadRequest("Changeset id is missing".to_string())
    }

    pub fn version_mismatch(element: ElementRef, provided: i64, stored: i64) -> Self {
        ApiError::Conflict(format!(
            "Version mismatch: Provided {provided}, server had: {stored} of {} {}",
            element.kind.title(),
            element.id
        ))
    }
}

impl From<XmlError> for ApiError {
    fn from(error: XmlError) -> Self {
        match error {
            XmlError::Encoding(_) => ApiError::Internal(anyhow::Error::new(error)),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}
