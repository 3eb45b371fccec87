use axum::{
    http::{
        header::{CONTENT_TYPE, WWW_AUTHENTICATE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::logic::ApiError;
use crate::xml::{self, OsmDocument};

/// A rendered XML document
#[derive(Debug, Clone)]
pub struct Xml(pub String);

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, "text/xml; charset=utf-8")], self.0).into_response()
    }
}

impl Xml {
    /// Render a response document. Failing to write XML is a server fault,
    /// never the client's.
    pub fn document(document: &OsmDocument, max_changeset_elements: u64) -> Result<Self, ApiError> {
        xml::render(document, max_changeset_elements)
            .map(Xml)
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("rendering osm document")))
    }

    pub fn diff_result(results: &[crate::model::DiffResult]) -> Result<Self, ApiError> {
        xml::render_diff_result(results)
            .map(Xml)
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("rendering diffResult")))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(error) => {
                log::error!("request failed: {error:#}");
                "Internal server error".to_string()
            }
            other => {
                log::debug!("request rejected with {}: {}", status, other);
                other.to_string()
            }
        };

        let mut response = (status, message).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Web Password\""),
            );
        }
        response
    }
}
