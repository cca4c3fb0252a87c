use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pantry_core::ValidationError;
use pantry_ocr::{PipelineError, PreprocessError};
use pantry_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No ingredients are registered; add some before asking for a menu")]
    EmptyInventory,

    #[error("{0}")]
    UnsupportedMedia(String),

    #[error("{0}")]
    TooLarge(String),

    #[error("No text could be extracted from the image")]
    NoText,

    #[error("{0}")]
    Upstream(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmptyInventory => StatusCode::CONFLICT,
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NoText => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => ApiError::NotFound(format!("Item {id} not found")),
            other => ApiError::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(r) => ApiError::UnsupportedMedia(r.body_text()),
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ApiError::TooLarge(other.body_text())
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Preprocess(PreprocessError::Unsupported) => {
                ApiError::UnsupportedMedia(PreprocessError::Unsupported.to_string())
            }
            PipelineError::Preprocess(p) => ApiError::BadRequest(p.to_string()),
            PipelineError::Ocr(o) => ApiError::Upstream(o.to_string()),
            PipelineError::Worker(w) => ApiError::Internal(w.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::ItemId;

    #[test]
    fn storage_not_found_becomes_404() {
        let err = ApiError::from(StorageError::NotFound(ItemId::new("42")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Item 42 not found");
    }

    #[test]
    fn unsupported_image_becomes_415() {
        let err = ApiError::from(PipelineError::Preprocess(PreprocessError::Unsupported));
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::from(ValidationError::MissingFields(vec!["name"])).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmptyInventory.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NoText.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::TooLarge("x".into()).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::NotConfigured("OCR").status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Storage(StorageError::Dynamo("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
