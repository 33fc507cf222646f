//! Service error type and HTTP status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use pprl_core::Error as CoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let ServiceError::Core(error) = self;

        let status = match &error {
            CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Transform { .. }
            | CoreError::EmptyValue { .. }
            | CoreError::Decode(_)
            | CoreError::LengthMismatch { .. }
            | CoreError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        };

        (status, error.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pprl_model::ValidationError;

    #[test]
    fn test_validation_errors_map_to_422() {
        let error = ServiceError::Core(CoreError::Validation(ValidationError::NoEntities));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_input_errors_map_to_400() {
        let error = ServiceError::Core(CoreError::Decode("a, b".into()));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
