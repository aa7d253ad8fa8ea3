use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::engine::error::ChatError;

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Auth => StatusCode::UNAUTHORIZED,
            ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ChatError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::Auth.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ChatError::Forbidden("no".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ChatError::NotFound("gone".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
