use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use progress_core::error::ProgressError;

// ---------------------------------------------------------------------------
// Internal sentinels for statuses that have no ProgressError variant
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

/// Carries an explicit HTTP 403 through the `anyhow::Error` chain.
#[derive(Debug)]
struct ForbiddenError(String);

impl std::fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ForbiddenError {}

/// Carries an explicit HTTP 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    /// Construct a 403 Forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self(ForbiddenError(msg.into()).into())
    }

    /// Construct a 404 Not Found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    pub fn status(&self) -> StatusCode {
        if self.0.is::<BadRequestError>() {
            return StatusCode::BAD_REQUEST;
        }
        if self.0.is::<ForbiddenError>() {
            return StatusCode::FORBIDDEN;
        }
        if self.0.is::<NotFoundError>() {
            return StatusCode::NOT_FOUND;
        }
        match self.0.downcast_ref::<ProgressError>() {
            Some(e) => match e {
                ProgressError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
                ProgressError::NotWritable(_) => StatusCode::FORBIDDEN,
                ProgressError::Conflict { .. } => StatusCode::CONFLICT,
                ProgressError::PathOutsideRoot(_)
                | ProgressError::UnsupportedDocument(_)
                | ProgressError::LineOutOfRange { .. }
                | ProgressError::NotACheckbox(_)
                | ProgressError::UnsupportedMarker(_)
                | ProgressError::UnsupportedKey(_)
                | ProgressError::NotInPrimaryCycle(_)
                | ProgressError::UnknownPanel(_) => StatusCode::BAD_REQUEST,
                ProgressError::InvalidConfig(_)
                | ProgressError::Io(_)
                | ProgressError::Yaml(_)
                | ProgressError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Some(ProgressError::Conflict {
            current_rev,
            current_mtime,
            ..
        }) = self.0.downcast_ref::<ProgressError>()
        {
            let body = serde_json::json!({
                "error": "Conflict: File was modified",
                "current_rev": current_rev,
                "current_mtime": current_mtime,
            });
            return (status, axum::Json(body)).into_response();
        }

        match self.0.downcast_ref::<ProgressError>() {
            Some(e) if e.is_security_relevant() => {
                tracing::warn!(error = %e, "rejected document path");
            }
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self.0, "request failed");
            }
            _ => {}
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn document_not_found_maps_to_404() {
        let err = AppError(ProgressError::DocumentNotFound(".claude/x.md".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn not_writable_maps_to_403() {
        let err = AppError(ProgressError::NotWritable("README.md".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = AppError(
            ProgressError::Conflict {
                path: ".claude/progress.md".into(),
                current_rev: "abc".into(),
                current_mtime: 1,
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn traversal_maps_to_400() {
        let err = AppError(ProgressError::PathOutsideRoot("../x.md".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn patch_target_errors_map_to_400() {
        for e in [
            ProgressError::NotACheckbox(3),
            ProgressError::LineOutOfRange { index: 9, len: 2 },
            ProgressError::UnsupportedMarker("X".into()),
        ] {
            assert_eq!(AppError(e.into()).into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        let err = AppError(ProgressError::Io(io_err).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_progress_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn constructors_map_to_their_status() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError::forbidden("Invalid Origin").into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
