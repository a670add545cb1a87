//! HTTP mapping of service errors
//!
//! Bodies are plain text. Status codes:
//!
//! | error | status |
//! |---|---|
//! | callback missing `code`, bad `state`, consent denied | 400 |
//! | credential rejected (any reason) | 401 |
//! | login on a flow without a redirect | 404 |
//! | provider rejected the code or was unreachable | 502 |
//! | record store or hashing failure | 500 |
//!
//! An unknown subject and a wrong secret render the same text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use credentials::{AuthError, IssueError, StoreError};
use provider::ExchangeError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Logout reports every failure, including a bad header, as a server error.
    #[error("{0}")]
    Logout(AuthError),

    #[error("Not Found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Exchange(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Exchange(_) => StatusCode::BAD_GATEWAY,
            ApiError::Auth(e) if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) | ApiError::Issue(_) | ApiError::Store(_) | ApiError::Logout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, message).into_response()
    }
}
