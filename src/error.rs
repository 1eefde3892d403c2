use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{io, path::PathBuf};
use tracing::error;

use crate::views;

/// Failures surfaced by the browse and download endpoints.
///
/// `TooLarge` and `Binary` are display outcomes, not errors, and live in
/// [`crate::classify::FileView`] instead.
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("path escapes the base directory")]
    Forbidden,

    #[error("no such file or directory")]
    NotFound,

    #[error("filesystem error: {0}")]
    Internal(#[from] io::Error),
}

impl BrowseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps an I/O failure on an already resolved path into the taxonomy.
    pub fn from_io(err: io::Error) -> Self {
        if crate::resolver::is_missing(&err) {
            Self::NotFound
        } else {
            Self::Internal(err)
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Forbidden => "Access denied.",
            Self::NotFound => "Path not found.",
            Self::Internal(_) => "Something went wrong while reading this path.",
        }
    }
}

impl IntoResponse for BrowseError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the log.
        if let Self::Internal(e) = &self {
            error!("Internal error while serving request: {}", e);
        }

        (status, views::error_page(status, self.public_message())).into_response()
    }
}

/// Failures while establishing the base directory at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to resolve root directory '{}': {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
}
