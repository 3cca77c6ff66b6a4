use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    /// Upstream answered 404 for a pokemon or species lookup.
    NotFound(String),
    /// Any other non-success upstream status.
    Http { status: u16, url: String },
    Network(String),
    Parse(String),
    Config(String),
    Internal(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Http { .. } => "UPSTREAM_STATUS",
            AppError::Network(_) => "UPSTREAM_UNREACHABLE",
            AppError::Parse(_) => "UPSTREAM_BODY",
            AppError::Config(_) => "CONFIG",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { .. } | AppError::Network(_) | AppError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(what) => write!(f, "{} not found", what),
            AppError::Http { status, url } => {
                write!(f, "HTTP error! status: {} ({})", status, url)
            }
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request failed: {}", self);
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguished() {
        assert!(AppError::NotFound("Pokemon".to_string()).is_not_found());
        let generic = AppError::Http {
            status: 404,
            url: "http://x/type/nope".to_string(),
        };
        assert!(!generic.is_not_found());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("Pokemon".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Network("reset".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Internal("join".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_messages() {
        let err = AppError::Http {
            status: 500,
            url: "http://x/pokemon".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 500 (http://x/pokemon)");
        assert_eq!(
            AppError::NotFound("Pokemon species".to_string()).to_string(),
            "Pokemon species not found"
        );
    }
}
