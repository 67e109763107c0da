use crate::accounts::{CollectionsServiceError, ImportError, RepositoryError};
use crate::config::ConfigError;
use crate::strategy::{StrategyLibraryError, StrategyLoadError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Import(ImportError),
    Strategy(StrategyLoadError),
    Service(CollectionsServiceError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Service(CollectionsServiceError::Repository(RepositoryError::NotFound))
            | AppError::Service(CollectionsServiceError::Library(
                StrategyLibraryError::NotFound(_),
            )) => StatusCode::NOT_FOUND,
            AppError::Import(_) | AppError::Strategy(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Strategy(err) => write!(f, "strategy error: {}", err),
            AppError::Service(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Strategy(err) => Some(err),
            AppError::Service(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<StrategyLoadError> for AppError {
    fn from(value: StrategyLoadError) -> Self {
        Self::Strategy(value)
    }
}

impl From<CollectionsServiceError> for AppError {
    fn from(value: CollectionsServiceError) -> Self {
        Self::Service(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_missing_records_to_not_found() {
        let missing_account = AppError::from(CollectionsServiceError::Repository(
            RepositoryError::NotFound,
        ));
        assert_eq!(missing_account.status(), StatusCode::NOT_FOUND);

        let missing_strategy = AppError::from(CollectionsServiceError::Library(
            StrategyLibraryError::NotFound("strategy_0009".to_string()),
        ));
        assert_eq!(missing_strategy.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing_strategy.to_string(), "strategy strategy_0009 not found");
    }

    #[test]
    fn maps_infrastructure_failures_to_server_error() {
        let poisoned = AppError::from(CollectionsServiceError::StatePoisoned(
            "queue writer".to_string(),
        ));
        assert_eq!(poisoned.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::from(ConfigError::InvalidPort).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_documents_are_bad_requests() {
        let err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let strategy = AppError::from(StrategyLoadError::from(err));
        assert_eq!(strategy.status(), StatusCode::BAD_REQUEST);
    }
}
