use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Failure of a single customer analysis.
///
/// Configuration problems are kept apart from failures of the remote call so
/// callers can decide whether to skip one record or stop altogether.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No API key is configured for the Messages API.
    MissingCredential,
    /// The request never produced an HTTP response (connect, timeout, TLS).
    Network(String),
    /// The Messages API answered with a non-success status.
    Api { status: u16, message: String },
    /// The reply text was not valid JSON or did not have the expected keys.
    Decode(String),
    /// The reply decoded but broke the result contract (score range, risk
    /// literal, recommendation count).
    Contract(String),
}

impl AnalysisError {
    /// True for every kind caused by the remote call itself.
    pub fn is_remote(&self) -> bool {
        !matches!(self, AnalysisError::MissingCredential)
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingCredential => {
                write!(f, "Missing credential: ANTHROPIC_API_KEY is not configured")
            }
            AnalysisError::Network(msg) => write!(f, "Network error: {}", msg),
            AnalysisError::Api { status, message } => {
                write!(f, "Messages API returned {}: {}", status, message)
            }
            AnalysisError::Decode(msg) => write!(f, "Invalid model reply: {}", msg),
            AnalysisError::Contract(msg) => write!(f, "Model reply broke contract: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<reqwest::Error> for AnalysisError {
    /// Converts a `reqwest::Error` into an `AnalysisError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AnalysisError::Decode(err.to_string())
        } else {
            AnalysisError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// The customer dataset file does not exist.
    FileNotFound(String),
    /// The customer dataset exists but a row or column is unusable.
    InvalidDataset(String),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// A customer analysis failed.
    Analysis(AnalysisError),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FileNotFound(path) => write!(f, "Customer file not found: {}", path),
            AppError::InvalidDataset(msg) => write!(f, "Invalid customer dataset: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Analysis(e) => write!(f, "Analysis error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::FileNotFound(_) | AppError::InvalidDataset(_) => {
                tracing::error!("Dataset error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Analysis(AnalysisError::MissingCredential) => {
                tracing::error!("Analysis requested without ANTHROPIC_API_KEY");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Analysis service is not configured".to_string(),
                )
            }
            AppError::Analysis(e) => {
                tracing::error!("Analysis error: {}", e);
                (StatusCode::BAD_GATEWAY, format!("Analysis failed: {}", e))
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return (*source.clone()).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Analysis(err)
    }
}

impl From<csv::Error> for AppError {
    /// Converts a `csv::Error` into an `AppError`.
    fn from(err: csv::Error) -> Self {
        AppError::InvalidDataset(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for csv::Error to add context
impl<T> ResultExt<T> for Result<T, csv::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_is_not_remote() {
        assert!(!AnalysisError::MissingCredential.is_remote());
        assert!(AnalysisError::Network("refused".into()).is_remote());
        assert!(AnalysisError::Decode("eof".into()).is_remote());
        assert!(AnalysisError::Contract("2 recommendations".into()).is_remote());
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::NotFound("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::from(AnalysisError::MissingCredential).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::from(AnalysisError::Api {
            status: 529,
            message: "overloaded".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_context_delegates_status_and_keeps_root() {
        let err: Result<(), AppError> = Err(AppError::BadRequest("count".into()));
        let err = err.context("batch").unwrap_err();
        assert!(matches!(err.root(), AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "batch: Bad request: count");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
