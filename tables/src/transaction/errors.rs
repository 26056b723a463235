use crate::common::HttpError;
use serde::Deserialize;
use thiserror::Error;

/// Message used when a failing body carries no readable `odata.error`.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Transaction Failed";

/// Errors raised while building, sending or decoding a transaction.
///
/// # Error Categories
///
/// ## Local validation (no network call was made)
/// - [`PartitionKeyMismatch`] - action targets a different partition
/// - [`EmptyTransaction`] - nothing to submit
/// - [`InvalidUrl`] - account URL cannot be parsed
/// - [`Serialization`] - entity payload could not be encoded
///
/// ## Service failures
/// - [`TransactionFailed`] - the batch request as a whole was rejected
/// - [`SubOperationFailed`] - one embedded operation was rejected; the whole
///   changeset is rolled back by the service and no partial results exist
///
/// ## Internal consistency
/// - [`MalformedResponse`] - the batch response could not be understood
///
/// ## Transport
/// - [`Http`] - the sender failed before producing a response
///
/// [`PartitionKeyMismatch`]: TransactionError::PartitionKeyMismatch
/// [`EmptyTransaction`]: TransactionError::EmptyTransaction
/// [`InvalidUrl`]: TransactionError::InvalidUrl
/// [`Serialization`]: TransactionError::Serialization
/// [`TransactionFailed`]: TransactionError::TransactionFailed
/// [`SubOperationFailed`]: TransactionError::SubOperationFailed
/// [`MalformedResponse`]: TransactionError::MalformedResponse
/// [`Http`]: TransactionError::Http
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionError {
    #[error(
        "All operations in a transaction must target the same partitionKey (expected '{expected}', got '{actual}')"
    )]
    PartitionKeyMismatch { expected: String, actual: String },

    #[error("No actions provided for transaction")]
    EmptyTransaction,

    #[error("Invalid account URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to serialize {operation} operation: {reason}")]
    Serialization { operation: String, reason: String },

    #[error("{message} (HTTP {status_code}{})", code_suffix(.code))]
    TransactionFailed {
        status_code: u16,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
        body: String,
    },

    #[error("Operation {index} in transaction failed: {message} (HTTP {status_code}{})", code_suffix(.code))]
    SubOperationFailed {
        index: usize,
        status_code: u16,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
    },

    #[error("Malformed transaction response: {reason}")]
    MalformedResponse { reason: String, sub_response: String },

    #[error(transparent)]
    Http(#[from] HttpError),
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(", code {code}"),
        None => String::new(),
    }
}

impl TransactionError {
    /// Builds a transaction-level failure from the whole response body.
    pub fn transaction_failed(
        status_code: u16,
        body: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        let body = body.into();
        let (code, message) = ODataError::parse(&body);
        Self::TransactionFailed {
            status_code,
            code,
            message,
            request_id,
            body,
        }
    }

    /// Builds a failure for one embedded operation from its JSON body.
    pub fn sub_operation_failed(
        index: usize,
        status_code: u16,
        body: &str,
        request_id: Option<String>,
    ) -> Self {
        let (code, message) = ODataError::parse(body);
        Self::SubOperationFailed {
            index,
            status_code,
            code,
            message,
            request_id,
        }
    }

    pub fn malformed(reason: impl Into<String>, sub_response: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            sub_response: sub_response.into(),
        }
    }

    /// HTTP status reported by the service, if this is a service failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransactionError::TransactionFailed { status_code, .. }
            | TransactionError::SubOperationFailed { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Service error code (e.g. `EntityAlreadyExists`), if one was returned.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            TransactionError::TransactionFailed { code, .. }
            | TransactionError::SubOperationFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            TransactionError::TransactionFailed { request_id, .. }
            | TransactionError::SubOperationFailed { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            TransactionError::TransactionFailed { .. } | TransactionError::SubOperationFailed { .. }
        )
    }

    /// True for failures detected before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TransactionError::PartitionKeyMismatch { .. }
                | TransactionError::EmptyTransaction
                | TransactionError::InvalidUrl { .. }
                | TransactionError::Serialization { .. }
        )
    }
}

/// Table service error body: `{"odata.error":{"code":..,"message":{"value":..}}}`
#[derive(Debug, Deserialize)]
struct ODataErrorResponse {
    #[serde(rename = "odata.error")]
    error: Option<ODataError>,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    code: Option<String>,
    message: Option<ODataErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ODataErrorMessage {
    value: Option<String>,
}

impl ODataError {
    /// Extracts `(code, message)` from a body, falling back to the generic
    /// message when the body is not a recognizable error document.
    fn parse(body: &str) -> (Option<String>, String) {
        match serde_json::from_str::<ODataErrorResponse>(body) {
            Ok(ODataErrorResponse { error: Some(error) }) => {
                let message = error
                    .message
                    .and_then(|m| m.value)
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                (error.code, message)
            }
            _ => (None, DEFAULT_FAILURE_MESSAGE.to_string()),
        }
    }
}
