use thiserror::Error;

/// HTTP transport errors raised while sending a request.
///
/// These errors describe failures of the transport itself: the request never
/// produced a response the transaction layer could look at. A response with a
/// non-success status is *not* an `HttpError`; it is handed back to the caller
/// and classified by the transaction response parser.
///
/// # Error Categories
///
/// ## Client Configuration Errors
/// - [`ClientCreation`] - HTTP client initialization failures
/// - [`InsecureConnection`] - Plain `http://` target without explicit opt-in
///
/// ## Request Execution Errors
/// - [`RequestFailed`] - General request failures with URL and reason
/// - [`Timeout`] - Request timeout with duration and target URL
/// - [`InvalidResponse`] - Response body could not be read as text
///
/// # Examples
///
/// ```no_run
/// use tables::common::HttpError;
///
/// fn log_http_error(error: &HttpError) {
///     match error {
///         HttpError::Timeout { url, seconds } => {
///             log::warn!("HTTP request timeout: url={}, duration={}s", url, seconds);
///         }
///         HttpError::RequestFailed { url, reason } => {
///             log::error!("HTTP request failed: url={}, reason={}", url, reason);
///         }
///         _ => log::error!("HTTP error: {}", error),
///     }
/// }
/// ```
///
/// [`ClientCreation`]: HttpError::ClientCreation
/// [`InsecureConnection`]: HttpError::InsecureConnection
/// [`RequestFailed`]: HttpError::RequestFailed
/// [`Timeout`]: HttpError::Timeout
/// [`InvalidResponse`]: HttpError::InvalidResponse
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HttpError {
    /// HTTP client initialization failed.
    ///
    /// # Fields
    /// - `reason`: Detailed description of the client creation failure
    #[error("HTTP client creation failed: {reason}")]
    ClientCreation { reason: String },

    /// The target uses plain HTTP and insecure connections were not allowed.
    ///
    /// Local emulators are usually reached over `http://`; set
    /// `allow_insecure_connection` in the service configuration to talk to them.
    #[error("Insecure connection to {url} is not allowed")]
    InsecureConnection { url: String },

    /// HTTP request execution failed.
    ///
    /// # Fields
    /// - `url`: The URL that was being requested
    /// - `reason`: Detailed description of the failure
    #[error("Request failed: {url} - {reason}")]
    RequestFailed { url: String, reason: String },

    /// HTTP request timed out.
    ///
    /// # Fields
    /// - `url`: The URL that timed out
    /// - `seconds`: The timeout duration that was exceeded
    #[error("Request timeout after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    /// Received response doesn't match expected format.
    ///
    /// # Fields
    /// - `expected`: Description of what was expected
    /// - `actual`: Description of what was actually received
    #[error("Invalid response: expected {expected}, got {actual}")]
    InvalidResponse { expected: String, actual: String },
}

impl HttpError {
    /// Returns the URL associated with this error, when there is one.
    pub fn url(&self) -> Option<&str> {
        match self {
            HttpError::InsecureConnection { url }
            | HttpError::RequestFailed { url, .. }
            | HttpError::Timeout { url, .. } => Some(url),
            HttpError::ClientCreation { .. } | HttpError::InvalidResponse { .. } => None,
        }
    }
}
