//! Error types for the SQL gateway.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant maps onto one failure class of the gateway (client input, policy,
//! database) so callers can tell "fix your request" apart from "try again later".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Cannot bind parameter '{name}': {message}")]
    Binding { name: String, message: String },

    /// Never surfaced as a request failure; the offending entry is skipped.
    #[error("Allow-list entry '{entry}' skipped: {reason}")]
    Resolution { entry: String, reason: String },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// SQL Server error number, e.g. 208 for "Invalid object name"
        code: Option<u32>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a binding error for the named parameter.
    pub fn binding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a (non-fatal) resolution error for an allow-list entry.
    pub fn resolution(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution error with an optional server error number.
    pub fn execution(message: impl Into<String>, code: Option<u32>) -> Self {
        Self::Execution {
            message: message.into(),
            code,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short classification used in payloads and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Binding { .. } => "binding",
            Self::Resolution { .. } => "resolution",
            Self::Execution { .. } => "execution",
            Self::Connection { .. } => "connection",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => Some(
                "Submit a single SELECT statement without comments, semicolons or data-modifying keywords",
            ),
            Self::Binding { .. } => {
                Some("Use identifier-like parameter names and scalar values (number, boolean, string)")
            }
            Self::Execution { .. } => Some("Check the SQL syntax, referenced objects and parameters"),
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQL Server error number, for execution failures reported by the server.
    pub fn server_code(&self) -> Option<u32> {
        match self {
            Self::Execution { code, .. } => *code,
            _ => None,
        }
    }

    /// Description safe to write to logs.
    ///
    /// Driver messages can quote bound values (e.g. error 245, "Conversion
    /// failed when converting the nvarchar value '...'"), so execution
    /// failures are reduced to their error number.
    pub fn log_detail(&self) -> String {
        match self {
            Self::Execution { code: Some(code), .. } => format!("server error {}", code),
            Self::Execution { code: None, .. } => "driver error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convert driver errors to GatewayError.
impl From<tiberius::error::Error> for GatewayError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => {
                GatewayError::execution(token.message().to_string(), Some(token.code()))
            }
            tiberius::error::Error::Io { message, .. } => GatewayError::connection(
                format!("I/O error: {}", message),
                "Check network connectivity and database server status",
            ),
            tiberius::error::Error::Tls(msg) => GatewayError::connection(
                format!("TLS error: {}", msg),
                "Verify the TrustServerCertificate / Encrypt settings of the connection string",
            ),
            tiberius::error::Error::Routing { host, port } => GatewayError::connection(
                format!("Unexpected routing request to {}:{}", host, port),
                "Retry the request; the server redirected the connection",
            ),
            other => GatewayError::execution(other.to_string(), None),
        }
    }
}

impl From<bb8::RunError<tiberius::error::Error>> for GatewayError {
    fn from(err: bb8::RunError<tiberius::error::Error>) -> Self {
        match err {
            bb8::RunError::User(e) => match GatewayError::from(e) {
                GatewayError::Execution { message, .. } => GatewayError::connection(
                    message,
                    "Check the connection string credentials and database name",
                ),
                other => other,
            },
            bb8::RunError::TimedOut => GatewayError::connection(
                "Timed out waiting for a pooled connection",
                "The database may be overloaded; retry later",
            ),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::connection(
            format!("I/O error: {}", err),
            "Check network connectivity and database server status",
        )
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Build the structured `data` payload attached to MCP errors.
fn error_data(err: &GatewayError) -> Option<serde_json::Value> {
    let mut data = serde_json::json!({ "kind": err.kind() });
    if let Some(s) = err.suggestion() {
        data["suggestion"] = serde_json::Value::String(s.to_string());
    }
    Some(data)
}

/// Convert GatewayError to MCP ErrorData for semantic error categorization.
impl From<GatewayError> for rmcp::ErrorData {
    fn from(err: GatewayError) -> Self {
        let data = error_data(&err);
        match &err {
            // Client faults -> invalid_params
            GatewayError::Validation { .. }
            | GatewayError::Binding { .. }
            | GatewayError::Resolution { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            // Driver message preserved, server error number appended
            GatewayError::Execution { message, code } => {
                let msg = match code {
                    Some(code) => format!("Execution failed: {} (error {})", message, code),
                    None => err.to_string(),
                };
                rmcp::ErrorData::internal_error(msg, data)
            }

            GatewayError::Connection { .. }
            | GatewayError::Configuration { .. }
            | GatewayError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
