//! Error taxonomy and OAuth2 error-response interpretation.

use serde_json::{Map, Value};
use thiserror::Error;
use webview_auth_core::TransportError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures delivered through the flow's failure callback.
///
/// Configuration mistakes (empty client id, malformed endpoint URLs) are a
/// different animal — they surface as [`crate::ConfigError`] at construction
/// time, never through this type.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("{0}")]
    Generic(String),

    #[error("unsupported token type: {0}")]
    UnsupportedTokenType(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("prerequisite failed: {0}")]
    PrerequisiteFailed(String),

    #[error("invalid or missing state parameter")]
    InvalidState,

    /// Server-reported denial; `params` keeps the raw response for diagnostics.
    #[error("{message}")]
    Authorization {
        message: String,
        params: Map<String, Value>,
    },
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Maps an OAuth2 error response (RFC 6749 §4.1.2.1 / §5.2) to a structured
/// error.
///
/// `error_description` wins when present (with form-encoded `+` restored to
/// spaces); otherwise the enumerated `error` code is translated through the
/// RFC's own definitions, and unknown codes fall back to
/// `"Authorization error: <code>."`.
pub fn interpret_error_response(params: &Map<String, Value>) -> AuthError {
    let message = if let Some(description) = params.get("error_description").and_then(Value::as_str)
    {
        description.replace('+', " ")
    } else if let Some(code) = params.get("error").and_then(Value::as_str) {
        message_for_error_code(code)
    } else {
        "Unknown error.".to_string()
    };

    AuthError::Authorization {
        message,
        params: params.clone(),
    }
}

fn message_for_error_code(code: &str) -> String {
    match code {
        "invalid_request" => {
            "The request is missing a required parameter, includes an invalid parameter value, \
             includes a parameter more than once, or is otherwise malformed."
                .to_string()
        }
        "unauthorized_client" => {
            "The client is not authorized to request an access token using this method."
                .to_string()
        }
        "access_denied" => {
            "The resource owner or authorization server denied the request.".to_string()
        }
        "unsupported_response_type" => {
            "The authorization server does not support obtaining an access token using this \
             method."
                .to_string()
        }
        "invalid_scope" => "The requested scope is invalid, unknown, or malformed.".to_string(),
        "server_error" => {
            "The authorization server encountered an unexpected condition that prevented it from \
             fulfilling the request."
                .to_string()
        }
        "temporarily_unavailable" => {
            "The authorization server is currently unable to handle the request due to a \
             temporary overloading or maintenance of the server."
                .to_string()
        }
        _ => format!("Authorization error: {code}."),
    }
}
