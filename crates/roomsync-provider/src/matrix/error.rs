//! Classification of homeserver failures

use reqwest::StatusCode;
use serde::Deserialize;

use roomsync_core::DomainError;

/// Standard Matrix error body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MatrixErrorBody {
    #[serde(default)]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

impl MatrixErrorBody {
    pub(crate) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Kick target already left or never joined
    pub(crate) fn is_not_in_room(&self) -> bool {
        self.errcode == "M_FORBIDDEN" && self.error.to_lowercase().contains("not in the room")
    }

    fn message(&self, body: &str) -> String {
        if self.errcode.is_empty() {
            body.chars().take(200).collect()
        } else {
            format!("{}: {}", self.errcode, self.error)
        }
    }
}

/// Map a non-success status to a domain error
///
/// Auth failures, throttling and server errors are worth retrying once the
/// operator or the homeserver recovers; any other client error is permanent.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> DomainError {
    let message = format!("HTTP {status}: {}", MatrixErrorBody::parse(body).message(body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            DomainError::ProviderUnavailable(message)
        }
        s if s.is_server_error() => DomainError::ProviderUnavailable(message),
        _ => DomainError::ProviderRejected(message),
    }
}

/// Map a transport failure to a domain error
pub(crate) fn classify_transport(err: &reqwest::Error) -> DomainError {
    if err.is_decode() {
        DomainError::ProviderRejected(format!("unexpected homeserver response: {err}"))
    } else {
        // Timeouts, refused connections, TLS and body errors
        DomainError::ProviderUnavailable(err.to_string())
    }
}
