//! Client error type and the control-plane error envelope.

use reqwest::StatusCode;
use serde::Deserialize;

/// Structured error body returned by the control plane on failures.
///
/// Responses without a decodable JSON body still yield an envelope whose
/// `code` is the numeric HTTP status rendered as a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    pub code: String,
    pub domain: Option<String>,
    pub message: Option<String>,
    pub details: Option<ErrorDetails>,
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
    pub data: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorDetails {
    pub info: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error connecting to api server: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("api error: domain: {}, reason: {}", .0.domain.as_deref().unwrap_or("null"), .0.code)]
    Api(ApiErrorBody),

    #[error("no tenant_id in client registration information")]
    MissingRegistrationTenantId,
}

impl Error {
    /// Build the envelope for a >=400 response, decoding the JSON body when
    /// one is present and falling back to a code-only envelope.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let mut envelope: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
        if envelope.code.is_empty() {
            envelope.code = status.as_u16().to_string();
        }
        Error::Api(envelope)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodyless_status_yields_code_only_envelope() {
        let err = Error::from_response(StatusCode::NOT_FOUND, b"");
        match err {
            Error::Api(body) => {
                assert_eq!(body.code, "404");
                assert_eq!(body.domain, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rich_body_populates_envelope() {
        let raw = br#"{
            "code": "409",
            "domain": "policy",
            "message": "version conflict",
            "details": {"info": "stale version"},
            "context": {"tenant_id": "t-1"},
            "data": ["a", "b"]
        }"#;
        let err = Error::from_response(StatusCode::CONFLICT, raw);
        match err {
            Error::Api(body) => {
                assert_eq!(body.code, "409");
                assert_eq!(body.domain.as_deref(), Some("policy"));
                assert_eq!(body.message.as_deref(), Some("version conflict"));
                assert_eq!(body.details.unwrap().info.as_deref(), Some("stale version"));
                assert_eq!(body.data.unwrap().len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn display_includes_domain_and_code() {
        let err = Error::from_response(StatusCode::FORBIDDEN, b"");
        assert_eq!(err.to_string(), "api error: domain: null, reason: 403");
    }
}
