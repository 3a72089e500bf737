use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::render::render_error_page;

/// Example shown to callers whose path does not look like a thread link
pub const USAGE_HINT: &str =
    "URLが不正 例: http://xxx/{subdomain}.5ch.net/test/read.cgi/{board}/{threadId}/{commentId}";

/// Error types for the card relay. Every variant ends up as an HTML error page.
#[derive(Error, Debug)]
pub enum CardError {
    #[error("{}", USAGE_HINT)]
    MalformedRequestUrl,

    #[error("接続エラー URL: {url}")]
    UpstreamTransport { url: String, reason: String },

    /// The cause is kept for the logs only; callers see a generic message.
    #[error("パースエラー")]
    UpstreamParse(String),

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl CardError {
    /// Short machine-friendly tag used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            CardError::MalformedRequestUrl => "malformed_request_url",
            CardError::UpstreamTransport { .. } => "upstream_transport",
            CardError::UpstreamParse(_) => "upstream_parse",
            CardError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        // Embed consumers only look at the body, so failures still answer 200
        let body = render_error_page(&self.to_string());

        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_names_url() {
        let err = CardError::UpstreamTransport {
            url: "http://may.5ch.net/test/read.cgi/news/1234567890/1".to_string(),
            reason: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("接続エラー URL: "));
        assert!(msg.contains("http://may.5ch.net/test/read.cgi/news/1234567890/1"));
        assert!(!msg.contains("connection refused"));
    }

    #[test]
    fn test_parse_error_hides_cause() {
        let err = CardError::UpstreamParse("no div.message > span.escaped".to_string());
        assert_eq!(err.to_string(), "パースエラー");
    }

    #[test]
    fn test_error_response_is_ok_html() {
        let response = CardError::MalformedRequestUrl.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(CardError::MalformedRequestUrl.kind(), "malformed_request_url");
        assert_eq!(CardError::UpstreamParse(String::new()).kind(), "upstream_parse");
    }
}
