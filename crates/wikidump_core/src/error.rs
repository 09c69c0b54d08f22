use thiserror::Error;

/// Longest slice of a response body kept in a transport error message.
const BODY_SNIPPET_CHARS: usize = 200;

pub type WikiResult<T> = std::result::Result<T, WikiError>;

#[derive(Debug, Error)]
pub enum WikiError {
    /// Non-200 status (status carried) or a connection-level failure (no status).
    #[error("{}", render_transport(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid JSON response from MediaWiki API: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("MediaWiki API error [{code}]: {info}")]
    Api { code: String, info: String },

    #[error("page '{title}' not found or could not be parsed")]
    NotFound { title: String },

    #[error("invalid wiki URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl WikiError {
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::Transport {
            status: Some(status),
            message: body.chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }

    /// HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WikiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

fn render_transport(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP error {status}: {message}"),
        None => format!("failed to call MediaWiki API: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::WikiError;

    #[test]
    fn http_status_error_keeps_status_and_truncates_body() {
        let body = "x".repeat(500);
        let error = WikiError::http_status(503, &body);
        assert_eq!(error.status(), Some(503));
        let rendered = error.to_string();
        assert!(rendered.starts_with("HTTP error 503: "));
        assert_eq!(rendered.len(), "HTTP error 503: ".len() + 200);
    }

    #[test]
    fn non_transport_errors_have_no_status() {
        let error = WikiError::NotFound {
            title: "Alpha".to_string(),
        };
        assert_eq!(error.status(), None);
        assert_eq!(
            error.to_string(),
            "page 'Alpha' not found or could not be parsed"
        );
    }
}
