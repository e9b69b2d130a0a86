use thiserror::Error;

#[derive(Debug, Error)]
pub enum KisError {
    #[error("KIS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("KIS returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token error: {0}")]
    Token(String),

    #[error("token cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed KIS payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl KisError {
    /// Transport failures and server-side errors are worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            KisError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            KisError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
