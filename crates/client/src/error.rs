use std::sync::Arc;

/// Errors returned by [`ApiClient`](crate::ApiClient).
///
/// `Clone` so one refresh outcome can be handed to every caller waiting
/// on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(Arc<reqwest::Error>),

    /// The API answered with its error envelope.
    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A request body could not be encoded.
    #[error("Could not encode request: {0}")]
    Encode(String),

    /// No usable credentials: the access token was rejected and refreshing
    /// it failed.
    #[error("Not authenticated")]
    Unauthorized,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(Arc::new(err))
    }
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Unauthorized => Some(401),
            ClientError::Request(_) | ClientError::Encode(_) => None,
        }
    }
}
