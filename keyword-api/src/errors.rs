use hyper::StatusCode;
use thiserror::Error;

/// Errors that stop the keyword API from starting or serving
#[derive(Error, Debug)]
pub enum KeywordApiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] crate::config::ValidationError),

    #[error("Failed to build estimator: {0}")]
    Estimator(#[from] estimator::BuildError),
}

/// Errors that end a single request before or instead of a batch run
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("no keywords given")]
    NoKeywords,

    #[error("too many keywords: got {count}, at most {max} allowed")]
    TooManyKeywords { count: usize, max: usize },

    #[error("keywords contain forbidden characters (quotes, backslashes or commas)")]
    ForbiddenCharacters(Vec<String>),

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::InvalidBody(_)
            | RequestError::NoKeywords
            | RequestError::TooManyKeywords { .. }
            | RequestError::ForbiddenCharacters(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound => StatusCode::NOT_FOUND,
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::BodyRead(_) | RequestError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Internal failures get a generic one.
    pub fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn invalid_keywords(&self) -> &[String] {
        match self {
            RequestError::ForbiddenCharacters(keywords) => keywords,
            _ => &[],
        }
    }
}
