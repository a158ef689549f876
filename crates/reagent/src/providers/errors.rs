use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {status}\n{body}")]
    RequestFailed { status: u16, body: String },

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Provider reported an error: {0}")]
    Api(String),

    #[error("Context length exceeded. Message: {0}")]
    ContextLengthExceeded(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
