use thiserror::Error;

/// Failure of a single slot fetch. `Display` is the message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never reached the server or no response came back.
    #[error("{0}")]
    Network(String),
    #[error("Request failed (HTTP {status})")]
    Status { status: u16 },
    /// The server answered 2xx but the body was not a slot list.
    #[error("{0}")]
    Decode(String),
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
