// src/error.rs

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Malformed or empty endpoint configuration. Fatal at construction.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown application: {0}")]
    UnknownApplication(String),

    /// The pool for an application yielded no endpoint.
    #[error("No endpoint available for application: {0}")]
    EmptyPool(String),

    #[error("Error occured during request: {0}")]
    RequestFailed(String),
}

impl DispatchError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
