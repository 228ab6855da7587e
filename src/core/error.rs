use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EstateError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("roth conversion projection has no years")]
    EmptyRothProjection,
    #[error("invalid solver config: {0}")]
    SolverConfig(String),
}

impl EstateError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
