use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server rejected the connection (server full)")]
    Rejected,

    #[error("No response from server within {0:?}")]
    Timeout(Duration),

    #[error("Could not resolve server address: {0}")]
    Resolve(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
