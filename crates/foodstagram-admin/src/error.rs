//! Error types for the foodstagram-admin crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Store error: {0}")]
    Store(#[from] foodstagram_store::StoreError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No user named {0:?}")]
    UnknownUser(String),

    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdminError>;
