use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReasonerError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Missing premise: {0}")]
    MissingPremise(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl ReasonerError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ReasonerError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReasonerError>;
