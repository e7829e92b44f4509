//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. Every
//! variant maps onto an [`ErrorKind`] so callers that only show a message can
//! still branch on what went wrong.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("No image generated for request {index} of the set")]
    NoImageProduced { index: usize },

    #[error("Malformed title response: {0}")]
    MalformedTextResponse(String),

    #[error("No results generated")]
    NoResultsProduced,

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

/// Coarse classification of [`Error`], stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyPrompt,
    NoImageProduced,
    MalformedTextResponse,
    TransportFailure,
    MissingCredential,
    NoResultsProduced,
    Cancelled,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyPrompt => ErrorKind::EmptyPrompt,
            Error::NoImageProduced { .. } => ErrorKind::NoImageProduced,
            Error::MalformedTextResponse(_) => ErrorKind::MalformedTextResponse,
            Error::NoResultsProduced => ErrorKind::NoResultsProduced,
            Error::MissingCredential(_) => ErrorKind::MissingCredential,
            Error::AiProvider(_) | Error::Http(_) => ErrorKind::TransportFailure,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Io(_) | Error::Serialization(_) | Error::Config(_) | Error::Invariant(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
