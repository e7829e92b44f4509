//! TubeGenius - AI-generated YouTube thumbnails, channel banners and titles
//!
//! A submission is expanded into prompt-engineered provider requests, run
//! concurrently against Gemini, and reduced to either an ordered list of image
//! data URIs or a list of scored title ideas.

pub mod ai;
pub mod builder;
pub mod cancel;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod prompts;
pub mod session;

pub use error::{Error, ErrorKind, Result};
