//! AI provider integration for image and title generation
//!
//! The orchestrator only sees these traits; the Gemini REST clients and the
//! in-memory mocks both implement them.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiImageClient, GeminiTitleClient};
pub use mock::{MockImageGenerationClient, MockImageOutcome, MockTitleClient};

use crate::models::{GeneratedImage, GenerationRequest, TitleRequest};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Run one image request. Fails with `Error::NoImageProduced` when the
    /// provider answers without an inline image.
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage>;
}

#[async_trait]
pub trait TitleService: Send + Sync {
    /// Run the structured title request and return the raw response text.
    /// `None` means the provider answered without any text part.
    async fn generate_titles(&self, request: &TitleRequest) -> Result<Option<String>>;
}
