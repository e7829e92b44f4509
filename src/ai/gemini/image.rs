use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::ImageGenerationService;
use crate::models::{GeneratedImage, GenerationRequest, ImageModel, DEFAULT_IMAGE_MODEL};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

pub struct GeminiImageClient {
    http: GeminiHttpClient,
    standard_model: String,
}

impl GeminiImageClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(120), client),
            standard_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// Override the model id used for [`ImageModel::StandardImage`].
    pub fn with_standard_model(mut self, model: String) -> Self {
        self.standard_model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn model_id(&self, model: ImageModel) -> &str {
        match model {
            ImageModel::StandardImage => &self.standard_model,
        }
    }

    fn build_request(request: &GenerationRequest) -> ImageRequest {
        let mut parts = Vec::with_capacity(2);

        if let Some(reference) = &request.reference_image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: reference.mime_type.clone(),
                    data: reference.to_base64(),
                },
            });
        }

        parts.push(Part::Text {
            text: request.prompt_text.clone(),
        });

        ImageRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: request.aspect_ratio.as_str().to_string(),
                },
            },
        }
    }
}

#[async_trait]
impl ImageGenerationService for GeminiImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let body = Self::build_request(request);
        let model = self.model_id(request.model);

        tracing::debug!(
            "Requesting {} image from {} (reference image: {})",
            request.aspect_ratio,
            model,
            request.reference_image.is_some()
        );

        let response: GenerateContentResponse = self.http.generate_content(model, &body).await?;

        let Some(image_data) = response.first_inline_data() else {
            tracing::warn!(
                "Gemini returned no image (finish reason: {})",
                response.finish_reason().unwrap_or("none")
            );
            return Err(Error::NoImageProduced { index: 0 });
        };

        tracing::debug!(
            "Gemini returned image with mime_type: {}",
            image_data.mime_type
        );

        use base64::Engine as _;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&image_data.data)
            .map_err(|e| {
                Error::AiProvider(format!("Failed to decode Gemini base64 image: {}", e))
            })?;

        Ok(GeneratedImage {
            mime_type: image_data.mime_type.clone(),
            data,
        })
    }
}
