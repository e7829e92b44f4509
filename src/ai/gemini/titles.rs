use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::TitleService;
use crate::models::{TitleRequest, DEFAULT_TEXT_MODEL};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TitleGenerationRequest<'a> {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: StructuredOutputConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredOutputConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

pub struct GeminiTitleClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiTitleClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model: DEFAULT_TEXT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl TitleService for GeminiTitleClient {
    async fn generate_titles(&self, request: &TitleRequest) -> Result<Option<String>> {
        let body = TitleGenerationRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text {
                    text: request.prompt_text.clone(),
                }],
            }],
            generation_config: StructuredOutputConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        };

        tracing::debug!("Requesting title ideas from {}", self.model);

        let response: GenerateContentResponse =
            self.http.generate_content(&self.model, &body).await?;

        Ok(response.first_text().map(str::to_string))
    }
}
