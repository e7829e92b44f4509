//! Expands one user submission into the concrete provider calls it needs.
//!
//! Pure: no I/O, no randomness. Identical parameters always produce identical
//! requests.

use crate::models::{GenerateParams, GenerationMode, GenerationRequest, TitleRequest};
use crate::prompts::{self, PromptCatalog};
use crate::{Error, Result};
use serde_json::json;

/// Provider calls derived from one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPlan {
    /// Image calls in issue order; results are reported in this order.
    Images(Vec<GenerationRequest>),
    /// A single structured text call.
    Titles(TitleRequest),
}

impl RequestPlan {
    pub fn image_requests(&self) -> &[GenerationRequest] {
        match self {
            RequestPlan::Images(requests) => requests,
            RequestPlan::Titles(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    catalog: PromptCatalog,
}

impl PromptBuilder {
    pub fn new(catalog: PromptCatalog) -> Self {
        Self { catalog }
    }

    pub fn build_requests(&self, params: &GenerateParams) -> Result<RequestPlan> {
        if params.prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let aspect_ratio = params
            .mode
            .forced_aspect_ratio()
            .unwrap_or(params.aspect_ratio);

        let prompt_texts: Vec<String> = match params.mode {
            GenerationMode::Standard => vec![params.prompt.clone()],
            GenerationMode::ThumbnailSet => self
                .catalog
                .image_templates(params.mode)
                .iter()
                .map(|template| prompts::render(template, &[("title", &params.prompt)]))
                .collect(),
            GenerationMode::BannerSet => {
                let niche = params
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .unwrap_or(prompts::DEFAULT_BANNER_NICHE);
                self.catalog
                    .image_templates(params.mode)
                    .iter()
                    .map(|template| {
                        prompts::render(template, &[("channel", &params.prompt), ("niche", niche)])
                    })
                    .collect()
            }
            GenerationMode::TitleIdeas => {
                return Ok(RequestPlan::Titles(self.title_request(&params.prompt)));
            }
        };

        let expected = params.mode.image_request_count();
        if prompt_texts.len() != expected {
            return Err(Error::Invariant(format!(
                "Prompt catalog {} has {} template(s) for {}, expected {}",
                self.catalog.version,
                prompt_texts.len(),
                params.mode,
                expected
            )));
        }

        tracing::debug!(
            "Built {} image request(s) for mode {} (templates {})",
            prompt_texts.len(),
            params.mode,
            self.catalog.version
        );

        Ok(RequestPlan::Images(
            prompt_texts
                .into_iter()
                .map(|prompt_text| GenerationRequest {
                    prompt_text,
                    model: params.model,
                    aspect_ratio,
                    reference_image: params.reference_image.clone(),
                })
                .collect(),
        ))
    }

    fn title_request(&self, topic: &str) -> TitleRequest {
        TitleRequest {
            prompt_text: prompts::render(self.catalog.title_ideas, &[("topic", topic)]),
            response_schema: title_response_schema(),
        }
    }
}

/// Structured-output schema for the title ideas call.
pub fn title_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "titles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "score": { "type": "INTEGER" },
                        "cognitiveBias": { "type": "STRING" }
                    },
                    "required": ["title", "score", "cognitiveBias"]
                }
            }
        },
        "required": ["titles"]
    })
}

/// Build requests with the built-in prompt catalog.
pub fn build_requests(params: &GenerateParams) -> Result<RequestPlan> {
    PromptBuilder::default().build_requests(params)
}
