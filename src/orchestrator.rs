//! Runs the requests a submission expands into and normalizes the outcome.
//!
//! Multi-image modes fan out concurrently and fail as a unit: any failed
//! request fails the whole operation, and successful images are reported in
//! request order regardless of which finished first. Nothing is retried here;
//! retry is the caller's decision.

use crate::ai::{GeminiImageClient, GeminiTitleClient, ImageGenerationService, TitleService};
use crate::builder::{PromptBuilder, RequestPlan};
use crate::cancel::CancelToken;
use crate::models::{
    Config, GenerateParams, GenerationRequest, GenerationResult, TitleCandidate, TitleRequest,
};
use crate::prompts::PromptCatalog;
use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What to do when the title response does not match the expected schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleParsePolicy {
    /// Treat it as "no titles" and return an empty list.
    #[default]
    Lenient,
    /// Surface `Error::MalformedTextResponse`.
    Strict,
}

pub struct GenerationOrchestrator {
    builder: PromptBuilder,
    images: Arc<dyn ImageGenerationService>,
    titles: Arc<dyn TitleService>,
    title_policy: TitleParsePolicy,
}

impl GenerationOrchestrator {
    pub fn new(images: Arc<dyn ImageGenerationService>, titles: Arc<dyn TitleService>) -> Self {
        Self {
            builder: PromptBuilder::default(),
            images,
            titles,
            title_policy: TitleParsePolicy::default(),
        }
    }

    /// Wire Gemini clients from configuration, sharing one connection pool.
    pub fn from_config(config: &Config) -> Self {
        let http_client = reqwest::Client::new();

        let mut images =
            GeminiImageClient::new_with_client(config.api_key.clone(), http_client.clone())
                .with_standard_model(config.image_model.clone());
        let mut titles = GeminiTitleClient::new_with_client(config.api_key.clone(), http_client)
            .with_model(config.text_model.clone());

        if let Some(base_url) = &config.base_url {
            images = images.with_base_url(base_url.clone());
            titles = titles.with_base_url(base_url.clone());
        }

        info!("Image provider: Gemini (model: {})", config.image_model);
        info!("Title provider: Gemini (model: {})", config.text_model);

        Self::new(Arc::new(images), Arc::new(titles))
    }

    pub fn with_prompt_catalog(mut self, catalog: PromptCatalog) -> Self {
        self.builder = PromptBuilder::new(catalog);
        self
    }

    pub fn with_title_policy(mut self, policy: TitleParsePolicy) -> Self {
        self.title_policy = policy;
        self
    }

    pub async fn generate(&self, params: &GenerateParams) -> Result<GenerationResult> {
        self.generate_with_cancel(params, &CancelToken::never()).await
    }

    /// Like [`generate`](Self::generate), aborting in-flight requests when
    /// `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        params: &GenerateParams,
        cancel: &CancelToken,
    ) -> Result<GenerationResult> {
        let plan = self.builder.build_requests(params)?;
        let started = Instant::now();
        info!("Starting {} generation", params.mode);

        let result = match plan {
            RequestPlan::Images(requests) => self
                .generate_images(requests, cancel)
                .await
                .map(GenerationResult::Images),
            RequestPlan::Titles(request) => self
                .generate_title_ideas(&request, cancel)
                .await
                .map(GenerationResult::Titles),
        };

        match &result {
            Ok(result) => info!(
                "{} generation produced {} result(s) in {:?}",
                params.mode,
                result.len(),
                started.elapsed()
            ),
            Err(e) => error!("{} generation failed: {}", params.mode, e),
        }

        result
    }

    async fn generate_images(
        &self,
        requests: Vec<GenerationRequest>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>> {
        let total = requests.len();
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let images = Arc::clone(&self.images);
            tasks.spawn(async move {
                let outcome = images.generate_image(&request).await.map_err(|e| match e {
                    Error::NoImageProduced { .. } => Error::NoImageProduced { index },
                    other => other,
                });
                (index, outcome)
            });
        }

        // Completion order is arbitrary; each result goes back into its request's slot.
        let mut slots: Vec<Option<String>> = vec![None; total];

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Cancelling {} in-flight image request(s)", tasks.len());
                    tasks.abort_all();
                    return Err(Error::Cancelled);
                }
                next = tasks.join_next() => next,
            };

            let Some(joined) = next else {
                break;
            };

            let (index, outcome) =
                joined.map_err(|e| Error::Invariant(format!("Image task failed: {}", e)))?;

            match outcome {
                Ok(image) => {
                    debug!(
                        "Image request {}/{} finished ({} bytes, {})",
                        index + 1,
                        total,
                        image.data.len(),
                        image.mime_type
                    );
                    slots[index] = Some(image.to_data_uri());
                }
                Err(e) => {
                    error!("Image request {}/{} failed: {}", index + 1, total, e);
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Error::Invariant(format!("No result recorded for image request {}", index))
                })
            })
            .collect()
    }

    async fn generate_title_ideas(
        &self,
        request: &TitleRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<TitleCandidate>> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = self.titles.generate_titles(request) => body?,
        };

        parse_title_candidates(body.as_deref().unwrap_or("{}"), self.title_policy)
    }
}

#[derive(Debug, Deserialize)]
struct RawTitleEnvelope {
    #[serde(default)]
    titles: Option<Vec<serde_json::Value>>,
}

/// One entry of the `titles` array. An entry without a string title is
/// dropped; a non-string bias reads as empty.
fn title_candidate(entry: &serde_json::Value) -> Option<TitleCandidate> {
    let title = entry
        .get("title")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?;

    Some(TitleCandidate {
        title: title.to_string(),
        score: entry.get("score").map(clamp_score).unwrap_or(0),
        cognitive_bias: entry
            .get("cognitiveBias")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn clamp_score(value: &serde_json::Value) -> u8 {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.map(|s| s.round().clamp(0.0, 100.0) as u8).unwrap_or(0)
}

/// Drop a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn decode_titles(body: &str) -> std::result::Result<Vec<TitleCandidate>, String> {
    let envelope: RawTitleEnvelope =
        serde_json::from_str(strip_code_fence(body)).map_err(|e| e.to_string())?;
    let titles = envelope
        .titles
        .ok_or_else(|| "response has no `titles` field".to_string())?;
    let total = titles.len();
    let candidates: Vec<TitleCandidate> = titles.iter().filter_map(title_candidate).collect();
    if candidates.len() < total {
        debug!(
            "Dropped {} title entr(ies) without a usable title",
            total - candidates.len()
        );
    }
    Ok(candidates)
}

/// Parse a structured title response, keeping provider order.
pub fn parse_title_candidates(body: &str, policy: TitleParsePolicy) -> Result<Vec<TitleCandidate>> {
    match decode_titles(body) {
        Ok(titles) => Ok(titles),
        Err(reason) => match policy {
            TitleParsePolicy::Lenient => {
                warn!("Failed to parse title ideas, returning none: {}", reason);
                Ok(Vec::new())
            }
            TitleParsePolicy::Strict => Err(Error::MalformedTextResponse(reason)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockImageGenerationClient, MockImageOutcome, MockTitleClient};
    use crate::cancel::cancel_pair;
    use crate::models::{AspectRatio, GeneratedImage, GenerationMode};
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const REACTION: &str = "Extreme close-up reaction";
    const ACTION: &str = "Action and storytelling";
    const MYSTERY: &str = "giant question mark";

    fn orchestrator(
        images: &MockImageGenerationClient,
        titles: &MockTitleClient,
    ) -> GenerationOrchestrator {
        GenerationOrchestrator::new(Arc::new(images.clone()), Arc::new(titles.clone()))
    }

    fn data_uri(bytes: &[u8]) -> String {
        GeneratedImage {
            mime_type: "image/png".to_string(),
            data: bytes.to_vec(),
        }
        .to_data_uri()
    }

    #[tokio::test]
    async fn test_thumbnail_results_keep_request_order_when_completion_is_reversed() {
        let images = MockImageGenerationClient::new()
            .with_delayed_outcome_for(
                REACTION,
                MockImageOutcome::png(vec![1]),
                Duration::from_millis(120),
            )
            .with_delayed_outcome_for(
                ACTION,
                MockImageOutcome::png(vec![2]),
                Duration::from_millis(60),
            )
            .with_outcome_for(MYSTERY, MockImageOutcome::png(vec![3]));
        let titles = MockTitleClient::new();

        let params = GenerateParams::new(GenerationMode::ThumbnailSet, "I Spent 50 Hours in VR");
        let result = orchestrator(&images, &titles).generate(&params).await.unwrap();

        assert_eq!(
            result,
            GenerationResult::Images(vec![data_uri(&[1]), data_uri(&[2]), data_uri(&[3])])
        );

        let completed = images.completion_order();
        assert!(completed[0].contains(MYSTERY));
        assert!(completed[2].contains(REACTION));
        assert_eq!(titles.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failed_thumbnail_fails_the_whole_set() {
        let images = MockImageGenerationClient::new()
            .with_outcome_for(REACTION, MockImageOutcome::png(vec![1]))
            .with_delayed_outcome_for(ACTION, MockImageOutcome::NoImage, Duration::from_millis(20))
            .with_outcome_for(MYSTERY, MockImageOutcome::png(vec![3]));

        let params = GenerateParams::new(GenerationMode::ThumbnailSet, "Budget gaming PC");
        let err = orchestrator(&images, &MockTitleClient::new())
            .generate(&params)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoImageProduced { index: 1 }));
        assert_eq!(images.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_banner_transport_failure_propagates() {
        let images = MockImageGenerationClient::new().with_outcome_for(
            "Detailed illustration",
            MockImageOutcome::ProviderError("Gemini API error (status 500)".to_string()),
        );

        let params = GenerateParams::new(GenerationMode::BannerSet, "Tech Reviews");
        let err = orchestrator(&images, &MockTitleClient::new())
            .generate(&params)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }

    #[tokio::test]
    async fn test_failure_does_not_wait_for_slow_siblings() {
        let images = MockImageGenerationClient::new()
            .with_delayed_outcome_for(
                REACTION,
                MockImageOutcome::png(vec![1]),
                Duration::from_secs(30),
            )
            .with_outcome_for(ACTION, MockImageOutcome::NoImage)
            .with_delayed_outcome_for(
                MYSTERY,
                MockImageOutcome::png(vec![3]),
                Duration::from_secs(30),
            );

        let params = GenerateParams::new(GenerationMode::ThumbnailSet, "Speedrun");
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator(&images, &MockTitleClient::new()).generate(&params),
        )
        .await
        .expect("fail-fast join should not wait for slow requests")
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoImageProduced);
    }

    #[tokio::test]
    async fn test_standard_mode_issues_one_request_with_user_ratio() {
        let images = MockImageGenerationClient::new();
        let params = GenerateParams::new(GenerationMode::Standard, "a lighthouse at dusk")
            .with_aspect_ratio(AspectRatio::Portrait);

        let result = orchestrator(&images, &MockTitleClient::new())
            .generate(&params)
            .await
            .unwrap();

        assert_eq!(result.image_urls().len(), 1);
        assert!(result.image_urls()[0].starts_with("data:image/png;base64,"));
        let requests = images.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt_text, "a lighthouse at dusk");
        assert_eq!(requests[0].aspect_ratio, AspectRatio::Portrait);
    }

    #[tokio::test]
    async fn test_title_ideas_parses_candidates() {
        let titles = MockTitleClient::new().with_response(
            r#"{"titles":[{"title":"X","score":95,"cognitiveBias":"Curiosity Gap"}]}"#,
        );
        let images = MockImageGenerationClient::new();

        let params = GenerateParams::new(GenerationMode::TitleIdeas, "VR marathon");
        let result = orchestrator(&images, &titles).generate(&params).await.unwrap();

        assert_eq!(
            result,
            GenerationResult::Titles(vec![TitleCandidate {
                title: "X".to_string(),
                score: 95,
                cognitive_bias: "Curiosity Gap".to_string(),
            }])
        );
        assert_eq!(images.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_title_ideas_tolerates_invalid_json() {
        let titles = MockTitleClient::new().with_response("not valid json");
        let params = GenerateParams::new(GenerationMode::TitleIdeas, "VR marathon");

        let result = orchestrator(&MockImageGenerationClient::new(), &titles)
            .generate(&params)
            .await
            .unwrap();

        assert_eq!(result, GenerationResult::Titles(Vec::new()));
    }

    #[tokio::test]
    async fn test_title_ideas_tolerates_missing_text() {
        let titles = MockTitleClient::new().with_empty_response();
        let params = GenerateParams::new(GenerationMode::TitleIdeas, "VR marathon");

        let result = orchestrator(&MockImageGenerationClient::new(), &titles)
            .generate(&params)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_title_ideas_strict_policy_surfaces_malformed_response() {
        let titles = MockTitleClient::new().with_response(r#"{"ideas":[]}"#);
        let params = GenerateParams::new(GenerationMode::TitleIdeas, "VR marathon");

        let err = orchestrator(&MockImageGenerationClient::new(), &titles)
            .with_title_policy(TitleParsePolicy::Strict)
            .generate(&params)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedTextResponse);
    }

    #[tokio::test]
    async fn test_title_ideas_transport_failure_is_not_swallowed() {
        let titles = MockTitleClient::new().with_failure("connection reset");
        let params = GenerateParams::new(GenerationMode::TitleIdeas, "VR marathon");

        let err = orchestrator(&MockImageGenerationClient::new(), &titles)
            .generate(&params)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }

    #[tokio::test]
    async fn test_blank_prompt_never_reaches_provider() {
        let images = MockImageGenerationClient::new();
        let titles = MockTitleClient::new();

        let err = orchestrator(&images, &titles)
            .generate(&GenerateParams::new(GenerationMode::ThumbnailSet, "   "))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyPrompt));
        assert_eq!(images.get_call_count(), 0);
        assert_eq!(titles.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_generate_issues_independent_calls() {
        let images = MockImageGenerationClient::new();
        let orchestrator = orchestrator(&images, &MockTitleClient::new());
        let params = GenerateParams::new(GenerationMode::Standard, "same prompt");

        let first = orchestrator.generate(&params).await.unwrap();
        let second = orchestrator.generate(&params).await.unwrap();

        assert_eq!(images.get_call_count(), 2);
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_requests() {
        let images = MockImageGenerationClient::new()
            .with_delayed_outcome_for("", MockImageOutcome::png(vec![1]), Duration::from_secs(30));
        let orchestrator = orchestrator(&images, &MockTitleClient::new());
        let params = GenerateParams::new(GenerationMode::BannerSet, "Tech Reviews");
        let (handle, token) = cancel_pair();

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (result, ()) = tokio::join!(
            orchestrator.generate_with_cancel(&params, &token),
            canceller
        );

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_parse_clamps_scores_and_drops_untitled_entries() {
        let body = r#"{"titles":[
            {"title":"Too Good","score":140,"cognitiveBias":"Hype"},
            {"score":50,"cognitiveBias":"Nothing"},
            {"title":"Negative","score":-3},
            {"title":"Stringy","score":"88.6","cognitiveBias":"FOMO"}
        ]}"#;

        let titles = parse_title_candidates(body, TitleParsePolicy::Strict).unwrap();

        assert_eq!(
            titles,
            vec![
                TitleCandidate {
                    title: "Too Good".to_string(),
                    score: 100,
                    cognitive_bias: "Hype".to_string(),
                },
                TitleCandidate {
                    title: "Negative".to_string(),
                    score: 0,
                    cognitive_bias: String::new(),
                },
                TitleCandidate {
                    title: "Stringy".to_string(),
                    score: 89,
                    cognitive_bias: "FOMO".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_keeps_valid_entries_next_to_mistyped_ones() {
        let body = r#"{"titles":[
            {"title":"Good One","score":90,"cognitiveBias":"FOMO"},
            {"title":"Odd One","score":80,"cognitiveBias":7},
            {"title":{"text":"Nested"},"score":70},
            "just a string"
        ]}"#;

        for policy in [TitleParsePolicy::Lenient, TitleParsePolicy::Strict] {
            let titles = parse_title_candidates(body, policy).unwrap();
            assert_eq!(
                titles,
                vec![
                    TitleCandidate {
                        title: "Good One".to_string(),
                        score: 90,
                        cognitive_bias: "FOMO".to_string(),
                    },
                    TitleCandidate {
                        title: "Odd One".to_string(),
                        score: 80,
                        cognitive_bias: String::new(),
                    },
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_custom_prompt_catalog_drives_requests() {
        let mut catalog = PromptCatalog::builtin();
        catalog.thumbnail = vec![
            "Variant A for {{title}}",
            "Variant B for {{title}}",
            "Variant C for {{title}}",
        ];
        let images = MockImageGenerationClient::new();

        let result = orchestrator(&images, &MockTitleClient::new())
            .with_prompt_catalog(catalog)
            .generate(&GenerateParams::new(GenerationMode::ThumbnailSet, "Speedrun"))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        let mut prompts: Vec<String> =
            images.requests().into_iter().map(|r| r.prompt_text).collect();
        prompts.sort();
        assert_eq!(
            prompts,
            vec![
                "Variant A for Speedrun",
                "Variant B for Speedrun",
                "Variant C for Speedrun"
            ]
        );
    }

    #[tokio::test]
    async fn test_short_prompt_catalog_fails_without_provider_calls() {
        let mut catalog = PromptCatalog::builtin();
        catalog.banner.clear();
        let images = MockImageGenerationClient::new();

        let err = orchestrator(&images, &MockTitleClient::new())
            .with_prompt_catalog(catalog)
            .generate(&GenerateParams::new(GenerationMode::BannerSet, "Tech Reviews"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(images.get_call_count(), 0);
    }

    #[test]
    fn test_parse_accepts_fenced_json() {
        let body = "```json\n{\"titles\":[{\"title\":\"A\",\"score\":70,\"cognitiveBias\":\"Urgency\"}]}\n```"
            .to_string();
        let titles = parse_title_candidates(&body, TitleParsePolicy::Strict).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].title, "A");
    }

    #[test]
    fn test_parse_keeps_provider_order() {
        let body = r#"{"titles":[
            {"title":"Low","score":10,"cognitiveBias":"a"},
            {"title":"High","score":99,"cognitiveBias":"b"}
        ]}"#;
        let titles = parse_title_candidates(body, TitleParsePolicy::Lenient).unwrap();
        assert_eq!(titles[0].title, "Low");
        assert_eq!(titles[1].title, "High");
    }
}
