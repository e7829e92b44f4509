use super::{ImageGenerationService, TitleService};
use crate::models::{GeneratedImage, GenerationRequest, TitleRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A tiny valid PNG used when no outcome is scripted.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// What the mock does for a matching request.
#[derive(Debug, Clone)]
pub enum MockImageOutcome {
    Image(GeneratedImage),
    NoImage,
    ProviderError(String),
}

impl MockImageOutcome {
    pub fn png(data: Vec<u8>) -> Self {
        MockImageOutcome::Image(GeneratedImage {
            mime_type: "image/png".to_string(),
            data,
        })
    }
}

#[derive(Debug, Clone)]
struct MockRule {
    prompt_fragment: String,
    outcome: MockImageOutcome,
    delay: Duration,
}

/// Scriptable image provider. Rules match on a prompt-text fragment, so
/// outcomes stay tied to a specific request even when calls run concurrently.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    rules: Arc<Mutex<Vec<MockRule>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    completions: Arc<Mutex<Vec<String>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            completions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_outcome_for(self, prompt_fragment: &str, outcome: MockImageOutcome) -> Self {
        self.with_delayed_outcome_for(prompt_fragment, outcome, Duration::ZERO)
    }

    pub fn with_delayed_outcome_for(
        self,
        prompt_fragment: &str,
        outcome: MockImageOutcome,
        delay: Duration,
    ) -> Self {
        self.rules.lock().unwrap().push(MockRule {
            prompt_fragment: prompt_fragment.to_string(),
            outcome,
            delay,
        });
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests in the order calls started.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompt texts in the order calls finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }

    fn rule_for(&self, prompt_text: &str) -> Option<MockRule> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| prompt_text.contains(&rule.prompt_fragment))
            .cloned()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.requests.lock().unwrap().push(request.clone());

        let (outcome, delay) = match self.rule_for(&request.prompt_text) {
            Some(rule) => (rule.outcome, rule.delay),
            None => (MockImageOutcome::png(TINY_PNG.to_vec()), Duration::ZERO),
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.completions
            .lock()
            .unwrap()
            .push(request.prompt_text.clone());

        match outcome {
            MockImageOutcome::Image(image) => Ok(image),
            MockImageOutcome::NoImage => Err(Error::NoImageProduced { index: 0 }),
            MockImageOutcome::ProviderError(message) => Err(Error::AiProvider(message)),
        }
    }
}

/// Default body returned by [`MockTitleClient`] when nothing is scripted.
pub const DEFAULT_TITLES_JSON: &str = r#"{"titles":[
    {"title":"I Tried It For 30 Days","score":91,"cognitiveBias":"Curiosity Gap"},
    {"title":"Stop Doing This Now","score":87,"cognitiveBias":"Loss Aversion"},
    {"title":"Nobody Talks About This","score":84,"cognitiveBias":"Negativity Bias"},
    {"title":"Last Chance Before It's Gone","score":78,"cognitiveBias":"Urgency"},
    {"title":"Everyone Is Switching To This","score":72,"cognitiveBias":"FOMO"}
]}"#;

#[derive(Debug, Clone)]
enum MockTitleResponse {
    Body(Option<String>),
    Failure(String),
}

/// Scriptable title provider; scripted responses are replayed in a cycle.
#[derive(Clone)]
pub struct MockTitleClient {
    responses: Arc<Mutex<Vec<MockTitleResponse>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTitleClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockTitleResponse::Body(Some(body.to_string())));
        self
    }

    /// Simulate a response without any text part.
    pub fn with_empty_response(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockTitleResponse::Body(None));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockTitleResponse::Failure(message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockTitleClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TitleService for MockTitleClient {
    async fn generate_titles(&self, _request: &TitleRequest) -> Result<Option<String>> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Some(DEFAULT_TITLES_JSON.to_string()));
        }

        let index = (*count - 1) % responses.len();
        match &responses[index] {
            MockTitleResponse::Body(body) => Ok(body.clone()),
            MockTitleResponse::Failure(message) => Err(Error::AiProvider(message.clone())),
        }
    }
}
