//! Data models and structures
//!
//! Defines generation modes, per-call provider requests, normalized results,
//! and environment-driven configuration.

use crate::ai::mime::sniff_image_mime;
use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Image pipeline a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageModel {
    #[default]
    StandardImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            "4:3" => Ok(AspectRatio::Landscape4x3),
            "3:4" => Ok(AspectRatio::Portrait3x4),
            other => Err(format!(
                "Invalid aspect ratio '{}'. Expected one of: 1:1, 16:9, 9:16, 4:3, 3:4",
                other
            )),
        }
    }
}

/// User-facing product flow; decides request fan-out and result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Standard,
    #[default]
    ThumbnailSet,
    BannerSet,
    TitleIdeas,
}

impl GenerationMode {
    /// Number of image requests one submission expands into.
    pub fn image_request_count(&self) -> usize {
        match self {
            GenerationMode::Standard => 1,
            GenerationMode::ThumbnailSet | GenerationMode::BannerSet => 3,
            GenerationMode::TitleIdeas => 0,
        }
    }

    /// Aspect ratio the mode imposes regardless of the user's choice.
    pub fn forced_aspect_ratio(&self) -> Option<AspectRatio> {
        match self {
            GenerationMode::ThumbnailSet | GenerationMode::BannerSet => {
                Some(AspectRatio::Landscape)
            }
            GenerationMode::Standard | GenerationMode::TitleIdeas => None,
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationMode::Standard => "standard",
            GenerationMode::ThumbnailSet => "thumbnail-set",
            GenerationMode::BannerSet => "banner-set",
            GenerationMode::TitleIdeas => "title-ideas",
        };
        f.write_str(name)
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(GenerationMode::Standard),
            "thumbnail-set" | "thumbnails" => Ok(GenerationMode::ThumbnailSet),
            "banner-set" | "banners" => Ok(GenerationMode::BannerSet),
            "title-ideas" | "titles" => Ok(GenerationMode::TitleIdeas),
            other => Err(format!(
                "Invalid mode '{}'. Expected one of: standard, thumbnail-set, banner-set, title-ideas",
                other
            )),
        }
    }
}

/// Image attached to image-to-image requests. Cloning shares the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl ReferenceImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build from raw file bytes, rejecting anything that is not a known image format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mime_type = sniff_image_mime(&bytes)
            .ok_or_else(|| Error::Config("Reference file is not a supported image".to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// One user submission, as handed over by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateParams {
    pub prompt: String,
    /// Channel niche; only consulted by [`GenerationMode::BannerSet`].
    pub description: Option<String>,
    pub model: ImageModel,
    pub aspect_ratio: AspectRatio,
    pub reference_image: Option<ReferenceImage>,
    pub mode: GenerationMode,
}

impl GenerateParams {
    pub fn new(mode: GenerationMode, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            description: None,
            model: ImageModel::default(),
            aspect_ratio: AspectRatio::default(),
            reference_image: None,
            mode,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_reference_image(mut self, reference_image: ReferenceImage) -> Self {
        self.reference_image = Some(reference_image);
        self
    }
}

/// A single image call to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub model: ImageModel,
    pub aspect_ratio: AspectRatio,
    pub reference_image: Option<ReferenceImage>,
}

/// The structured text call issued for [`GenerationMode::TitleIdeas`].
#[derive(Debug, Clone, PartialEq)]
pub struct TitleRequest {
    pub prompt_text: String,
    pub response_schema: serde_json::Value,
}

/// Decoded inline image payload returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    pub fn to_data_uri(&self) -> String {
        let mime_type = if self.mime_type.is_empty() {
            "image/png"
        } else {
            self.mime_type.as_str()
        };
        format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleCandidate {
    pub title: String,
    pub score: u8,
    pub cognitive_bias: String,
}

/// Normalized outcome of one generation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GenerationResult {
    /// Image data URIs in request order.
    #[serde(rename = "imageUrls")]
    Images(Vec<String>),
    /// Title candidates in provider order.
    #[serde(rename = "textResults")]
    Titles(Vec<TitleCandidate>),
}

impl GenerationResult {
    pub fn is_empty(&self) -> bool {
        match self {
            GenerationResult::Images(urls) => urls.is_empty(),
            GenerationResult::Titles(titles) => titles.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GenerationResult::Images(urls) => urls.len(),
            GenerationResult::Titles(titles) => titles.len(),
        }
    }

    pub fn image_urls(&self) -> &[String] {
        match self {
            GenerationResult::Images(urls) => urls,
            GenerationResult::Titles(_) => &[],
        }
    }

    pub fn titles(&self) -> &[TitleCandidate] {
        match self {
            GenerationResult::Titles(titles) => titles,
            GenerationResult::Images(_) => &[],
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub image_model: String,
    pub text_model: String,
    pub base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("API_KEY")
            .or_else(|| non_empty("GEMINI_API_KEY"))
            .ok_or_else(|| {
                Error::MissingCredential("API_KEY (or GEMINI_API_KEY) not set".to_string())
            })?;

        Ok(Self {
            api_key,
            image_model: non_empty("IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            text_model: non_empty("TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            base_url: non_empty("GEMINI_BASE_URL"),
        })
    }
}
