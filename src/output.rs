//! Writes generation results to a local output directory.

use crate::ai::mime::extension_for_mime;
use crate::models::{GeneratedImage, GenerationMode, GenerationResult};
use crate::{Error, Result};
use base64::Engine as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decode a `data:<mime>;base64,<payload>` URI.
///
/// Only accepts the shape produced by [`GeneratedImage::to_data_uri`], so a
/// failure here means a result was not built by this crate
/// (`Error::Invariant`).
pub fn decode_data_uri(uri: &str) -> Result<GeneratedImage> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::Invariant("Image result is not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Invariant("Data URI has no payload".to_string()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::Invariant(format!("Data URI is not base64: {}", header)))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Invariant(format!("Invalid base64 in data URI: {}", e)))?;

    Ok(GeneratedImage {
        mime_type: mime_type.to_string(),
        data,
    })
}

fn file_prefix(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::ThumbnailSet => "thumbnail",
        GenerationMode::BannerSet => "banner",
        GenerationMode::Standard | GenerationMode::TitleIdeas => "image",
    }
}

/// Save image data URIs as `<prefix>_<n>.<ext>`, numbered from 1 in request order.
pub fn save_images(dir: &Path, mode: GenerationMode, uris: &[String]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let prefix = file_prefix(mode);
    let mut paths = Vec::with_capacity(uris.len());

    for (i, uri) in uris.iter().enumerate() {
        let image = decode_data_uri(uri)?;
        let path = dir.join(format!(
            "{}_{}.{}",
            prefix,
            i + 1,
            extension_for_mime(&image.mime_type)
        ));
        fs::write(&path, &image.data)?;
        info!("Saved image locally at: {}", path.display());
        paths.push(path);
    }

    Ok(paths)
}

/// Save a whole result: images as files, titles as `titles.json`.
pub fn save_result(
    dir: &Path,
    mode: GenerationMode,
    result: &GenerationResult,
) -> Result<Vec<PathBuf>> {
    match result {
        GenerationResult::Images(uris) => save_images(dir, mode, uris),
        GenerationResult::Titles(titles) => {
            fs::create_dir_all(dir)?;
            let path = dir.join("titles.json");
            fs::write(&path, serde_json::to_string_pretty(titles)?)?;
            info!("Saved JSON locally at: {}", path.display());
            Ok(vec![path])
        }
    }
}
