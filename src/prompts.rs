//! Versioned prompt templates, keyed by generation mode.
//!
//! Templates live under `data/prompts/` and are compiled in, so they can be
//! reworded without touching orchestration code.

use crate::models::GenerationMode;

pub const THUMBNAIL_REACTION: &str = include_str!("../data/prompts/thumbnail_reaction.txt");
pub const THUMBNAIL_ACTION: &str = include_str!("../data/prompts/thumbnail_action.txt");
pub const THUMBNAIL_MYSTERY: &str = include_str!("../data/prompts/thumbnail_mystery.txt");
pub const BANNER_SLEEK: &str = include_str!("../data/prompts/banner_sleek.txt");
pub const BANNER_ILLUSTRATIVE: &str = include_str!("../data/prompts/banner_illustrative.txt");
pub const BANNER_CINEMATIC: &str = include_str!("../data/prompts/banner_cinematic.txt");
pub const TITLE_IDEAS: &str = include_str!("../data/prompts/title_ideas.txt");

/// Niche substituted into banner templates when the user leaves it blank.
pub const DEFAULT_BANNER_NICHE: &str = "Content Creator";

/// Mapping from mode to its ordered template list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCatalog {
    pub version: &'static str,
    pub thumbnail: Vec<&'static str>,
    pub banner: Vec<&'static str>,
    pub title_ideas: &'static str,
}

impl PromptCatalog {
    pub fn builtin() -> Self {
        Self {
            version: "2024-11-ctr-v1",
            thumbnail: vec![THUMBNAIL_REACTION, THUMBNAIL_ACTION, THUMBNAIL_MYSTERY],
            banner: vec![BANNER_SLEEK, BANNER_ILLUSTRATIVE, BANNER_CINEMATIC],
            title_ideas: TITLE_IDEAS,
        }
    }

    /// Image templates for a mode, in issue order. Empty for modes that send
    /// the user's text verbatim or produce no images.
    pub fn image_templates(&self, mode: GenerationMode) -> &[&'static str] {
        match mode {
            GenerationMode::ThumbnailSet => self.thumbnail.as_slice(),
            GenerationMode::BannerSet => self.banner.as_slice(),
            GenerationMode::Standard | GenerationMode::TitleIdeas => &[],
        }
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replace `{{key}}` placeholders in a template string.
///
/// Substitution is single-pass: placeholder syntax inside a substituted value
/// is left untouched. Unknown placeholders are kept verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = &after_open[..end];
                match vars.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => result.push_str(value),
                    None => {
                        result.push_str("{{");
                        result.push_str(key);
                        result.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_render_does_not_expand_placeholders_in_values() {
        assert_eq!(
            render("{{channel}} / {{niche}}", &[("channel", "{{niche}}"), ("niche", "Gaming")]),
            "{{niche}} / Gaming"
        );
    }

    #[test]
    fn test_render_keeps_unknown_and_unterminated_placeholders() {
        assert_eq!(render("{{missing}} {{open", &[]), "{{missing}} {{open");
    }

    #[test]
    fn test_templates_have_expected_placeholders() {
        for template in [THUMBNAIL_REACTION, THUMBNAIL_ACTION, THUMBNAIL_MYSTERY] {
            assert!(template.contains("{{title}}"));
        }
        for template in [BANNER_SLEEK, BANNER_ILLUSTRATIVE, BANNER_CINEMATIC] {
            assert!(template.contains("{{channel}}"));
            assert!(template.contains("{{niche}}"));
        }
        assert!(TITLE_IDEAS.contains("{{topic}}"));
    }

    #[test]
    fn test_builtin_catalog_has_three_distinct_templates_per_set() {
        let catalog = PromptCatalog::builtin();
        for mode in [GenerationMode::ThumbnailSet, GenerationMode::BannerSet] {
            let templates = catalog.image_templates(mode);
            assert_eq!(templates.len(), 3);
            assert_ne!(templates[0], templates[1]);
            assert_ne!(templates[1], templates[2]);
        }
        assert!(catalog.image_templates(GenerationMode::Standard).is_empty());
    }
}
