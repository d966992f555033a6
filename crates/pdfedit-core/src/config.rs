//! Compositor tuning loaded from TOML
//!
//! Every field has a default, so an empty document (or no file at all) yields
//! the built-in behavior. Only the sections you want to change need to appear.

use crate::error::{PdfEditError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Layout and baking parameters shared by the overlay projector and the compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Heuristic glyph advance as a fraction of the font size
    pub avg_glyph_width_factor: f64,
    /// Line advance as a multiple of the font size
    pub line_height_factor: f64,
    /// Total vertical padding (points) added to an estimated text box
    pub vertical_padding: f64,
    /// Inner left/right padding (points) of a free-text box
    pub horizontal_padding: f64,
    /// Width (canonical fraction) used when a text annotation has none
    pub default_annotation_width: f64,
    /// Points added on every side of a patch bbox when painting the whiteout
    pub patch_cover_padding: f64,
    /// Underline/strike stroke width as a fraction of the font size
    pub decoration_thickness_factor: f64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            avg_glyph_width_factor: 0.5,
            line_height_factor: 1.2,
            vertical_padding: 4.0,
            horizontal_padding: 2.0,
            default_annotation_width: 0.3,
            patch_cover_padding: 1.0,
            decoration_thickness_factor: 0.06,
        }
    }
}

impl ComposeConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or a value is out of range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use pdfedit_core::ComposeConfig;
    ///
    /// let config = ComposeConfig::from_toml("line_height_factor = 1.5").unwrap();
    /// assert_eq!(config.line_height_factor, 1.5);
    /// assert_eq!(config.avg_glyph_width_factor, 0.5);
    /// ```
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: ComposeConfig =
            toml::from_str(s).map_err(|e| PdfEditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make layout degenerate
    pub fn validate(&self) -> Result<()> {
        if self.avg_glyph_width_factor <= 0.0 {
            return Err(PdfEditError::Config(
                "avg_glyph_width_factor must be positive".into(),
            ));
        }
        if self.line_height_factor <= 0.0 {
            return Err(PdfEditError::Config(
                "line_height_factor must be positive".into(),
            ));
        }
        if self.vertical_padding < 0.0
            || self.horizontal_padding < 0.0
            || self.patch_cover_padding < 0.0
        {
            return Err(PdfEditError::Config("paddings must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.default_annotation_width)
            || self.default_annotation_width == 0.0
        {
            return Err(PdfEditError::Config(
                "default_annotation_width must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ComposeConfig::from_toml("").unwrap();
        assert_eq!(config, ComposeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ComposeConfig::from_toml(
            r#"
            vertical_padding = 8.0
            patch_cover_padding = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.vertical_padding, 8.0);
        assert_eq!(config.patch_cover_padding, 2.5);
        assert_eq!(config.line_height_factor, 1.2);
    }

    #[test]
    fn test_rejects_zero_glyph_factor() {
        let err = ComposeConfig::from_toml("avg_glyph_width_factor = 0.0").unwrap_err();
        assert!(err.to_string().contains("avg_glyph_width_factor"));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(ComposeConfig::from_toml("line_height_factor = ").is_err());
    }

    #[test]
    fn test_from_missing_file_fails_with_path() {
        let err = ComposeConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
