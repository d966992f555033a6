//! Session settings loaded from TOML
//!
//! ```toml
//! history_limit = 50
//!
//! [compose]
//! line_height_factor = 1.4
//! ```

use crate::error::{Result, SessionError};
use anyhow::Context;
use pdfedit_core::ComposeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of snapshots kept by the undo log
    pub history_limit: usize,
    /// Layout parameters handed to every composite
    pub compose: ComposeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            compose: ComposeConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let config: SessionConfig =
            toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(SessionError::Config(
                "history_limit must be at least 1".into(),
            ));
        }
        self.compose.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(SessionConfig::from_toml("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_nested_compose_table() {
        let config = SessionConfig::from_toml(
            "history_limit = 5\n[compose]\nline_height_factor = 1.5\n",
        )
        .unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.compose.line_height_factor, 1.5);
        assert_eq!(config.compose.avg_glyph_width_factor, 0.5);
    }

    #[test]
    fn test_zero_history_limit_rejected() {
        assert!(matches!(
            SessionConfig::from_toml("history_limit = 0"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_compose_section_rejected() {
        assert!(matches!(
            SessionConfig::from_toml("[compose]\navg_glyph_width_factor = 0.0"),
            Err(SessionError::Engine(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SessionConfig::from_file("/nonexistent/session.toml").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/session.toml"));
    }
}
