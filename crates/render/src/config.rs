//! Renderer configuration, read from YAML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```yaml
//! surface: { width: 800, height: 600 }
//! candidates: [primary, gl]
//! clear_color: [1.0, 1.0, 1.0, 1.0]
//! ```

use crate::types::{ContextCandidate, SurfaceSize};
use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Size used for offscreen surfaces. Window surfaces report their own.
    pub surface: SurfaceSize,
    /// Context types to try, in order.
    pub candidates: Vec<ContextCandidate>,
    /// RGBA color the target is cleared to before drawing.
    pub clear_color: Vec4,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceSize::default(),
            candidates: ContextCandidate::DEFAULT_ORDER.to_vec(),
            clear_color: Vec4::ONE,
        }
    }
}

impl RenderConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!("loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(RenderConfig::from_yaml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn missing_fields_fall_back() {
        let config = RenderConfig::from_yaml_str("candidates: [gl, fallback]\n").unwrap();
        assert_eq!(
            config.candidates,
            vec![ContextCandidate::Gl, ContextCandidate::Fallback]
        );
        assert_eq!(config.surface, SurfaceSize::default());
        assert_eq!(config.clear_color, Vec4::ONE);
    }

    #[test]
    fn yaml_roundtrip() {
        let config = RenderConfig {
            surface: SurfaceSize::new(320, 240),
            candidates: vec![ContextCandidate::Primary],
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        };
        let text = config.to_yaml().unwrap();
        assert_eq!(RenderConfig::from_yaml_str(&text).unwrap(), config);
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        let err = RenderConfig::from_yaml_str("candidates: [webgl]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RenderConfig::load("/nonexistent/tricolor.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
