use crate::error::{PipelineError, Result};
use crate::limits::{clamp_embed_concurrency, default_embed_concurrency, embed_concurrency_from_env};
use serde::{Deserialize, Serialize};
use std::path::Path;
use treegpt_graph::{DensityProjector, DEFAULT_EPS, DEFAULT_MIN_SAMPLES};
use treegpt_text_chunker::DEFAULT_MAX_TOKENS;

/// Settings for one pipeline run.
///
/// ```toml
/// max_tokens = 400
/// conversation_limit = 40
/// embed_concurrency = 4
///
/// [clustering]
/// eps = 0.3
/// min_samples = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Token budget before a pair is chunked
    pub max_tokens: usize,
    /// Only the first N conversations of the archive
    pub conversation_limit: Option<usize>,
    /// Replies embedded at once; `TREEGPT_EMBED_CONCURRENCY` or a CPU-based default when unset
    pub embed_concurrency: Option<usize>,
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringConfig {
    /// Cosine distance radius
    pub eps: f32,
    pub min_samples: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            conversation_limit: None,
            embed_concurrency: None,
            clustering: ClusteringConfig::default(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_tokens must be > 0".to_string(),
            ));
        }
        if self.embed_concurrency == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "embed_concurrency must be > 0".to_string(),
            ));
        }
        self.clustering.validate()
    }

    /// Effective embedding concurrency, clamped to `1..=32`
    #[must_use]
    pub fn resolved_embed_concurrency(&self) -> usize {
        self.embed_concurrency.map_or_else(
            || embed_concurrency_from_env(default_embed_concurrency()),
            clamp_embed_concurrency,
        )
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        self.projector().map(|_| ())
    }

    pub fn projector(&self) -> Result<DensityProjector> {
        DensityProjector::new(self.eps, self.min_samples)
            .map_err(|e| PipelineError::InvalidConfig(format!("clustering: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_tokens, 400);
        assert_eq!(config.conversation_limit, None);
        assert_eq!(config.clustering.eps, 0.3);
        assert_eq!(config.clustering.min_samples, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            conversation_limit = 40

            [clustering]
            min_samples = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.max_tokens, 400);
        assert_eq!(config.conversation_limit, Some(40));
        assert_eq!(config.clustering.eps, 0.3);
        assert_eq!(config.clustering.min_samples, 3);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            PipelineConfig::from_toml_str("").unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("max_tokens = 0"),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[clustering]\neps = -1.0"),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("max_tokenz = 10"),
            Err(PipelineError::ConfigParseError(_))
        ));
    }

    #[test]
    fn explicit_concurrency_wins() {
        let config = PipelineConfig {
            embed_concurrency: Some(7),
            ..PipelineConfig::default()
        };
        assert_eq!(config.resolved_embed_concurrency(), 7);
        assert!((1..=32).contains(&PipelineConfig::default().resolved_embed_concurrency()));
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "max_tokens = 128\n").unwrap();
        assert_eq!(PipelineConfig::load(tmp.path()).unwrap().max_tokens, 128);
    }
}
