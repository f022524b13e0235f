use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("limits.max_keywords must be at least 1")]
    ZeroMaxKeywords,

    #[error("limits.max_body_bytes must be at least 1")]
    ZeroBodyLimit,

    #[error("related.suffixes cannot be empty")]
    NoRelatedSuffixes,

    #[error(transparent)]
    Estimator(#[from] estimator::config::ValidationError),
}

/// Keyword API configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for keyword requests
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub related: RelatedConfig,
    pub estimator: estimator::config::Config,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.limits.max_keywords == 0 {
            return Err(ValidationError::ZeroMaxKeywords);
        }
        if self.limits.max_body_bytes == 0 {
            return Err(ValidationError::ZeroBodyLimit);
        }
        if self.related.suffixes.is_empty() {
            return Err(ValidationError::NoRelatedSuffixes);
        }

        self.estimator.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// Keywords accepted in a single request
    pub max_keywords: usize,
    /// Pause between two keywords of the same batch
    pub inter_keyword_delay_ms: u64,
    /// Larger request bodies are rejected without being read
    pub max_body_bytes: usize,
}

impl Limits {
    pub fn inter_keyword_delay(&self) -> Duration {
        Duration::from_millis(self.inter_keyword_delay_ms)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_keywords: 5,
            inter_keyword_delay_ms: 300,
            max_body_bytes: 16 * 1024,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelatedConfig {
    pub max_candidates: usize,
    /// Appended to the seed keyword, in order, to build candidates
    pub suffixes: Vec<String>,
}

const DEFAULT_SUFFIXES: &[&str] = &[
    "방법", "추천", "리뷰", "가격", "비교", "후기", "종류", "사용법", "효과", "구매", "무료", "최저가",
];

impl Default for RelatedConfig {
    fn default() -> Self {
        RelatedConfig {
            max_candidates: 12,
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
