use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

pub const CLIENT_ID_ENV: &str = "NAVER_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "NAVER_CLIENT_SECRET";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("missing upstream credential: set {0}")]
    MissingCredential(&'static str),

    #[error("fetch.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("scoring weight `{0}` must be a finite, non-negative number")]
    InvalidWeight(&'static str),

    #[error("scoring pc_share must be between 0 and 1")]
    InvalidShare,
}

/// Estimator configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub naver: NaverConfig,
    /// Optional scraped keyword table used as an extra source
    #[serde(default)]
    pub keyword_table: Option<KeywordTableConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub fallback: FallbackMode,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fetch.max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        self.scoring.validate()
    }
}

/// Naver Open API search endpoints.
///
/// Credentials may be given here, but the `NAVER_CLIENT_ID` and
/// `NAVER_CLIENT_SECRET` environment variables take precedence.
#[derive(Clone, Deserialize, PartialEq)]
pub struct NaverConfig {
    #[serde(default = "default_naver_url")]
    pub base_url: Url,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

fn default_naver_url() -> Url {
    Url::parse("https://openapi.naver.com/").expect("static URL is valid")
}

impl NaverConfig {
    /// Resolves credentials once at startup. There are no built-in defaults:
    /// if neither the environment nor the config provides a value, this fails.
    pub fn credentials<F>(&self, env: F) -> Result<Credentials, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &'static str, configured: &Option<String>| {
            env(name)
                .or_else(|| configured.clone())
                .filter(|value| !value.trim().is_empty())
                .ok_or(ValidationError::MissingCredential(name))
        };

        Ok(Credentials {
            client_id: pick(CLIENT_ID_ENV, &self.client_id)?,
            client_secret: pick(CLIENT_SECRET_ENV, &self.client_secret)?,
        })
    }
}

impl fmt::Debug for NaverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaverConfig")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KeywordTableConfig {
    /// Page that accepts a `keyword` form post and answers with an HTML table
    pub url: Url,
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_ms: u64,
    pub danger_accept_invalid_certs: bool,
    /// Sent on every outbound request. Scraped pages reject unknown clients.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            timeout_ms: 10_000,
            danger_accept_invalid_certs: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Weight applied to the result count of each search vertical
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerticalWeights {
    pub web: f64,
    pub blog: f64,
    pub news: f64,
    pub cafe: f64,
}

impl Default for VerticalWeights {
    fn default() -> Self {
        VerticalWeights {
            web: 1.0,
            blog: 0.8,
            news: 0.5,
            cafe: 0.7,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ScoringConfig {
    WeightedCounts {
        #[serde(default)]
        weights: VerticalWeights,
        #[serde(default = "default_scale")]
        scale: f64,
        #[serde(default = "default_cap")]
        cap: u64,
    },
    ReportedVolume {
        #[serde(default = "default_pc_share")]
        pc_share: f64,
    },
}

fn default_scale() -> f64 {
    0.1
}

fn default_cap() -> u64 {
    10_000_000
}

fn default_pc_share() -> f64 {
    0.3
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig::WeightedCounts {
            weights: VerticalWeights::default(),
            scale: default_scale(),
            cap: default_cap(),
        }
    }
}

impl ScoringConfig {
    /// The other strategy with its defaults, used when this one finds
    /// nothing it can score.
    pub fn complement(&self) -> ScoringConfig {
        match self {
            ScoringConfig::WeightedCounts { .. } => ScoringConfig::ReportedVolume {
                pc_share: default_pc_share(),
            },
            ScoringConfig::ReportedVolume { .. } => ScoringConfig::default(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let check = |name: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ValidationError::InvalidWeight(name))
            }
        };

        match self {
            ScoringConfig::WeightedCounts { weights, scale, .. } => {
                check("web", weights.web)?;
                check("blog", weights.blog)?;
                check("news", weights.news)?;
                check("cafe", weights.cafe)?;
                check("scale", *scale)
            }
            ScoringConfig::ReportedVolume { pc_share } => {
                if (0.0..=1.0).contains(pc_share) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidShare)
                }
            }
        }
    }
}

/// What to do when no upstream produced any signal for a keyword
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Synthesize a volume and tag it `estimated`
    #[default]
    Synthetic,
    /// Report a per-keyword error
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = serde_yaml::from_str("naver: {}").unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.naver.base_url.as_str(), "https://openapi.naver.com/");
        assert_eq!(config.fetch, FetchConfig::default());
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.fallback, FallbackMode::Synthetic);
        assert!(config.keyword_table.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
naver:
    base_url: "http://127.0.0.1:9000/"
    client_id: abc
keyword_table:
    url: "http://127.0.0.1:9001/keyword.php"
fetch:
    max_attempts: 5
    base_delay_ms: 250
scoring:
    type: reported_volume
    pc_share: 0.4
fallback: error
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.naver.client_id.as_deref(), Some("abc"));
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.timeout_ms, 10_000);
        assert_eq!(
            config.scoring,
            ScoringConfig::ReportedVolume { pc_share: 0.4 }
        );
        assert_eq!(config.fallback, FallbackMode::Error);
    }

    #[test]
    fn test_partial_weights_use_defaults() {
        let yaml = r#"
type: weighted_counts
weights:
    web: 2.0
"#;
        let scoring: ScoringConfig = serde_yaml::from_str(yaml).unwrap();
        let ScoringConfig::WeightedCounts {
            weights,
            scale,
            cap,
        } = scoring
        else {
            panic!("expected weighted counts");
        };
        assert_eq!(weights.web, 2.0);
        assert_eq!(weights.blog, 0.8);
        assert_eq!(scale, 0.1);
        assert_eq!(cap, 10_000_000);
    }

    #[test]
    fn test_validation_errors() {
        let mut config: Config = serde_yaml::from_str("naver: {}").unwrap();
        config.fetch.max_attempts = 0;
        assert_eq!(config.validate(), Err(ValidationError::ZeroAttempts));

        let mut config: Config = serde_yaml::from_str("naver: {}").unwrap();
        config.scoring = ScoringConfig::ReportedVolume { pc_share: 1.5 };
        assert_eq!(config.validate(), Err(ValidationError::InvalidShare));

        let mut config: Config = serde_yaml::from_str("naver: {}").unwrap();
        config.scoring = ScoringConfig::WeightedCounts {
            weights: VerticalWeights {
                news: -1.0,
                ..Default::default()
            },
            scale: 0.1,
            cap: 10,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidWeight("news"))
        );
    }

    #[test]
    fn test_credentials_env_overrides_config() {
        let config: NaverConfig =
            serde_yaml::from_str("{client_id: from-file, client_secret: file-secret}").unwrap();

        let credentials = config
            .credentials(env_from(&[(CLIENT_ID_ENV, "from-env")]))
            .unwrap();
        assert_eq!(credentials.client_id, "from-env");
        assert_eq!(credentials.client_secret, "file-secret");
    }

    #[test]
    fn test_credentials_fail_closed() {
        let config: NaverConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(
            config.credentials(env_from(&[])),
            Err(ValidationError::MissingCredential(CLIENT_ID_ENV))
        );
        assert_eq!(
            config.credentials(env_from(&[(CLIENT_ID_ENV, "id"), (CLIENT_SECRET_ENV, " ")])),
            Err(ValidationError::MissingCredential(CLIENT_SECRET_ENV))
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = Credentials {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[test]
    fn test_deserialization_errors() {
        assert!(serde_yaml::from_str::<Config>("naver: {base_url: not-a-url}").is_err());
        assert!(serde_yaml::from_str::<FallbackMode>("guess").is_err());
        assert!(serde_yaml::from_str::<ScoringConfig>("type: magic").is_err());
    }
}
