use crate::config::{Config, Credentials, FallbackMode, ValidationError};
use crate::fetch::{FetchError, ResilientFetch};
use crate::keyword_table::KeywordTableSource;
use crate::labels::{self, ShopCategory};
use crate::metrics_defs::{ESTIMATE_DURATION, SOURCE_FAILURES, SYNTHETIC_ESTIMATES};
use crate::naver::{NaverSearchSource, NaverSetupError};
use crate::scoring::{self, ScoringStrategy};
use crate::sources::{Signals, SourceError, UpstreamSource, Vertical};
use crate::synthetic::synthetic_volume;
use crate::types::{Device, DeviceHint, EstimateSource, Volume, VolumeEstimate};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

const MONTHLY_BLOG_RATE: f64 = 0.1;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("invalid estimator config: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not build HTTP client: {0}")]
    Client(#[from] FetchError),
    #[error(transparent)]
    Naver(#[from] NaverSetupError),
}

#[derive(thiserror::Error, Debug)]
pub enum EstimateError {
    #[error("no search volume available for `{keyword}`: {reason}")]
    NoSignal { keyword: String, reason: String },
}

/// Estimates monthly search volume for one keyword at a time.
pub struct VolumeEstimator {
    sources: Vec<Arc<dyn UpstreamSource>>,
    scoring: Box<dyn ScoringStrategy>,
    fallback: FallbackMode,
}

impl VolumeEstimator {
    pub fn new(
        sources: Vec<Arc<dyn UpstreamSource>>,
        scoring: Box<dyn ScoringStrategy>,
        fallback: FallbackMode,
    ) -> Self {
        VolumeEstimator {
            sources,
            scoring,
            fallback,
        }
    }

    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, BuildError> {
        config.validate()?;

        let fetch = ResilientFetch::new(&config.fetch)?;
        let mut sources: Vec<Arc<dyn UpstreamSource>> = vec![Arc::new(NaverSearchSource::new(
            &config.naver.base_url,
            credentials,
            fetch.clone(),
        )?)];

        if let Some(table) = &config.keyword_table {
            sources.push(Arc::new(KeywordTableSource::new(table.url.clone(), fetch)));
        }

        let estimator = VolumeEstimator::new(
            sources,
            scoring::from_config(&config.scoring),
            config.fallback,
        );
        tracing::info!(
            sources = ?estimator.source_names(),
            scoring = estimator.scoring.name(),
            fallback = ?estimator.fallback,
            "Volume estimator ready"
        );
        Ok(estimator)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub async fn estimate(
        &self,
        keyword: &str,
        device: DeviceHint,
    ) -> Result<VolumeEstimate, EstimateError> {
        let start = Instant::now();
        let result = self.estimate_inner(keyword, device).await;
        histogram!(ESTIMATE_DURATION).record(start.elapsed().as_secs_f64());
        result
    }

    async fn estimate_inner(
        &self,
        keyword: &str,
        device: DeviceHint,
    ) -> Result<VolumeEstimate, EstimateError> {
        let mut signals = Signals::default();
        let mut failures = Vec::new();

        // Sources are consulted in order so later ones can override earlier counts.
        for source in &self.sources {
            match source.fetch(keyword, device).await {
                Ok(found) => signals.merge(found),
                Err(e) => {
                    counter!(SOURCE_FAILURES, "source" => source.name()).increment(1);
                    match &e {
                        SourceError::NotListed(_) => {
                            tracing::debug!(keyword, error = %e, "Keyword not listed by source")
                        }
                        _ => tracing::warn!(keyword, error = %e, "Source returned no signal"),
                    }
                    failures.push(e.to_string());
                }
            }
        }

        // Only an upstream that returned nothing at all sends us to the fallback.
        if !signals.is_empty() {
            match self.scoring.score(&signals, device) {
                Some(volume) => {
                    return Ok(build_estimate(
                        keyword,
                        volume,
                        &signals,
                        EstimateSource::Upstream,
                    ));
                }
                None => failures.push(format!("{} found nothing to score", self.scoring.name())),
            }
        }

        let reason = match failures.is_empty() {
            true => "no source returned any signal".to_string(),
            false => failures.join("; "),
        };

        match self.fallback {
            FallbackMode::Synthetic => {
                counter!(SYNTHETIC_ESTIMATES).increment(1);
                tracing::warn!(keyword, reason = %reason, "No upstream signal, synthesizing volume");
                Ok(synthetic_estimate(keyword, device))
            }
            FallbackMode::Error => Err(EstimateError::NoSignal {
                keyword: keyword.to_string(),
                reason,
            }),
        }
    }
}

// Kept out of the async path: the thread rng is not Send.
// Never carries upstream counts.
fn synthetic_estimate(keyword: &str, device: DeviceHint) -> VolumeEstimate {
    let volume = synthetic_volume(keyword, &mut rand::rng()).restrict_to(device);
    build_estimate(keyword, volume, &Signals::default(), EstimateSource::Estimated)
}

fn build_estimate(
    keyword: &str,
    volume: Volume,
    signals: &Signals,
    source: EstimateSource,
) -> VolumeEstimate {
    let web_total = signals.vertical_total(Vertical::Web);
    let blog_total = signals.vertical_total(Vertical::Blog);
    let blog_pc = signals.count(Vertical::Blog, Device::Pc);
    let search_volume = volume.total();

    VolumeEstimate {
        keyword: keyword.to_string(),
        volume,
        monthly_blog_rate: (blog_pc as f64 * MONTHLY_BLOG_RATE).round() as u64,
        web_total,
        blog_total,
        blog_saturation: labels::blog_saturation(blog_total, search_volume),
        competition: labels::competition(search_volume, blog_total),
        commercial: labels::commercial_intent(keyword),
        shop_category: ShopCategory::classify(keyword),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::labels::Level;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        name: &'static str,
        result: fn() -> Result<Signals, SourceError>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(name: &'static str, result: fn() -> Result<Signals, SourceError>) -> Arc<Self> {
            Arc::new(FixedSource {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl UpstreamSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _keyword: &str, _device: DeviceHint) -> Result<Signals, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn notebook_counts() -> Result<Signals, SourceError> {
        let mut signals = Signals::default();
        for device in [Device::Pc, Device::Mobile] {
            signals.record_count(Vertical::Web, device, 12000);
            signals.record_count(Vertical::Blog, device, 3000);
        }
        Ok(signals)
    }

    fn unauthorized() -> Result<Signals, SourceError> {
        Err(SourceError::Unauthorized("stub"))
    }

    fn unavailable() -> Result<Signals, SourceError> {
        Err(SourceError::Unavailable {
            source_name: "stub",
            message: "upstream responded with 502".into(),
        })
    }

    fn not_listed() -> Result<Signals, SourceError> {
        Err(SourceError::NotListed("table"))
    }

    fn reported_total() -> Result<Signals, SourceError> {
        let mut signals = Signals::default();
        signals.set_reported_total(135_000);
        Ok(signals)
    }

    fn estimator(sources: Vec<Arc<FixedSource>>, fallback: FallbackMode) -> VolumeEstimator {
        estimator_with_scoring(sources, &ScoringConfig::default(), fallback)
    }

    fn estimator_with_scoring(
        sources: Vec<Arc<FixedSource>>,
        scoring: &ScoringConfig,
        fallback: FallbackMode,
    ) -> VolumeEstimator {
        VolumeEstimator::new(
            sources
                .into_iter()
                .map(|source| source as Arc<dyn UpstreamSource>)
                .collect(),
            scoring::from_config(scoring),
            fallback,
        )
    }

    #[tokio::test]
    async fn test_estimate_from_counts() {
        let estimator = estimator(
            vec![FixedSource::new("counts", notebook_counts)],
            FallbackMode::Synthetic,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.volume, Volume::new(1440, 1440));
        assert_eq!(estimate.volume.total(), 2880);
        assert_eq!(estimate.source, EstimateSource::Upstream);
        assert_eq!(estimate.web_total, 24000);
        assert_eq!(estimate.blog_total, 6000);
        assert_eq!(estimate.monthly_blog_rate, 300);
        assert_eq!(estimate.blog_saturation, Level::VeryHigh);
        assert_eq!(estimate.competition, Level::VeryHigh);
        assert_eq!(estimate.commercial, Level::Low);
        assert_eq!(estimate.shop_category, ShopCategory::Electronics);
    }

    #[tokio::test]
    async fn test_repeated_estimates_are_identical() {
        let estimator = estimator(
            vec![FixedSource::new("counts", notebook_counts)],
            FallbackMode::Synthetic,
        );

        let first = estimator.estimate("노트북", DeviceHint::All).await.unwrap();
        let second = estimator.estimate("노트북", DeviceHint::All).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unauthorized_falls_back_to_synthetic() {
        let estimator = estimator(
            vec![FixedSource::new("stub", unauthorized)],
            FallbackMode::Synthetic,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.source, EstimateSource::Estimated);
        assert!(estimate.volume.total() > 0);
        assert_eq!(estimate.web_total, 0);
        assert_eq!(estimate.blog_total, 0);
    }

    #[tokio::test]
    async fn test_synthetic_respects_device_hint() {
        let estimator = estimator(
            vec![FixedSource::new("stub", unavailable)],
            FallbackMode::Synthetic,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::Pc).await.unwrap();
        assert_eq!(estimate.volume.mobile(), 0);
        assert!(estimate.volume.pc() > 0);
    }

    #[tokio::test]
    async fn test_error_fallback() {
        let estimator = estimator(
            vec![FixedSource::new("stub", unauthorized)],
            FallbackMode::Error,
        );

        let error = estimator
            .estimate("노트북", DeviceHint::All)
            .await
            .unwrap_err();

        let EstimateError::NoSignal { keyword, reason } = error;
        assert_eq!(keyword, "노트북");
        assert!(reason.contains("credentials"));
    }

    #[tokio::test]
    async fn test_one_failing_source_keeps_upstream_result() {
        let failing = FixedSource::new("failing", unavailable);
        let counts = FixedSource::new("counts", notebook_counts);
        let estimator = estimator(
            vec![failing.clone(), counts.clone()],
            FallbackMode::Error,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.source, EstimateSource::Upstream);
        assert_eq!(estimate.volume.total(), 2880);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(counts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_counts_scored_when_reported_total_missing() {
        let estimator = estimator_with_scoring(
            vec![
                FixedSource::new("counts", notebook_counts),
                FixedSource::new("table", not_listed),
            ],
            &ScoringConfig::ReportedVolume { pc_share: 0.3 },
            FallbackMode::Synthetic,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.source, EstimateSource::Upstream);
        assert_eq!(estimate.volume, Volume::new(1440, 1440));
        assert_eq!(estimate.web_total, 24000);
        assert_eq!(estimate.blog_total, 6000);
        assert_eq!(estimate.blog_saturation, Level::VeryHigh);
    }

    #[tokio::test]
    async fn test_reported_total_kept_when_counts_fail() {
        let estimator = estimator(
            vec![
                FixedSource::new("counts", unauthorized),
                FixedSource::new("table", reported_total),
            ],
            FallbackMode::Error,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.source, EstimateSource::Upstream);
        assert_eq!(estimate.volume, Volume::new(40_500, 94_500));
        assert_eq!(estimate.web_total, 0);
    }

    #[tokio::test]
    async fn test_synthetic_estimate_carries_no_upstream_counts() {
        let estimator = estimator(
            vec![
                FixedSource::new("counts", unavailable),
                FixedSource::new("table", not_listed),
            ],
            FallbackMode::Synthetic,
        );

        let estimate = estimator.estimate("노트북", DeviceHint::All).await.unwrap();

        assert_eq!(estimate.source, EstimateSource::Estimated);
        assert_eq!(estimate.web_total, 0);
        assert_eq!(estimate.blog_total, 0);
        assert_eq!(estimate.monthly_blog_rate, 0);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config: Config = serde_yaml::from_str(
            r#"
naver: {}
keyword_table:
    url: "http://127.0.0.1:1/keyword.php"
"#,
        )
        .unwrap();
        let credentials = Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        };

        let estimator = VolumeEstimator::from_config(&config, &credentials).unwrap();
        assert_eq!(estimator.source_names(), vec!["naver_search", "keyword_table"]);

        let mut invalid = config.clone();
        invalid.fetch.max_attempts = 0;
        assert!(matches!(
            VolumeEstimator::from_config(&invalid, &credentials),
            Err(BuildError::Validation(ValidationError::ZeroAttempts))
        ));
    }
}
