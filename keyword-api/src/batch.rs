use crate::envelope::KeywordResult;
use crate::metrics_defs::BATCH_KEYWORDS;
use estimator::{DeviceHint, VolumeEstimator};
use shared::counter;
use std::sync::Arc;
use std::time::Duration;

/// Runs keywords through the estimator one at a time, in input order.
///
/// A failing keyword becomes an error entry; the rest of the batch still runs.
pub struct BatchRunner {
    estimator: Arc<VolumeEstimator>,
    delay: Duration,
}

impl BatchRunner {
    pub fn new(estimator: Arc<VolumeEstimator>, delay: Duration) -> Self {
        BatchRunner { estimator, delay }
    }

    pub async fn run(&self, keywords: &[String], device: DeviceHint) -> Vec<KeywordResult> {
        let mut results = Vec::with_capacity(keywords.len());

        for (index, keyword) in keywords.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = match self.estimator.estimate(keyword, device).await {
                Ok(estimate) => {
                    counter!(BATCH_KEYWORDS, "outcome" => "ok").increment(1);
                    KeywordResult::Estimate(estimate)
                }
                Err(e) => {
                    counter!(BATCH_KEYWORDS, "outcome" => "error").increment(1);
                    tracing::warn!(keyword = %keyword, error = %e, "Keyword estimate failed");
                    KeywordResult::Error {
                        keyword: keyword.clone(),
                        error: e.to_string(),
                    }
                }
            };
            results.push(result);
        }

        results
    }
}
