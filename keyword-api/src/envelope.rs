use crate::errors::RequestError;
use estimator::{DeviceHint, VolumeEstimate};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome for one keyword of a batch, in input position.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeywordResult {
    Estimate(VolumeEstimate),
    Error { keyword: String, error: String },
}

impl KeywordResult {
    pub fn keyword(&self) -> &str {
        match self {
            KeywordResult::Estimate(estimate) => &estimate.keyword,
            KeywordResult::Error { keyword, .. } => keyword,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, KeywordResult::Error { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Serialize)]
pub struct ResultEnvelope {
    pub status: Status,
    pub count: usize,
    pub keywords: Vec<String>,
    pub device: DeviceHint,
    pub results: Vec<KeywordResult>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl ResultEnvelope {
    pub fn success(keywords: Vec<String>, device: DeviceHint, results: Vec<KeywordResult>) -> Self {
        ResultEnvelope {
            status: Status::Success,
            count: results.len(),
            keywords,
            device,
            results,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_keywords: Vec<String>,
}

impl From<&RequestError> for ErrorBody {
    fn from(error: &RequestError) -> Self {
        ErrorBody {
            status: Status::Error,
            message: error.public_message(),
            invalid_keywords: error.invalid_keywords().to_vec(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
