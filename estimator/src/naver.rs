use crate::config::Credentials;
use crate::fetch::{FetchError, ResilientFetch};
use crate::sources::{Signals, SourceError, UpstreamSource, Vertical};
use crate::types::{Device, DeviceHint};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::Deserialize;
use url::Url;

const SOURCE_NAME: &str = "naver_search";

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum NaverSetupError {
    #[error("credential is not a valid header value: {0}")]
    InvalidCredential(#[from] InvalidHeaderValue),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

fn search_path(vertical: Vertical) -> &'static str {
    match vertical {
        Vertical::Web => "v1/search/webkr.json",
        Vertical::Blog => "v1/search/blog.json",
        Vertical::News => "v1/search/news.json",
        Vertical::Cafe => "v1/search/cafearticle.json",
    }
}

/// Result counts from the Naver Open API search verticals.
///
/// One keyword costs one call per vertical and requested device. The calls
/// run concurrently; the source only fails when every one of them fails.
pub struct NaverSearchSource {
    // Indexed by `Vertical as usize`
    endpoints: [Url; 4],
    headers: HeaderMap,
    fetch: ResilientFetch,
}

impl NaverSearchSource {
    pub fn new(
        base_url: &Url,
        credentials: &Credentials,
        fetch: ResilientFetch,
    ) -> Result<Self, NaverSetupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Naver-Client-Id",
            HeaderValue::from_str(&credentials.client_id)?,
        );
        let mut secret = HeaderValue::from_str(&credentials.client_secret)?;
        secret.set_sensitive(true);
        headers.insert("X-Naver-Client-Secret", secret);

        let endpoint = |vertical| base_url.join(search_path(vertical));
        let endpoints = [
            endpoint(Vertical::Web)?,
            endpoint(Vertical::Blog)?,
            endpoint(Vertical::News)?,
            endpoint(Vertical::Cafe)?,
        ];

        Ok(NaverSearchSource {
            endpoints,
            headers,
            fetch,
        })
    }

    fn endpoint(&self, keyword: &str, vertical: Vertical, device: Device) -> Url {
        let mut url = self.endpoints[vertical as usize].clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("query", keyword)
                .append_pair("display", "1")
                .append_pair("start", "1");
            if device == Device::Mobile {
                query.append_pair("mobile", "true");
            }
        }
        url
    }

    async fn search_total(
        &self,
        keyword: &str,
        vertical: Vertical,
        device: Device,
    ) -> (Vertical, Device, Result<u64, FetchError>) {
        let url = self.endpoint(keyword, vertical, device);
        let result = self
            .fetch
            .get_json::<SearchResponse>(&url, &self.headers)
            .await
            .map(|response| response.total);
        (vertical, device, result)
    }
}

#[async_trait]
impl UpstreamSource for NaverSearchSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, keyword: &str, device: DeviceHint) -> Result<Signals, SourceError> {
        let calls = device.devices().iter().flat_map(move |device| {
            Vertical::ALL
                .iter()
                .map(move |vertical| self.search_total(keyword, *vertical, *device))
        });
        let results = join_all(calls).await;

        let mut signals = Signals::default();
        let mut failures = Vec::new();

        for (vertical, device, result) in results {
            match result {
                Ok(total) => signals.record_count(vertical, device, total),
                Err(e) => {
                    tracing::warn!(
                        keyword,
                        vertical = vertical.as_str(),
                        device = device.as_str(),
                        error = %e,
                        "Search vertical failed"
                    );
                    failures.push(e);
                }
            }
        }

        if signals.has_counts() {
            return Ok(signals);
        }

        if !failures.is_empty() && failures.iter().all(FetchError::is_unauthorized) {
            return Err(SourceError::Unauthorized(SOURCE_NAME));
        }

        Err(SourceError::Unavailable {
            source_name: SOURCE_NAME,
            message: failures
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no verticals queried".to_string()),
        })
    }
}
