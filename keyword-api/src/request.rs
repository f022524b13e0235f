//! Parsing and validation of incoming keyword requests.
//!
//! Keywords arrive as a JSON array, a comma-delimited string (JSON or query
//! string) or the legacy `DataQ` field. Every form ends up as the same
//! validated [`KeywordRequest`] before any upstream call is made.

use crate::config::Limits;
use crate::errors::RequestError;
use estimator::DeviceHint;
use serde::Deserialize;

const FORBIDDEN: &[char] = &['\'', '"', '\\'];
const DELIMITER: char = ',';

/// A validated, ordered keyword list. Duplicates are kept.
#[derive(Clone, Debug, PartialEq)]
pub struct KeywordRequest {
    keywords: Vec<String>,
    device: DeviceHint,
}

impl KeywordRequest {
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn device(&self) -> DeviceHint {
        self.device
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordList {
    Many(Vec<String>),
    Delimited(String),
}

#[derive(Deserialize)]
struct KeywordPayload {
    #[serde(default)]
    keywords: Option<KeywordList>,
    #[serde(rename = "DataQ", default)]
    data_q: Option<String>,
    #[serde(default)]
    device: DeviceHint,
}

#[derive(Deserialize)]
struct RelatedPayload {
    keyword: String,
}

/// Parses a `POST /api/keywords` JSON body.
pub fn from_json(body: &[u8], limits: &Limits) -> Result<KeywordRequest, RequestError> {
    let payload: KeywordPayload =
        serde_json::from_slice(body).map_err(|e| RequestError::InvalidBody(e.to_string()))?;

    let candidates = match (payload.keywords, payload.data_q) {
        (Some(KeywordList::Many(keywords)), _) => Candidates::Elements(keywords),
        (Some(KeywordList::Delimited(joined)), _) | (None, Some(joined)) => {
            Candidates::Delimited(joined)
        }
        (None, None) => Candidates::Elements(Vec::new()),
    };

    validate(candidates, payload.device, limits)
}

/// Parses the `keyword` and `device` parameters of a `GET /api/keywords` query.
pub fn from_query(query: Option<&str>, limits: &Limits) -> Result<KeywordRequest, RequestError> {
    let mut joined = String::new();
    let mut device = DeviceHint::default();

    for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match name.as_ref() {
            "keyword" => joined = value.into_owned(),
            "device" => {
                device = value
                    .parse()
                    .map_err(|e: estimator::UnknownDevice| RequestError::InvalidBody(e.to_string()))?
            }
            _ => {}
        }
    }

    validate(Candidates::Delimited(joined), device, limits)
}

/// Parses a `POST /api/related-keywords` body into its single seed keyword.
pub fn related_seed(body: &[u8]) -> Result<String, RequestError> {
    let payload: RelatedPayload =
        serde_json::from_slice(body).map_err(|e| RequestError::InvalidBody(e.to_string()))?;

    let keyword = payload.keyword.trim();
    if keyword.is_empty() {
        return Err(RequestError::NoKeywords);
    }
    if has_forbidden(keyword, true) {
        return Err(RequestError::ForbiddenCharacters(vec![keyword.to_string()]));
    }
    Ok(keyword.to_string())
}

enum Candidates {
    /// Array elements, where a comma is not allowed
    Elements(Vec<String>),
    Delimited(String),
}

fn validate(
    candidates: Candidates,
    device: DeviceHint,
    limits: &Limits,
) -> Result<KeywordRequest, RequestError> {
    let (keywords, comma_forbidden): (Vec<String>, bool) = match candidates {
        Candidates::Elements(elements) => (clean(elements), true),
        Candidates::Delimited(joined) => (
            clean(joined.split(DELIMITER).map(str::to_string).collect()),
            false,
        ),
    };

    if keywords.is_empty() {
        return Err(RequestError::NoKeywords);
    }

    if keywords.len() > limits.max_keywords {
        return Err(RequestError::TooManyKeywords {
            count: keywords.len(),
            max: limits.max_keywords,
        });
    }

    let invalid: Vec<String> = keywords
        .iter()
        .filter(|keyword| has_forbidden(keyword, comma_forbidden))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(RequestError::ForbiddenCharacters(invalid));
    }

    Ok(KeywordRequest { keywords, device })
}

fn clean(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn has_forbidden(keyword: &str, comma_forbidden: bool) -> bool {
    keyword
        .chars()
        .any(|c| FORBIDDEN.contains(&c) || (comma_forbidden && c == DELIMITER))
}
