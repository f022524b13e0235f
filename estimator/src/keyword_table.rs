use crate::fetch::ResilientFetch;
use crate::sources::{Signals, SourceError, UpstreamSource};
use crate::types::DeviceHint;
use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

const SOURCE_NAME: &str = "keyword_table";

/// Monthly totals scraped from a third-party keyword table page.
///
/// The page takes a `keyword` form post and renders an HTML table whose
/// rows are `keyword | search volume | competition | ...`, with a header row
/// first. Only the row for the requested keyword is used.
pub struct KeywordTableSource {
    url: Url,
    fetch: ResilientFetch,
}

impl KeywordTableSource {
    pub fn new(url: Url, fetch: ResilientFetch) -> Self {
        KeywordTableSource { url, fetch }
    }
}

#[async_trait]
impl UpstreamSource for KeywordTableSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    // The table has no device split, so the hint is applied later by scoring.
    async fn fetch(&self, keyword: &str, _device: DeviceHint) -> Result<Signals, SourceError> {
        let html = self
            .fetch
            .post_form_text(&self.url, &[("keyword", keyword)])
            .await
            .map_err(|e| match e.is_unauthorized() {
                true => SourceError::Unauthorized(SOURCE_NAME),
                false => SourceError::Unavailable {
                    source_name: SOURCE_NAME,
                    message: e.to_string(),
                },
            })?;

        let total = find_search_volume(&html, keyword)?.ok_or(SourceError::NotListed(SOURCE_NAME))?;
        tracing::debug!(keyword, total, "Found keyword in table");

        let mut signals = Signals::default();
        signals.set_reported_total(total);
        Ok(signals)
    }
}

/// Looks up the search volume column of the row whose first cell is `keyword`.
fn find_search_volume(html: &str, keyword: &str) -> Result<Option<u64>, SourceError> {
    let selector = |css: &str| {
        Selector::parse(css).map_err(|e| SourceError::Unavailable {
            source_name: SOURCE_NAME,
            message: format!("invalid selector {css}: {e}"),
        })
    };
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let document = Html::parse_document(html);
    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    // First row is the header.
    for row in table.select(&row_selector).skip(1) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        let [name, volume, ..] = cells.as_slice() else {
            continue;
        };
        if name != keyword {
            continue;
        }

        return Ok(parse_count(volume));
    }

    Ok(None)
}

/// Parses counts rendered as "12,300" or "< 10". Non-digits are dropped.
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
