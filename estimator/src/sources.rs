use crate::types::{Device, DeviceHint};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Search verticals whose result counts feed the volume estimate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vertical {
    Web,
    Blog,
    News,
    Cafe,
}

impl Vertical {
    pub const ALL: [Vertical; 4] = [Vertical::Web, Vertical::Blog, Vertical::News, Vertical::Cafe];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Vertical::Web => "web",
            Vertical::Blog => "blog",
            Vertical::News => "news",
            Vertical::Cafe => "cafe",
        }
    }
}

/// Raw signal gathered for one keyword.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signals {
    counts: BTreeMap<(Vertical, Device), u64>,
    reported_total: Option<u64>,
}

impl Signals {
    pub fn record_count(&mut self, vertical: Vertical, device: Device, total: u64) {
        self.counts.insert((vertical, device), total);
    }

    /// Result count for one vertical and device, zero when nothing was recorded.
    pub fn count(&self, vertical: Vertical, device: Device) -> u64 {
        self.counts.get(&(vertical, device)).copied().unwrap_or(0)
    }

    pub fn vertical_total(&self, vertical: Vertical) -> u64 {
        self.counts
            .iter()
            .filter(|((v, _), _)| *v == vertical)
            .map(|(_, count)| *count)
            .fold(0, u64::saturating_add)
    }

    pub fn has_counts(&self) -> bool {
        !self.counts.is_empty()
    }

    pub fn set_reported_total(&mut self, total: u64) {
        self.reported_total = Some(total);
    }

    /// Monthly total reported directly by a source, if any
    pub fn reported_total(&self) -> Option<u64> {
        self.reported_total
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.reported_total.is_none()
    }

    /// Folds `other` into `self`. Later values win on conflict.
    pub fn merge(&mut self, other: Signals) {
        self.counts.extend(other.counts);
        if other.reported_total.is_some() {
            self.reported_total = other.reported_total;
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("{0}: upstream rejected the credentials")]
    Unauthorized(&'static str),

    #[error("{source_name}: {message}")]
    Unavailable {
        source_name: &'static str,
        message: String,
    },

    #[error("{0}: keyword not listed")]
    NotListed(&'static str),
}

/// Anything that can supply raw signal for a keyword: a search API, a
/// trends API or a scraped page.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, keyword: &str, device: DeviceHint) -> Result<Signals, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_totals() {
        let mut signals = Signals::default();
        assert!(signals.is_empty());

        signals.record_count(Vertical::Blog, Device::Pc, 3000);
        signals.record_count(Vertical::Blog, Device::Mobile, 2000);
        signals.record_count(Vertical::Web, Device::Pc, 12000);

        assert!(!signals.is_empty());
        assert_eq!(signals.count(Vertical::Blog, Device::Pc), 3000);
        assert_eq!(signals.count(Vertical::News, Device::Pc), 0);
        assert_eq!(signals.vertical_total(Vertical::Blog), 5000);
        assert_eq!(signals.vertical_total(Vertical::Cafe), 0);
    }

    #[test]
    fn test_merge() {
        let mut counts = Signals::default();
        counts.record_count(Vertical::Web, Device::Pc, 10);

        let mut reported = Signals::default();
        reported.set_reported_total(500);
        reported.record_count(Vertical::Web, Device::Pc, 20);

        counts.merge(reported);
        assert_eq!(counts.count(Vertical::Web, Device::Pc), 20);
        assert_eq!(counts.reported_total(), Some(500));

        counts.merge(Signals::default());
        assert_eq!(counts.reported_total(), Some(500));
    }
}
