//! Turning raw upstream signal into device volumes.

use crate::config::{ScoringConfig, VerticalWeights};
use crate::sources::{Signals, Vertical};
use crate::types::{Device, DeviceHint, Volume};

/// Maps merged signals to a volume. Returns `None` when the signals carry
/// nothing this strategy can score.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, signals: &Signals, device: DeviceHint) -> Option<Volume>;
}

/// Builds the configured strategy, backed by its complement so that any
/// signal a source returned can be scored.
pub fn from_config(config: &ScoringConfig) -> Box<dyn ScoringStrategy> {
    Box::new(ScoringChain {
        strategies: vec![strategy(config), strategy(&config.complement())],
    })
}

fn strategy(config: &ScoringConfig) -> Box<dyn ScoringStrategy> {
    match config {
        ScoringConfig::WeightedCounts {
            weights,
            scale,
            cap,
        } => Box::new(WeightedCounts {
            weights: weights.clone(),
            scale: *scale,
            cap: *cap,
        }),
        ScoringConfig::ReportedVolume { pc_share } => Box::new(ReportedVolume {
            pc_share: *pc_share,
        }),
    }
}

/// Strategies tried in order. The first one that scores wins.
pub struct ScoringChain {
    strategies: Vec<Box<dyn ScoringStrategy>>,
}

impl ScoringStrategy for ScoringChain {
    fn name(&self) -> &'static str {
        self.strategies
            .first()
            .map_or("none", |strategy| strategy.name())
    }

    fn score(&self, signals: &Signals, device: DeviceHint) -> Option<Volume> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.score(signals, device))
    }
}

/// Weighted sum of vertical result counts, scaled and capped per device.
///
/// This is a proxy for search demand, not a measurement of it.
#[derive(Clone, Debug)]
pub struct WeightedCounts {
    pub weights: VerticalWeights,
    pub scale: f64,
    pub cap: u64,
}

impl WeightedCounts {
    fn weight(&self, vertical: Vertical) -> f64 {
        match vertical {
            Vertical::Web => self.weights.web,
            Vertical::Blog => self.weights.blog,
            Vertical::News => self.weights.news,
            Vertical::Cafe => self.weights.cafe,
        }
    }

    fn device_volume(&self, signals: &Signals, device: Device) -> u64 {
        let raw: f64 = Vertical::ALL
            .iter()
            .map(|vertical| signals.count(*vertical, device) as f64 * self.weight(*vertical))
            .sum();

        ((raw * self.scale).round() as u64).min(self.cap)
    }
}

impl ScoringStrategy for WeightedCounts {
    fn name(&self) -> &'static str {
        "weighted_counts"
    }

    fn score(&self, signals: &Signals, device: DeviceHint) -> Option<Volume> {
        if !signals.has_counts() {
            return None;
        }

        let volume = Volume::new(
            self.device_volume(signals, Device::Pc),
            self.device_volume(signals, Device::Mobile),
        );
        Some(volume.restrict_to(device))
    }
}

/// Uses a monthly total reported by a source and splits it by device share.
#[derive(Clone, Debug)]
pub struct ReportedVolume {
    pub pc_share: f64,
}

impl ScoringStrategy for ReportedVolume {
    fn name(&self) -> &'static str {
        "reported_volume"
    }

    fn score(&self, signals: &Signals, device: DeviceHint) -> Option<Volume> {
        let total = signals.reported_total()?;
        let pc = ((total as f64 * self.pc_share).round() as u64).min(total);
        Some(Volume::new(pc, total - pc).restrict_to(device))
    }
}
