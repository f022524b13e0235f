//! Metrics definitions for the estimator.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_ATTEMPTS: MetricDef = MetricDef {
    name: "upstream.attempts",
    metric_type: MetricType::Counter,
    description: "Outbound upstream attempts. Tagged with outcome.",
};

pub const UPSTREAM_RETRIES_EXHAUSTED: MetricDef = MetricDef {
    name: "upstream.retries_exhausted",
    metric_type: MetricType::Counter,
    description: "Upstream calls that failed on every allowed attempt",
};

pub const SOURCE_FAILURES: MetricDef = MetricDef {
    name: "source.failures",
    metric_type: MetricType::Counter,
    description: "Upstream sources that returned no signal for a keyword. Tagged with source.",
};

pub const SYNTHETIC_ESTIMATES: MetricDef = MetricDef {
    name: "estimate.synthetic",
    metric_type: MetricType::Counter,
    description: "Estimates synthesized because no upstream signal was available",
};

pub const ESTIMATE_DURATION: MetricDef = MetricDef {
    name: "estimate.duration",
    metric_type: MetricType::Histogram,
    description: "Time to estimate a single keyword in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UPSTREAM_ATTEMPTS,
    UPSTREAM_RETRIES_EXHAUSTED,
    SOURCE_FAILURES,
    SYNTHETIC_ESTIMATES,
    ESTIMATE_DURATION,
];
