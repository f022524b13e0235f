use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, route.",
};

pub const BATCH_KEYWORDS: MetricDef = MetricDef {
    name: "batch.keywords",
    metric_type: MetricType::Counter,
    description: "Keywords processed by the batch runner. Tagged with outcome.",
};

pub const REJECTED_REQUESTS: MetricDef = MetricDef {
    name: "requests.rejected",
    metric_type: MetricType::Counter,
    description: "Requests rejected before any upstream call. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, BATCH_KEYWORDS, REJECTED_REQUESTS];
