//! Search volume estimation for keywords.
//!
//! A [`VolumeEstimator`] asks each configured [`UpstreamSource`] for raw
//! signal about a keyword, turns the merged [`Signals`] into PC and mobile
//! volumes with a [`ScoringStrategy`], and derives the qualitative labels
//! shown next to the numbers. Outbound calls go through [`ResilientFetch`].

pub mod config;
pub mod estimator;
pub mod fetch;
pub mod keyword_table;
pub mod labels;
pub mod metrics_defs;
pub mod naver;
pub mod scoring;
pub mod sources;
pub mod synthetic;
pub mod types;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use estimator::{BuildError, EstimateError, VolumeEstimator};
pub use fetch::{FetchError, ResilientFetch, RetryPolicy};
pub use scoring::ScoringStrategy;
pub use sources::{Signals, SourceError, UpstreamSource};
pub use types::{Device, DeviceHint, EstimateSource, UnknownDevice, Volume, VolumeEstimate};
