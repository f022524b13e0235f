//! Placeholder volumes for keywords no upstream knows about.
//!
//! Shorter keywords tend to be broader and get a larger base. The result is
//! jittered so repeated lookups do not look like real, stable data.

use crate::types::Volume;
use rand::Rng;

const MAX_LENGTH: usize = 20;
const MIN_BASE: f64 = 500.0;
const LENGTH_RANGE: f64 = 20_000.0;
const PC_SHARE: f64 = 0.3;

/// Base volume before jitter, from the keyword length in characters.
pub fn base_volume(keyword: &str) -> f64 {
    let length = keyword.chars().count().min(MAX_LENGTH - 1);
    let factor = (MAX_LENGTH - length) as f64 / MAX_LENGTH as f64;
    MIN_BASE + factor * LENGTH_RANGE
}

pub fn synthetic_volume<R: Rng + ?Sized>(keyword: &str, rng: &mut R) -> Volume {
    let jitter = rng.random_range(0.7..=1.3);
    let total = (base_volume(keyword) * jitter).round() as u64;
    let pc = (total as f64 * PC_SHARE).round() as u64;
    Volume::new(pc, total - pc)
}
