//! Roulette-wheel selection over weighted entries.

use anyhow::{bail, Result};
use rand::Rng;

/// Index of the first entry whose cumulative weight exceeds `roll`.
///
/// With weights `[10, 30, 60]` the thresholds are 10, 40 and 100: a roll
/// of 45 lands in the third band. `None` when `roll` is at or past the
/// total weight.
pub fn weighted_index(weights: impl IntoIterator<Item = f64>, roll: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    for (i, weight) in weights.into_iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return Some(i);
        }
    }
    None
}

/// Draw one entry with probability proportional to its weight.
///
/// Fails on an empty pool or a non-positive total weight; callers are
/// expected to validate their pools up front.
pub fn pick_weighted<'a, T, R, F>(rng: &mut R, entries: &'a [T], weight: F) -> Result<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    if entries.is_empty() {
        bail!("weighted draw over an empty pool");
    }
    let total: f64 = entries.iter().map(&weight).sum();
    if !total.is_finite() || total <= 0.0 {
        bail!("weighted draw with invalid total weight {total}");
    }
    let roll = rng.random_range(0.0..total);
    match weighted_index(entries.iter().map(&weight), roll) {
        Some(i) => Ok(&entries[i]),
        // Float accumulation can land the roll a hair past the last bound.
        None => Ok(&entries[entries.len() - 1]),
    }
}

/// One Bernoulli trial with probability `chance`, clamped to `[0, 1]`.
pub fn hit_chance<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.random_bool(chance.clamp(0.0, 1.0))
}
