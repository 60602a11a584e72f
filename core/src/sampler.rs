//! Categorical sampling over explicit weight vectors.
//!
//! Weights are normalized exactly once, into a cumulative table, when the
//! sampler is built. A draw is one uniform roll plus a binary search, so the
//! per-row cost stays flat at tens of millions of rows.

use crate::{
    error::{SeedError, SeedResult},
    rng::BatchRng,
};

#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    values: Vec<T>,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Uniform,
    /// Normalized cumulative weights; entries from the last positive
    /// weight onward are pinned to exactly 1.0.
    Cumulative(Vec<f64>),
}

impl<T> WeightedSampler<T> {
    /// P(values[i]) = weights[i] / sum(weights).
    pub fn new(values: Vec<T>, weights: &[f64]) -> SeedResult<Self> {
        if values.len() != weights.len() {
            return Err(SeedError::config(format!(
                "sampler has {} values but {} weights",
                values.len(),
                weights.len()
            )));
        }
        if values.is_empty() {
            return Err(SeedError::config("sampler needs at least one value"));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(SeedError::config(format!(
                "sampler weights must be finite and non-negative, got {bad}"
            )));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(SeedError::config("sampler weights are all zero"));
        }

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut running = 0.0;
        for w in weights {
            running += w / total;
            cumulative.push(running);
        }
        // Rounding can leave the tail at 0.99999...; pin it so every roll
        // in [0, 1) lands on a positive-weight entry.
        let last_positive = weights.iter().rposition(|w| *w > 0.0).unwrap_or(0);
        for c in &mut cumulative[last_positive..] {
            *c = 1.0;
        }

        Ok(Self {
            values,
            kind: Kind::Cumulative(cumulative),
        })
    }

    /// Every value equally likely.
    pub fn uniform(values: Vec<T>) -> SeedResult<Self> {
        if values.is_empty() {
            return Err(SeedError::config("sampler needs at least one value"));
        }
        Ok(Self {
            values,
            kind: Kind::Uniform,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Normalized probability of index `i`.
    pub fn probability(&self, i: usize) -> f64 {
        match &self.kind {
            Kind::Uniform => 1.0 / self.values.len() as f64,
            Kind::Cumulative(cumulative) => {
                let prev = if i == 0 { 0.0 } else { cumulative[i - 1] };
                cumulative[i] - prev
            }
        }
    }

    pub fn sample_index(&self, rng: &mut BatchRng) -> usize {
        match &self.kind {
            Kind::Uniform => rng.next_index(self.values.len()),
            Kind::Cumulative(cumulative) => {
                let roll = rng.next_f64();
                cumulative
                    .partition_point(|c| *c <= roll)
                    .min(self.values.len() - 1)
            }
        }
    }

    pub fn sample(&self, rng: &mut BatchRng) -> &T {
        &self.values[self.sample_index(rng)]
    }

    pub fn sample_n(&self, rng: &mut BatchRng, n: usize) -> Vec<&T> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl<T: Copy> WeightedSampler<T> {
    pub fn draw(&self, rng: &mut BatchRng) -> T {
        *self.sample(rng)
    }
}
