//! Record generators.
//!
//! RULE: Generators are pure. They never touch the store, never hold
//! mutable shared state, and draw every random value from the BatchRng
//! they are handed. A generator is built once per stage from an immutable
//! reference snapshot and then shared by reference across all workers.
//!
//! Row order inside a batch follows the batch's global offsets, and the
//! executor concatenates batches in partition order, so the loaded table
//! order is independent of which worker ran which batch.

mod customer;
mod payment;
mod purchase;
mod service;

pub use customer::{CustomerGenerator, CustomerRow};
pub use payment::{PaymentGenerator, PaymentRow};
pub use purchase::{PurchaseGenerator, PurchaseRow};
pub use service::{classify, generate_services, price_range, ServiceRow};

use crate::{
    config::PopulationConfig,
    error::SeedResult,
    loader::LoadRow,
    partition::Batch,
    rng::{BatchRng, StageSlot},
};
use chrono::{Duration, NaiveDateTime, SubsecRound};

/// One batched stage's row producer.
pub trait RecordGenerator: Sync {
    type Row: LoadRow;

    /// Selects the RNG stream family for this stage.
    const STAGE: StageSlot;

    /// Produce exactly `batch.count` rows.
    fn generate(&self, batch: &Batch, rng: &mut BatchRng) -> SeedResult<Vec<Self::Row>>;
}

/// Run-wide clock and date rules shared by every dated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// Captured once per run, truncated to microseconds.
    pub now: NaiveDateTime,
    pub window_days: u32,
    pub recurring_term_days: u32,
}

impl Timeline {
    pub fn new(now: NaiveDateTime, window_days: u32, recurring_term_days: u32) -> Self {
        Self {
            now: now.trunc_subsecs(6),
            window_days,
            recurring_term_days,
        }
    }

    pub fn from_config(now: NaiveDateTime, config: &PopulationConfig) -> Self {
        Self::new(now, config.activity_window_days, config.recurring_term_days)
    }

    /// `now` minus a uniform 1..=window_days whole days. Time of day is kept.
    pub fn past_date(&self, rng: &mut BatchRng) -> NaiveDateTime {
        let days = rng.next_in_range(1, u64::from(self.window_days));
        self.now - Duration::days(days as i64)
    }

    pub fn term_end(&self, start: NaiveDateTime) -> NaiveDateTime {
        start + Duration::days(i64::from(self.recurring_term_days))
    }
}
