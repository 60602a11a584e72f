//! Parallel fan-out of generation batches.
//!
//! RULE: workers share nothing mutable. A task sees its Batch descriptor
//! and an immutable reference snapshot, and returns owned rows.
//! Any failing or panicking task fails the whole stage; there is no
//! partial-stage checkpoint.

use crate::{
    error::{SeedError, SeedResult},
    partition::Batch,
};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub struct FanOut {
    pool: rayon::ThreadPool,
}

impl FanOut {
    /// Build a dedicated worker pool. `workers == 0` means one per core.
    pub fn new(workers: usize) -> SeedResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("seed-worker-{i}"))
            .build()
            .map_err(|e| SeedError::config(format!("cannot build worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` for every batch on the pool and concatenate the results
    /// in partition order.
    pub fn run<T, F>(&self, stage: &'static str, batches: &[Batch], task: F) -> SeedResult<Vec<T>>
    where
        T: Send,
        F: Fn(&Batch) -> SeedResult<Vec<T>> + Sync,
    {
        let per_batch: Vec<Vec<T>> = self.pool.install(|| {
            batches
                .par_iter()
                .map(|batch| -> SeedResult<Vec<T>> {
                    let rows = panic::catch_unwind(AssertUnwindSafe(|| task(batch))).map_err(
                        |payload| SeedError::Worker {
                            stage,
                            batch: batch.index,
                            message: panic_message(payload.as_ref()),
                        },
                    )??;
                    log::debug!(
                        "{stage}: batch {} generated {} rows [{}, {})",
                        batch.index,
                        rows.len(),
                        batch.start,
                        batch.end()
                    );
                    Ok(rows)
                })
                .collect::<SeedResult<Vec<_>>>()
        })?;

        let total = per_batch.iter().map(Vec::len).sum();
        let mut rows = Vec::with_capacity(total);
        for batch_rows in per_batch {
            rows.extend(batch_rows);
        }
        Ok(rows)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
