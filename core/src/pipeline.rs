//! Population pipeline orchestrator.
//!
//! STAGE ORDER (fixed, enforced by PipelineState):
//!   1. Clear      wipe all tables, reset id sequences
//!   2. Customers  batched, parallel generation
//!   3. Services   the catalog, generated in one piece
//!   4. Purchases  batched; needs customer ids + service refs
//!   5. Payments   batched; needs customer ids + purchase refs
//!   6. Verify     counts, popularity, sampled integrity checks
//!
//! RULES:
//!   - A stage runs only from the state its predecessor left behind.
//!   - Reference snapshots are fetched from the store after the producing
//!     stage committed, never carried over from generation.
//!   - Generation fans out; loading is sequential, one chunk at a time.
//!   - Any stage failure aborts the run. Chunks already committed stay.

use crate::{
    config::PopulationConfig,
    error::{SeedError, SeedResult},
    executor::FanOut,
    generator::{
        generate_services, CustomerGenerator, PaymentGenerator, PurchaseGenerator,
        RecordGenerator, Timeline,
    },
    loader::{BulkLoader, LoadStrategy, LoadSummary},
    partition::partition,
    rng::{SeedBank, StageSlot},
    store::{PaymentSampleCheck, ServicePopularity, Store, TableCounts, TermCheck},
    types::{RowId, RunId},
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Pending,
    Cleared,
    CustomersLoaded,
    ServicesLoaded,
    PurchasesLoaded,
    PaymentsLoaded,
    Verified,
}

// ── Reports ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage:        &'static str,
    pub table:        &'static str,
    pub rows:         usize,
    pub batches:      usize,
    pub chunks:       usize,
    pub elapsed_secs: f64,
}

impl StageReport {
    fn skipped(slot: StageSlot, table: &'static str) -> Self {
        Self {
            stage: slot.name(),
            table,
            rows: 0,
            batches: 0,
            chunks: 0,
            elapsed_secs: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub counts:     TableCounts,
    pub popularity: Vec<ServicePopularity>,
    pub payments:   PaymentSampleCheck,
    pub terms:      TermCheck,
}

impl VerificationReport {
    /// Every sampled payment carries its service price and every sampled
    /// purchase has the right end_date.
    pub fn is_consistent(&self) -> bool {
        self.payments.correct_amounts == self.payments.sampled && self.terms.violations == 0
    }

    /// Fraction of sampled payments made by the purchase's own customer.
    pub fn same_customer_share(&self) -> f64 {
        if self.payments.sampled == 0 {
            return 0.0;
        }
        self.payments.matching_customers as f64 / self.payments.sampled as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationReport {
    pub run_id:       RunId,
    pub seed:         u64,
    pub strategy:     LoadStrategy,
    pub workers:      usize,
    pub stages:       Vec<StageReport>,
    pub verification: Option<VerificationReport>,
    pub elapsed_secs: f64,
}

// ── Pipeline ─────────────────────────────────────────────────────

pub struct Pipeline {
    pub run_id:   RunId,
    config:       PopulationConfig,
    store:        Store,
    executor:     FanOut,
    loader:       BulkLoader,
    seeds:        SeedBank,
    timeline:     Timeline,
    state:        PipelineState,
    stages:       Vec<StageReport>,
    verification: Option<VerificationReport>,
    started:      Instant,
}

impl Pipeline {
    /// Validate the config, open and migrate the store, and build the
    /// worker pool. "Now" for every generated date is captured here.
    pub fn new(config: PopulationConfig) -> SeedResult<Self> {
        Self::with_now(config, Utc::now().naive_utc())
    }

    /// Like `new`, with a fixed reference time. Two pipelines with the
    /// same config and `now` generate identical rows.
    pub fn with_now(config: PopulationConfig, now: NaiveDateTime) -> SeedResult<Self> {
        config.validate()?;
        let store = Store::open(&config.store)?;
        store.migrate()?;
        let executor = FanOut::new(config.workers)?;
        let loader = BulkLoader::new(config.load_strategy, config.batch_size)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "[{run_id}] pipeline ready: db={} strategy={:?} workers={} seed={}",
            store.path(),
            loader.strategy(),
            executor.workers(),
            config.seed
        );
        Ok(Self {
            seeds: SeedBank::new(config.seed),
            timeline: Timeline::from_config(now, &config),
            config,
            store,
            executor,
            loader,
            state: PipelineState::Pending,
            stages: Vec::new(),
            verification: None,
            started: Instant::now(),
            run_id,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// Run every stage in order and return the full report.
    pub fn run(&mut self) -> SeedResult<PopulationReport> {
        self.clear()?;
        self.load_customers()?;
        self.load_services()?;
        self.load_purchases()?;
        self.load_payments()?;
        self.verify()?;
        let report = self.report();
        log::info!(
            "[{}] population finished in {:.2}s",
            self.run_id,
            report.elapsed_secs
        );
        Ok(report)
    }

    pub fn report(&self) -> PopulationReport {
        PopulationReport {
            run_id: self.run_id.clone(),
            seed: self.seeds.master_seed(),
            strategy: self.loader.strategy(),
            workers: self.executor.workers(),
            stages: self.stages.clone(),
            verification: self.verification.clone(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    // ── Stages ────────────────────────────────────────────────────

    pub fn clear(&mut self) -> SeedResult<()> {
        self.expect_state("clear", PipelineState::Pending)?;
        self.store.clear()?;
        self.state = PipelineState::Cleared;
        Ok(())
    }

    pub fn load_customers(&mut self) -> SeedResult<&StageReport> {
        self.expect_state("customers", PipelineState::Cleared)?;
        let generator = CustomerGenerator::new()?;
        let report = self.logged(StageSlot::Customers, |p| {
            p.fan_out_and_load(&generator, p.config.targets.customers)
        })?;
        self.finish_stage(report, PipelineState::CustomersLoaded)
    }

    pub fn load_services(&mut self) -> SeedResult<&StageReport> {
        self.expect_state("services", PipelineState::CustomersLoaded)?;
        let report = self.logged(StageSlot::Services, |p| {
            let started = Instant::now();
            let mut rng = p.seeds.for_batch(StageSlot::Services, 0);
            let rows = generate_services(&p.config.catalog, &mut rng)?;
            let summary = p.loader.load(&p.store, &rows)?;
            Ok(stage_report(StageSlot::Services, 1, summary, started))
        })?;
        self.finish_stage(report, PipelineState::ServicesLoaded)
    }

    pub fn load_purchases(&mut self) -> SeedResult<&StageReport> {
        self.expect_state("purchases", PipelineState::ServicesLoaded)?;
        let report = self.logged(StageSlot::Purchases, |p| {
            let target = p.config.targets.purchases;
            if target == 0 {
                return Ok(StageReport::skipped(StageSlot::Purchases, "purchases"));
            }
            let customers = p.fetch_customer_ids()?;
            let services = p.store.service_refs(p.config.fetch_page_size)?;
            let generator =
                PurchaseGenerator::new(customers, &services, &p.config.catalog, p.timeline)?;
            p.fan_out_and_load(&generator, target)
        })?;
        self.finish_stage(report, PipelineState::PurchasesLoaded)
    }

    pub fn load_payments(&mut self) -> SeedResult<&StageReport> {
        self.expect_state("payments", PipelineState::PurchasesLoaded)?;
        let report = self.logged(StageSlot::Payments, |p| {
            let target = p.config.targets.payments;
            if target == 0 {
                return Ok(StageReport::skipped(StageSlot::Payments, "payments"));
            }
            let purchases = p.store.purchase_refs(p.config.fetch_page_size)?;
            let customers = p.fetch_customer_ids()?;
            let generator = PaymentGenerator::new(
                customers,
                Arc::from(purchases),
                p.config.same_customer_rate,
                p.timeline,
            )?;
            p.fan_out_and_load(&generator, target)
        })?;
        self.finish_stage(report, PipelineState::PaymentsLoaded)
    }

    pub fn verify(&mut self) -> SeedResult<&VerificationReport> {
        self.expect_state("verify", PipelineState::PaymentsLoaded)?;
        let sample = self.config.verify_sample;
        let report = VerificationReport {
            counts: self.store.table_counts()?,
            popularity: self.store.service_popularity()?,
            payments: self.store.check_payment_sample(sample)?,
            terms: self
                .store
                .check_purchase_terms(sample, self.config.recurring_term_days)?,
        };

        log::info!(
            "[{}] verify: {} customers, {} services, {} purchases, {} payments",
            self.run_id,
            report.counts.customers,
            report.counts.services,
            report.counts.purchases,
            report.counts.payments
        );
        if !report.is_consistent() {
            log::warn!(
                "[{}] verify: {}/{} payment amounts match, {} purchase term violations",
                self.run_id,
                report.payments.correct_amounts,
                report.payments.sampled,
                report.terms.violations
            );
        }

        self.state = PipelineState::Verified;
        Ok(self.verification.insert(report))
    }

    // ── Internals ─────────────────────────────────────────────────

    fn expect_state(&self, stage: &'static str, expected: PipelineState) -> SeedResult<()> {
        if self.state != expected {
            return Err(SeedError::InvalidTransition {
                stage,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn fetch_customer_ids(&self) -> SeedResult<Arc<[RowId]>> {
        Ok(self.store.customer_ids(self.config.fetch_page_size)?.into())
    }

    /// Partition `target`, generate every batch on the pool with its own
    /// RNG stream, then load the concatenated rows.
    fn fan_out_and_load<G: RecordGenerator>(
        &self,
        generator: &G,
        target: usize,
    ) -> SeedResult<StageReport> {
        let started = Instant::now();
        let batches = partition(target, self.config.batch_size)?;
        let seeds = &self.seeds;
        let rows = self.executor.run(G::STAGE.name(), &batches, |batch| {
            let mut rng = seeds.for_batch(G::STAGE, batch.index);
            generator.generate(batch, &mut rng)
        })?;
        log::debug!(
            "[{}] {}: generated {} rows in {:.2}s",
            self.run_id,
            G::STAGE.name(),
            rows.len(),
            started.elapsed().as_secs_f64()
        );
        let summary = self.loader.load(&self.store, &rows)?;
        Ok(stage_report(G::STAGE, batches.len(), summary, started))
    }

    fn logged<F>(&self, slot: StageSlot, stage: F) -> SeedResult<StageReport>
    where
        F: FnOnce(&Self) -> SeedResult<StageReport>,
    {
        log::info!("[{}] {}: starting", self.run_id, slot.name());
        stage(self).map_err(|e| {
            log::error!("[{}] {}: aborted: {e}", self.run_id, slot.name());
            e
        })
    }

    fn finish_stage(&mut self, report: StageReport, next: PipelineState) -> SeedResult<&StageReport> {
        log::info!(
            "[{}] {}: {} rows in {} chunks ({:.2}s)",
            self.run_id,
            report.stage,
            report.rows,
            report.chunks,
            report.elapsed_secs
        );
        self.state = next;
        let index = self.stages.len();
        self.stages.push(report);
        Ok(&self.stages[index])
    }
}

fn stage_report(
    slot: StageSlot,
    batches: usize,
    summary: LoadSummary,
    started: Instant,
) -> StageReport {
    StageReport {
        stage: slot.name(),
        table: summary.table,
        rows: summary.rows,
        batches,
        chunks: summary.chunks,
        elapsed_secs: started.elapsed().as_secs_f64(),
    }
}
