use crate::{
    error::{SeedError, SeedResult},
    loader::LoadStrategy,
    sampler::WeightedSampler,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound for day counts, keeping every date arithmetic in range.
pub const MAX_DAYS: u32 = 36_500;

// ── Targets ──────────────────────────────────────────────────────

/// Rows to generate per batched stage. The service count is the catalog
/// length and is never batched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetCounts {
    pub customers: usize,
    pub purchases: usize,
    pub payments: usize,
}

impl Default for TargetCounts {
    fn default() -> Self {
        Self {
            customers: 200_000,
            purchases: 200_000,
            payments: 200_000,
        }
    }
}

// ── Service catalog ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Relative popularity. Normalized by the sampler, need not sum to 1.
    pub popularity: f64,
}

impl CatalogEntry {
    pub fn new(name: &str, popularity: f64) -> Self {
        Self {
            name: name.into(),
            popularity,
        }
    }
}

/// The twenty-entry telecom catalog with its popularity weights.
pub fn default_catalog() -> Vec<CatalogEntry> {
    [
        // Internet
        ("Fiber Optic 100Mbps", 0.15),
        ("Fiber Optic 500Mbps", 0.12),
        ("Fiber Optic 1Gbps", 0.08),
        ("Cable Internet 50Mbps", 0.10),
        ("Cable Internet 200Mbps", 0.09),
        ("DSL Internet 25Mbps", 0.06),
        ("DSL Internet 50Mbps", 0.05),
        ("Wireless Internet 100Mbps", 0.04),
        // Mobile
        ("Mobile Plan 5GB", 0.12),
        ("Mobile Plan 10GB", 0.10),
        ("Mobile Plan 20GB", 0.08),
        ("Mobile Plan Unlimited", 0.06),
        ("Mobile Plan Family 4GB", 0.08),
        ("Mobile Plan Family 10GB", 0.06),
        ("Mobile Plan Business 50GB", 0.03),
        // TV
        ("Basic TV Package", 0.08),
        ("Premium TV Package", 0.06),
        ("Sports TV Package", 0.05),
        ("Movie TV Package", 0.04),
        ("Family TV Package", 0.06),
    ]
    .into_iter()
    .map(|(name, popularity)| CatalogEntry::new(name, popularity))
    .collect()
}

// ── Store ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: String,
    /// Connections kept open while idle.
    pub pool_size: u32,
    /// Extra connections allowed above pool_size under load.
    pub max_overflow: u32,
    pub connection_timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "billing.db".into(),
            pool_size: 5,
            max_overflow: 10,
            connection_timeout_secs: 30,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

// ── Population ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub targets: TargetCounts,
    /// Rows per generation batch, and per load chunk.
    pub batch_size: usize,
    /// Worker pool size. 0 = one worker per core.
    pub workers: usize,
    pub load_strategy: LoadStrategy,
    /// Master seed; every batch stream derives from it.
    pub seed: u64,
    /// Page size for reference-data reads.
    pub fetch_page_size: usize,
    /// Payments inspected by the verification pass.
    pub verify_sample: usize,
    /// Probability that a payment is made by the purchase's own customer.
    pub same_customer_rate: f64,
    /// Dates fall between 1 and this many days before the run started.
    pub activity_window_days: u32,
    /// end_date - start_date for recurring services.
    pub recurring_term_days: u32,
    pub catalog: Vec<CatalogEntry>,
    pub store: StoreConfig,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            targets: TargetCounts::default(),
            batch_size: 10_000,
            workers: 0,
            load_strategy: LoadStrategy::StreamingCopy,
            seed: 42,
            fetch_page_size: 1_000,
            verify_sample: 1_000,
            same_customer_rate: 0.95,
            activity_window_days: 365,
            recurring_term_days: 30,
            catalog: default_catalog(),
            store: StoreConfig::default(),
        }
    }
}

impl PopulationConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PopulationConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with small targets for use in tests.
    pub fn default_test(db_path: &str) -> Self {
        Self {
            targets: TargetCounts {
                customers: 500,
                purchases: 1_000,
                payments: 1_500,
            },
            batch_size: 200,
            workers: 4,
            fetch_page_size: 128,
            verify_sample: 500,
            store: StoreConfig {
                pool_size: 2,
                max_overflow: 2,
                ..StoreConfig::at(db_path)
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SeedResult<()> {
        if self.batch_size == 0 {
            return Err(SeedError::config("batch_size must be greater than zero"));
        }
        if self.fetch_page_size == 0 {
            return Err(SeedError::config("fetch_page_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.same_customer_rate) {
            return Err(SeedError::config(format!(
                "same_customer_rate must be within [0, 1], got {}",
                self.same_customer_rate
            )));
        }
        if !(1..=MAX_DAYS).contains(&self.activity_window_days) {
            return Err(SeedError::config(format!(
                "activity_window_days must be within [1, {MAX_DAYS}], got {}",
                self.activity_window_days
            )));
        }
        if self.recurring_term_days > MAX_DAYS {
            return Err(SeedError::config(format!(
                "recurring_term_days must be at most {MAX_DAYS}, got {}",
                self.recurring_term_days
            )));
        }
        self.validate_catalog()?;
        if self.store.pool_size == 0 {
            return Err(SeedError::config("store.pool_size must be greater than zero"));
        }
        if self.store.path.is_empty() {
            return Err(SeedError::config("store.path is empty"));
        }
        Ok(())
    }

    /// Catalog names must be unique and popularities must form a usable
    /// weight vector, so a bad catalog fails before anything is written.
    fn validate_catalog(&self) -> SeedResult<()> {
        if self.catalog.is_empty() {
            return Err(SeedError::config("service catalog is empty"));
        }
        let mut seen = HashSet::with_capacity(self.catalog.len());
        if let Some(dup) = self.catalog.iter().find(|e| !seen.insert(e.name.as_str())) {
            return Err(SeedError::config(format!(
                "catalog lists service '{}' more than once",
                dup.name
            )));
        }
        let weights: Vec<f64> = self.catalog.iter().map(|e| e.popularity).collect();
        WeightedSampler::new(vec![(); weights.len()], &weights)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_twenty_weighted_entries() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 20);
        assert!(catalog.iter().all(|e| e.popularity > 0.0));
    }

    #[test]
    fn defaults_validate() {
        PopulationConfig::default().validate().unwrap();
        PopulationConfig::default_test("t.db").validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "targets": { "customers": 10, "purchases": 20, "payments": 30 },
            "load_strategy": "insert_batches",
            "store": { "path": "x.db" }
        }"#;
        let config: PopulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.targets.payments, 30);
        assert_eq!(config.load_strategy, LoadStrategy::InsertBatches);
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.store.path, "x.db");
        assert_eq!(config.store.pool_size, 5);
        assert_eq!(config.catalog.len(), 20);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = PopulationConfig::default();
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(SeedError::Configuration(_))));

        let mut config = PopulationConfig::default();
        config.same_customer_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.catalog.clear();
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.store.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_catalog_names() {
        let mut config = PopulationConfig::default();
        config.catalog = vec![
            CatalogEntry::new("Basic TV Package", 1.0),
            CatalogEntry::new("Basic TV Package", 9.0),
            CatalogEntry::new("Mobile Plan 5GB", 1.0),
        ];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SeedError::Configuration(_)));
        assert!(err.to_string().contains("Basic TV Package"));
    }

    #[test]
    fn rejects_unusable_popularity_weights() {
        for weights in [[-1.0, 1.0], [f64::NAN, 1.0], [0.0, 0.0], [f64::INFINITY, 1.0]] {
            let mut config = PopulationConfig::default();
            config.catalog = vec![
                CatalogEntry::new("Basic TV Package", weights[0]),
                CatalogEntry::new("Mobile Plan 5GB", weights[1]),
            ];
            assert!(
                matches!(config.validate(), Err(SeedError::Configuration(_))),
                "{weights:?}"
            );
        }
    }

    #[test]
    fn zero_weight_entries_are_allowed_alongside_positive_ones() {
        let mut config = PopulationConfig::default();
        config.catalog[0].popularity = 0.0;
        config.validate().unwrap();
    }

    #[test]
    fn day_counts_are_bounded() {
        let mut config = PopulationConfig::default();
        config.activity_window_days = MAX_DAYS + 1;
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.activity_window_days = 0;
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.recurring_term_days = u32::MAX;
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.activity_window_days = MAX_DAYS;
        config.recurring_term_days = MAX_DAYS;
        config.validate().unwrap();
    }
}
