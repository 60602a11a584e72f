//! The service catalog is small and fixed, so it is generated in one piece
//! on the orchestrator thread rather than fanned out.
//!
//! RULE: type and price bucket are decided from the entry name alone.
//! Every catalog entry is recurring MONTHLY unless its name marks it as a
//! one-off charge.

use crate::{
    config::CatalogEntry,
    error::SeedResult,
    loader::{ColumnKind, Field, LoadRow, TableSpec},
    rng::BatchRng,
    types::{BillingCycle, ServiceType},
};

const ONE_OFF_KEYWORDS: [&str; 3] = ["One-Off", "Installation", "Activation"];

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRow {
    pub name: String,
    pub service_type: ServiceType,
    pub base_price: f64,
    pub is_recurring: bool,
    /// None exactly when `is_recurring` is false.
    pub billing_cycle: Option<BillingCycle>,
}

impl LoadRow for ServiceRow {
    const TABLE: TableSpec = TableSpec {
        name: "services",
        columns: &["name", "type", "base_price", "is_recurring", "billing_cycle"],
        kinds: &[
            ColumnKind::Text,
            ColumnKind::Integer,
            ColumnKind::Real,
            ColumnKind::Integer,
            ColumnKind::Integer,
        ],
    };

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::Text(&self.name),
            Field::Int(self.service_type.code()),
            Field::Real(self.base_price),
            Field::Int(i64::from(self.is_recurring)),
            self.billing_cycle
                .map_or(Field::Null, |cycle| Field::Int(cycle.code())),
        ]
    }
}

const INTERNET_KEYWORDS: [&str; 5] = ["Internet", "Fiber", "Cable", "DSL", "Wireless"];

/// Service type implied by a catalog name. Anything that is neither
/// one-off, internet nor mobile is a TV package.
pub fn classify(name: &str) -> ServiceType {
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));
    if has_any(&ONE_OFF_KEYWORDS) {
        ServiceType::OneOff
    } else if has_any(&INTERNET_KEYWORDS) {
        ServiceType::Internet
    } else if name.contains("Mobile") {
        ServiceType::Mobile
    } else {
        ServiceType::Tv
    }
}

/// Price bucket (min, max) for a catalog entry of the given type.
pub fn price_range(service_type: ServiceType, name: &str) -> (f64, f64) {
    let has = |k: &str| name.contains(k);
    match service_type {
        ServiceType::Internet if has("1Gbps") => (80.0, 120.0),
        ServiceType::Internet if has("500Mbps") => (50.0, 80.0),
        ServiceType::Internet if has("200Mbps") => (40.0, 60.0),
        ServiceType::Internet if has("100Mbps") => (25.0, 45.0),
        ServiceType::Internet if has("50Mbps") => (20.0, 35.0),
        ServiceType::Internet => (15.0, 25.0),
        ServiceType::Mobile if has("Unlimited") => (40.0, 60.0),
        ServiceType::Mobile if has("50GB") => (35.0, 50.0),
        ServiceType::Mobile if has("20GB") => (25.0, 35.0),
        ServiceType::Mobile if has("10GB") => (20.0, 30.0),
        ServiceType::Mobile if has("5GB") => (15.0, 25.0),
        ServiceType::Mobile => (30.0, 45.0),
        ServiceType::Tv if has("Premium") => (30.0, 50.0),
        ServiceType::Tv if has("Sports") || has("Movie") => (20.0, 35.0),
        ServiceType::Tv => (15.0, 25.0),
        ServiceType::OneOff => (50.0, 150.0),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One row per catalog entry, in catalog order.
pub fn generate_services(catalog: &[CatalogEntry], rng: &mut BatchRng) -> SeedResult<Vec<ServiceRow>> {
    catalog
        .iter()
        .map(|entry| {
            let service_type = classify(&entry.name);
            let (lo, hi) = price_range(service_type, &entry.name);
            let is_recurring = service_type != ServiceType::OneOff;
            Ok(ServiceRow {
                name: entry.name.clone(),
                service_type,
                base_price: round_cents(rng.uniform(lo, hi)),
                is_recurring,
                billing_cycle: is_recurring.then_some(BillingCycle::Monthly),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::default_catalog,
        rng::{SeedBank, StageSlot},
    };

    #[test]
    fn default_catalog_is_all_recurring_monthly() {
        let mut rng = SeedBank::new(42).for_batch(StageSlot::Services, 0);
        let rows = generate_services(&default_catalog(), &mut rng).unwrap();
        assert_eq!(rows.len(), 20);
        for row in &rows {
            assert!(row.is_recurring);
            assert_eq!(row.billing_cycle, Some(BillingCycle::Monthly));
            let (lo, hi) = price_range(row.service_type, &row.name);
            assert!(row.base_price >= lo && row.base_price <= hi, "{row:?}");
            assert_eq!(row.base_price, round_cents(row.base_price));
        }
        let counts = |t| rows.iter().filter(|r| r.service_type == t).count();
        assert_eq!(counts(ServiceType::Internet), 8);
        assert_eq!(counts(ServiceType::Mobile), 7);
        assert_eq!(counts(ServiceType::Tv), 5);
    }

    #[test]
    fn one_off_entries_have_no_billing_cycle() {
        let catalog = vec![
            CatalogEntry::new("Fiber Installation", 1.0),
            CatalogEntry::new("SIM Activation", 1.0),
        ];
        let mut rng = SeedBank::new(1).for_batch(StageSlot::Services, 0);
        for row in generate_services(&catalog, &mut rng).unwrap() {
            assert_eq!(row.service_type, ServiceType::OneOff);
            assert!(!row.is_recurring);
            assert_eq!(row.billing_cycle, None);
            assert!(row.base_price >= 50.0 && row.base_price <= 150.0);
            assert!(matches!(row.fields()[4], Field::Null));
        }
    }

    #[test]
    fn names_classify_by_keyword() {
        assert_eq!(classify("Wireless Internet 100Mbps"), ServiceType::Internet);
        assert_eq!(classify("DSL Internet 25Mbps"), ServiceType::Internet);
        assert_eq!(classify("Mobile Plan 5GB"), ServiceType::Mobile);
        assert_eq!(classify("Family TV Package"), ServiceType::Tv);
        assert_eq!(classify("Router Installation"), ServiceType::OneOff);
    }

    #[test]
    fn plain_family_plans_fall_into_the_family_bucket() {
        assert_eq!(price_range(ServiceType::Mobile, "Mobile Plan Family 4GB"), (30.0, 45.0));
        assert_eq!(price_range(ServiceType::Mobile, "Mobile Plan Family 10GB"), (20.0, 30.0));
    }
}
