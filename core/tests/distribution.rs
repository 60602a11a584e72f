//! Statistical properties of the generators.
//!
//! These run the generators directly over partitioned batches, the same
//! way the pipeline fans them out, without touching a store.

use billing_seed_core::{
    config::{default_catalog, CatalogEntry},
    generator::{PaymentGenerator, PurchaseGenerator, RecordGenerator, Timeline},
    partition::partition,
    rng::SeedBank,
    store::{NamedService, PurchaseRef, ServiceRef},
    types::RowId,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

fn timeline() -> Timeline {
    let now = NaiveDate::from_ymd_opt(2025, 3, 15)
        .unwrap()
        .and_hms_micro_opt(8, 15, 0, 500)
        .unwrap();
    Timeline::new(now, 365, 30)
}

fn customers(n: RowId) -> Arc<[RowId]> {
    (1..=n).collect()
}

fn services(catalog: &[CatalogEntry]) -> Vec<NamedService> {
    catalog
        .iter()
        .enumerate()
        .map(|(i, entry)| NamedService {
            name: entry.name.clone(),
            service: ServiceRef {
                id: i as RowId + 1,
                base_price: 20.0 + i as f64,
                is_recurring: true,
            },
        })
        .collect()
}

/// Generate `total` rows in batches of `batch_size`, concatenated in
/// partition order.
fn generate_all<G: RecordGenerator>(
    generator: &G,
    seed: u64,
    total: usize,
    batch_size: usize,
) -> Vec<G::Row> {
    let bank = SeedBank::new(seed);
    let mut rows = Vec::with_capacity(total);
    for batch in partition(total, batch_size).unwrap() {
        let mut rng = bank.for_batch(G::STAGE, batch.index);
        rows.extend(generator.generate(&batch, &mut rng).unwrap());
    }
    rows
}

#[test]
fn purchases_follow_catalog_popularity() {
    let catalog = default_catalog();
    let refs = services(&catalog);
    let generator = PurchaseGenerator::new(customers(500), &refs, &catalog, timeline()).unwrap();

    const N: usize = 20_000;
    let rows = generate_all(&generator, 42, N, 2_500);
    assert_eq!(rows.len(), N);

    let mut observed: HashMap<RowId, usize> = HashMap::new();
    for row in &rows {
        *observed.entry(row.service_id).or_default() += 1;
    }

    let total_weight: f64 = catalog.iter().map(|e| e.popularity).sum();
    let chi_square: f64 = refs
        .iter()
        .zip(&catalog)
        .map(|(service, entry)| {
            let expected = N as f64 * entry.popularity / total_weight;
            let seen = *observed.get(&service.service.id).unwrap_or(&0) as f64;
            (seen - expected).powi(2) / expected
        })
        .sum();

    // 19 degrees of freedom; 54.0 is far beyond the 0.999 quantile (43.8).
    assert!(chi_square < 54.0, "chi-square {chi_square:.2} too large");
}

#[test]
fn equal_weights_split_evenly() {
    let catalog = vec![
        CatalogEntry::new("Fiber Optic 100Mbps", 1.0),
        CatalogEntry::new("Mobile Plan 5GB", 1.0),
        CatalogEntry::new("Basic TV Package", 1.0),
    ];
    let refs = services(&catalog);
    let generator = PurchaseGenerator::new(customers(100), &refs, &catalog, timeline()).unwrap();

    let rows = generate_all(&generator, 21, 3_000, 500);
    for service in &refs {
        let share = rows
            .iter()
            .filter(|r| r.service_id == service.service.id)
            .count() as f64
            / rows.len() as f64;
        assert!(
            (share - 1.0 / 3.0).abs() < 0.02,
            "{} drew {:.3} of purchases",
            service.name,
            share
        );
    }
}

#[test]
fn zero_weight_services_are_never_purchased() {
    let catalog = vec![
        CatalogEntry::new("Fiber Optic 100Mbps", 0.0),
        CatalogEntry::new("Mobile Plan 5GB", 3.0),
        CatalogEntry::new("Basic TV Package", 1.0),
    ];
    let refs = services(&catalog);
    let generator = PurchaseGenerator::new(customers(10), &refs, &catalog, timeline()).unwrap();
    let rows = generate_all(&generator, 7, 5_000, 1_000);
    assert!(rows.iter().all(|r| r.service_id != 1));
}

#[test]
fn recurring_purchases_end_after_the_term() {
    let catalog = default_catalog();
    let mut refs = services(&catalog);
    for service in refs.iter_mut().step_by(2) {
        service.service.is_recurring = false;
    }
    let recurring: HashMap<RowId, bool> = refs
        .iter()
        .map(|s| (s.service.id, s.service.is_recurring))
        .collect();
    let generator = PurchaseGenerator::new(customers(50), &refs, &catalog, timeline()).unwrap();

    let now = timeline().now;
    for row in generate_all(&generator, 99, 4_000, 1_000) {
        let age = now - row.start_date;
        assert!(age >= chrono::Duration::days(1) && age <= chrono::Duration::days(365));
        match (recurring[&row.service_id], row.end_date) {
            (true, Some(end)) => assert_eq!(end - row.start_date, chrono::Duration::days(30)),
            (false, None) => {}
            other => panic!("end_date mismatch: {other:?}"),
        }
    }
}

#[test]
fn payments_mostly_come_from_the_purchasing_customer() {
    let purchases: Arc<[PurchaseRef]> = (1..=400)
        .map(|id| PurchaseRef {
            id,
            customer_id: id % 100 + 1,
            base_price: 15.0 + (id % 7) as f64,
        })
        .collect();
    let by_id: HashMap<RowId, PurchaseRef> = purchases.iter().map(|p| (p.id, *p)).collect();
    let generator =
        PaymentGenerator::new(customers(100), purchases, 0.95, timeline()).unwrap();

    const N: usize = 20_000;
    let rows = generate_all(&generator, 42, N, 3_000);
    let mut same = 0;
    for row in &rows {
        let purchase = by_id[&row.purchase_id];
        assert!((row.amount - purchase.base_price).abs() < 0.01);
        if row.customer_id == purchase.customer_id {
            same += 1;
        }
    }
    let share = same as f64 / N as f64;
    assert!((share - 0.95).abs() < 0.02, "same-customer share {share:.4}");
}

#[test]
fn partitions_cover_every_offset_once() {
    for (total, size) in [(0, 10), (1, 10), (10, 10), (10_001, 1_000), (7, 3)] {
        let batches = partition(total, size).unwrap();
        assert_eq!(batches.len(), total.div_ceil(size));
        let offsets: Vec<usize> = batches.iter().flat_map(|b| b.offsets()).collect();
        assert_eq!(offsets, (0..total).collect::<Vec<_>>());
        assert!(batches.iter().all(|b| b.count <= size && b.count > 0));
    }
}
