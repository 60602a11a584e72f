use super::{RecordGenerator, Timeline};
use crate::{
    config::CatalogEntry,
    error::{SeedError, SeedResult},
    loader::{ColumnKind, Field, LoadRow, TableSpec},
    partition::Batch,
    rng::{BatchRng, StageSlot},
    sampler::WeightedSampler,
    store::{NamedService, ServiceRef},
    types::{PurchaseStatus, RowId},
};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRow {
    pub customer_id: RowId,
    pub service_id: RowId,
    pub start_date: NaiveDateTime,
    /// start_date + term for recurring services, None otherwise.
    pub end_date: Option<NaiveDateTime>,
    pub status: PurchaseStatus,
}

impl LoadRow for PurchaseRow {
    const TABLE: TableSpec = TableSpec {
        name: "purchases",
        columns: &["customer_id", "service_id", "start_date", "end_date", "status"],
        kinds: &[
            ColumnKind::Integer,
            ColumnKind::Integer,
            ColumnKind::Text,
            ColumnKind::Text,
            ColumnKind::Integer,
        ],
    };

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::Int(self.customer_id),
            Field::Int(self.service_id),
            Field::Timestamp(self.start_date),
            self.end_date.map_or(Field::Null, Field::Timestamp),
            Field::Int(self.status.code()),
        ]
    }
}

pub struct PurchaseGenerator {
    customer_ids: Arc<[RowId]>,
    services: WeightedSampler<ServiceRef>,
    statuses: WeightedSampler<PurchaseStatus>,
    timeline: Timeline,
}

impl PurchaseGenerator {
    /// Services are weighted by the popularity of the catalog entry with
    /// the same name. A fetched service missing from the catalog is a
    /// configuration error.
    pub fn new(
        customer_ids: Arc<[RowId]>,
        services: &[NamedService],
        catalog: &[CatalogEntry],
        timeline: Timeline,
    ) -> SeedResult<Self> {
        if customer_ids.is_empty() {
            return Err(SeedError::MissingReferenceData {
                stage: StageSlot::Purchases.name(),
                table: "customers",
            });
        }
        if services.is_empty() {
            return Err(SeedError::MissingReferenceData {
                stage: StageSlot::Purchases.name(),
                table: "services",
            });
        }

        let popularity: HashMap<&str, f64> = catalog
            .iter()
            .map(|entry| (entry.name.as_str(), entry.popularity))
            .collect();
        let weights = services
            .iter()
            .map(|s| {
                popularity.get(s.name.as_str()).copied().ok_or_else(|| {
                    SeedError::config(format!("service '{}' is not in the catalog", s.name))
                })
            })
            .collect::<SeedResult<Vec<f64>>>()?;

        Ok(Self {
            customer_ids,
            services: WeightedSampler::new(services.iter().map(|s| s.service).collect(), &weights)?,
            statuses: WeightedSampler::uniform(PurchaseStatus::ALL.to_vec())?,
            timeline,
        })
    }
}

impl RecordGenerator for PurchaseGenerator {
    type Row = PurchaseRow;
    const STAGE: StageSlot = StageSlot::Purchases;

    fn generate(&self, batch: &Batch, rng: &mut BatchRng) -> SeedResult<Vec<PurchaseRow>> {
        let mut rows = Vec::with_capacity(batch.count);
        for _ in batch.offsets() {
            let customer_id = self.customer_ids[rng.next_index(self.customer_ids.len())];
            let service = self.services.draw(rng);
            let start_date = self.timeline.past_date(rng);
            rows.push(PurchaseRow {
                customer_id,
                service_id: service.id,
                start_date,
                end_date: service
                    .is_recurring
                    .then(|| self.timeline.term_end(start_date)),
                status: self.statuses.draw(rng),
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn timeline() -> Timeline {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Timeline::new(now, 365, 30)
    }

    fn named(id: RowId, name: &str, is_recurring: bool) -> NamedService {
        NamedService {
            name: name.into(),
            service: ServiceRef {
                id,
                base_price: 10.0 * id as f64,
                is_recurring,
            },
        }
    }

    #[test]
    fn end_date_follows_the_recurring_flag() {
        let services = vec![named(1, "A", true), named(2, "B", false)];
        let catalog = vec![CatalogEntry::new("A", 1.0), CatalogEntry::new("B", 1.0)];
        let generator =
            PurchaseGenerator::new(Arc::from(vec![10, 11, 12]), &services, &catalog, timeline())
                .unwrap();
        let batch = Batch {
            index: 0,
            start: 0,
            count: 500,
        };
        let mut rng = crate::rng::SeedBank::new(5).for_batch(StageSlot::Purchases, 0);
        for row in generator.generate(&batch, &mut rng).unwrap() {
            assert!([10, 11, 12].contains(&row.customer_id));
            match row.service_id {
                1 => assert_eq!(row.end_date, Some(row.start_date + Duration::days(30))),
                2 => assert_eq!(row.end_date, None),
                other => panic!("unexpected service {other}"),
            }
        }
    }

    #[test]
    fn empty_references_are_reported_before_generation() {
        let services = vec![named(1, "A", true)];
        let catalog = vec![CatalogEntry::new("A", 1.0)];
        let err = PurchaseGenerator::new(Arc::from(Vec::new()), &services, &catalog, timeline())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SeedError::MissingReferenceData { table: "customers", .. }
        ));

        let err = PurchaseGenerator::new(Arc::from(vec![1]), &[], &catalog, timeline())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SeedError::MissingReferenceData { table: "services", .. }
        ));
    }

    #[test]
    fn services_outside_the_catalog_are_rejected() {
        let services = vec![named(1, "Unlisted", true)];
        let catalog = vec![CatalogEntry::new("A", 1.0)];
        assert!(matches!(
            PurchaseGenerator::new(Arc::from(vec![1]), &services, &catalog, timeline()),
            Err(SeedError::Configuration(_))
        ));
    }
}
