use super::{RecordGenerator, Timeline};
use crate::{
    error::{SeedError, SeedResult},
    loader::{ColumnKind, Field, LoadRow, TableSpec},
    partition::Batch,
    rng::{BatchRng, StageSlot},
    sampler::WeightedSampler,
    store::PurchaseRef,
    types::{Currency, PaymentMethod, PaymentStatus, RowId},
};
use chrono::NaiveDateTime;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRow {
    pub customer_id: RowId,
    pub purchase_id: RowId,
    pub amount: f64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub timestamp: NaiveDateTime,
}

impl LoadRow for PaymentRow {
    const TABLE: TableSpec = TableSpec {
        name: "payments",
        columns: &[
            "customer_id",
            "purchase_id",
            "amount",
            "currency",
            "payment_method",
            "status",
            "timestamp",
        ],
        kinds: &[
            ColumnKind::Integer,
            ColumnKind::Integer,
            ColumnKind::Real,
            ColumnKind::Integer,
            ColumnKind::Integer,
            ColumnKind::Integer,
            ColumnKind::Text,
        ],
    };

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::Int(self.customer_id),
            Field::Int(self.purchase_id),
            Field::Real(self.amount),
            Field::Int(self.currency.code()),
            Field::Int(self.payment_method.code()),
            Field::Int(self.status.code()),
            Field::Timestamp(self.timestamp),
        ]
    }
}

pub struct PaymentGenerator {
    customer_ids: Arc<[RowId]>,
    purchases: Arc<[PurchaseRef]>,
    same_customer_rate: f64,
    currencies: WeightedSampler<Currency>,
    methods: WeightedSampler<PaymentMethod>,
    statuses: WeightedSampler<PaymentStatus>,
    timeline: Timeline,
}

impl PaymentGenerator {
    pub fn new(
        customer_ids: Arc<[RowId]>,
        purchases: Arc<[PurchaseRef]>,
        same_customer_rate: f64,
        timeline: Timeline,
    ) -> SeedResult<Self> {
        if purchases.is_empty() {
            return Err(SeedError::MissingReferenceData {
                stage: StageSlot::Payments.name(),
                table: "purchases",
            });
        }
        if customer_ids.is_empty() {
            return Err(SeedError::MissingReferenceData {
                stage: StageSlot::Payments.name(),
                table: "customers",
            });
        }
        Ok(Self {
            customer_ids,
            purchases,
            same_customer_rate,
            currencies: WeightedSampler::uniform(Currency::ALL.to_vec())?,
            methods: WeightedSampler::uniform(PaymentMethod::ALL.to_vec())?,
            statuses: WeightedSampler::uniform(PaymentStatus::ALL.to_vec())?,
            timeline,
        })
    }

    /// The purchase's own customer with probability `same_customer_rate`,
    /// otherwise a uniformly chosen other customer. With a single customer
    /// there is no other, so the owner pays.
    fn payer(&self, owner: RowId, rng: &mut BatchRng) -> RowId {
        let ids = &self.customer_ids;
        if rng.chance(self.same_customer_rate) || ids.len() < 2 {
            return owner;
        }
        // Draw from all but the last slot; landing on the owner maps to
        // the last slot. Uniform over the n - 1 others when ids are unique.
        let pick = ids[rng.next_index(ids.len() - 1)];
        if pick == owner {
            ids[ids.len() - 1]
        } else {
            pick
        }
    }
}

impl RecordGenerator for PaymentGenerator {
    type Row = PaymentRow;
    const STAGE: StageSlot = StageSlot::Payments;

    fn generate(&self, batch: &Batch, rng: &mut BatchRng) -> SeedResult<Vec<PaymentRow>> {
        let mut rows = Vec::with_capacity(batch.count);
        for _ in batch.offsets() {
            let purchase = self.purchases[rng.next_index(self.purchases.len())];
            rows.push(PaymentRow {
                customer_id: self.payer(purchase.customer_id, rng),
                purchase_id: purchase.id,
                amount: purchase.base_price,
                currency: self.currencies.draw(rng),
                payment_method: self.methods.draw(rng),
                status: self.statuses.draw(rng),
                timestamp: self.timeline.past_date(rng),
            });
        }
        Ok(rows)
    }
}
