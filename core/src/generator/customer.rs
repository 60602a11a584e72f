use super::RecordGenerator;
use crate::{
    error::SeedResult,
    loader::{ColumnKind, Field, LoadRow, TableSpec},
    name_generator::NameGenerator,
    partition::Batch,
    rng::{BatchRng, StageSlot},
    sampler::WeightedSampler,
    types::AccountStatus,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRow {
    pub name: String,
    pub email: String,
    pub account_status: AccountStatus,
}

impl LoadRow for CustomerRow {
    const TABLE: TableSpec = TableSpec {
        name: "customers",
        columns: &["name", "email", "account_status"],
        kinds: &[ColumnKind::Text, ColumnKind::Text, ColumnKind::Integer],
    };

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::Text(&self.name),
            Field::Text(&self.email),
            Field::Int(self.account_status.code()),
        ]
    }
}

pub struct CustomerGenerator {
    statuses: WeightedSampler<AccountStatus>,
}

impl CustomerGenerator {
    pub fn new() -> SeedResult<Self> {
        Ok(Self {
            statuses: WeightedSampler::uniform(AccountStatus::ALL.to_vec())?,
        })
    }
}

impl RecordGenerator for CustomerGenerator {
    type Row = CustomerRow;
    const STAGE: StageSlot = StageSlot::Customers;

    fn generate(&self, batch: &Batch, rng: &mut BatchRng) -> SeedResult<Vec<CustomerRow>> {
        Ok(batch
            .offsets()
            .map(|offset| {
                let identity = NameGenerator::identity(rng, offset);
                CustomerRow {
                    name: identity.name,
                    email: identity.email,
                    account_status: self.statuses.draw(rng),
                }
            })
            .collect())
    }
}
