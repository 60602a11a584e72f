use super::Store;
use crate::{
    error::{SeedError, SeedResult},
    types::RowId,
};
use rusqlite::{params, Row};

// ── Reference projections ─────────────────────────────────────────
//
// Only the columns a dependent stage needs, read back after the producing
// stage committed. Reads are keyset-paged on the primary key so memory on
// the store side stays bounded however large the table is.

/// What a purchase needs to know about its service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceRef {
    pub id: RowId,
    pub base_price: f64,
    pub is_recurring: bool,
}

/// A service with its catalog name, used to look up popularity.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedService {
    pub name: String,
    pub service: ServiceRef,
}

/// What a payment needs to know about its purchase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseRef {
    pub id: RowId,
    pub customer_id: RowId,
    /// base_price of the purchased service.
    pub base_price: f64,
}

impl Store {
    pub fn customer_ids(&self, page_size: usize) -> SeedResult<Vec<RowId>> {
        self.paginate(
            "SELECT id FROM customers WHERE id > ?1 ORDER BY id LIMIT ?2",
            page_size,
            |row| {
                let id: RowId = row.get(0)?;
                Ok((id, id))
            },
        )
    }

    pub fn service_refs(&self, page_size: usize) -> SeedResult<Vec<NamedService>> {
        self.paginate(
            "SELECT id, name, base_price, is_recurring FROM services
             WHERE id > ?1 ORDER BY id LIMIT ?2",
            page_size,
            |row| {
                let id: RowId = row.get(0)?;
                Ok((
                    id,
                    NamedService {
                        name: row.get(1)?,
                        service: ServiceRef {
                            id,
                            base_price: row.get(2)?,
                            is_recurring: row.get::<_, i64>(3)? != 0,
                        },
                    },
                ))
            },
        )
    }

    pub fn purchase_refs(&self, page_size: usize) -> SeedResult<Vec<PurchaseRef>> {
        self.paginate(
            "SELECT p.id, p.customer_id, s.base_price
             FROM purchases p
             JOIN services s ON s.id = p.service_id
             WHERE p.id > ?1 ORDER BY p.id LIMIT ?2",
            page_size,
            |row| {
                let id: RowId = row.get(0)?;
                Ok((
                    id,
                    PurchaseRef {
                        id,
                        customer_id: row.get(1)?,
                        base_price: row.get(2)?,
                    },
                ))
            },
        )
    }

    /// Walk `sql` page by page. `sql` binds the last seen key as ?1 and the
    /// page size as ?2; `map` returns each row's key alongside its value.
    fn paginate<T, F>(&self, sql: &str, page_size: usize, mut map: F) -> SeedResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<(RowId, T)>,
    {
        if page_size == 0 {
            return Err(SeedError::config("fetch page size must be greater than zero"));
        }
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(sql)?;
        let mut out = Vec::new();
        let mut last_key: RowId = RowId::MIN;
        loop {
            let page = stmt
                .query_map(params![last_key, page_size as i64], &mut map)?
                .collect::<Result<Vec<_>, _>>()?;
            let Some((key, _)) = page.last() else { break };
            last_key = *key;
            let exhausted = page.len() < page_size;
            out.extend(page.into_iter().map(|(_, value)| value));
            if exhausted {
                break;
            }
        }
        Ok(out)
    }
}
