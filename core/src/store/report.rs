use super::Store;
use crate::{
    error::SeedResult,
    loader::parse_timestamp,
    types::{Currency, PaymentMethod, PaymentStatus, RowId, ServiceType},
};
use chrono::{Duration, NaiveDateTime};
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableCounts {
    pub customers: i64,
    pub services: i64,
    pub purchases: i64,
    pub payments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePopularity {
    pub service_id: RowId,
    pub name: String,
    pub purchases: i64,
    /// Fraction of all purchases, 0.0 when there are none.
    pub share: f64,
}

/// Sampled payment integrity: amount vs. the purchased service's price,
/// payer vs. the purchase's customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaymentSampleCheck {
    pub sampled: usize,
    pub correct_amounts: usize,
    pub matching_customers: usize,
}

/// Sampled purchase term integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TermCheck {
    pub sampled: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceTypeStats {
    pub service_type: ServiceType,
    pub total_payments: i64,
    pub total_amount: f64,
    pub avg_amount: f64,
    pub successful_payments: i64,
    pub credit_card_payments: i64,
    pub bank_transfer_payments: i64,
    pub mobile_payments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCustomer {
    pub customer_id: RowId,
    pub name: String,
    pub total_spent: f64,
    pub payment_count: i64,
    pub avg_payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPayment {
    pub payment_id: RowId,
    pub customer_name: String,
    pub service_name: String,
    pub amount: f64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub timestamp: NaiveDateTime,
}

/// Amounts within this distance of the service price count as equal.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

impl Store {
    // ── Verification ──────────────────────────────────────────────

    pub fn service_popularity(&self) -> SeedResult<Vec<ServicePopularity>> {
        let total = self.count(super::PURCHASES)?;
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, COUNT(p.id)
             FROM services s
             LEFT JOIN purchases p ON p.service_id = s.id
             GROUP BY s.id
             ORDER BY s.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let purchases: i64 = row.get(2)?;
                Ok(ServicePopularity {
                    service_id: row.get(0)?,
                    name: row.get(1)?,
                    purchases,
                    share: if total > 0 {
                        purchases as f64 / total as f64
                    } else {
                        0.0
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Check the first `limit` payments (by id) against their purchase.
    pub fn check_payment_sample(&self, limit: usize) -> SeedResult<PaymentSampleCheck> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT pay.amount, s.base_price, pay.customer_id, pur.customer_id
             FROM payments pay
             JOIN purchases pur ON pur.id = pay.purchase_id
             JOIN services s ON s.id = pur.service_id
             ORDER BY pay.id
             LIMIT ?1",
        )?;
        let mut check = PaymentSampleCheck::default();
        let mut rows = stmt.query(params![limit as i64])?;
        while let Some(row) = rows.next()? {
            let amount: f64 = row.get(0)?;
            let base_price: f64 = row.get(1)?;
            let payer: RowId = row.get(2)?;
            let owner: RowId = row.get(3)?;
            check.sampled += 1;
            if (amount - base_price).abs() < AMOUNT_TOLERANCE {
                check.correct_amounts += 1;
            }
            if payer == owner {
                check.matching_customers += 1;
            }
        }
        Ok(check)
    }

    /// Check the first `limit` purchases (by id): end_date must be
    /// start_date + `term_days` for recurring services and NULL otherwise.
    pub fn check_purchase_terms(&self, limit: usize, term_days: u32) -> SeedResult<TermCheck> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT p.start_date, p.end_date, s.is_recurring
             FROM purchases p
             JOIN services s ON s.id = p.service_id
             ORDER BY p.id
             LIMIT ?1",
        )?;
        let term = Duration::days(i64::from(term_days));
        let mut check = TermCheck::default();
        let mut rows = stmt.query(params![limit as i64])?;
        while let Some(row) = rows.next()? {
            let start: String = row.get(0)?;
            let end: Option<String> = row.get(1)?;
            let recurring = row.get::<_, i64>(2)? != 0;
            check.sampled += 1;
            let ok = match (recurring, end) {
                (true, Some(end)) => parse_timestamp(&end)? == parse_timestamp(&start)? + term,
                (false, None) => true,
                _ => false,
            };
            if !ok {
                check.violations += 1;
            }
        }
        Ok(check)
    }

    // ── Dashboard queries ─────────────────────────────────────────

    /// Payment statistics grouped by the purchased service's type.
    pub fn service_type_stats(&self) -> SeedResult<Vec<ServiceTypeStats>> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT s.type,
                    COUNT(pay.id),
                    COALESCE(SUM(pay.amount), 0.0),
                    COALESCE(AVG(pay.amount), 0.0),
                    SUM(CASE WHEN pay.status = ?1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN pay.payment_method = ?2 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN pay.payment_method = ?3 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN pay.payment_method = ?4 THEN 1 ELSE 0 END)
             FROM payments pay
             JOIN purchases pur ON pur.id = pay.purchase_id
             JOIN services s ON s.id = pur.service_id
             GROUP BY s.type
             ORDER BY s.type",
        )?;
        let rows = stmt
            .query_map(
                params![
                    PaymentStatus::Completed,
                    PaymentMethod::CreditCard,
                    PaymentMethod::BankTransfer,
                    PaymentMethod::MobilePayment,
                ],
                |row| {
                    Ok(ServiceTypeStats {
                        service_type: row.get(0)?,
                        total_payments: row.get(1)?,
                        total_amount: row.get(2)?,
                        avg_amount: row.get(3)?,
                        successful_payments: row.get(4)?,
                        credit_card_payments: row.get(5)?,
                        bank_transfer_payments: row.get(6)?,
                        mobile_payments: row.get(7)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Top `limit` customers by total amount paid.
    pub fn top_customers(&self, limit: usize) -> SeedResult<Vec<TopCustomer>> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, SUM(pay.amount), COUNT(pay.id), AVG(pay.amount)
             FROM payments pay
             JOIN customers c ON c.id = pay.customer_id
             GROUP BY c.id
             ORDER BY SUM(pay.amount) DESC, c.id ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TopCustomer {
                    customer_id: row.get(0)?,
                    name: row.get(1)?,
                    total_spent: row.get(2)?,
                    payment_count: row.get(3)?,
                    avg_payment: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The `limit` most recent payments with payer and service names.
    pub fn recent_payments(&self, limit: usize) -> SeedResult<Vec<RecentPayment>> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT pay.id, c.name, s.name, pay.amount, pay.currency, pay.status, pay.timestamp
             FROM payments pay
             JOIN customers c ON c.id = pay.customer_id
             JOIN purchases pur ON pur.id = pay.purchase_id
             JOIN services s ON s.id = pur.service_id
             ORDER BY pay.timestamp DESC, pay.id DESC
             LIMIT ?1",
        )?;
        let mut out = Vec::new();
        let mut rows = stmt.query(params![limit as i64])?;
        while let Some(row) = rows.next()? {
            let timestamp: String = row.get(6)?;
            out.push(RecentPayment {
                payment_id: row.get(0)?,
                customer_name: row.get(1)?,
                service_name: row.get(2)?,
                amount: row.get(3)?,
                currency: row.get(4)?,
                status: row.get(5)?,
                timestamp: parse_timestamp(&timestamp)?,
            });
        }
        Ok(out)
    }
}
