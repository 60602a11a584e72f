//! Shared primitive types and the persisted enum vocabulary.
//!
//! RULE: Every enum below is stored as a small integer. The integer codes
//! are contractual (the dashboard reads them) and are spelled out in
//! `code()` / `from_code()`. NEVER derive them from declaration order,
//! NEVER renumber an existing variant; only append.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// A persisted row identifier. Opaque outside the store.
pub type RowId = i64;

/// The canonical population run identifier.
pub type RunId = String;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:literal => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored integer code.
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Display label. Never written to the store.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.code()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let code = value.as_i64()?;
                $name::from_code(code).ok_or(FromSqlError::OutOfRange(code))
            }
        }
    };
}

coded_enum! {
    AccountStatus {
        Active = 1 => "ACTIVE",
        Suspended = 2 => "SUSPENDED",
        Terminated = 3 => "TERMINATED",
    }
}

coded_enum! {
    ServiceType {
        Internet = 1 => "INTERNET",
        Mobile = 2 => "MOBILE",
        OneOff = 3 => "ONE_OFF",
        Tv = 4 => "TV",
    }
}

coded_enum! {
    BillingCycle {
        Monthly = 1 => "MONTHLY",
        Yearly = 2 => "YEARLY",
    }
}

coded_enum! {
    PurchaseStatus {
        Active = 1 => "ACTIVE",
        Canceled = 2 => "CANCELED",
        Expired = 3 => "EXPIRED",
        AwaitingActivation = 4 => "AWAITING_ACTIVATION",
    }
}

coded_enum! {
    PaymentMethod {
        CreditCard = 1 => "CREDIT_CARD",
        BankTransfer = 2 => "BANK_TRANSFER",
        MobilePayment = 3 => "MOBILE_PAYMENT",
        CashPayment = 4 => "CASH_PAYMENT",
    }
}

coded_enum! {
    PaymentStatus {
        Pending = 1 => "PENDING",
        Completed = 2 => "COMPLETED",
        Failed = 3 => "FAILED",
        Refunded = 4 => "REFUNDED",
    }
}

coded_enum! {
    Currency {
        Eur = 1 => "EUR",
        Bgn = 2 => "BGN",
        Usd = 3 => "USD",
        Gbp = 4 => "GBP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_published_table() {
        let currency: Vec<_> = Currency::ALL.iter().map(|c| (c.code(), c.label())).collect();
        assert_eq!(currency, vec![(1, "EUR"), (2, "BGN"), (3, "USD"), (4, "GBP")]);

        let status: Vec<_> = PaymentStatus::ALL.iter().map(|s| (s.code(), s.label())).collect();
        assert_eq!(
            status,
            vec![(1, "PENDING"), (2, "COMPLETED"), (3, "FAILED"), (4, "REFUNDED")]
        );

        let method: Vec<_> = PaymentMethod::ALL.iter().map(|m| (m.code(), m.label())).collect();
        assert_eq!(
            method,
            vec![
                (1, "CREDIT_CARD"),
                (2, "BANK_TRANSFER"),
                (3, "MOBILE_PAYMENT"),
                (4, "CASH_PAYMENT")
            ]
        );

        let account: Vec<_> = AccountStatus::ALL.iter().map(|a| (a.code(), a.label())).collect();
        assert_eq!(account, vec![(1, "ACTIVE"), (2, "SUSPENDED"), (3, "TERMINATED")]);

        let kind: Vec<_> = ServiceType::ALL.iter().map(|t| (t.code(), t.label())).collect();
        assert_eq!(kind, vec![(1, "INTERNET"), (2, "MOBILE"), (3, "ONE_OFF"), (4, "TV")]);

        let cycle: Vec<_> = BillingCycle::ALL.iter().map(|b| (b.code(), b.label())).collect();
        assert_eq!(cycle, vec![(1, "MONTHLY"), (2, "YEARLY")]);

        let purchase: Vec<_> = PurchaseStatus::ALL.iter().map(|p| (p.code(), p.label())).collect();
        assert_eq!(
            purchase,
            vec![(1, "ACTIVE"), (2, "CANCELED"), (3, "EXPIRED"), (4, "AWAITING_ACTIVATION")]
        );
    }

    #[test]
    fn from_code_inverts_code() {
        for s in PurchaseStatus::ALL {
            assert_eq!(PurchaseStatus::from_code(s.code()), Some(*s));
        }
        for c in Currency::ALL {
            assert_eq!(Currency::from_code(c.code()), Some(*c));
        }
        assert_eq!(Currency::from_code(0), None);
        assert_eq!(ServiceType::from_code(5), None);
    }

    #[test]
    fn enums_round_trip_through_sqlite_as_integers() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        conn.execute("INSERT INTO t (v) VALUES (?1)", [PaymentMethod::MobilePayment])
            .unwrap();

        let raw: i64 = conn.query_row("SELECT v FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(raw, 3);
        let back: PaymentMethod = conn.query_row("SELECT v FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(back, PaymentMethod::MobilePayment);
    }

    #[test]
    fn unknown_code_is_rejected_on_read() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let res: rusqlite::Result<Currency> = conn.query_row("SELECT 9", [], |r| r.get(0));
        assert!(res.is_err());
    }
}
