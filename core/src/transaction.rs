//! The immutable transaction record every stage reads.

use crate::types::CustomerId;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One purchase event, as validated by the data loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Zero-based data row in the source table. Breaks same-day ties.
    pub row:                  usize,
    pub bill_id:              Option<String>,
    pub customer_id:          CustomerId,
    pub bill_date:            NaiveDate,
    pub revenue_value:        Decimal,
    pub eligibility_flag:     bool,
    pub first_bill_date:      NaiveDate,
    pub zrd_promo_discount:   Decimal,
    pub other_promo_discount: Decimal,
    pub freebee_cost:         Decimal,
    pub promo_code:           Option<String>,
}

impl Transaction {
    pub fn total_discount(&self) -> Decimal {
        self.zrd_promo_discount + self.other_promo_discount + self.freebee_cost
    }

    /// Discount funded by the ZC program. Other promotions excluded.
    pub fn zc_discount(&self) -> Decimal {
        self.zrd_promo_discount + self.freebee_cost
    }

    /// A ZenoCoin redemption: any positive ZC discount, or a ZRD promo code.
    pub fn is_redemption(&self) -> bool {
        self.zrd_promo_discount > Decimal::ZERO
            || self.freebee_cost > Decimal::ZERO
            || self
                .promo_code
                .as_deref()
                .is_some_and(|code| code.starts_with("ZRD"))
    }

    pub fn revenue_f64(&self) -> f64 {
        self.revenue_value.to_f64().unwrap_or(0.0)
    }

    /// Chronological order within one customer: date, then source row.
    pub fn sequence_key(&self) -> (NaiveDate, usize) {
        (self.bill_date, self.row)
    }
}

/// Latest bill date in the table: the end of every observation window.
pub fn dataset_as_of(transactions: &[Transaction]) -> Option<NaiveDate> {
    transactions.iter().map(|t| t.bill_date).max()
}
