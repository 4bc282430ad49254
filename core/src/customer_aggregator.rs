//! Customer aggregator: one profile per distinct customer.
//!
//! Pure function of the transaction slice. Profiles are rebuilt from
//! scratch on every run and never updated incrementally.

use crate::{
    transaction::Transaction,
    types::{days_between, CustomerId, YearMonth},
};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id:         CustomerId,
    pub first_purchase_date: NaiveDate,
    pub last_purchase_date:  NaiveDate,
    pub total_spend:         Decimal,
    pub order_count:         u32,
    /// Eligible on at least one transaction.
    pub is_zc_user:          bool,
    /// Eligible on the first transaction.
    pub acquired_with_zc:    bool,
    pub total_discount:      Decimal,
    pub active_months:       u32,
}

impl CustomerProfile {
    pub fn total_spend_f64(&self) -> f64 {
        self.total_spend.to_f64().unwrap_or(0.0)
    }

    /// Days between first and last purchase.
    pub fn active_span_days(&self) -> i64 {
        days_between(self.first_purchase_date, self.last_purchase_date)
    }

    /// Spend normalised to a 30-day month over the active span.
    pub fn monthly_spend(&self) -> f64 {
        self.total_spend_f64() / (self.active_span_days() as f64 / 30.0 + 1.0)
    }

    /// Spend per distinct active calendar month.
    pub fn spend_per_active_month(&self) -> f64 {
        if self.active_months == 0 {
            0.0
        } else {
            self.total_spend_f64() / self.active_months as f64
        }
    }
}

/// Every customer's transactions in chronological order (date, then row).
/// Keyed and iterated by customer id.
pub fn group_by_customer(transactions: &[Transaction]) -> BTreeMap<&str, Vec<&Transaction>> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for txn in transactions {
        groups.entry(txn.customer_id.as_str()).or_default().push(txn);
    }
    for history in groups.values_mut() {
        history.sort_by_key(|t| t.sequence_key());
    }
    groups
}

/// Build one profile per distinct customer id, sorted by id.
pub fn aggregate(transactions: &[Transaction]) -> Vec<CustomerProfile> {
    let profiles: Vec<CustomerProfile> = group_by_customer(transactions)
        .into_iter()
        .filter_map(|(customer_id, history)| build_profile(customer_id, &history))
        .collect();

    log::info!(
        "aggregator: built {} profiles from {} transactions",
        profiles.len(),
        transactions.len()
    );
    profiles
}

/// Profile for one customer's chronologically ordered history.
/// None only for an empty history.
pub fn build_profile(customer_id: &str, history: &[&Transaction]) -> Option<CustomerProfile> {
    let first = history.first()?;
    let months: BTreeSet<YearMonth> = history.iter().map(|t| YearMonth::of(t.bill_date)).collect();

    Some(CustomerProfile {
        customer_id:         customer_id.to_string(),
        first_purchase_date: history.iter().map(|t| t.bill_date).min()?,
        last_purchase_date:  history.iter().map(|t| t.bill_date).max()?,
        total_spend:         history.iter().map(|t| t.revenue_value).sum(),
        order_count:         history.len() as u32,
        is_zc_user:          history.iter().any(|t| t.eligibility_flag),
        acquired_with_zc:    first.eligibility_flag,
        total_discount:      history.iter().map(|t| t.total_discount()).sum(),
        active_months:       months.len() as u32,
    })
}
