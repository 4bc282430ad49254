//! Synthetic transaction tables for demos and tests.
//!
//! RULE: output is a pure function of (SyntheticConfig, seed).
//! Every draw comes from a SeedBank stream, so the same seed yields a
//! byte-identical table.
//!
//! Three kinds of customer are generated:
//!   - ZC-acquired: eligible from the first order
//!   - adopters:    ineligible at first, eligible from a later order
//!   - non-ZC:      never eligible
//! Eligible orders run at a higher ticket and a shorter gap, and may
//! carry a redemption.

use crate::{
    rng::{DrawKind, DrawStream, SeedBank},
    transaction::Transaction,
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub customers:           usize,
    pub start_date:          NaiveDate,
    /// Length of the observed period.
    pub days:                u32,
    pub zc_acquired_share:   f64,
    /// Share of the remaining customers that adopt later.
    pub adopter_share:       f64,
    /// Pareto scale and shape of a customer's base ticket.
    pub ticket_min:          f64,
    pub ticket_alpha:        f64,
    pub ticket_cap:          f64,
    /// Ticket multiplier on eligible orders.
    pub zc_ticket_uplift:    f64,
    pub mean_gap_days:       f64,
    /// Gap divisor on eligible orders.
    pub zc_frequency_uplift: f64,
    /// Probability the customer never returns after an order.
    pub churn_per_order:     f64,
    pub redemption_rate:     f64,
    /// ZRD discount as a fraction of the order revenue.
    pub discount_share:      f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            customers:           500,
            start_date:          NaiveDate::from_ymd_opt(2025, 4, 1).unwrap_or_default(),
            days:                180,
            zc_acquired_share:   0.35,
            adopter_share:       0.30,
            ticket_min:          60.0,
            ticket_alpha:        2.5,
            ticket_cap:          2_500.0,
            zc_ticket_uplift:    1.25,
            mean_gap_days:       24.0,
            zc_frequency_uplift: 1.4,
            churn_per_order:     0.18,
            redemption_rate:     0.55,
            discount_share:      0.10,
        }
    }
}

impl SyntheticConfig {
    pub fn with_customers(customers: usize) -> Self {
        Self { customers, ..Self::default() }
    }

    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(i64::from(self.days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persona {
    ZcAcquired,
    /// Becomes eligible on this zero-based order.
    Adopter { from_order: u32 },
    NonZc,
}

fn money(value: f64) -> Decimal {
    Decimal::new((value * 100.0).round() as i64, 2)
}

/// Generate a full transaction table, ordered by date then customer.
pub fn generate(config: &SyntheticConfig, seed: u64) -> Vec<Transaction> {
    let bank = SeedBank::new(seed);
    let mut customers = bank.stream(DrawKind::Customers);
    let mut orders = bank.stream(DrawKind::Orders);
    let mut amounts = bank.stream(DrawKind::Amounts);
    let mut discounts = bank.stream(DrawKind::Discounts);

    let end = config.end_date();
    // Leave the last third of the period for repeat orders.
    let acquisition_days = u64::from((config.days * 2 / 3).max(1));

    let mut transactions = Vec::new();
    for i in 0..config.customers {
        let customer_id = format!("p-{i:06}");
        let first_date = config.start_date + Duration::days(customers.below(acquisition_days) as i64);
        let persona = if customers.chance(config.zc_acquired_share) {
            Persona::ZcAcquired
        } else if customers.chance(config.adopter_share) {
            Persona::Adopter { from_order: 1 + customers.below(3) as u32 }
        } else {
            Persona::NonZc
        };
        let base_ticket = amounts.ticket(config.ticket_min, config.ticket_alpha, config.ticket_cap);

        let mut date = first_date;
        let mut order = 0u32;
        while date <= end {
            let eligible = match persona {
                Persona::ZcAcquired => true,
                Persona::Adopter { from_order } => order >= from_order,
                Persona::NonZc => false,
            };
            // Adopters are guaranteed a second order so the adoption event can happen.
            let keep_going = matches!(persona, Persona::Adopter { from_order } if order < from_order);

            transactions.push(draw_order(
                config,
                &customer_id,
                first_date,
                date,
                base_ticket,
                eligible,
                &mut amounts,
                &mut discounts,
            ));

            if !keep_going && orders.chance(config.churn_per_order) {
                break;
            }
            let mean_gap = if eligible {
                config.mean_gap_days / config.zc_frequency_uplift
            } else {
                config.mean_gap_days
            };
            date += Duration::days(orders.gap_days(mean_gap));
            order += 1;
        }
    }

    transactions.sort_by(|a, b| (a.bill_date, &a.customer_id).cmp(&(b.bill_date, &b.customer_id)));
    for (row, txn) in transactions.iter_mut().enumerate() {
        txn.row = row;
        txn.bill_id = Some(format!("b-{row:07}"));
    }

    log::info!(
        "synthetic: seed={seed} generated {} transactions for {} customers",
        transactions.len(),
        config.customers
    );
    transactions
}

#[allow(clippy::too_many_arguments)]
fn draw_order(
    config: &SyntheticConfig,
    customer_id: &str,
    first_date: NaiveDate,
    date: NaiveDate,
    base_ticket: f64,
    eligible: bool,
    amounts: &mut DrawStream,
    discounts: &mut DrawStream,
) -> Transaction {
    let uplift = if eligible { config.zc_ticket_uplift } else { 1.0 };
    let revenue = base_ticket * uplift * amounts.between(0.6, 1.4);

    let redeemed = eligible && discounts.chance(config.redemption_rate);
    let (zrd, freebee, promo_code) = if redeemed {
        let freebee = if discounts.chance(0.1) { money(discounts.between(5.0, 15.0)) } else { Decimal::ZERO };
        (money(revenue * config.discount_share), freebee, Some("ZRD10".to_string()))
    } else {
        (Decimal::ZERO, Decimal::ZERO, None)
    };

    Transaction {
        row:                  0,
        bill_id:              None,
        customer_id:          customer_id.to_string(),
        bill_date:            date,
        revenue_value:        money(revenue),
        eligibility_flag:     eligible,
        first_bill_date:      first_date,
        zrd_promo_discount:   zrd,
        other_promo_discount: Decimal::ZERO,
        freebee_cost:         freebee,
        promo_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_customer_has_a_first_order() {
        let config = SyntheticConfig::with_customers(50);
        let txns = generate(&config, 7);
        let mut ids: Vec<&str> = txns.iter().map(|t| t.customer_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
        assert!(txns.iter().all(|t| t.bill_date >= config.start_date));
        assert!(txns.iter().all(|t| t.revenue_value > Decimal::ZERO));
    }

    #[test]
    fn rows_are_renumbered_in_date_order() {
        let txns = generate(&SyntheticConfig::with_customers(30), 11);
        assert!(txns.windows(2).all(|w| w[0].bill_date <= w[1].bill_date));
        assert!(txns.iter().enumerate().all(|(i, t)| t.row == i));
    }

    #[test]
    fn only_eligible_orders_redeem() {
        let txns = generate(&SyntheticConfig::with_customers(200), 3);
        assert!(txns.iter().filter(|t| t.is_redemption()).all(|t| t.eligibility_flag));
        assert!(txns.iter().any(|t| t.is_redemption()));
    }
}
