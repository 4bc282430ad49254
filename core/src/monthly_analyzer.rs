//! Monthly analyzer: the customer-month view of the programme.
//!
//! A customer-month is one customer's activity inside one calendar
//! month. A month is "redeeming" when at least one transaction in it
//! is a redemption, "eligible" when at least one is eligible.

use crate::{
    config::MonthlyConfig,
    stats,
    transaction::Transaction,
    types::{CustomerId, YearMonth},
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMonth {
    pub customer_id:  CustomerId,
    pub month:        YearMonth,
    pub spend:        f64,
    pub transactions: u32,
    pub redeemed:     bool,
    pub eligible:     bool,
    pub zc_discount:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTrend {
    pub month:               YearMonth,
    pub active_customers:    usize,
    pub avg_spend:           Option<f64>,
    pub redeeming_customers: usize,
    pub eligible_customers:  usize,
    pub total_discount:      f64,
    /// Redeeming / eligible customer-months within the month.
    pub redemption_rate:     Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionComparison {
    pub redeeming_months:         usize,
    pub non_redeeming_months:     usize,
    pub avg_spend_redeeming:      Option<f64>,
    pub avg_spend_non_redeeming:  Option<f64>,
    /// Absolute spend difference per customer-month.
    pub spend_difference:         Option<f64>,
    pub spend_lift:               Option<f64>,
    pub avg_orders_redeeming:     Option<f64>,
    pub avg_orders_non_redeeming: Option<f64>,
    pub frequency_lift:           Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRate {
    pub start_month:     Option<YearMonth>,
    pub eligible_months: usize,
    pub redeemed_months: usize,
    pub rate:            Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextMonthRetention {
    /// Redeemers whose following month lies inside the dataset.
    pub customers: usize,
    pub retained:  usize,
    /// Redeemers first redeeming in the final month; not observable.
    pub excluded:  usize,
    pub rate:      Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRoi {
    /// Sum of ZC discounts over every customer-month.
    pub total_investment:           f64,
    pub incremental_monthly_spend:  Option<f64>,
    pub incremental_lifetime_value: Option<f64>,
    /// Percent. None without investment.
    pub monthly_roi:                Option<f64>,
    pub ltv_roi:                    Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub customer_months:      Vec<CustomerMonth>,
    pub trends:               Vec<MonthTrend>,
    pub comparison:           RedemptionComparison,
    pub redemption:           RedemptionRate,
    pub next_month_retention: NextMonthRetention,
    pub historical_roi:       HistoricalRoi,
}

/// One row per (customer, month), ordered by customer then month.
pub fn customer_months(transactions: &[Transaction]) -> Vec<CustomerMonth> {
    let mut rows: BTreeMap<(&str, YearMonth), CustomerMonth> = BTreeMap::new();
    for txn in transactions {
        let month = YearMonth::of(txn.bill_date);
        let row = rows
            .entry((txn.customer_id.as_str(), month))
            .or_insert_with(|| CustomerMonth {
                customer_id:  txn.customer_id.clone(),
                month,
                spend:        0.0,
                transactions: 0,
                redeemed:     false,
                eligible:     false,
                zc_discount:  0.0,
            });
        row.spend += txn.revenue_f64();
        row.transactions += 1;
        row.redeemed |= txn.is_redemption();
        row.eligible |= txn.eligibility_flag;
        row.zc_discount += txn.zc_discount().to_f64().unwrap_or(0.0);
    }
    rows.into_values().collect()
}

pub fn analyze_monthly(transactions: &[Transaction], config: &MonthlyConfig) -> MonthlyReport {
    let rows = customer_months(transactions);

    let trends = month_trends(&rows);
    let comparison = compare_redeeming(&rows);
    let redemption = redemption_rate(&rows, config.redemption_start_month);
    let next_month_retention = next_month_retention(&rows);
    let historical_roi = historical_roi(&rows, &comparison);

    log::info!(
        "monthly: {} customer-months over {} months, redemption rate {}",
        rows.len(),
        trends.len(),
        redemption
            .rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".into())
    );

    MonthlyReport {
        customer_months: rows,
        trends,
        comparison,
        redemption,
        next_month_retention,
        historical_roi,
    }
}

fn month_trends(rows: &[CustomerMonth]) -> Vec<MonthTrend> {
    let mut by_month: BTreeMap<YearMonth, Vec<&CustomerMonth>> = BTreeMap::new();
    for row in rows {
        by_month.entry(row.month).or_default().push(row);
    }
    by_month
        .into_iter()
        .map(|(month, members)| {
            let spends: Vec<f64> = members.iter().map(|r| r.spend).collect();
            let redeeming = members.iter().filter(|r| r.redeemed).count();
            let eligible = members.iter().filter(|r| r.eligible).count();
            let redeeming_eligible = members.iter().filter(|r| r.eligible && r.redeemed).count();
            MonthTrend {
                month,
                active_customers: members.len(),
                avg_spend: stats::mean(&spends),
                redeeming_customers: redeeming,
                eligible_customers: eligible,
                total_discount: members.iter().map(|r| r.zc_discount).sum(),
                redemption_rate: stats::rate(redeeming_eligible, eligible),
            }
        })
        .collect()
}

fn compare_redeeming(rows: &[CustomerMonth]) -> RedemptionComparison {
    let (redeeming, other): (Vec<&CustomerMonth>, Vec<&CustomerMonth>) = rows.iter().partition(|r| r.redeemed);
    let spend = |rs: &[&CustomerMonth]| stats::mean(&rs.iter().map(|r| r.spend).collect::<Vec<_>>());
    let orders = |rs: &[&CustomerMonth]| stats::mean(&rs.iter().map(|r| r.transactions as f64).collect::<Vec<_>>());

    let (spend_r, spend_n) = (spend(&redeeming), spend(&other));
    let (orders_r, orders_n) = (orders(&redeeming), orders(&other));

    RedemptionComparison {
        redeeming_months: redeeming.len(),
        non_redeeming_months: other.len(),
        avg_spend_redeeming: spend_r,
        avg_spend_non_redeeming: spend_n,
        spend_difference: spend_r.zip(spend_n).map(|(r, n)| r - n),
        spend_lift: spend_r.zip(spend_n).and_then(|(r, n)| stats::relative_lift(r, n)),
        avg_orders_redeeming: orders_r,
        avg_orders_non_redeeming: orders_n,
        frequency_lift: orders_r.zip(orders_n).and_then(|(r, n)| stats::relative_lift(r, n)),
    }
}

fn redemption_rate(rows: &[CustomerMonth], start_month: Option<YearMonth>) -> RedemptionRate {
    let eligible: Vec<&CustomerMonth> = rows
        .iter()
        .filter(|r| r.eligible && start_month.map_or(true, |start| r.month >= start))
        .collect();
    let redeemed = eligible.iter().filter(|r| r.redeemed).count();
    RedemptionRate {
        start_month,
        eligible_months: eligible.len(),
        redeemed_months: redeemed,
        rate: stats::rate(redeemed, eligible.len()),
    }
}

/// Did a customer come back in the calendar month after the first
/// redeeming month.
fn next_month_retention(rows: &[CustomerMonth]) -> NextMonthRetention {
    let Some(last_month) = rows.iter().map(|r| r.month).max() else {
        return NextMonthRetention { customers: 0, retained: 0, excluded: 0, rate: None };
    };

    let mut active: BTreeMap<&str, BTreeSet<YearMonth>> = BTreeMap::new();
    let mut first_redeeming: BTreeMap<&str, YearMonth> = BTreeMap::new();
    for row in rows {
        active.entry(row.customer_id.as_str()).or_default().insert(row.month);
        if row.redeemed {
            first_redeeming
                .entry(row.customer_id.as_str())
                .and_modify(|m| *m = (*m).min(row.month))
                .or_insert(row.month);
        }
    }

    let (observable, excluded): (Vec<(&str, YearMonth)>, Vec<(&str, YearMonth)>) = first_redeeming
        .into_iter()
        .partition(|(_, month)| *month < last_month);
    let retained = observable
        .iter()
        .filter(|(id, month)| active.get(id).is_some_and(|months| months.contains(&month.next())))
        .count();

    NextMonthRetention {
        customers: observable.len(),
        retained,
        excluded: excluded.len(),
        rate: stats::rate(retained, observable.len()),
    }
}

fn historical_roi(rows: &[CustomerMonth], comparison: &RedemptionComparison) -> HistoricalRoi {
    let total_investment: f64 = rows.iter().map(|r| r.zc_discount).sum();

    // Lifetime spend per customer, split by ever-redeemed.
    let mut lifetime: BTreeMap<&str, (f64, bool)> = BTreeMap::new();
    for row in rows {
        let entry = lifetime.entry(row.customer_id.as_str()).or_insert((0.0, false));
        entry.0 += row.spend;
        entry.1 |= row.redeemed;
    }
    let redeemers: Vec<f64> = lifetime.values().filter(|(_, r)| *r).map(|(s, _)| *s).collect();
    let others: Vec<f64> = lifetime.values().filter(|(_, r)| !*r).map(|(s, _)| *s).collect();
    let incremental_lifetime_value = stats::mean(&redeemers).zip(stats::mean(&others)).map(|(r, o)| r - o);

    let roi = |incremental_value: f64| {
        if total_investment > 0.0 {
            Some((incremental_value - total_investment) / total_investment * 100.0)
        } else {
            None
        }
    };

    HistoricalRoi {
        total_investment,
        incremental_monthly_spend: comparison.spend_difference,
        incremental_lifetime_value,
        monthly_roi: comparison
            .spend_difference
            .and_then(|d| roi(d * comparison.redeeming_months as f64)),
        ltv_roi: incremental_lifetime_value.and_then(|d| roi(d * redeemers.len() as f64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn txn(row: usize, customer: &str, date: (i32, u32, u32), revenue: i64, zrd: i64) -> Transaction {
        let bill_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        Transaction {
            row,
            bill_id:              None,
            customer_id:          customer.to_string(),
            bill_date,
            revenue_value:        Decimal::new(revenue, 0),
            eligibility_flag:     true,
            first_bill_date:      bill_date,
            zrd_promo_discount:   Decimal::new(zrd, 0),
            other_promo_discount: Decimal::ZERO,
            freebee_cost:         Decimal::ZERO,
            promo_code:           None,
        }
    }

    #[test]
    fn customer_months_merge_same_month_activity() {
        let rows = customer_months(&[
            txn(0, "a", (2025, 7, 1), 100, 10),
            txn(1, "a", (2025, 7, 20), 50, 0),
            txn(2, "a", (2025, 8, 2), 70, 0),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spend, 150.0);
        assert_eq!(rows[0].transactions, 2);
        assert!(rows[0].redeemed);
        assert!(!rows[1].redeemed);
    }

    #[test]
    fn final_month_redeemers_are_excluded_from_next_month_retention() {
        let rows = customer_months(&[
            txn(0, "a", (2025, 7, 1), 100, 10),
            txn(1, "a", (2025, 8, 1), 100, 0),
            txn(2, "b", (2025, 7, 3), 100, 10),
            txn(3, "c", (2025, 8, 9), 100, 10),
        ]);
        let retention = next_month_retention(&rows);
        assert_eq!(retention.customers, 2);
        assert_eq!(retention.retained, 1);
        assert_eq!(retention.excluded, 1);
        assert_eq!(retention.rate, Some(0.5));
    }

    #[test]
    fn no_investment_means_no_roi() {
        let rows = customer_months(&[txn(0, "a", (2025, 7, 1), 100, 0)]);
        let comparison = compare_redeeming(&rows);
        let roi = historical_roi(&rows, &comparison);
        assert_eq!(roi.total_investment, 0.0);
        assert_eq!(roi.monthly_roi, None);
        assert_eq!(roi.ltv_roi, None);
    }
}
