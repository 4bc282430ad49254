//! CSV transaction loader.
//!
//! Validates the header against the fixed schema, coerces every cell
//! into a typed Transaction and applies the configured parse policy.
//! Required CSV columns:
//!   patient-id, bill_date, revenue-value, eligibility_flag,
//!   first-bill-date, zrd_promo_discount, freebee_cost
//! Optional:
//!   id, bill-flag, promo-code, other_promo_discount

use crate::{
    config::{LoaderConfig, ParsePolicy},
    error::{AnalyticsError, AnalyticsResult},
    event::AnalysisEvent,
    transaction::Transaction,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::str::FromStr;

pub const COL_CUSTOMER_ID: &str = "patient-id";
pub const COL_BILL_DATE: &str = "bill_date";
pub const COL_REVENUE: &str = "revenue-value";
pub const COL_ELIGIBILITY: &str = "eligibility_flag";
pub const COL_FIRST_BILL_DATE: &str = "first-bill-date";
pub const COL_ZRD_DISCOUNT: &str = "zrd_promo_discount";
pub const COL_FREEBEE_COST: &str = "freebee_cost";

pub const COL_BILL_ID: &str = "id";
pub const COL_BILL_FLAG: &str = "bill-flag";
pub const COL_PROMO_CODE: &str = "promo-code";
pub const COL_OTHER_DISCOUNT: &str = "other_promo_discount";

pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_CUSTOMER_ID,
    COL_BILL_DATE,
    COL_REVENUE,
    COL_ELIGIBILITY,
    COL_FIRST_BILL_DATE,
    COL_ZRD_DISCOUNT,
    COL_FREEBEE_COST,
];

/// The loader's output: validated transactions plus what was dropped.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub transactions:  Vec<Transaction>,
    pub rows_read:     usize,
    pub rows_filtered: usize,
    pub rows_skipped:  usize,
    pub events:        Vec<AnalysisEvent>,
}

/// Load transactions from any CSV reader.
pub fn load_transactions<R: Read>(reader: R, config: &LoaderConfig) -> AnalyticsResult<LoadedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(csv_reader.headers()?)?;

    let mut transactions = Vec::new();
    let mut events = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_filtered = 0usize;
    let mut rows_skipped = 0usize;

    for (index, result) in csv_reader.records().enumerate() {
        rows_read += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => match columns.row_error(&e, index + 1) {
                Some(err) => {
                    skip_or_abort(err, config.parse_policy, &mut rows_skipped, &mut events)?;
                    continue;
                }
                None => return Err(e.into()),
            },
        };

        if config.gross_only {
            if let Some(flag) = columns.optional(&record, COL_BILL_FLAG) {
                if !flag.eq_ignore_ascii_case("gross") {
                    rows_filtered += 1;
                    log::debug!("loader: row {} filtered (bill-flag '{flag}')", index + 1);
                    continue;
                }
            }
        }

        match parse_row(&columns, &record, index) {
            Ok(txn) => transactions.push(txn),
            Err(err) => skip_or_abort(err, config.parse_policy, &mut rows_skipped, &mut events)?,
        }
    }

    if rows_filtered > 0 {
        events.push(AnalysisEvent::RowsFiltered {
            reason: "bill-flag is not gross".into(),
            count:  rows_filtered,
        });
    }

    log::info!(
        "loader: read {rows_read} rows, kept {}, filtered {rows_filtered}, skipped {rows_skipped}",
        transactions.len()
    );

    Ok(LoadedTable {
        transactions,
        rows_read,
        rows_filtered,
        rows_skipped,
        events,
    })
}

/// Under Skip a row-level Parse error becomes a RowSkipped event;
/// anything else is returned.
fn skip_or_abort(
    err: AnalyticsError,
    policy: ParsePolicy,
    rows_skipped: &mut usize,
    events: &mut Vec<AnalysisEvent>,
) -> AnalyticsResult<()> {
    match err {
        AnalyticsError::Parse { row, field, value } if policy == ParsePolicy::Skip => {
            log::warn!("loader: skipping row {row}: field '{field}' has unconvertible value '{value}'");
            *rows_skipped += 1;
            events.push(AnalysisEvent::RowSkipped { row, field, value });
            Ok(())
        }
        err => Err(err),
    }
}

/// Load transactions from a CSV file path.
pub fn load_transactions_file(path: &str, config: &LoaderConfig) -> AnalyticsResult<LoadedTable> {
    let file = std::fs::File::open(path)?;
    load_transactions(file, config)
}

/// Write transactions back out in the loader's schema.
pub fn write_transactions<W: Write>(writer: W, transactions: &[Transaction]) -> AnalyticsResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        COL_BILL_ID,
        COL_CUSTOMER_ID,
        COL_BILL_DATE,
        COL_REVENUE,
        COL_ELIGIBILITY,
        COL_FIRST_BILL_DATE,
        COL_ZRD_DISCOUNT,
        COL_OTHER_DISCOUNT,
        COL_FREEBEE_COST,
        COL_PROMO_CODE,
        COL_BILL_FLAG,
    ])?;
    for t in transactions {
        csv_writer.write_record([
            t.bill_id.clone().unwrap_or_default(),
            t.customer_id.clone(),
            t.bill_date.format("%Y-%m-%d").to_string(),
            t.revenue_value.to_string(),
            if t.eligibility_flag { "1".into() } else { "0".into() },
            t.first_bill_date.format("%Y-%m-%d").to_string(),
            t.zrd_promo_discount.to_string(),
            t.other_promo_discount.to_string(),
            t.freebee_cost.to_string(),
            t.promo_code.clone().unwrap_or_default(),
            "gross".into(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

// ── Header handling ──────────────────────────────────────────────────────────

struct ColumnIndex {
    positions: HashMap<String, usize>,
    names:     Vec<String>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> AnalyticsResult<Self> {
        let names: Vec<String> = headers.iter().map(|name| name.trim().to_string()).collect();
        let positions: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !positions.contains_key(**col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalyticsError::Schema { missing });
        }
        Ok(Self { positions, names })
    }

    fn required<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }

    /// A record the csv reader itself rejected, as a Parse error on the
    /// offending column. None for errors that are not tied to one row.
    fn row_error(&self, err: &csv::Error, row: usize) -> Option<AnalyticsError> {
        match err.kind() {
            csv::ErrorKind::Utf8 { err, .. } => Some(AnalyticsError::Parse {
                row,
                field: self.names.get(err.field()).cloned().unwrap_or_else(|| format!("column {}", err.field() + 1)),
                value: "<invalid UTF-8>".into(),
            }),
            csv::ErrorKind::UnequalLengths { len, .. } => Some(AnalyticsError::Parse {
                row,
                field: "record".into(),
                value: format!("{len} fields"),
            }),
            _ => None,
        }
    }

    fn optional<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.positions.get(column).and_then(|&i| record.get(i))
    }
}

// ── Row parsing ──────────────────────────────────────────────────────────────

fn parse_row(columns: &ColumnIndex, record: &csv::StringRecord, index: usize) -> AnalyticsResult<Transaction> {
    let row = index + 1;
    let fail = |field: &str, value: &str| AnalyticsError::Parse {
        row,
        field: field.to_string(),
        value: value.to_string(),
    };

    let customer_id = columns.required(record, COL_CUSTOMER_ID);
    if customer_id.is_empty() {
        return Err(fail(COL_CUSTOMER_ID, customer_id));
    }

    let raw = columns.required(record, COL_BILL_DATE);
    let bill_date = parse_date(raw).ok_or_else(|| fail(COL_BILL_DATE, raw))?;

    let raw = columns.required(record, COL_REVENUE);
    let revenue_value = parse_decimal(raw).ok_or_else(|| fail(COL_REVENUE, raw))?;

    let raw = columns.required(record, COL_ELIGIBILITY);
    let eligibility_flag = parse_bool(raw).ok_or_else(|| fail(COL_ELIGIBILITY, raw))?;

    let raw = columns.required(record, COL_FIRST_BILL_DATE);
    let first_bill_date = parse_date(raw).ok_or_else(|| fail(COL_FIRST_BILL_DATE, raw))?;

    let raw = columns.required(record, COL_ZRD_DISCOUNT);
    let zrd_promo_discount = parse_discount(raw).ok_or_else(|| fail(COL_ZRD_DISCOUNT, raw))?;

    let raw = columns.required(record, COL_FREEBEE_COST);
    let freebee_cost = parse_discount(raw).ok_or_else(|| fail(COL_FREEBEE_COST, raw))?;

    let other_promo_discount = match columns.optional(record, COL_OTHER_DISCOUNT) {
        Some(raw) => parse_discount(raw).ok_or_else(|| fail(COL_OTHER_DISCOUNT, raw))?,
        None => Decimal::ZERO,
    };

    Ok(Transaction {
        row: index,
        bill_id: non_empty(columns.optional(record, COL_BILL_ID)),
        customer_id: customer_id.to_string(),
        bill_date,
        revenue_value,
        eligibility_flag,
        first_bill_date,
        zrd_promo_discount,
        other_promo_discount,
        freebee_cost,
        promo_code: non_empty(columns.optional(record, COL_PROMO_CODE)),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Accepts `YYYY-MM-DD` or `DD-MM-YYYY`, optionally followed by a
/// ` HH:MM:SS` / `THH:MM:SS` time part which is discarded.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let (date_part, time_part) = match s.find(|c: char| c == ' ' || c == 'T') {
        Some(i) => (&s[..i], Some(s[i + 1..].trim())),
        None => (s, None),
    };
    if let Some(time) = time_part {
        NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d-%m-%Y"))
        .ok()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Discount cells may be blank; blank means no discount.
fn parse_discount(raw: &str) -> Option<Decimal> {
    if raw.trim().is_empty() {
        Some(Decimal::ZERO)
    } else {
        parse_decimal(raw)
    }
}

/// Flexible bool: "true"/"false", "1"/"0", "yes"/"no", "y"/"n".
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}
