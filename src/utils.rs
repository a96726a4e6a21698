// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::error::{CostError, Result};
use crate::models::{BillingMonth, BudgetPeriod};

const UA: &str = concat!(
    "costdesk/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/costdesk)"
);

pub const DEFAULT_BASE_CURRENCY: &str = "EUR";

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn user_agent() -> &'static str {
    UA
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        CostError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", s.trim()))
    })
}

pub fn parse_month(s: &str) -> Result<BillingMonth> {
    s.parse::<BillingMonth>()
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| CostError::validation(format!("Invalid decimal '{}'", s.trim())))
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_line(conn: &Connection, phone_number: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM lines WHERE phone_number=?1")?;
    stmt.query_row(params![phone_number.trim()], |r| r.get(0))
        .optional()?
        .ok_or_else(|| CostError::not_found("line", phone_number.trim()))
}

pub fn id_for_department(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM departments WHERE name=?1")?;
    stmt.query_row(params![name.trim()], |r| r.get(0))
        .optional()?
        .ok_or_else(|| CostError::not_found("department", name.trim()))
}

// Base currency settings
pub fn get_base_currency(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='base_currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()))
}

pub fn set_base_currency(conn: &Connection, ccy: &str) -> Result<()> {
    let ccy = ccy.trim().to_uppercase();
    if ccy.len() != 3 || !ccy.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CostError::validation(format!("Invalid currency code '{}'", ccy)));
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('base_currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

/// Convert an amount from 'from_ccy' to 'to_ccy' using the closest on-or-before rate.
/// Rates are stored base->quote. If the pair is not found directly we go through the
/// base currency hub, then try the reciprocal, and finally leave the amount unchanged.
pub fn fx_convert(
    conn: &Connection,
    date: NaiveDate,
    amount: Decimal,
    from_ccy: &str,
    to_ccy: &str,
) -> Result<Decimal> {
    if from_ccy.eq_ignore_ascii_case(to_ccy) {
        return Ok(amount);
    }
    let hub = get_base_currency(conn)?;

    fn find_rate(
        conn: &Connection,
        date: NaiveDate,
        base: &str,
        quote: &str,
    ) -> Result<Option<Decimal>> {
        let mut stmt = conn.prepare_cached(
            "SELECT rate FROM fx_rates WHERE base=?1 AND quote=?2 AND date<=?3 ORDER BY date DESC LIMIT 1",
        )?;
        let r: Option<String> = stmt
            .query_row(params![base, quote, date.to_string()], |r| r.get(0))
            .optional()?;
        match r {
            Some(s) => {
                let d = s.parse::<Decimal>().map_err(|_| {
                    CostError::Internal(format!("Invalid rate '{}' for {}/{}", s, base, quote))
                })?;
                Ok(Some(d))
            }
            None => Ok(None),
        }
    }

    if to_ccy == hub {
        if let Some(r) = find_rate(conn, date, &hub, from_ccy)? {
            if r.is_zero() {
                return Ok(amount);
            }
            return Ok(amount / r);
        }
    } else if from_ccy == hub {
        if let Some(r) = find_rate(conn, date, &hub, to_ccy)? {
            return Ok(amount * r);
        }
    } else {
        let base_amt = fx_convert(conn, date, amount, from_ccy, &hub)?;
        return fx_convert(conn, date, base_amt, &hub, to_ccy);
    }

    // Try reciprocal last
    if let Some(r) = find_rate(conn, date, to_ccy, from_ccy)? {
        if r.is_zero() {
            return Ok(amount);
        }
        return Ok(amount / r);
    }

    Ok(amount)
}

/// Calendar window of `period` that contains `today`.
pub fn period_window(period: BudgetPeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month = BillingMonth::containing(today);
    let (first, last) = match period {
        BudgetPeriod::Monthly => (month, month),
        BudgetPeriod::Quarterly => {
            let start = (today.month() - 1) / 3 * 3 + 1;
            let first = BillingMonth {
                year: today.year(),
                month: start,
            };
            let last = BillingMonth {
                year: today.year(),
                month: start + 2,
            };
            (first, last)
        }
        BudgetPeriod::Yearly => (
            BillingMonth {
                year: today.year(),
                month: 1,
            },
            BillingMonth {
                year: today.year(),
                month: 12,
            },
        ),
    };
    (first.first_day(), last.last_day())
}

/// Period window clipped to the budget's own start and end dates.
pub fn budget_window(
    period: BudgetPeriod,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let (from, to) = period_window(period, today);
    let from = from.max(start_date);
    let to = match end_date {
        Some(end) => to.min(end),
        None => to,
    };
    (from, to)
}

/// Spend as a percentage of `amount`, rounded for display. Zero when `amount` is zero.
pub fn percentage_of(spend: Decimal, amount: Decimal) -> Decimal {
    if amount.is_zero() {
        return Decimal::ZERO;
    }
    (spend / amount * Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn quarter_window_covers_three_months() {
        let (from, to) = period_window(BudgetPeriod::Quarterly, d("2024-05-17"));
        assert_eq!(from, d("2024-04-01"));
        assert_eq!(to, d("2024-06-30"));
    }

    #[test]
    fn budget_window_is_clipped_to_start_and_end() {
        let (from, to) = budget_window(
            BudgetPeriod::Yearly,
            d("2024-03-10"),
            Some(d("2024-09-30")),
            d("2024-06-01"),
        );
        assert_eq!(from, d("2024-03-10"));
        assert_eq!(to, d("2024-09-30"));
    }

    #[test]
    fn percentage_guards_zero_amount() {
        assert_eq!(percentage_of(Decimal::TEN, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            percentage_of(Decimal::new(850, 0), Decimal::new(1000, 0)),
            Decimal::new(85, 0)
        );
    }

    #[test]
    fn invalid_date_is_a_validation_error() {
        let err = parse_date("2024-02-30").unwrap_err();
        assert!(matches!(err, CostError::Validation(_)));
    }
}
