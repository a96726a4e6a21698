// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{CostError, Result};
use crate::utils::{
    fx_convert, get_base_currency, http_client, maybe_print_json, parse_date, parse_decimal,
    pretty_table, set_base_currency,
};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

const FRANKFURTER: &str = "https://api.frankfurter.dev";

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("set-base", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            set_base_currency(conn, &ccy)?;
            println!("Base currency set to {}", ccy);
        }
        Some(("set", sub)) => {
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let quote = sub.get_one::<String>("quote").unwrap();
            let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
            let base = get_base_currency(conn)?;
            set_rate(conn, date, &base, quote, rate)?;
            println!("1 {} = {} {} from {}", base, rate, quote.to_uppercase(), date);
        }
        Some(("fetch", sub)) => {
            let days: i64 = *sub.get_one::<i64>("days").unwrap_or(&120);
            let n = fetch_rates(conn, days)?;
            println!("Stored {} FX rates via Frankfurter (ECB).", n);
        }
        Some(("list", sub)) => {
            let rates = list_rates(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rates)? {
                let rows = rates
                    .into_iter()
                    .map(|r| vec![r.date.to_string(), r.base, r.quote, r.rate.to_string()])
                    .collect();
                println!("{}", pretty_table(&["Date", "Base", "Quote", "Rate"], rows));
            }
        }
        Some(("convert", sub)) => {
            let date = parse_date(sub.get_one::<String>("date").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let from = sub.get_one::<String>("from").unwrap().to_uppercase();
            let to = sub.get_one::<String>("to").unwrap().to_uppercase();
            let res = fx_convert(conn, date, amount, &from, &to)?;
            println!("{} {} -> {:.4} {}", amount, from, res, to);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxRate {
    pub date: NaiveDate,
    pub base: String,
    pub quote: String,
    pub rate: Decimal,
}

/// Stores `1 base = rate quote` for `date`, replacing any rate already there.
pub fn set_rate(
    conn: &Connection,
    date: NaiveDate,
    base: &str,
    quote: &str,
    rate: Decimal,
) -> Result<()> {
    let quote = quote.trim().to_uppercase();
    if quote.len() != 3 || !quote.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CostError::validation(format!("Invalid currency code '{}'", quote)));
    }
    if rate <= Decimal::ZERO {
        return Err(CostError::validation("rate must be greater than zero"));
    }
    conn.execute(
        "INSERT INTO fx_rates(date, base, quote, rate) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(date, base, quote) DO UPDATE SET rate=excluded.rate",
        params![date.to_string(), base, quote, rate.to_string()],
    )?;
    Ok(())
}

pub fn list_rates(conn: &Connection) -> Result<Vec<FxRate>> {
    let mut stmt = conn.prepare(
        "SELECT date, base, quote, rate FROM fx_rates ORDER BY date DESC, base, quote LIMIT 50",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (d, base, quote, rate) = row?;
        out.push(FxRate {
            date: parse_date(&d)?,
            base,
            quote,
            rate: parse_decimal(&rate)?,
        });
    }
    Ok(out)
}

/// Every currency that usage or budgets are recorded in.
pub fn distinct_currencies(conn: &Connection) -> Result<Vec<String>> {
    let mut out = Vec::<String>::new();
    for sql in [
        "SELECT DISTINCT currency FROM usage_records",
        "SELECT DISTINCT currency FROM budgets",
    ] {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        for row in rows {
            let c: String = row?;
            if !c.is_empty() && !out.contains(&c) {
                out.push(c);
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct Series {
    rates: HashMap<String, HashMap<String, Decimal>>,
}

fn fetch_rates(conn: &Connection, days: i64) -> Result<usize> {
    let base = get_base_currency(conn)?;
    let today = Utc::now().date_naive();
    let start = today - chrono::Duration::days(days.max(1));
    let targets: Vec<String> = distinct_currencies(conn)?
        .into_iter()
        .filter(|c| c != &base)
        .collect();
    if targets.is_empty() {
        info!("no non-base currencies in use, nothing to fetch");
        return Ok(0);
    }
    let to_param = targets.join(",");
    let url = format!("{FRANKFURTER}/{start}..{today}?from={base}&to={to_param}");
    let client = http_client()?;
    let resp = client
        .get(&url)
        .send()
        .map_err(|e| CostError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        warn!(status = %resp.status(), %url, "fx fetch rejected");
        return Err(CostError::Network(format!("FX provider returned {}", resp.status())));
    }
    let s: Series = resp.json()?;
    let mut n = 0;
    for (date, mp) in s.rates {
        for (quote, rate) in mp {
            n += conn.execute(
                "INSERT OR IGNORE INTO fx_rates(date, base, quote, rate) VALUES (?1, ?2, ?3, ?4)",
                params![date, base, quote, rate.to_string()],
            )?;
        }
    }
    info!(stored = n, base = %base, "fx rates fetched");
    Ok(n)
}
