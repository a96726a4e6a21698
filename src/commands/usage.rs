// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{CostError, Result};
use crate::models::{BillingMonth, CostCategory, UsageRecord};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use csv::ReaderBuilder;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::{HashMap, hash_map::Entry};
use std::path::Path;
use tracing::info;

/// One raw billing line as entered on the CLI or read from an import file.
#[derive(Debug, Clone)]
pub struct UsageInput {
    pub phone_number: String,
    pub date: String,
    pub category: String,
    pub amount: String,
    pub currency: String,
    pub description: Option<String>,
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = UsageInput {
                phone_number: sub.get_one::<String>("phone").unwrap().clone(),
                date: sub.get_one::<String>("date").unwrap().clone(),
                category: sub.get_one::<String>("category").unwrap().clone(),
                amount: sub.get_one::<String>("amount").unwrap().clone(),
                currency: sub.get_one::<String>("currency").unwrap().clone(),
                description: sub.get_one::<String>("description").cloned(),
            };
            let rec = record_usage(conn, &input)?;
            println!(
                "Recorded {} {} {} on {} for {}",
                rec.amount,
                rec.currency,
                rec.category,
                rec.date,
                input.phone_number.trim()
            );
        }
        Some(("import", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let n = import_usage(conn, Path::new(path))?;
            println!("Imported {} usage records from {}", n, path);
        }
        Some(("list", sub)) => {
            let month = sub
                .get_one::<String>("month")
                .map(|s| s.parse::<BillingMonth>())
                .transpose()?;
            let data = list_usage(conn, month)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|u| {
                        vec![
                            u.date.to_string(),
                            u.line_id.to_string(),
                            u.category.to_string(),
                            format!("{:.2}", u.amount),
                            u.currency,
                            u.description.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["Date", "Line", "Category", "Amount", "CCY", "Description"],
                        rows
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn normalize_currency(raw: &str) -> Result<String> {
    let ccy = raw.trim().to_uppercase();
    if ccy.len() != 3 || !ccy.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CostError::validation(format!(
            "invalid currency code '{}'",
            raw.trim()
        )));
    }
    Ok(ccy)
}

fn insert_usage(conn: &Connection, line_id: i64, input: &UsageInput) -> Result<UsageRecord> {
    let date = parse_date(&input.date)?;
    let category = input.category.parse::<CostCategory>()?;
    let amount = parse_decimal(&input.amount)?;
    if amount < Decimal::ZERO {
        return Err(CostError::validation(format!(
            "usage amount must not be negative, got {}",
            amount
        )));
    }
    let currency = normalize_currency(&input.currency)?;
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    conn.execute(
        "INSERT INTO usage_records(line_id, date, category, amount, currency, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            line_id,
            date.to_string(),
            category,
            amount.to_string(),
            currency,
            description
        ],
    )?;
    Ok(UsageRecord {
        id: conn.last_insert_rowid(),
        line_id,
        date,
        category,
        amount,
        currency,
        description,
    })
}

fn line_id_for(conn: &Connection, phone: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM lines WHERE phone_number=?1",
        params![phone.trim()],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| CostError::validation(format!("unknown line '{}'", phone.trim())))
}

pub fn record_usage(conn: &Connection, input: &UsageInput) -> Result<UsageRecord> {
    let line_id = line_id_for(conn, &input.phone_number)?;
    insert_usage(conn, line_id, input)
}

/// Imports `date,phone_number,category,amount,currency,description` rows atomically.
pub fn import_usage(conn: &mut Connection, path: &Path) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let tx = conn.transaction()?;
    let mut line_cache: HashMap<String, i64> = HashMap::new();
    let mut count = 0usize;

    for (idx, result) in rdr.records().enumerate() {
        let rec = result?;
        let row = idx + 2;
        let field = |i: usize, name: &str| -> Result<String> {
            rec.get(i)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| CostError::validation(format!("row {}: {} missing", row, name)))
        };
        let input = UsageInput {
            date: field(0, "date")?,
            phone_number: field(1, "phone_number")?,
            category: field(2, "category")?,
            amount: field(3, "amount")?,
            currency: field(4, "currency")?,
            description: rec.get(5).map(str::to_string),
        };

        let line_id = match line_cache.entry(input.phone_number.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => *entry.insert(line_id_for(&tx, &input.phone_number)?),
        };
        insert_usage(&tx, line_id, &input).map_err(|e| match e {
            CostError::Validation(msg) => CostError::validation(format!("row {}: {}", row, msg)),
            other => other,
        })?;
        count += 1;
    }
    tx.commit()?;
    info!(records = count, path = %path.display(), "usage import committed");
    Ok(count)
}

pub fn list_usage(conn: &Connection, month: Option<BillingMonth>) -> Result<Vec<UsageRecord>> {
    let mut sql = String::from(
        "SELECT id, line_id, date, category, amount, currency, description FROM usage_records",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(m) = month {
        sql.push_str(" WHERE date>=?1 AND date<=?2");
        params_vec.push(m.first_day().to_string());
        params_vec.push(m.last_day().to_string());
    }
    sql.push_str(" ORDER BY date DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let date: String = r.get(2)?;
        let amount: String = r.get(4)?;
        out.push(UsageRecord {
            id: r.get(0)?,
            line_id: r.get(1)?,
            date: parse_date(&date)?,
            category: r.get(3)?,
            amount: parse_decimal(&amount)?,
            currency: r.get(5)?,
            description: r.get(6)?,
        });
    }
    Ok(out)
}
