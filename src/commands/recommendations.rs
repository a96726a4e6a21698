// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Savings suggestions are curated records. Nothing here derives them from usage.

use crate::error::{CostError, Result};
use crate::models::{OptimizationRecommendation, RecommendationDetails};
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let savings = parse_decimal(sub.get_one::<String>("savings").unwrap())?;
            let details: RecommendationDetails =
                serde_json::from_str(sub.get_one::<String>("details").unwrap())?;
            let rec = add_recommendation(conn, savings, &details)?;
            println!("Added recommendation {} ({} saved)", rec.id, rec.potential_savings);
        }
        Some(("import", sub)) => {
            let path = sub.get_one::<String>("path").unwrap();
            let n = import_recommendations(conn, Path::new(path))?;
            println!("Imported {} recommendations", n);
        }
        Some(("list", sub)) => {
            let recs = list_recommendations(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &recs)? {
                let rows = recs
                    .into_iter()
                    .map(|r| vec![r.id.to_string(), describe(&r.details), r.potential_savings.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Suggestion", "Savings"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

fn describe(d: &RecommendationDetails) -> String {
    match d {
        RecommendationDetails::DataPlanDowngrade {
            phone_number,
            current_plan,
            suggested_plan,
            ..
        } => format!("{phone_number}: {current_plan} -> {suggested_plan}"),
        RecommendationDetails::SharedDataPlan {
            department,
            line_count,
            ..
        } => format!("shared data plan for {department} ({line_count} lines)"),
        RecommendationDetails::InternationalCallingPlan { phone_number, .. } => {
            format!("international calling plan for {phone_number}")
        }
    }
}

pub fn add_recommendation(
    conn: &Connection,
    potential_savings: Decimal,
    details: &RecommendationDetails,
) -> Result<OptimizationRecommendation> {
    if potential_savings < Decimal::ZERO {
        return Err(CostError::validation("potential_savings must not be negative"));
    }
    conn.execute(
        "INSERT INTO recommendations(potential_savings, details) VALUES (?1, ?2)",
        params![potential_savings.to_string(), serde_json::to_string(details)?],
    )?;
    Ok(OptimizationRecommendation {
        id: conn.last_insert_rowid(),
        potential_savings,
        details: details.clone(),
    })
}

#[derive(serde::Deserialize)]
struct ImportedRecommendation {
    potential_savings: Decimal,
    #[serde(flatten)]
    details: RecommendationDetails,
}

/// Loads a JSON array of recommendations, all or nothing.
pub fn import_recommendations(conn: &Connection, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)?;
    let items: Vec<ImportedRecommendation> = serde_json::from_str(&raw)?;
    let tx = conn.unchecked_transaction()?;
    for item in &items {
        add_recommendation(&tx, item.potential_savings, &item.details)?;
    }
    tx.commit()?;
    Ok(items.len())
}

pub fn list_recommendations(conn: &Connection) -> Result<Vec<OptimizationRecommendation>> {
    let mut stmt = conn.prepare(
        "SELECT id, potential_savings, details FROM recommendations ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, savings, details) = row?;
        out.push(OptimizationRecommendation {
            id,
            potential_savings: parse_decimal(&savings)?,
            details: serde_json::from_str(&details)?,
        });
    }
    Ok(out)
}
