// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::costs::{StoredCosts, department_totals};
use crate::error::Result;
use crate::utils::{get_base_currency, maybe_print_json, parse_decimal, pretty_table};
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

impl Issue {
    fn new(kind: &'static str, detail: String) -> Self {
        Self { kind, detail }
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    let issues = diagnose(conn)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn diagnose(conn: &Connection) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();

    // 1) Stored totals that drifted from their buckets
    let mut stmt = conn.prepare(
        "SELECT year, month, scope, label, data_cost, calls_cost, sms_cost, other_cost, total_cost
         FROM cost_breakdowns ORDER BY year, month, scope, label",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let year: i32 = r.get(0)?;
        let month: u32 = r.get(1)?;
        let scope: String = r.get(2)?;
        let label: String = r.get(3)?;
        let stored = StoredCosts::read(r, 4)?;
        let derived = stored.costs()?.total_cost();
        let total = parse_decimal(&stored.total)?;
        if derived != total {
            issues.push(Issue::new(
                "breakdown_total_mismatch",
                format!(
                    "{:04}-{:02} {} {}: stored {} vs buckets {}",
                    year, month, scope, label, total, derived
                ),
            ));
        }
    }

    // 2) Department rows that do not add up to the company row
    let tolerance = Decimal::new(1, 2);
    for (period, (dept_total, count)) in department_totals(conn)? {
        let company: Option<String> = conn
            .query_row(
                "SELECT total_cost FROM cost_breakdowns WHERE year=?1 AND month=?2 AND scope='company'",
                (period.year, period.month),
                |r| r.get(0),
            )
            .optional()?;
        let Some(company) = company else {
            issues.push(Issue::new(
                "breakdown_missing_company",
                period.to_string(),
            ));
            continue;
        };
        let company = parse_decimal(&company)?;
        if (company - dept_total).abs() > tolerance * Decimal::from(count) {
            issues.push(Issue::new(
                "department_reconciliation",
                format!("{}: departments {} vs company {}", period, dept_total, company),
            ));
        }
    }

    // 3) Budgets whose scope fields disagree
    let mut stmt = conn.prepare(
        "SELECT id, entity_type FROM budgets
         WHERE (entity_type='company' AND entity_id IS NOT NULL)
            OR (entity_type!='company' AND entity_id IS NULL)
            OR (entity_type='line' AND entity_id NOT IN (SELECT id FROM lines))
            OR (entity_type='department' AND entity_id NOT IN (SELECT id FROM departments))",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let kind: String = r.get(1)?;
        issues.push(Issue::new(
            "budget_scope",
            format!("budget {} ({}) has no valid entity", id, kind),
        ));
    }

    // 4) FX coverage gaps: usage in a non-base currency without a rate on or before its date
    let base = get_base_currency(conn)?;
    let mut stmt = conn.prepare(
        "SELECT MIN(date), currency FROM usage_records WHERE currency != ?1 GROUP BY currency",
    )?;
    let mut cur = stmt.query([&base])?;
    while let Some(r) = cur.next()? {
        let d: String = r.get(0)?;
        let ccy: String = r.get(1)?;
        let mut st = conn.prepare_cached(
            "SELECT 1 FROM fx_rates
             WHERE ((base=?1 AND quote=?2) OR (base=?2 AND quote=?1)) AND date<=?3 LIMIT 1",
        )?;
        let ok: Option<i32> = st.query_row((&base, &ccy, &d), |r| r.get(0)).optional()?;
        if ok.is_none() {
            issues.push(Issue::new("missing_fx", format!("{} {}", d, ccy)));
        }
    }

    Ok(issues)
}
