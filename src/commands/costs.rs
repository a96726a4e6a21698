// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{CostError, Result};
use crate::models::{
    BillingMonth, CategoryBreakdown, CostCategory, Costs, DepartmentBreakdown, LineBreakdown,
    TrendPoint,
};
use crate::utils::{
    fx_convert, get_base_currency, maybe_print_json, parse_date, parse_decimal, parse_month,
    pretty_table,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub const UNASSIGNED: &str = "Unassigned";
pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const MAX_TREND_MONTHS: u32 = 60;

const SCOPE_COMPANY: &str = "company";
const SCOPE_LINE: &str = "line";
const SCOPE_DEPARTMENT: &str = "department";

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("generate", sub)) => {
            let month = parse_month(sub.get_one::<String>("month").unwrap())?;
            let b = generate_breakdown(conn, month)?;
            println!(
                "Generated breakdown for {}: total {:.2} {}",
                month,
                b.costs.total_cost(),
                b.currency
            );
        }
        Some(("category", sub)) => {
            let month = parse_month(sub.get_one::<String>("month").unwrap())?;
            let b = cost_by_category(conn, month)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &b)? {
                if !b.generated {
                    println!("No breakdown generated for {} yet", month);
                    return Ok(());
                }
                println!(
                    "{}",
                    pretty_table(&["Period", "Data", "Calls", "SMS", "Other", "Total"], {
                        let mut r = vec![month.to_string()];
                        r.extend(cost_cells(&b.costs));
                        vec![r]
                    })
                );
            }
        }
        Some(("line", sub)) => {
            let month = parse_month(sub.get_one::<String>("month").unwrap())?;
            let data = cost_by_line(conn, month)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|l| {
                        let mut r = vec![l.phone_number, l.assigned_to];
                        r.extend(cost_cells(&l.costs));
                        r
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["Phone", "Assigned To", "Data", "Calls", "SMS", "Other", "Total"],
                        rows
                    )
                );
            }
        }
        Some(("department", sub)) => {
            let month = parse_month(sub.get_one::<String>("month").unwrap())?;
            let data = cost_by_department(conn, month)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|d| {
                        let mut r = vec![d.department, d.line_count.to_string()];
                        r.extend(cost_cells(&d.costs));
                        r
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["Department", "Lines", "Data", "Calls", "SMS", "Other", "Total"],
                        rows
                    )
                );
            }
        }
        Some(("trends", sub)) => {
            let months = *sub.get_one::<u32>("months").unwrap_or(&DEFAULT_TREND_MONTHS);
            let data = cost_trends(conn, months)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|t| {
                        let mut r = vec![t.period];
                        r.extend(cost_cells(&t.costs));
                        r
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Period", "Data", "Calls", "SMS", "Other", "Total"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn cost_cells(c: &Costs) -> Vec<String> {
    vec![
        format!("{:.2}", c.data_cost),
        format!("{:.2}", c.calls_cost),
        format!("{:.2}", c.sms_cost),
        format!("{:.2}", c.other_cost),
        format!("{:.2}", c.total_cost()),
    ]
}

#[derive(Default)]
struct DepartmentAcc {
    name: String,
    line_count: i64,
    costs: Costs,
}

/// Recomputes every breakdown row for `month` from raw usage, replacing what was stored.
/// Amounts are converted to the base currency at the rate of each usage date.
pub fn generate_breakdown(conn: &mut Connection, month: BillingMonth) -> Result<CategoryBreakdown> {
    let base = get_base_currency(conn)?;
    let tx = conn.transaction()?;

    // Every active line gets a row, even without usage.
    let mut lines: BTreeMap<i64, Costs> = BTreeMap::new();
    let mut departments: BTreeMap<Option<i64>, DepartmentAcc> = BTreeMap::new();
    {
        let mut stmt = tx.prepare("SELECT id, name FROM departments")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, name) = row?;
            departments.insert(
                Some(id),
                DepartmentAcc {
                    name,
                    ..Default::default()
                },
            );
        }
        let mut stmt = tx.prepare("SELECT id, department_id FROM lines WHERE active=1")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Option<i64>>(1)?)))?;
        for row in rows {
            let (line_id, dept_id) = row?;
            lines.insert(line_id, Costs::default());
            department_entry(&mut departments, dept_id).line_count += 1;
        }
    }

    let mut company = Costs::default();
    {
        let mut stmt = tx.prepare(
            "SELECT u.line_id, l.department_id, l.active, u.date, u.category, u.amount, u.currency
             FROM usage_records u JOIN lines l ON u.line_id=l.id
             WHERE u.date>=?1 AND u.date<=?2",
        )?;
        let mut rows = stmt.query(params![
            month.first_day().to_string(),
            month.last_day().to_string()
        ])?;
        while let Some(r) = rows.next()? {
            let line_id: i64 = r.get(0)?;
            let dept_id: Option<i64> = r.get(1)?;
            let active = r.get::<_, i64>(2)? != 0;
            let date: String = r.get(3)?;
            let category: CostCategory = r.get(4)?;
            let amount: String = r.get(5)?;
            let ccy: String = r.get(6)?;
            let amt = fx_convert(&tx, parse_date(&date)?, parse_decimal(&amount)?, &ccy, &base)?;

            company = company.charge(category, amt);
            let dept = department_entry(&mut departments, dept_id);
            dept.costs = dept.costs.charge(category, amt);
            if active {
                let line = lines.entry(line_id).or_default();
                *line = line.charge(category, amt);
            }
        }
    }

    // Unassigned only shows up when something lands in it.
    departments.retain(|id, acc| id.is_some() || acc.line_count > 0 || !acc.costs.is_zero());

    tx.execute(
        "DELETE FROM cost_breakdowns WHERE year=?1 AND month=?2",
        params![month.year, month.month],
    )?;
    let generated_at = Utc::now().to_rfc3339();
    let company = company.rounded();
    insert_row(
        &tx,
        month,
        SCOPE_COMPANY,
        None,
        "Company",
        0,
        &company,
        &base,
        &generated_at,
    )?;
    for (line_id, costs) in &lines {
        let phone: String = tx.query_row(
            "SELECT phone_number FROM lines WHERE id=?1",
            params![line_id],
            |r| r.get(0),
        )?;
        insert_row(
            &tx,
            month,
            SCOPE_LINE,
            Some(*line_id),
            &phone,
            0,
            &costs.rounded(),
            &base,
            &generated_at,
        )?;
    }
    for (dept_id, acc) in &departments {
        insert_row(
            &tx,
            month,
            SCOPE_DEPARTMENT,
            *dept_id,
            &acc.name,
            acc.line_count,
            &acc.costs.rounded(),
            &base,
            &generated_at,
        )?;
    }
    tx.commit()?;
    info!(
        period = %month,
        lines = lines.len(),
        departments = departments.len(),
        total = %company.total_cost(),
        "cost breakdown generated"
    );

    Ok(CategoryBreakdown {
        year: month.year,
        month: month.month,
        currency: base,
        generated: true,
        costs: company,
    })
}

fn department_entry(
    departments: &mut BTreeMap<Option<i64>, DepartmentAcc>,
    dept_id: Option<i64>,
) -> &mut DepartmentAcc {
    departments.entry(dept_id).or_insert_with(|| DepartmentAcc {
        name: UNASSIGNED.to_string(),
        ..Default::default()
    })
}

#[allow(clippy::too_many_arguments)]
fn insert_row(
    tx: &Transaction<'_>,
    month: BillingMonth,
    scope: &str,
    scope_id: Option<i64>,
    label: &str,
    line_count: i64,
    costs: &Costs,
    currency: &str,
    generated_at: &str,
) -> Result<()> {
    tx.execute(
        "INSERT INTO cost_breakdowns(year, month, scope, scope_id, label, line_count,
            data_cost, calls_cost, sms_cost, other_cost, total_cost, currency, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            month.year,
            month.month,
            scope,
            scope_id,
            label,
            line_count,
            costs.data_cost.to_string(),
            costs.calls_cost.to_string(),
            costs.sms_cost.to_string(),
            costs.other_cost.to_string(),
            costs.total_cost().to_string(),
            currency,
            generated_at
        ],
    )?;
    Ok(())
}

/// Bucket columns as stored. The persisted total is not trusted; `Costs` re-derives it.
pub(crate) struct StoredCosts {
    pub data: String,
    pub calls: String,
    pub sms: String,
    pub other: String,
    pub total: String,
}

impl StoredCosts {
    pub(crate) fn read(r: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            data: r.get(first)?,
            calls: r.get(first + 1)?,
            sms: r.get(first + 2)?,
            other: r.get(first + 3)?,
            total: r.get(first + 4)?,
        })
    }

    pub(crate) fn costs(&self) -> Result<Costs> {
        Ok(Costs::new(
            parse_decimal(&self.data)?,
            parse_decimal(&self.calls)?,
            parse_decimal(&self.sms)?,
            parse_decimal(&self.other)?,
        ))
    }
}

const COST_COLUMNS: &str = "data_cost, calls_cost, sms_cost, other_cost, total_cost";

/// Company-wide buckets for `month`; zero-filled with `generated = false` when nothing was generated.
pub fn cost_by_category(conn: &Connection, month: BillingMonth) -> Result<CategoryBreakdown> {
    let sql = format!(
        "SELECT currency, {COST_COLUMNS} FROM cost_breakdowns
         WHERE year=?1 AND month=?2 AND scope='{SCOPE_COMPANY}'"
    );
    let row = conn
        .query_row(&sql, params![month.year, month.month], |r| {
            Ok((r.get::<_, String>(0)?, StoredCosts::read(r, 1)?))
        })
        .optional()?;
    match row {
        Some((currency, stored)) => Ok(CategoryBreakdown {
            year: month.year,
            month: month.month,
            currency,
            generated: true,
            costs: stored.costs()?,
        }),
        None => Ok(CategoryBreakdown {
            year: month.year,
            month: month.month,
            currency: get_base_currency(conn)?,
            generated: false,
            costs: Costs::default(),
        }),
    }
}

pub fn cost_by_line(conn: &Connection, month: BillingMonth) -> Result<Vec<LineBreakdown>> {
    let sql = format!(
        "SELECT b.scope_id, b.label, IFNULL(l.assigned_to, ''), d.name, {cols}
         FROM cost_breakdowns b
         LEFT JOIN lines l ON b.scope_id=l.id
         LEFT JOIN departments d ON l.department_id=d.id
         WHERE b.year=?1 AND b.month=?2 AND b.scope='{SCOPE_LINE}'
         ORDER BY b.label",
        cols = "b.data_cost, b.calls_cost, b.sms_cost, b.other_cost, b.total_cost"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![month.year, month.month], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            StoredCosts::read(r, 4)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (line_id, phone_number, assigned_to, department, stored) = row?;
        out.push(LineBreakdown {
            line_id,
            phone_number,
            assigned_to,
            department,
            costs: stored.costs()?,
        });
    }
    Ok(out)
}

pub fn cost_by_department(
    conn: &Connection,
    month: BillingMonth,
) -> Result<Vec<DepartmentBreakdown>> {
    let sql = format!(
        "SELECT scope_id, label, line_count, {COST_COLUMNS} FROM cost_breakdowns
         WHERE year=?1 AND month=?2 AND scope='{SCOPE_DEPARTMENT}'
         ORDER BY scope_id IS NULL, label"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![month.year, month.month], |r| {
        Ok((
            r.get::<_, Option<i64>>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            StoredCosts::read(r, 3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (department_id, department, line_count, stored) = row?;
        out.push(DepartmentBreakdown {
            department_id,
            department,
            line_count,
            costs: stored.costs()?,
        });
    }
    Ok(out)
}

/// Up to `months` most recent generated periods, oldest first. Periods never generated are omitted.
pub fn cost_trends(conn: &Connection, months: u32) -> Result<Vec<TrendPoint>> {
    if !(1..=MAX_TREND_MONTHS).contains(&months) {
        return Err(CostError::validation(format!(
            "months must be between 1 and {MAX_TREND_MONTHS}, got {months}"
        )));
    }
    let sql = format!(
        "SELECT year, month, {COST_COLUMNS} FROM cost_breakdowns
         WHERE scope='{SCOPE_COMPANY}'
         ORDER BY year DESC, month DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![months], |r| {
        Ok((
            r.get::<_, i32>(0)?,
            r.get::<_, u32>(1)?,
            StoredCosts::read(r, 2)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (year, month, stored) = row?;
        let period = BillingMonth::new(year, month)?;
        out.push(TrendPoint {
            year,
            month,
            period: period.to_string(),
            costs: stored.costs()?,
        });
    }
    out.reverse();
    Ok(out)
}

/// Sum of stored department totals per generated period, for reconciliation checks.
pub(crate) fn department_totals(
    conn: &Connection,
) -> Result<HashMap<BillingMonth, (rust_decimal::Decimal, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT year, month, data_cost, calls_cost, sms_cost, other_cost, total_cost
         FROM cost_breakdowns WHERE scope='department'",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i32>(0)?,
            r.get::<_, u32>(1)?,
            StoredCosts::read(r, 2)?,
        ))
    })?;
    let mut out: HashMap<BillingMonth, (rust_decimal::Decimal, usize)> = HashMap::new();
    for row in rows {
        let (year, month, stored) = row?;
        let entry = out.entry(BillingMonth::new(year, month)?).or_default();
        entry.0 += stored.costs()?.total_cost();
        entry.1 += 1;
    }
    Ok(out)
}
