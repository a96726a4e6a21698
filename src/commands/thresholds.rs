// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::budgets::list_budgets;
use crate::error::Result;
use crate::models::{Budget, BudgetStatus, EntityType};
use crate::utils::{
    budget_window, fx_convert, maybe_print_json, parse_date, parse_decimal, percentage_of,
    pretty_table,
};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, ToSql};
use rust_decimal::Decimal;
use tracing::debug;

/// `spend / amount * 100 >= threshold`, evaluated without division.
pub fn is_exceeded(spend: Decimal, amount: Decimal, alert_threshold: u8) -> bool {
    spend * Decimal::ONE_HUNDRED >= Decimal::from(alert_threshold) * amount
}

/// Usage inside `[from, to]` for the budget's scope, converted to the budget currency.
/// Unrounded; callers round only what they report.
pub fn current_spend(
    conn: &Connection,
    budget: &Budget,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal> {
    let mut sql = String::from(
        "SELECT u.date, u.amount, u.currency FROM usage_records u
         JOIN lines l ON u.line_id=l.id
         WHERE u.date>=?1 AND u.date<=?2",
    );
    let from_s = from.to_string();
    let to_s = to.to_string();
    let mut p: Vec<&dyn ToSql> = vec![&from_s, &to_s];
    match (budget.entity_type, &budget.entity_id) {
        (EntityType::Line, Some(id)) => {
            sql.push_str(" AND u.line_id=?3");
            p.push(id);
        }
        (EntityType::Department, Some(id)) => {
            sql.push_str(" AND l.department_id=?3");
            p.push(id);
        }
        _ => {}
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(p.as_slice())?;
    let target = budget.currency.as_str();
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let date: String = r.get(0)?;
        let amount: String = r.get(1)?;
        let ccy: String = r.get(2)?;
        total += fx_convert(conn, parse_date(&date)?, parse_decimal(&amount)?, &ccy, target)?;
    }
    Ok(total)
}

pub fn budget_status(conn: &Connection, budget: &Budget, today: NaiveDate) -> Result<BudgetStatus> {
    let (window_start, window_end) =
        budget_window(budget.period, budget.start_date, budget.end_date, today);
    let spend = current_spend(conn, budget, window_start, window_end)?;
    Ok(BudgetStatus {
        budget: budget.clone(),
        current_spend: spend.round_dp(2),
        percentage: percentage_of(spend, budget.amount),
        window_start,
        window_end,
        exceeded: is_exceeded(spend, budget.amount, budget.alert_threshold),
    })
}

/// Budgets active on `today` whose spend in the current window reached the alert threshold.
/// Read only.
pub fn check_thresholds(conn: &Connection, today: NaiveDate) -> Result<Vec<BudgetStatus>> {
    let mut exceeded = Vec::new();
    for budget in list_budgets(conn)? {
        if !budget.is_active_on(today) {
            continue;
        }
        let status = budget_status(conn, &budget, today)?;
        debug!(
            budget_id = budget.id,
            spend = %status.current_spend,
            percentage = %status.percentage,
            exceeded = status.exceeded,
            "threshold evaluated"
        );
        if status.exceeded {
            exceeded.push(status);
        }
    }
    Ok(exceeded)
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    let today = match m.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => Utc::now().date_naive(),
    };
    let exceeded = check_thresholds(conn, today)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &exceeded)? {
        return Ok(());
    }
    if exceeded.is_empty() {
        println!("No budget has reached its alert threshold on {}", today);
        return Ok(());
    }
    let rows = exceeded
        .into_iter()
        .map(|s| {
            vec![
                s.budget.id.to_string(),
                s.budget.entity_name,
                format!("{:.2} {}", s.budget.amount, s.budget.currency),
                format!("{:.2}", s.current_spend),
                format!("{}%", s.percentage),
                format!("{}%", s.budget.alert_threshold),
                format!("{}..{}", s.window_start, s.window_end),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Entity", "Budget", "Spent", "Used", "Alert", "Window"],
            rows
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn boundary_is_inclusive() {
        assert!(is_exceeded(dec!(800), dec!(1000), 80));
        assert!(!is_exceeded(dec!(799.99), dec!(1000), 80));
        assert!(is_exceeded(dec!(1000), dec!(1000), 100));
    }
}
