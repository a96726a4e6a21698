// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::lines::{get_department, get_line};
use crate::commands::thresholds::budget_status;
use crate::error::{CostError, Result};
use crate::models::{Budget, BudgetPeriod, Currency, EntityType, SpendingSummary};
use crate::utils::{
    fx_convert, get_base_currency, id_for_department, id_for_line, maybe_print_json,
    parse_date, parse_decimal, percentage_of, pretty_table,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

pub const DEFAULT_ALERT_THRESHOLD: i64 = 80;

fn default_threshold() -> i64 {
    DEFAULT_ALERT_THRESHOLD
}

fn default_currency() -> Currency {
    Currency::Eur
}

/// Create/update payload. Dates stay strings so a malformed date is reported as a
/// validation failure rather than a body parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BudgetInput {
    pub entity_type: EntityType,
    #[serde(default)]
    pub entity_id: Option<i64>,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 100, message = "alert_threshold must be between 1 and 100"))]
    pub alert_threshold: i64,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

struct ValidBudget {
    entity_id: Option<i64>,
    entity_name: String,
    alert_threshold: u8,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

fn validate_input(conn: &Connection, input: &BudgetInput) -> Result<ValidBudget> {
    input.validate()?;
    if input.amount <= Decimal::ZERO {
        return Err(CostError::validation("amount must be greater than zero"));
    }
    let entity_name = match (input.entity_type, input.entity_id) {
        (EntityType::Company, None) => "Company".to_string(),
        (EntityType::Company, Some(_)) => {
            return Err(CostError::validation(
                "entity_id must be empty for a company budget",
            ));
        }
        (_, None) => {
            return Err(CostError::validation(format!(
                "entity_id is required for a {} budget",
                input.entity_type
            )));
        }
        (EntityType::Line, Some(id)) => {
            let line = get_line(conn, id)
                .map_err(|_| CostError::validation(format!("unknown line id {}", id)))?;
            format!("{} ({})", line.phone_number, line.assigned_to)
        }
        (EntityType::Department, Some(id)) => {
            get_department(conn, id)
                .map_err(|_| CostError::validation(format!("unknown department id {}", id)))?
                .name
        }
    };
    let start_date = parse_date(&input.start_date)?;
    let end_date = match input.end_date.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_date(s)?),
        _ => None,
    };
    if let Some(end) = end_date {
        if end < start_date {
            return Err(CostError::validation("end_date must not be before start_date"));
        }
    }
    let alert_threshold = u8::try_from(input.alert_threshold)
        .map_err(|_| CostError::validation("alert_threshold must be between 1 and 100"))?;
    Ok(ValidBudget {
        entity_id: input.entity_id,
        entity_name,
        alert_threshold,
        start_date,
        end_date,
    })
}

struct BudgetRow {
    id: i64,
    entity_type: EntityType,
    entity_id: Option<i64>,
    entity_name: String,
    amount: String,
    currency: Currency,
    period: BudgetPeriod,
    alert_threshold: i64,
    start_date: String,
    end_date: Option<String>,
    created_at: String,
    updated_at: String,
}

const BUDGET_SELECT: &str = "SELECT id, entity_type, entity_id, entity_name, amount, currency, period,
        alert_threshold, start_date, end_date, created_at, updated_at FROM budgets";

fn read_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<BudgetRow> {
    Ok(BudgetRow {
        id: r.get(0)?,
        entity_type: r.get(1)?,
        entity_id: r.get(2)?,
        entity_name: r.get(3)?,
        amount: r.get(4)?,
        currency: r.get(5)?,
        period: r.get(6)?,
        alert_threshold: r.get(7)?,
        start_date: r.get(8)?,
        end_date: r.get(9)?,
        created_at: r.get(10)?,
        updated_at: r.get(11)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| CostError::Internal(format!("Invalid timestamp '{}' in budgets", s)))
}

impl BudgetRow {
    fn into_budget(self) -> Result<Budget> {
        Ok(Budget {
            id: self.id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            amount: parse_decimal(&self.amount)?,
            currency: self.currency,
            period: self.period,
            alert_threshold: u8::try_from(self.alert_threshold).unwrap_or(u8::MAX),
            start_date: parse_date(&self.start_date)?,
            end_date: self.end_date.as_deref().map(parse_date).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn list_budgets(conn: &Connection) -> Result<Vec<Budget>> {
    let sql = format!("{BUDGET_SELECT} ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_budget()?);
    }
    Ok(out)
}

pub fn get_budget(conn: &Connection, id: i64) -> Result<Budget> {
    let sql = format!("{BUDGET_SELECT} WHERE id=?1");
    conn.query_row(&sql, params![id], read_row)
        .optional()?
        .ok_or_else(|| CostError::not_found("budget", id))?
        .into_budget()
}

pub fn create_budget(conn: &Connection, input: &BudgetInput) -> Result<Budget> {
    let v = validate_input(conn, input)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO budgets(entity_type, entity_id, entity_name, amount, currency, period,
            alert_threshold, start_date, end_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            input.entity_type,
            v.entity_id,
            v.entity_name,
            input.amount.to_string(),
            input.currency,
            input.period,
            v.alert_threshold,
            v.start_date.to_string(),
            v.end_date.map(|d| d.to_string()),
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(budget_id = id, entity = %v.entity_name, "budget created");
    get_budget(conn, id)
}

/// Last write wins; there is no version check between concurrent editors.
pub fn update_budget(conn: &Connection, id: i64, input: &BudgetInput) -> Result<Budget> {
    get_budget(conn, id)?;
    let v = validate_input(conn, input)?;
    conn.execute(
        "UPDATE budgets SET entity_type=?1, entity_id=?2, entity_name=?3, amount=?4, currency=?5,
            period=?6, alert_threshold=?7, start_date=?8, end_date=?9, updated_at=?10
         WHERE id=?11",
        params![
            input.entity_type,
            v.entity_id,
            v.entity_name,
            input.amount.to_string(),
            input.currency,
            input.period,
            v.alert_threshold,
            v.start_date.to_string(),
            v.end_date.map(|d| d.to_string()),
            Utc::now().to_rfc3339(),
            id
        ],
    )?;
    debug!(budget_id = id, "budget updated");
    get_budget(conn, id)
}

pub fn delete_budget(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM budgets WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(CostError::not_found("budget", id));
    }
    info!(budget_id = id, "budget deleted");
    Ok(())
}

/// Totals over budgets active on `today`, both sides converted to the base currency.
pub fn spending_summary(conn: &Connection, today: NaiveDate) -> Result<SpendingSummary> {
    let base = get_base_currency(conn)?;
    let mut total_budget = Decimal::ZERO;
    let mut total_spending = Decimal::ZERO;
    let mut statuses = Vec::new();
    for budget in list_budgets(conn)?
        .into_iter()
        .filter(|b| b.is_active_on(today))
    {
        let status = budget_status(conn, &budget, today)?;
        let ccy = status.budget.currency.as_str();
        total_budget += fx_convert(conn, today, status.budget.amount, ccy, &base)?;
        total_spending += fx_convert(conn, today, status.current_spend, ccy, &base)?;
        statuses.push(status);
    }
    let total_budget = total_budget.round_dp(2);
    let total_spending = total_spending.round_dp(2);
    Ok(SpendingSummary {
        total_budget,
        total_spending,
        overall_percentage: percentage_of(total_spending, total_budget),
        currency: base,
        budgets: statuses,
    })
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = input_from_args(conn, sub)?;
            let b = create_budget(conn, &input)?;
            println!(
                "Budget {} set for {} = {} {} ({}, alert at {}%)",
                b.id, b.entity_name, b.amount, b.currency, b.period, b.alert_threshold
            );
        }
        Some(("edit", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim().parse::<i64>()?;
            let input = input_from_args(conn, sub)?;
            let b = update_budget(conn, id, &input)?;
            println!("Budget {} updated for {}", b.id, b.entity_name);
        }
        Some(("rm", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim().parse::<i64>()?;
            delete_budget(conn, id)?;
            println!("Removed budget {}", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("summary", sub)) => summary(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn input_from_args(conn: &Connection, sub: &clap::ArgMatches) -> Result<BudgetInput> {
    let entity_type = sub
        .get_one::<String>("scope")
        .unwrap()
        .parse::<EntityType>()?;
    let entity_id = match (entity_type, sub.get_one::<String>("entity")) {
        (EntityType::Line, Some(phone)) => Some(id_for_line(conn, phone)?),
        (EntityType::Department, Some(name)) => Some(id_for_department(conn, name)?),
        (EntityType::Company, Some(_)) => {
            return Err(CostError::validation(
                "--entity cannot be used with a company budget",
            ));
        }
        (_, None) => None,
    };
    Ok(BudgetInput {
        entity_type,
        entity_id,
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        currency: sub
            .get_one::<String>("currency")
            .map(|s| s.parse::<Currency>())
            .transpose()?
            .unwrap_or_else(default_currency),
        period: sub
            .get_one::<String>("period")
            .map(|s| s.parse::<BudgetPeriod>())
            .transpose()?
            .unwrap_or_default(),
        alert_threshold: sub
            .get_one::<String>("threshold")
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| CostError::validation(format!("invalid threshold '{}'", s)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_ALERT_THRESHOLD),
        start_date: sub
            .get_one::<String>("start")
            .cloned()
            .unwrap_or_else(|| Utc::now().date_naive().to_string()),
        end_date: sub.get_one::<String>("end").cloned(),
    })
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let budgets = list_budgets(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budgets)? {
        return Ok(());
    }
    let rows = budgets
        .into_iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.entity_type.to_string(),
                b.entity_name,
                format!("{:.2}", b.amount),
                b.currency.to_string(),
                b.period.to_string(),
                format!("{}%", b.alert_threshold),
                b.start_date.to_string(),
                b.end_date.map(|d| d.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "ID", "Scope", "Entity", "Amount", "CCY", "Period", "Alert", "Start", "End"
            ],
            rows
        )
    );
    Ok(())
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => Utc::now().date_naive(),
    };
    let s = spending_summary(conn, today)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
        return Ok(());
    }
    let rows = s
        .budgets
        .iter()
        .map(|st| {
            vec![
                st.budget.entity_name.clone(),
                format!("{:.2} {}", st.budget.amount, st.budget.currency),
                format!("{:.2}", st.current_spend),
                format!("{}%", st.percentage),
                if st.exceeded { "ALERT" } else { "" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Entity", "Budget", "Spent", "Used", ""], rows)
    );
    println!(
        "Total: {:.2} of {:.2} {} ({}%)",
        s.total_spending, s.total_budget, s.currency, s.overall_percentage
    );
    Ok(())
}
