// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::thresholds::check_thresholds;
use crate::error::{CostError, Result};
use crate::models::{Notification, NotificationKind};
use crate::utils::{maybe_print_json, parse_date, pretty_table};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("check", sub)) => {
            let today = match sub.get_one::<String>("date") {
                Some(s) => parse_date(s)?,
                None => Utc::now().date_naive(),
            };
            let created = record_threshold_alerts(conn, today)?;
            println!("{} new budget alert(s)", created.len());
        }
        Some(("list", sub)) => {
            let items = list_notifications(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                let rows = items
                    .into_iter()
                    .map(|n| {
                        vec![
                            n.id.to_string(),
                            n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                            n.title,
                            n.message,
                            if n.read { "" } else { "unread" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "When", "Title", "Message", ""], rows)
                );
            }
        }
        Some(("read", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim().parse::<i64>()?;
            mark_read(conn, id)?;
            println!("Marked notification {} as read", id);
        }
        Some(("read-all", _)) => {
            let n = mark_all_read(conn)?;
            println!("Marked {} notification(s) as read", n);
        }
        _ => {}
    }
    Ok(())
}

/// Stores one alert per exceeded budget and period window. Re-running inside the same
/// window adds nothing. Returns the notifications created by this call.
pub fn record_threshold_alerts(conn: &Connection, today: NaiveDate) -> Result<Vec<Notification>> {
    let mut created = Vec::new();
    for status in check_thresholds(conn, today)? {
        let b = &status.budget;
        let title = format!("Budget alert: {}", b.entity_name);
        let message = format!(
            "{} has used {}% of its {} {} {} budget ({} of {} spent since {}).",
            b.entity_name,
            status.percentage,
            b.period,
            b.amount,
            b.currency,
            status.current_spend,
            b.amount,
            status.window_start
        );
        let now = Utc::now();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO notifications(kind, title, message, budget_id, window_start, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                NotificationKind::BudgetAlert,
                title,
                message,
                b.id,
                status.window_start.to_string(),
                now.to_rfc3339()
            ],
        )?;
        if inserted == 1 {
            info!(budget_id = b.id, percentage = %status.percentage, "budget alert recorded");
            created.push(Notification {
                id: conn.last_insert_rowid(),
                kind: NotificationKind::BudgetAlert,
                title,
                message,
                budget_id: Some(b.id),
                created_at: now,
                read: false,
            });
        }
    }
    Ok(created)
}

/// Adds a free-form system notice.
pub fn notify_system(conn: &Connection, title: &str, message: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications(kind, title, message, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![NotificationKind::System, title, message, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_notifications(conn: &Connection) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, title, message, budget_id, created_at, read_at IS NOT NULL
         FROM notifications ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, NotificationKind>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, Option<i64>>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, bool>(6)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, kind, title, message, budget_id, created, read) = row?;
        let created_at = DateTime::parse_from_rfc3339(&created)
            .map_err(|_| CostError::Internal(format!("Invalid timestamp '{}'", created)))?
            .with_timezone(&Utc);
        out.push(Notification {
            id,
            kind,
            title,
            message,
            budget_id,
            created_at,
            read,
        });
    }
    Ok(out)
}

pub fn unread_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE read_at IS NULL",
        [],
        |r| r.get(0),
    )?)
}

pub fn mark_read(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute(
        "UPDATE notifications SET read_at=COALESCE(read_at, ?1) WHERE id=?2",
        params![Utc::now().to_rfc3339(), id],
    )?;
    if n == 0 {
        return Err(CostError::not_found("notification", id));
    }
    Ok(())
}

pub fn mark_all_read(conn: &Connection) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE notifications SET read_at=?1 WHERE read_at IS NULL",
        params![Utc::now().to_rfc3339()],
    )?)
}
