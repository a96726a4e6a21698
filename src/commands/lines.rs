// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{CostError, Result};
use crate::models::{Department, Line};
use crate::utils::{id_for_department, maybe_print_json, pretty_table};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{6,15}$").expect("static regex"));

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let phone = sub.get_one::<String>("phone").unwrap();
            let assigned = sub.get_one::<String>("assigned-to").unwrap();
            let dept = sub.get_one::<String>("department").map(|s| s.as_str());
            let line = add_line(conn, phone, assigned, dept)?;
            println!(
                "Added line {} ({}){}",
                line.phone_number,
                line.assigned_to,
                line.department
                    .map(|d| format!(" in {}", d))
                    .unwrap_or_default()
            );
        }
        Some(("list", sub)) => {
            let lines = list_lines(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &lines)? {
                let rows = lines
                    .into_iter()
                    .map(|l| {
                        vec![
                            l.phone_number,
                            l.assigned_to,
                            l.department.unwrap_or_default(),
                            if l.active { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Phone", "Assigned To", "Department", "Active"], rows)
                );
            }
        }
        Some(("deactivate", sub)) => {
            let phone = sub.get_one::<String>("phone").unwrap();
            deactivate_line(conn, phone)?;
            println!("Deactivated line {}", phone.trim());
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_department(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let dept = add_department(conn, name)?;
            println!("Added department '{}'", dept.name);
        }
        Some(("list", sub)) => {
            let depts = list_departments(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &depts)? {
                let rows = depts
                    .into_iter()
                    .map(|d| vec![d.id.to_string(), d.name])
                    .collect();
                println!("{}", pretty_table(&["ID", "Name"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn add_department(conn: &Connection, name: &str) -> Result<Department> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CostError::validation("department name must not be empty"));
    }
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM departments WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(CostError::validation(format!(
            "department '{}' already exists",
            name
        )));
    }
    conn.execute("INSERT INTO departments(name) VALUES (?1)", params![name])?;
    Ok(Department {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn list_departments(conn: &Connection) -> Result<Vec<Department>> {
    let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(Department {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_department(conn: &Connection, id: i64) -> Result<Department> {
    conn.query_row(
        "SELECT id, name FROM departments WHERE id=?1",
        params![id],
        |r| {
            Ok(Department {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| CostError::not_found("department", id))
}

pub fn add_line(
    conn: &Connection,
    phone_number: &str,
    assigned_to: &str,
    department: Option<&str>,
) -> Result<Line> {
    let phone = phone_number.trim();
    if !PHONE.is_match(phone) {
        return Err(CostError::validation(format!(
            "invalid phone number '{}'",
            phone
        )));
    }
    let assigned = assigned_to.trim();
    if assigned.is_empty() {
        return Err(CostError::validation("assigned_to must not be empty"));
    }
    let dept_id = match department.map(str::trim).filter(|d| !d.is_empty()) {
        Some(name) => Some(id_for_department(conn, name).map_err(|_| {
            CostError::validation(format!("unknown department '{}'", name))
        })?),
        None => None,
    };
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM lines WHERE phone_number=?1",
            params![phone],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(CostError::validation(format!(
            "line {} already exists",
            phone
        )));
    }
    conn.execute(
        "INSERT INTO lines(phone_number, assigned_to, department_id) VALUES (?1, ?2, ?3)",
        params![phone, assigned, dept_id],
    )?;
    get_line(conn, conn.last_insert_rowid())
}

const LINE_SELECT: &str = "SELECT l.id, l.phone_number, l.assigned_to, l.department_id, d.name, l.active
     FROM lines l LEFT JOIN departments d ON l.department_id=d.id";

fn line_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Line> {
    Ok(Line {
        id: r.get(0)?,
        phone_number: r.get(1)?,
        assigned_to: r.get(2)?,
        department_id: r.get(3)?,
        department: r.get(4)?,
        active: r.get::<_, i64>(5)? != 0,
    })
}

pub fn get_line(conn: &Connection, id: i64) -> Result<Line> {
    let sql = format!("{LINE_SELECT} WHERE l.id=?1");
    conn.query_row(&sql, params![id], line_from_row)
        .optional()?
        .ok_or_else(|| CostError::not_found("line", id))
}

pub fn list_lines(conn: &Connection) -> Result<Vec<Line>> {
    let sql = format!("{LINE_SELECT} ORDER BY l.phone_number");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], line_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn deactivate_line(conn: &Connection, phone_number: &str) -> Result<()> {
    let n = conn.execute(
        "UPDATE lines SET active=0 WHERE phone_number=?1",
        params![phone_number.trim()],
    )?;
    if n == 0 {
        return Err(CostError::not_found("line", phone_number.trim()));
    }
    Ok(())
}
