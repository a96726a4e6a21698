// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{CostError, Result};
use crate::models::User;
use crate::utils::{maybe_print_json, pretty_table};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: String,
    pub company: Option<String>,
    #[validate(
        length(min = 8, message = "password must be at least 8 characters"),
        custom(function = "fits_bcrypt")
    )]
    pub password: String,
}

// bcrypt only looks at the first 72 bytes
fn fits_bcrypt(password: &str) -> std::result::Result<(), ValidationError> {
    if password.len() > 72 {
        return Err(ValidationError::new("password_too_long")
            .with_message("password must be at most 72 bytes".into()));
    }
    Ok(())
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewUser {
                email: sub.get_one::<String>("email").unwrap().clone(),
                name: sub.get_one::<String>("name").unwrap().clone(),
                company: sub.get_one::<String>("company").cloned(),
                password: sub.get_one::<String>("password").unwrap().clone(),
            };
            let user = create_user(conn, &input)?;
            println!("Created user {} <{}>", user.id, user.email);
        }
        Some(("list", sub)) => {
            let users = list_users(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &users)? {
                let rows = users
                    .into_iter()
                    .map(|u| {
                        vec![
                            u.id.to_string(),
                            u.email,
                            u.name,
                            u.company.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Email", "Name", "Company"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn create_user(conn: &Connection, input: &NewUser) -> Result<User> {
    create_user_with_cost(conn, input, DEFAULT_COST)
}

/// Same as [`create_user`] with an explicit bcrypt work factor.
pub fn create_user_with_cost(conn: &Connection, input: &NewUser, cost: u32) -> Result<User> {
    input.validate()?;
    let email = input.email.trim().to_lowercase();
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email=?1",
            params![email],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(CostError::validation(format!(
            "a user with email {} already exists",
            email
        )));
    }
    let password_hash = hash(&input.password, cost)?;
    let company = input
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    conn.execute(
        "INSERT INTO users(email, name, company, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            email,
            input.name.trim(),
            company,
            password_hash,
            Utc::now().to_rfc3339()
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id = id, "user created");
    get_user(conn, id)
}

const USER_SELECT: &str = "SELECT id, email, name, company, created_at FROM users";

fn read_user(r: &rusqlite::Row<'_>) -> rusqlite::Result<(User, String)> {
    Ok((
        User {
            id: r.get(0)?,
            email: r.get(1)?,
            name: r.get(2)?,
            company: r.get(3)?,
            created_at: DateTime::<Utc>::MIN_UTC,
        },
        r.get(4)?,
    ))
}

fn finish(row: (User, String)) -> Result<User> {
    let (mut user, created) = row;
    user.created_at = DateTime::parse_from_rfc3339(&created)
        .map_err(|_| CostError::Internal(format!("Invalid timestamp '{}' in users", created)))?
        .with_timezone(&Utc);
    Ok(user)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User> {
    let sql = format!("{USER_SELECT} WHERE id=?1");
    let row = conn
        .query_row(&sql, params![id], read_user)
        .optional()?
        .ok_or_else(|| CostError::not_found("user", id))?;
    finish(row)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let sql = format!("{USER_SELECT} ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_user)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(finish(row?)?);
    }
    Ok(out)
}

/// Checks credentials. Unknown email and wrong password fail the same way.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    let found: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email=?1",
            params![email],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((id, password_hash)) = found else {
        warn!("login for unknown email");
        return Err(CostError::Auth("invalid email or password".to_string()));
    };
    if !verify(password, &password_hash)? {
        warn!(user_id = id, "login with wrong password");
        return Err(CostError::Auth("invalid email or password".to_string()));
    }
    get_user(conn, id)
}
