// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::costs::{cost_by_category, cost_by_department, cost_by_line};
use crate::error::{CostError, Result};
use crate::models::{BillingMonth, BreakdownKind, Costs, ExportFormat};
use crate::utils::parse_month;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing::info;

/// A rendered export, ready to be written to disk or sent as a download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> anyhow::Result<()> {
    // Parse everything before touching the output path.
    let format = m.get_one::<String>("format").unwrap().parse::<ExportFormat>()?;
    let kind = m.get_one::<String>("type").unwrap().parse::<BreakdownKind>()?;
    let month = parse_month(m.get_one::<String>("month").unwrap())?;
    let file = export_breakdown(conn, format, kind, month)?;
    let out = match m.get_one::<String>("out") {
        Some(p) => p.clone(),
        None => file.filename.clone(),
    };
    write_export(&file, Path::new(&out))?;
    println!("Exported {} breakdown for {} to {}", kind, month, out);
    Ok(())
}

pub fn write_export(file: &ExportFile, out: &Path) -> Result<()> {
    std::fs::write(out, &file.bytes)?;
    info!(path = %out.display(), bytes = file.bytes.len(), "export written");
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    period: String,
    scope: &'a str,
    name: String,
    detail: String,
    data_cost: String,
    calls_cost: String,
    sms_cost: String,
    other_cost: String,
    total_cost: String,
    currency: &'a str,
}

fn csv_row<'a>(
    month: BillingMonth,
    scope: &'a str,
    name: String,
    detail: String,
    costs: &Costs,
    currency: &'a str,
) -> CsvRow<'a> {
    CsvRow {
        period: month.to_string(),
        scope,
        name,
        detail,
        data_cost: format!("{:.2}", costs.data_cost),
        calls_cost: format!("{:.2}", costs.calls_cost),
        sms_cost: format!("{:.2}", costs.sms_cost),
        other_cost: format!("{:.2}", costs.other_cost),
        total_cost: format!("{:.2}", costs.total_cost()),
        currency,
    }
}

/// Renders one stored breakdown for `month` as CSV or JSON.
pub fn export_breakdown(
    conn: &Connection,
    format: ExportFormat,
    kind: BreakdownKind,
    month: BillingMonth,
) -> Result<ExportFile> {
    let summary = cost_by_category(conn, month)?;
    let currency = summary.currency.as_str();

    let bytes = match format {
        ExportFormat::Json => {
            let body = match kind {
                BreakdownKind::Category => serde_json::to_value(&summary)?,
                BreakdownKind::Line => json!({
                    "year": month.year,
                    "month": month.month,
                    "currency": currency,
                    "lines": cost_by_line(conn, month)?,
                }),
                BreakdownKind::Department => json!({
                    "year": month.year,
                    "month": month.month,
                    "currency": currency,
                    "departments": cost_by_department(conn, month)?,
                }),
            };
            serde_json::to_vec_pretty(&body)?
        }
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            match kind {
                BreakdownKind::Category => {
                    wtr.serialize(csv_row(
                        month,
                        "company",
                        "Company".to_string(),
                        String::new(),
                        &summary.costs,
                        currency,
                    ))?;
                }
                BreakdownKind::Line => {
                    for l in cost_by_line(conn, month)? {
                        wtr.serialize(csv_row(
                            month,
                            "line",
                            l.phone_number,
                            l.assigned_to,
                            &l.costs,
                            currency,
                        ))?;
                    }
                }
                BreakdownKind::Department => {
                    for d in cost_by_department(conn, month)? {
                        wtr.serialize(csv_row(
                            month,
                            "department",
                            d.department,
                            d.line_count.to_string(),
                            &d.costs,
                            currency,
                        ))?;
                    }
                }
            }
            wtr.into_inner()
                .map_err(|e| CostError::Internal(format!("flush csv export: {}", e)))?
        }
    };

    let (ext, content_type) = match format {
        ExportFormat::Csv => ("csv", "text/csv; charset=utf-8"),
        ExportFormat::Json => ("json", "application/json"),
    };
    Ok(ExportFile {
        filename: format!("cost-{}-{}.{}", kind, month, ext),
        content_type,
        bytes,
    })
}
