// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use super::{ApiJson, ApiQuery, AppState, auth::Claims};
use crate::commands::{costs, exporter, notifications, recommendations};
use crate::error::Result;
use crate::models::{
    BillingMonth, BreakdownKind, CategoryBreakdown, DepartmentBreakdown, ExportFormat,
    LineBreakdown, OptimizationRecommendation, TrendPoint,
};

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: i32,
    pub month: u32,
}

impl PeriodQuery {
    fn billing_month(&self) -> Result<BillingMonth> {
        BillingMonth::new(self.year, self.month)
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportIn {
    pub format: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: i32,
    pub month: u32,
}

pub async fn by_category(
    _claims: Claims,
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PeriodQuery>,
) -> Result<Json<CategoryBreakdown>> {
    let month = q.billing_month()?;
    let data = state
        .with_conn(move |c| costs::cost_by_category(c, month))
        .await?;
    Ok(Json(data))
}

pub async fn by_line(
    _claims: Claims,
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PeriodQuery>,
) -> Result<Json<Vec<LineBreakdown>>> {
    let month = q.billing_month()?;
    let data = state
        .with_conn(move |c| costs::cost_by_line(c, month))
        .await?;
    Ok(Json(data))
}

pub async fn by_department(
    _claims: Claims,
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<PeriodQuery>,
) -> Result<Json<Vec<DepartmentBreakdown>>> {
    let month = q.billing_month()?;
    let data = state
        .with_conn(move |c| costs::cost_by_department(c, month))
        .await?;
    Ok(Json(data))
}

pub async fn trends(
    _claims: Claims,
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<TrendsQuery>,
) -> Result<Json<Vec<TrendPoint>>> {
    let months = q.months.unwrap_or(costs::DEFAULT_TREND_MONTHS);
    let data = state
        .with_conn(move |c| costs::cost_trends(c, months))
        .await?;
    Ok(Json(data))
}

pub async fn generate_breakdown(
    _claims: Claims,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PeriodQuery>,
) -> Result<Json<CategoryBreakdown>> {
    let month = body.billing_month()?;
    let data = state
        .with_conn(move |c| {
            let b = costs::generate_breakdown(c, month)?;
            let note = notifications::notify_system(
                c,
                "Cost breakdown ready",
                &format!(
                    "Breakdown for {} generated, total {:.2} {}.",
                    month,
                    b.costs.total_cost(),
                    b.currency
                ),
            );
            if let Err(e) = note {
                warn!(error = %e, "could not record breakdown notification");
            }
            Ok(b)
        })
        .await?;
    Ok(Json(data))
}

/// Streams the file back as an attachment.
pub async fn export(
    _claims: Claims,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ExportIn>,
) -> Result<Response> {
    let format = body.format.parse::<ExportFormat>()?;
    let kind = body.kind.parse::<BreakdownKind>()?;
    let month = BillingMonth::new(body.year, body.month)?;
    let file = state
        .with_conn(move |c| exporter::export_breakdown(c, format, kind, month))
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

pub async fn recommendations(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<OptimizationRecommendation>>> {
    let data = state
        .with_conn(|c| recommendations::list_recommendations(c))
        .await?;
    Ok(Json(data))
}
