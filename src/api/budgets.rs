// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use super::{ApiJson, AppState, auth::Claims};
use crate::commands::{budgets, budgets::BudgetInput, lines, thresholds};
use crate::error::Result;
use crate::models::{Budget, BudgetStatus, Department, Line, SpendingSummary};

pub async fn list_budgets(_claims: Claims, State(state): State<AppState>) -> Result<Json<Vec<Budget>>> {
    let data = state.with_conn(|c| budgets::list_budgets(c)).await?;
    Ok(Json(data))
}

pub async fn create_budget(
    _claims: Claims,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BudgetInput>,
) -> Result<(StatusCode, Json<Budget>)> {
    let budget = state
        .with_conn(move |c| budgets::create_budget(c, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn update_budget(
    _claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<BudgetInput>,
) -> Result<Json<Budget>> {
    let budget = state
        .with_conn(move |c| budgets::update_budget(c, id, &input))
        .await?;
    Ok(Json(budget))
}

pub async fn delete_budget(
    _claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state
        .with_conn(move |c| budgets::delete_budget(c, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn spending_summary(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<SpendingSummary>> {
    let today = Utc::now().date_naive();
    let summary = state
        .with_conn(move |c| budgets::spending_summary(c, today))
        .await?;
    Ok(Json(summary))
}

pub async fn check_thresholds(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<BudgetStatus>>> {
    let today = Utc::now().date_naive();
    let exceeded = state
        .with_conn(move |c| thresholds::check_thresholds(c, today))
        .await?;
    Ok(Json(exceeded))
}

pub async fn list_lines(_claims: Claims, State(state): State<AppState>) -> Result<Json<Vec<Line>>> {
    let data = state.with_conn(|c| lines::list_lines(c)).await?;
    Ok(Json(data))
}

pub async fn list_departments(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Department>>> {
    let data = state.with_conn(|c| lines::list_departments(c)).await?;
    Ok(Json(data))
}
