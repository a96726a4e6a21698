// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AppState, auth::Claims};
use crate::commands::notifications;
use crate::error::Result;
use crate::models::Notification;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UnreadCount {
    pub count: i64,
}

pub async fn list_notifications(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>> {
    let data = state
        .with_conn(|c| notifications::list_notifications(c))
        .await?;
    Ok(Json(data))
}

pub async fn unread_count(_claims: Claims, State(state): State<AppState>) -> Result<Json<UnreadCount>> {
    let count = state.with_conn(|c| notifications::unread_count(c)).await?;
    Ok(Json(UnreadCount { count }))
}

pub async fn mark_read(
    _claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state
        .with_conn(move |c| notifications::mark_read(c, id))
        .await?;
    Ok(Json(json!({ "id": id, "read": true })))
}

pub async fn mark_all_read(_claims: Claims, State(state): State<AppState>) -> Result<Json<Value>> {
    let updated = state
        .with_conn(|c| notifications::mark_all_read(c))
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
