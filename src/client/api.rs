// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::api::notifications::UnreadCount;
use crate::commands::budgets::BudgetInput;
use crate::config::Config;
use crate::error::{CostError, Result};
use crate::models::{
    Budget, BudgetStatus, CategoryBreakdown, Department, DepartmentBreakdown, Line, LineBreakdown,
    Notification, OptimizationRecommendation, SpendingSummary, TrendPoint, User,
};
use crate::utils::user_agent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Downloaded export file.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Typed access to the REST API. Failed calls are reported once and never retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.api_base_url.clone())
    }

    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn execute(&self, req: RequestBuilder, path: &str) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|e| {
            debug!(error = %e, path, "request failed before a response");
            CostError::Network(e.to_string())
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error_for_status(status, path, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, path: &str) -> Result<T> {
        let resp = self.execute(req, path).await?;
        resp.json::<T>()
            .await
            .map_err(|e| CostError::Network(format!("unreadable response from {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, path), path).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let path = "/api/auth/login";
        let req = self
            .request(Method::POST, path)
            .json(&json!({ "email": email, "password": password }));
        self.send_json(req, path).await
    }

    pub async fn profile(&self) -> Result<User> {
        self.get("/api/auth/profile").await
    }

    pub async fn list_budgets(&self) -> Result<Vec<Budget>> {
        self.get("/api/budgets").await
    }

    pub async fn create_budget(&self, input: &BudgetInput) -> Result<Budget> {
        let path = "/api/budgets";
        self.send_json(self.request(Method::POST, path).json(input), path)
            .await
    }

    pub async fn update_budget(&self, id: i64, input: &BudgetInput) -> Result<Budget> {
        let path = format!("/api/budgets/{id}");
        self.send_json(self.request(Method::PUT, &path).json(input), &path)
            .await
    }

    pub async fn delete_budget(&self, id: i64) -> Result<()> {
        let path = format!("/api/budgets/{id}");
        self.execute(self.request(Method::DELETE, &path), &path)
            .await?;
        Ok(())
    }

    pub async fn spending_summary(&self) -> Result<SpendingSummary> {
        self.get("/api/budgets/spending-summary").await
    }

    pub async fn check_thresholds(&self) -> Result<Vec<BudgetStatus>> {
        self.get("/api/budgets/check-thresholds").await
    }

    pub async fn list_lines(&self) -> Result<Vec<Line>> {
        self.get("/api/lines").await
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        self.get("/api/departments").await
    }

    pub async fn cost_by_category(&self, year: i32, month: u32) -> Result<CategoryBreakdown> {
        self.get(&format!("/api/cost-control/by-category?year={year}&month={month}"))
            .await
    }

    pub async fn cost_by_line(&self, year: i32, month: u32) -> Result<Vec<LineBreakdown>> {
        self.get(&format!("/api/cost-control/by-line?year={year}&month={month}"))
            .await
    }

    pub async fn cost_by_department(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<DepartmentBreakdown>> {
        self.get(&format!(
            "/api/cost-control/by-department?year={year}&month={month}"
        ))
        .await
    }

    pub async fn cost_trends(&self, months: u32) -> Result<Vec<TrendPoint>> {
        self.get(&format!("/api/cost-control/trends?months={months}"))
            .await
    }

    pub async fn generate_breakdown(&self, year: i32, month: u32) -> Result<CategoryBreakdown> {
        let path = "/api/cost-control/generate-breakdown";
        let req = self
            .request(Method::POST, path)
            .json(&json!({ "year": year, "month": month }));
        self.send_json(req, path).await
    }

    pub async fn export(&self, format: &str, kind: &str, year: i32, month: u32) -> Result<Download> {
        let path = "/api/cost-control/export";
        let req = self.request(Method::POST, path).json(&json!({
            "format": format,
            "type": kind,
            "year": year,
            "month": month,
        }));
        let resp = self.execute(req, path).await?;
        let headers = resp.headers().clone();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format!("cost-{kind}-{year:04}-{month:02}.{format}"));
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CostError::Network(e.to_string()))?
            .to_vec();
        Ok(Download {
            filename,
            content_type,
            bytes,
        })
    }

    pub async fn recommendations(&self) -> Result<Vec<OptimizationRecommendation>> {
        self.get("/api/cost-control/recommendations").await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.get("/api/notifications").await
    }

    pub async fn unread_count(&self) -> Result<i64> {
        let c: UnreadCount = self.get("/api/notifications/unread-count").await?;
        Ok(c.count)
    }

    pub async fn mark_read(&self, id: i64) -> Result<()> {
        let path = format!("/api/notifications/{id}/read");
        self.execute(self.request(Method::PUT, &path), &path)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<u64> {
        let path = "/api/notifications/read-all";
        let v: Value = self
            .send_json(self.request(Method::PUT, path), path)
            .await?;
        Ok(v.get("updated").and_then(Value::as_u64).unwrap_or(0))
    }
}

fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

/// Maps a non-success status to the error taxonomy shown to the user.
pub fn error_for_status(status: StatusCode, path: &str, body: &str) -> CostError {
    let message = server_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CostError::Auth(message),
        StatusCode::NOT_FOUND => not_found_for(path),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CostError::Validation(message)
        }
        _ => CostError::Network(format!("{} from {}: {}", status.as_u16(), path, message)),
    }
}

fn not_found_for(path: &str) -> CostError {
    let path = path.split('?').next().unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let found = segments
        .iter()
        .rposition(|s| s.parse::<i64>().is_ok())
        .filter(|i| *i > 0);
    match found {
        Some(i) => {
            let resource = segments[i - 1];
            CostError::not_found(resource.strip_suffix('s').unwrap_or(resource), segments[i])
        }
        None => CostError::not_found("resource", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn statuses_map_to_error_kinds() {
        let body = r#"{"error":"token expired"}"#;
        assert_eq!(
            error_for_status(StatusCode::FORBIDDEN, "/api/budgets", body).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, "/api/budgets", "").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, "/api/budgets", "").kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = error_for_status(StatusCode::NOT_FOUND, "/api/budgets/42", "");
        assert_eq!(err.to_string(), "budget with ID 42 not found");
        let err = error_for_status(StatusCode::NOT_FOUND, "/api/notifications/7/read", "");
        assert_eq!(err.to_string(), "notification with ID 7 not found");
    }

    #[test]
    fn filename_comes_from_disposition() {
        assert_eq!(
            attachment_filename("attachment; filename=\"cost-line-2024-05.csv\""),
            Some("cost-line-2024-05.csv".to_string())
        );
        assert_eq!(attachment_filename("inline"), None);
    }
}
