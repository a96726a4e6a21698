// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! HTTP surface over the budget, cost and notification commands.

pub mod alerts;
pub mod auth;
pub mod budgets;
pub mod costs;
pub mod notifications;

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{
        FromRef, FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post, put},
};
use rusqlite::Connection;
use serde_json::{Value, json};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{CostError, Result};
use alerts::AlertJob;
use auth::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    pub jwt: JwtConfig,
}

impl FromRef<AppState> for JwtConfig {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl AppState {
    pub fn new(conn: Connection, jwt: JwtConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            jwt,
        }
    }

    /// Runs `f` against the shared connection on the blocking pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|_| CostError::Internal("database lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CostError::Internal(format!("database task failed: {e}")))?
    }
}

/// JSON body whose parse failures surface as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CostError))]
pub struct ApiJson<T>(pub T);

/// Query string whose parse failures surface as validation errors.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CostError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for CostError {
    fn from(rejection: JsonRejection) -> Self {
        CostError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for CostError {
    fn from(rejection: QueryRejection) -> Self {
        CostError::Validation(rejection.body_text())
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/profile", get(auth::profile))
        .route(
            "/api/budgets",
            get(budgets::list_budgets).post(budgets::create_budget),
        )
        .route(
            "/api/budgets/spending-summary",
            get(budgets::spending_summary),
        )
        .route(
            "/api/budgets/check-thresholds",
            get(budgets::check_thresholds),
        )
        .route(
            "/api/budgets/{id}",
            put(budgets::update_budget).delete(budgets::delete_budget),
        )
        .route("/api/lines", get(budgets::list_lines))
        .route("/api/departments", get(budgets::list_departments))
        .route("/api/cost-control/by-category", get(costs::by_category))
        .route("/api/cost-control/by-line", get(costs::by_line))
        .route("/api/cost-control/by-department", get(costs::by_department))
        .route("/api/cost-control/trends", get(costs::trends))
        .route(
            "/api/cost-control/generate-breakdown",
            post(costs::generate_breakdown),
        )
        .route("/api/cost-control/export", post(costs::export))
        .route(
            "/api/cost-control/recommendations",
            get(costs::recommendations),
        )
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{id}/read",
            put(notifications::mark_read),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(_) if o.contains('*') => {
                warn!(origin = %o, "ignoring wildcard CORS origin");
                None
            }
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_credentials(true)
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
}

pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(get_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// Serves the API until Ctrl+C or SIGTERM, running the alert job alongside.
pub async fn serve(config: Config, conn: Connection) -> anyhow::Result<()> {
    let state = AppState::new(conn, JwtConfig::from(&config));
    let job = AlertJob::start(state.clone(), config.alert_check_interval);
    let app = app(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.server_address).await?;
    info!("🚀 costdesk API running at {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    job.stop().await;
    info!("👋 Shutting down gracefully...");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
