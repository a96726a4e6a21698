// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Duration;

use chrono::Utc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

use super::AppState;
use crate::commands::notifications::record_threshold_alerts;
use crate::error::Result;

/// Periodic threshold check that turns exceeded budgets into notifications.
/// Lives exactly as long as the server that started it.
pub struct AlertJob {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AlertJob {
    pub fn start(state: AppState, every: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            info!("🔔 Starting budget alert job, interval: {:?}", every);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = run_once(&state).await {
                            error!(error = %e, "❌ Budget alert check failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("budget alert job stopped");
        });
        Self { stop, handle }
    }

    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "budget alert job panicked");
        }
    }
}

#[tracing::instrument("alert_check", skip_all, err)]
pub async fn run_once(state: &AppState) -> Result<usize> {
    let today = Utc::now().date_naive();
    let created = state
        .with_conn(move |c| record_threshold_alerts(c, today))
        .await?;
    if !created.is_empty() {
        info!(alerts = created.len(), "budget alerts raised");
    }
    Ok(created.len())
}
