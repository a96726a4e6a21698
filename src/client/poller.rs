// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, warn};

use super::api::ApiClient;
use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Unread(i64),
    Failed { kind: ErrorKind, message: String },
}

/// Fetches the unread notification count on a fixed interval for one session.
/// Dropping the poller cancels it.
pub struct UnreadPoller {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl UnreadPoller {
    pub fn start(client: ApiClient, every: Duration) -> (Self, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stopped.changed() => break,
                }
                let event = match client.unread_count().await {
                    Ok(count) => PollEvent::Unread(count),
                    Err(e) => {
                        warn!(error = %e, "unread count poll failed");
                        PollEvent::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        }
                    }
                };
                // The session is gone once the server refuses the token.
                let session_over = matches!(
                    event,
                    PollEvent::Failed {
                        kind: ErrorKind::Auth,
                        ..
                    }
                );
                if tx.send(event).await.is_err() || session_over {
                    break;
                }
            }
            debug!("unread poller finished");
        });
        (
            Self {
                stop,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for UnreadPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
