// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Page state containers. Every transition consumes the old state and returns the next one.

use crate::error::{CostError, ErrorKind, Result};
use crate::models::{Notification, NotificationKind, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Loading,
    Idle,
    Error(String),
}

/// One fetch on a page. A failed fetch keeps the last data it had.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub status: FetchStatus,
    pub data: Option<T>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(self) -> Self {
        Self {
            status: FetchStatus::Loading,
            data: self.data,
        }
    }

    pub fn succeed(self, data: T) -> Self {
        Self {
            status: FetchStatus::Idle,
            data: Some(data),
        }
    }

    pub fn fail(self, err: &CostError) -> Self {
        Self {
            status: FetchStatus::Error(err.to_string()),
            data: self.data,
        }
    }

    pub fn apply(self, result: Result<T>) -> Self {
        match result {
            Ok(data) => self.succeed(data),
            Err(e) => self.fail(&e),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn {
        token: String,
        user: User,
    },
    /// Credentials were refused by the server and have been dropped.
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoginSucceeded { token: String, user: User },
    LoggedOut,
    RequestFailed { kind: ErrorKind, message: String },
}

impl SessionEvent {
    pub fn from_error(err: &CostError) -> Self {
        Self::RequestFailed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl SessionState {
    pub fn reduce(self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::LoginSucceeded { token, user } => Self::LoggedIn { token, user },
            SessionEvent::LoggedOut => Self::LoggedOut,
            SessionEvent::RequestFailed {
                kind: ErrorKind::Auth,
                message,
            } => Self::Rejected { reason: message },
            SessionEvent::RequestFailed { .. } => self,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::LoggedIn { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn needs_login(&self) -> bool {
        !matches!(self, Self::LoggedIn { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationsState {
    pub items: Vec<Notification>,
    pub unread: i64,
}

#[derive(Debug, Clone)]
pub enum NotificationsEvent {
    Loaded(Vec<Notification>),
    UnreadCount(i64),
    MarkedRead(i64),
    MarkedAllRead,
}

impl NotificationsState {
    pub fn reduce(self, event: NotificationsEvent) -> Self {
        match event {
            NotificationsEvent::Loaded(items) => {
                let unread = items.iter().filter(|n| !n.read).count() as i64;
                Self { items, unread }
            }
            NotificationsEvent::UnreadCount(unread) => Self {
                unread: unread.max(0),
                ..self
            },
            NotificationsEvent::MarkedRead(id) => {
                let mut flipped = false;
                let items = self
                    .items
                    .into_iter()
                    .map(|n| {
                        if n.id == id && !n.read {
                            flipped = true;
                            Notification { read: true, ..n }
                        } else {
                            n
                        }
                    })
                    .collect();
                let unread = if flipped {
                    (self.unread - 1).max(0)
                } else {
                    self.unread
                };
                Self { items, unread }
            }
            NotificationsEvent::MarkedAllRead => Self {
                items: self
                    .items
                    .into_iter()
                    .map(|n| Notification { read: true, ..n })
                    .collect(),
                unread: 0,
            },
        }
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Notification> {
        self.items
            .iter()
            .filter(|n| n.kind == NotificationKind::BudgetAlert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(id: i64, read: bool) -> Notification {
        Notification {
            id,
            kind: NotificationKind::BudgetAlert,
            title: format!("alert {id}"),
            message: String::new(),
            budget_id: Some(1),
            created_at: Utc::now(),
            read,
        }
    }

    #[test]
    fn failure_keeps_previous_data() {
        let s = FetchState::new().start().succeed(vec![1, 2, 3]);
        let s = s.start();
        assert!(s.is_loading());
        let s = s.fail(&CostError::Network("timeout".into()));
        assert_eq!(s.data, Some(vec![1, 2, 3]));
        assert!(s.error().unwrap().contains("timeout"));
    }

    #[test]
    fn auth_failure_rejects_session() {
        let user = User {
            id: 1,
            email: "ops@example.al".into(),
            name: "Ops".into(),
            company: None,
            created_at: Utc::now(),
        };
        let s = SessionState::default().reduce(SessionEvent::LoginSucceeded {
            token: "t".into(),
            user,
        });
        assert_eq!(s.token(), Some("t"));

        let s = s.reduce(SessionEvent::from_error(&CostError::Network("down".into())));
        assert!(!s.needs_login());

        let s = s.reduce(SessionEvent::from_error(&CostError::Auth("expired".into())));
        assert!(s.needs_login());
        assert_eq!(s.token(), None);
    }

    #[test]
    fn marking_read_is_counted_once() {
        let s = NotificationsState::default()
            .reduce(NotificationsEvent::Loaded(vec![note(1, false), note(2, false), note(3, true)]));
        assert_eq!(s.unread, 2);
        let s = s.reduce(NotificationsEvent::MarkedRead(1));
        let s = s.reduce(NotificationsEvent::MarkedRead(1));
        assert_eq!(s.unread, 1);
        let s = s.reduce(NotificationsEvent::MarkedAllRead);
        assert_eq!(s.unread, 0);
        assert!(s.items.iter().all(|n| n.read));
    }
}
