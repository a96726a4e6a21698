// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Dashboard side of the API: typed calls, page state and display helpers.

pub mod api;
pub mod filter;
pub mod format;
pub mod poller;
pub mod state;

pub use api::{ApiClient, Download, Session};
pub use poller::{PollEvent, UnreadPoller};
pub use state::{FetchState, FetchStatus, NotificationsState, SessionState};
