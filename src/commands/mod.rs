// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod lines;
pub mod usage;
pub mod budgets;
pub mod costs;
pub mod thresholds;
pub mod exporter;
pub mod fx;
pub mod notifications;
pub mod users;
pub mod recommendations;
pub mod doctor;
