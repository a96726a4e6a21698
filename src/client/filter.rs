// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::commands::costs::UNASSIGNED;
use crate::error::CostError;
use crate::models::{DepartmentBreakdown, Line, LineBreakdown, Notification, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationTab {
    #[default]
    All,
    Unread,
    Alerts,
}

impl FromStr for NotificationTab {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "unread" => Ok(Self::Unread),
            "alerts" => Ok(Self::Alerts),
            other => Err(CostError::validation(format!(
                "unknown notification tab '{other}'"
            ))),
        }
    }
}

/// Inclusive date bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|f| day >= f) && self.to.is_none_or(|t| day <= t)
    }
}

pub fn filter_notifications(
    items: &[Notification],
    tab: NotificationTab,
    range: DateRange,
) -> Vec<Notification> {
    items
        .iter()
        .filter(|n| match tab {
            NotificationTab::All => true,
            NotificationTab::Unread => !n.read,
            NotificationTab::Alerts => n.kind == NotificationKind::BudgetAlert,
        })
        .filter(|n| range.contains(n.created_at.date_naive()))
        .cloned()
        .collect()
}

/// Rows that belong to a department.
pub trait DepartmentScoped {
    fn department_name(&self) -> Option<&str>;
}

impl DepartmentScoped for Line {
    fn department_name(&self) -> Option<&str> {
        self.department.as_deref()
    }
}

impl DepartmentScoped for LineBreakdown {
    fn department_name(&self) -> Option<&str> {
        self.department.as_deref()
    }
}

impl DepartmentScoped for DepartmentBreakdown {
    fn department_name(&self) -> Option<&str> {
        Some(&self.department)
    }
}

/// `None` or `"all"` keeps every row; matching ignores case.
/// Rows without a department match `Unassigned`.
pub fn filter_by_department<T>(rows: &[T], department: Option<&str>) -> Vec<T>
where
    T: DepartmentScoped + Clone,
{
    match department.map(str::trim) {
        None => rows.to_vec(),
        Some(d) if d.is_empty() || d.eq_ignore_ascii_case("all") => rows.to_vec(),
        Some(d) => rows
            .iter()
            .filter(|r| {
                r.department_name()
                    .unwrap_or(UNASSIGNED)
                    .eq_ignore_ascii_case(d)
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Costs;
    use chrono::{TimeZone, Utc};

    fn note(id: i64, kind: NotificationKind, read: bool, day: u32) -> Notification {
        Notification {
            id,
            kind,
            title: String::new(),
            message: String::new(),
            budget_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
            read,
        }
    }

    #[test]
    fn tabs_and_dates_combine() {
        let items = vec![
            note(1, NotificationKind::BudgetAlert, false, 2),
            note(2, NotificationKind::System, false, 10),
            note(3, NotificationKind::BudgetAlert, true, 20),
        ];
        let ids = |v: Vec<Notification>| v.into_iter().map(|n| n.id).collect::<Vec<_>>();

        assert_eq!(ids(filter_notifications(&items, NotificationTab::Unread, DateRange::default())), [1, 2]);
        assert_eq!(ids(filter_notifications(&items, NotificationTab::Alerts, DateRange::default())), [1, 3]);
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 5, 10),
            to: NaiveDate::from_ymd_opt(2024, 5, 20),
        };
        assert_eq!(ids(filter_notifications(&items, NotificationTab::All, range)), [2, 3]);
    }

    #[test]
    fn department_filter_is_case_insensitive() {
        let row = |dept: Option<&str>| LineBreakdown {
            line_id: 1,
            phone_number: "+355691234567".into(),
            assigned_to: "A".into(),
            department: dept.map(str::to_string),
            costs: Costs::default(),
        };
        let rows = vec![row(Some("Sales")), row(Some("Support")), row(None)];
        assert_eq!(filter_by_department(&rows, Some("sales")).len(), 1);
        assert_eq!(filter_by_department(&rows, Some("All")).len(), 3);
        assert_eq!(filter_by_department(&rows, None).len(), 3);
        assert!("archived".parse::<NotificationTab>().is_err());
    }

    #[test]
    fn unassigned_matches_rows_without_department() {
        let line = |id: i64, dept: Option<&str>| Line {
            id,
            phone_number: format!("+35569111000{id}"),
            assigned_to: "A".into(),
            department_id: None,
            department: dept.map(str::to_string),
            active: true,
        };
        let lines = vec![line(1, Some("Sales")), line(2, None)];
        let hits = filter_by_department(&lines, Some("unassigned"));
        assert_eq!(hits.iter().map(|l| l.id).collect::<Vec<_>>(), [2]);

        let dept = DepartmentBreakdown {
            department_id: None,
            department: UNASSIGNED.to_string(),
            line_count: 1,
            costs: Costs::default(),
        };
        assert_eq!(filter_by_department(&[dept], Some("Unassigned")).len(), 1);
    }
}
