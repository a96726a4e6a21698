// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CostError;

/// Enums stored as TEXT columns and parsed case-insensitively.
macro_rules! text_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = CostError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let t = s.trim();
                $(
                    if t.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(CostError::validation(format!(
                    "invalid {} '{}', expected one of: {}",
                    $label,
                    t,
                    [$($text),+].join("|")
                )))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse::<$name>()
                    .map_err(|e| FromSqlError::Other(e.to_string().into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Line,
    Department,
    Company,
}

text_enum!(EntityType, "entity type" {
    Line => "line",
    Department => "department",
    Company => "company",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    All,
}

text_enum!(Currency, "currency" {
    Eur => "EUR",
    Usd => "USD",
    All => "ALL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

text_enum!(BudgetPeriod, "period" {
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Data,
    Calls,
    Sms,
    Other,
}

text_enum!(CostCategory, "usage category" {
    Data => "data",
    Calls => "calls",
    Sms => "sms",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

text_enum!(ExportFormat, "export format" {
    Csv => "csv",
    Json => "json",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownKind {
    Category,
    Line,
    Department,
}

text_enum!(BreakdownKind, "breakdown type" {
    Category => "category",
    Line => "line",
    Department => "department",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BudgetAlert,
    System,
}

text_enum!(NotificationKind, "notification kind" {
    BudgetAlert => "budget_alert",
    System => "system",
});

/// A validated calendar month used as the key of every breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingMonth {
    pub year: i32,
    pub month: u32,
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, CostError> {
        if !(1..=12).contains(&month) {
            return Err(CostError::validation(format!(
                "invalid month {month}, expected 1-12"
            )));
        }
        if !(2000..=9999).contains(&year) {
            return Err(CostError::validation(format!("invalid year {year}")));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| CostError::validation(format!("invalid month '{s}', expected YYYY-MM")))?;
        let year = y
            .parse::<i32>()
            .map_err(|_| CostError::validation(format!("invalid year in '{s}'")))?;
        let month = m
            .parse::<u32>()
            .map_err(|_| CostError::validation(format!("invalid month in '{s}'")))?;
        BillingMonth::new(year, month)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub id: i64,
    pub phone_number: String,
    pub assigned_to: String,
    pub department_id: Option<i64>,
    pub department: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub id: i64,
    pub line_id: i64,
    pub date: NaiveDate,
    pub category: CostCategory,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: i64,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub entity_name: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub period: BudgetPeriod,
    pub alert_threshold: u8,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && self.end_date.is_none_or(|end| end >= day)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct CostBuckets {
    #[serde(default)]
    data_cost: Decimal,
    #[serde(default)]
    calls_cost: Decimal,
    #[serde(default)]
    sms_cost: Decimal,
    #[serde(default)]
    other_cost: Decimal,
}

impl From<CostBuckets> for Costs {
    fn from(b: CostBuckets) -> Self {
        Costs::new(b.data_cost, b.calls_cost, b.sms_cost, b.other_cost)
    }
}

/// Four cost buckets; `total_cost` is always derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CostBuckets")]
pub struct Costs {
    pub data_cost: Decimal,
    pub calls_cost: Decimal,
    pub sms_cost: Decimal,
    pub other_cost: Decimal,
    total_cost: Decimal,
}

impl Costs {
    pub fn new(data: Decimal, calls: Decimal, sms: Decimal, other: Decimal) -> Self {
        Self {
            data_cost: data,
            calls_cost: calls,
            sms_cost: sms,
            other_cost: other,
            total_cost: data + calls + sms + other,
        }
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn is_zero(&self) -> bool {
        self.total_cost.is_zero()
            && self.data_cost.is_zero()
            && self.calls_cost.is_zero()
            && self.sms_cost.is_zero()
            && self.other_cost.is_zero()
    }

    pub fn charge(&self, category: CostCategory, amount: Decimal) -> Self {
        let (mut d, mut c, mut s, mut o) =
            (self.data_cost, self.calls_cost, self.sms_cost, self.other_cost);
        match category {
            CostCategory::Data => d += amount,
            CostCategory::Calls => c += amount,
            CostCategory::Sms => s += amount,
            CostCategory::Other => o += amount,
        }
        Costs::new(d, c, s, o)
    }

    /// Rounds each bucket to cents and re-derives the total from the rounded buckets.
    pub fn rounded(&self) -> Self {
        Costs::new(
            self.data_cost.round_dp(2),
            self.calls_cost.round_dp(2),
            self.sms_cost.round_dp(2),
            self.other_cost.round_dp(2),
        )
    }
}

impl std::ops::Add for Costs {
    type Output = Costs;

    fn add(self, rhs: Costs) -> Costs {
        Costs::new(
            self.data_cost + rhs.data_cost,
            self.calls_cost + rhs.calls_cost,
            self.sms_cost + rhs.sms_cost,
            self.other_cost + rhs.other_cost,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryBreakdown {
    pub year: i32,
    pub month: u32,
    pub currency: String,
    /// False when no breakdown has been generated for the period.
    pub generated: bool,
    #[serde(flatten)]
    pub costs: Costs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineBreakdown {
    pub line_id: i64,
    pub phone_number: String,
    pub assigned_to: String,
    pub department: Option<String>,
    #[serde(flatten)]
    pub costs: Costs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentBreakdown {
    pub department_id: Option<i64>,
    pub department: String,
    pub line_count: i64,
    #[serde(flatten)]
    pub costs: Costs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    pub period: String,
    #[serde(flatten)]
    pub costs: Costs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub budget: Budget,
    pub current_spend: Decimal,
    pub percentage: Decimal,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub exceeded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub total_budget: Decimal,
    pub total_spending: Decimal,
    pub overall_percentage: Decimal,
    pub currency: String,
    pub budgets: Vec<BudgetStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub budget_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecommendationDetails {
    DataPlanDowngrade {
        phone_number: String,
        current_plan: String,
        current_usage_gb: Decimal,
        suggested_plan: String,
    },
    SharedDataPlan {
        department: String,
        line_count: i64,
        current_cost: Decimal,
    },
    InternationalCallingPlan {
        phone_number: String,
        call_cost: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationRecommendation {
    pub id: i64,
    pub potential_savings: Decimal,
    #[serde(flatten)]
    pub details: RecommendationDetails,
}
