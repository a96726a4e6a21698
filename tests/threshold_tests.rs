// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use costdesk::commands::budgets::{BudgetInput, create_budget};
use costdesk::commands::fx::set_rate;
use costdesk::commands::lines::{add_department, add_line, deactivate_line};
use costdesk::commands::thresholds::{budget_status, check_thresholds};
use costdesk::commands::usage::{UsageInput, record_usage};
use costdesk::models::{BudgetPeriod, Currency, EntityType};
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    add_department(&conn, "Sales").unwrap();
    add_department(&conn, "Support").unwrap();
    add_line(&conn, "+355691110001", "Arta", Some("Sales")).unwrap();
    add_line(&conn, "+355691110002", "Besnik", Some("Support")).unwrap();
    conn
}

fn spend(conn: &Connection, phone: &str, date: &str, amount: &str, ccy: &str) {
    record_usage(
        conn,
        &UsageInput {
            phone_number: phone.into(),
            date: date.into(),
            category: "calls".into(),
            amount: amount.into(),
            currency: ccy.into(),
            description: None,
        },
    )
    .unwrap();
}

fn budget(entity_type: EntityType, entity_id: Option<i64>, amount: Decimal) -> BudgetInput {
    BudgetInput {
        entity_type,
        entity_id,
        amount,
        currency: Currency::Eur,
        period: BudgetPeriod::Monthly,
        alert_threshold: 80,
        start_date: "2024-01-01".to_string(),
        end_date: None,
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn only_budgets_at_or_over_threshold_are_returned() {
    let conn = setup();
    let over = create_budget(&conn, &budget(EntityType::Line, Some(1), dec!(1000))).unwrap();
    let under = create_budget(&conn, &budget(EntityType::Line, Some(2), dec!(1000))).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "850", "EUR");
    spend(&conn, "+355691110002", "2024-05-03", "799", "EUR");

    let hits = check_thresholds(&conn, day("2024-05-20")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].budget.id, over.id);
    assert_eq!(hits[0].current_spend, dec!(850));
    assert_eq!(hits[0].percentage, dec!(85));

    let status = budget_status(&conn, &under, day("2024-05-20")).unwrap();
    assert!(!status.exceeded);
    assert_eq!(status.percentage, dec!(79.9));
}

#[test]
fn sub_cent_spend_is_compared_before_rounding() {
    let conn = setup();
    let b = create_budget(&conn, &budget(EntityType::Line, Some(1), dec!(1000))).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "799.996", "EUR");

    assert!(check_thresholds(&conn, day("2024-05-20")).unwrap().is_empty());
    let status = budget_status(&conn, &b, day("2024-05-20")).unwrap();
    assert!(!status.exceeded);
    assert_eq!(status.current_spend, dec!(800.00));
}

#[test]
fn exact_threshold_counts_as_exceeded() {
    let conn = setup();
    create_budget(&conn, &budget(EntityType::Company, None, dec!(1000))).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "500", "EUR");
    spend(&conn, "+355691110002", "2024-05-04", "300", "EUR");
    let hits = check_thresholds(&conn, day("2024-05-31")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].percentage, dec!(80));
}

#[test]
fn spend_outside_the_current_window_is_ignored() {
    let conn = setup();
    create_budget(&conn, &budget(EntityType::Company, None, dec!(1000))).unwrap();
    spend(&conn, "+355691110001", "2024-04-30", "900", "EUR");
    assert!(check_thresholds(&conn, day("2024-05-02")).unwrap().is_empty());
    assert_eq!(check_thresholds(&conn, day("2024-04-30")).unwrap().len(), 1);
}

#[test]
fn quarterly_window_accumulates_months() {
    let conn = setup();
    let input = BudgetInput {
        period: BudgetPeriod::Quarterly,
        ..budget(EntityType::Department, Some(1), dec!(1000))
    };
    create_budget(&conn, &input).unwrap();
    spend(&conn, "+355691110001", "2024-04-10", "450", "EUR");
    spend(&conn, "+355691110001", "2024-06-10", "400", "EUR");
    // other department does not count
    spend(&conn, "+355691110002", "2024-06-10", "5000", "EUR");

    let hits = check_thresholds(&conn, day("2024-06-15")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].current_spend, dec!(850));
    assert_eq!(hits[0].window_start, day("2024-04-01"));
    assert_eq!(hits[0].window_end, day("2024-06-30"));
}

#[test]
fn expired_or_future_budgets_are_skipped() {
    let conn = setup();
    let ended = BudgetInput {
        end_date: Some("2024-04-30".to_string()),
        ..budget(EntityType::Company, None, dec!(100))
    };
    let future = BudgetInput {
        start_date: "2024-06-01".to_string(),
        ..budget(EntityType::Company, None, dec!(100))
    };
    create_budget(&conn, &ended).unwrap();
    create_budget(&conn, &future).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "500", "EUR");
    assert!(check_thresholds(&conn, day("2024-05-20")).unwrap().is_empty());
}

#[test]
fn foreign_usage_is_converted_to_budget_currency() {
    let conn = setup();
    // 1 EUR = 100 ALL
    set_rate(&conn, day("2024-05-01"), "EUR", "ALL", dec!(100)).unwrap();
    create_budget(&conn, &budget(EntityType::Line, Some(1), dec!(100))).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "8500", "ALL");
    let hits = check_thresholds(&conn, day("2024-05-20")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].current_spend, dec!(85));
}

#[test]
fn deactivated_line_usage_still_counts_for_its_budget() {
    let conn = setup();
    create_budget(&conn, &budget(EntityType::Line, Some(1), dec!(100))).unwrap();
    spend(&conn, "+355691110001", "2024-05-03", "90", "EUR");
    deactivate_line(&conn, "+355691110001").unwrap();
    assert_eq!(check_thresholds(&conn, day("2024-05-20")).unwrap().len(), 1);
}
