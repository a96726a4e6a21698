// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use costdesk::commands::budgets::{
    BudgetInput, create_budget, delete_budget, get_budget, list_budgets, spending_summary,
    update_budget,
};
use costdesk::commands::lines::{add_department, add_line};
use costdesk::commands::usage::{UsageInput, record_usage};
use costdesk::error::{CostError, ErrorKind};
use costdesk::models::{BudgetPeriod, Currency, EntityType};
use rusqlite::Connection;
use rust_decimal_macros::dec;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    add_department(&conn, "Sales").unwrap();
    add_line(&conn, "+355691110001", "Arta", Some("Sales")).unwrap();
    conn
}

fn company(amount: rust_decimal::Decimal) -> BudgetInput {
    BudgetInput {
        entity_type: EntityType::Company,
        entity_id: None,
        amount,
        currency: Currency::Eur,
        period: BudgetPeriod::Monthly,
        alert_threshold: 80,
        start_date: "2024-05-01".to_string(),
        end_date: None,
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn create_names_the_entity() {
    let conn = setup();
    let b = create_budget(&conn, &company(dec!(1000))).unwrap();
    assert_eq!(b.entity_name, "Company");
    assert_eq!(b.alert_threshold, 80);

    let line_budget = BudgetInput {
        entity_type: EntityType::Line,
        entity_id: Some(1),
        ..company(dec!(50))
    };
    let b = create_budget(&conn, &line_budget).unwrap();
    assert_eq!(b.entity_name, "+355691110001 (Arta)");

    let dept_budget = BudgetInput {
        entity_type: EntityType::Department,
        entity_id: Some(1),
        ..company(dec!(400))
    };
    assert_eq!(create_budget(&conn, &dept_budget).unwrap().entity_name, "Sales");
    assert_eq!(list_budgets(&conn).unwrap().len(), 3);
}

#[test]
fn threshold_defaults_to_eighty_when_omitted() {
    let input: BudgetInput = serde_json::from_str(
        r#"{"entity_type":"company","amount":"500","start_date":"2024-05-01"}"#,
    )
    .unwrap();
    assert_eq!(input.alert_threshold, 80);
    assert_eq!(input.currency, Currency::Eur);
    assert_eq!(input.period, BudgetPeriod::Monthly);
}

#[test]
fn invalid_inputs_are_rejected_without_writing() {
    let conn = setup();
    let cases = vec![
        company(dec!(0)),
        company(dec!(-5)),
        BudgetInput {
            alert_threshold: 0,
            ..company(dec!(100))
        },
        BudgetInput {
            alert_threshold: 101,
            ..company(dec!(100))
        },
        BudgetInput {
            entity_id: Some(1),
            ..company(dec!(100))
        },
        BudgetInput {
            entity_type: EntityType::Line,
            entity_id: None,
            ..company(dec!(100))
        },
        BudgetInput {
            entity_type: EntityType::Line,
            entity_id: Some(99),
            ..company(dec!(100))
        },
        BudgetInput {
            start_date: "2024-13-01".to_string(),
            ..company(dec!(100))
        },
        BudgetInput {
            end_date: Some("2024-04-30".to_string()),
            ..company(dec!(100))
        },
    ];
    for input in cases {
        let err = create_budget(&conn, &input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{input:?} gave {err}");
    }
    assert!(list_budgets(&conn).unwrap().is_empty());
}

#[test]
fn update_replaces_fields_and_refreshes_timestamp() {
    let conn = setup();
    let b = create_budget(&conn, &company(dec!(1000))).unwrap();
    let edited = BudgetInput {
        amount: dec!(1200),
        period: BudgetPeriod::Quarterly,
        alert_threshold: 90,
        ..company(dec!(0))
    };
    let u = update_budget(&conn, b.id, &edited).unwrap();
    assert_eq!(u.amount, dec!(1200));
    assert_eq!(u.period, BudgetPeriod::Quarterly);
    assert_eq!(u.alert_threshold, 90);
    assert_eq!(u.created_at, b.created_at);
    assert!(u.updated_at >= b.updated_at);

    let err = update_budget(&conn, 404, &edited).unwrap_err();
    assert!(matches!(err, CostError::NotFound { .. }));
}

#[test]
fn deleting_unknown_budget_leaves_list_unchanged() {
    let conn = setup();
    let b = create_budget(&conn, &company(dec!(1000))).unwrap();
    let err = delete_budget(&conn, b.id + 1).unwrap_err();
    assert_eq!(err.to_string(), format!("budget with ID {} not found", b.id + 1));
    assert_eq!(list_budgets(&conn).unwrap().len(), 1);

    delete_budget(&conn, b.id).unwrap();
    assert!(list_budgets(&conn).unwrap().is_empty());
    assert_eq!(get_budget(&conn, b.id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn summary_covers_active_budgets_only() {
    let conn = setup();
    create_budget(&conn, &company(dec!(1000))).unwrap();
    create_budget(
        &conn,
        &BudgetInput {
            start_date: "2024-06-01".to_string(),
            ..company(dec!(5000))
        },
    )
    .unwrap();
    record_usage(
        &conn,
        &UsageInput {
            phone_number: "+355691110001".into(),
            date: "2024-05-10".into(),
            category: "data".into(),
            amount: "250".into(),
            currency: "EUR".into(),
            description: None,
        },
    )
    .unwrap();

    let s = spending_summary(&conn, day("2024-05-20")).unwrap();
    assert_eq!(s.budgets.len(), 1);
    assert_eq!(s.total_budget, dec!(1000));
    assert_eq!(s.total_spending, dec!(250));
    assert_eq!(s.overall_percentage, dec!(25));
    assert_eq!(s.currency, "EUR");
}

#[test]
fn summary_without_budgets_is_zero() {
    let conn = setup();
    let s = spending_summary(&conn, day("2024-05-20")).unwrap();
    assert!(s.budgets.is_empty());
    assert_eq!(s.overall_percentage, dec!(0));
}
