// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use costdesk::commands::costs::{
    UNASSIGNED, cost_by_category, cost_by_department, cost_by_line, cost_trends,
    generate_breakdown,
};
use costdesk::commands::fx::set_rate;
use costdesk::commands::lines::{add_department, add_line, deactivate_line};
use costdesk::commands::usage::{UsageInput, record_usage};
use costdesk::error::ErrorKind;
use costdesk::models::BillingMonth;
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn usage(conn: &Connection, phone: &str, date: &str, category: &str, amount: &str) {
    record_usage(
        conn,
        &UsageInput {
            phone_number: phone.into(),
            date: date.into(),
            category: category.into(),
            amount: amount.into(),
            currency: "EUR".into(),
            description: None,
        },
    )
    .unwrap();
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    add_department(&conn, "Sales").unwrap();
    add_department(&conn, "Support").unwrap();
    add_line(&conn, "+355691110001", "Arta", Some("Sales")).unwrap();
    add_line(&conn, "+355691110002", "Besnik", Some("Support")).unwrap();
    add_line(&conn, "+355691110003", "Drita", None).unwrap();
    add_line(&conn, "+355691110004", "Gent", Some("Sales")).unwrap();

    usage(&conn, "+355691110001", "2024-05-02", "data", "10.10");
    usage(&conn, "+355691110001", "2024-05-09", "calls", "5.50");
    usage(&conn, "+355691110002", "2024-05-11", "sms", "2.25");
    usage(&conn, "+355691110003", "2024-05-31", "other", "7");
    usage(&conn, "+355691110004", "2024-05-15", "data", "3");
    // outside the month
    usage(&conn, "+355691110001", "2024-06-01", "data", "100");
    deactivate_line(&conn, "+355691110004").unwrap();
    conn
}

fn may() -> BillingMonth {
    BillingMonth::new(2024, 5).unwrap()
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM cost_breakdowns", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn company_breakdown_sums_every_usage_record() {
    let mut conn = setup();
    let b = generate_breakdown(&mut conn, may()).unwrap();
    assert!(b.generated);
    assert_eq!(b.currency, "EUR");
    assert_eq!(b.costs.data_cost, dec!(13.10));
    assert_eq!(b.costs.calls_cost, dec!(5.50));
    assert_eq!(b.costs.sms_cost, dec!(2.25));
    assert_eq!(b.costs.other_cost, dec!(7));
    assert_eq!(b.costs.total_cost(), dec!(27.85));
    assert_eq!(cost_by_category(&conn, may()).unwrap(), b);
}

#[test]
fn line_rows_cover_active_lines_only() {
    let mut conn = setup();
    generate_breakdown(&mut conn, may()).unwrap();
    let lines = cost_by_line(&conn, may()).unwrap();
    let phones: Vec<&str> = lines.iter().map(|l| l.phone_number.as_str()).collect();
    assert_eq!(phones, ["+355691110001", "+355691110002", "+355691110003"]);
    assert_eq!(lines[0].costs.total_cost(), dec!(15.60));
    assert_eq!(lines[0].department.as_deref(), Some("Sales"));
    assert_eq!(lines[2].department, None);
}

#[test]
fn departments_reconcile_with_company_total() {
    let mut conn = setup();
    let company = generate_breakdown(&mut conn, may()).unwrap();
    let depts = cost_by_department(&conn, may()).unwrap();

    let names: Vec<&str> = depts.iter().map(|d| d.department.as_str()).collect();
    assert_eq!(names, ["Sales", "Support", UNASSIGNED]);
    assert_eq!(depts[0].costs.total_cost(), dec!(18.60));
    assert_eq!(depts[0].line_count, 1);
    assert_eq!(depts[2].department_id, None);

    let sum: Decimal = depts.iter().map(|d| d.costs.total_cost()).sum();
    assert_eq!(sum, company.costs.total_cost());
}

#[test]
fn unassigned_appears_only_when_used() {
    let mut conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    add_department(&conn, "Sales").unwrap();
    add_line(&conn, "+355691110001", "Arta", Some("Sales")).unwrap();
    usage(&conn, "+355691110001", "2024-05-02", "data", "4");
    generate_breakdown(&mut conn, may()).unwrap();
    let depts = cost_by_department(&conn, may()).unwrap();
    assert_eq!(depts.len(), 1);
    assert_eq!(depts[0].department, "Sales");
}

#[test]
fn regenerating_replaces_rows() {
    let mut conn = setup();
    let first = generate_breakdown(&mut conn, may()).unwrap();
    let first_lines = cost_by_line(&conn, may()).unwrap();
    let first_depts = cost_by_department(&conn, may()).unwrap();
    let before = row_count(&conn);

    let second = generate_breakdown(&mut conn, may()).unwrap();
    assert_eq!(second, first);
    assert_eq!(cost_by_line(&conn, may()).unwrap(), first_lines);
    assert_eq!(cost_by_department(&conn, may()).unwrap(), first_depts);
    assert_eq!(row_count(&conn), before);

    usage(&conn, "+355691110002", "2024-05-20", "calls", "1.15");
    let b = generate_breakdown(&mut conn, may()).unwrap();
    assert_eq!(row_count(&conn), before);
    assert_eq!(b.costs.total_cost(), dec!(29.00));
}

#[test]
fn foreign_usage_is_stored_in_base_currency() {
    let mut conn = setup();
    set_rate(
        &conn,
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        "EUR",
        "USD",
        dec!(1.25),
    )
    .unwrap();
    record_usage(
        &conn,
        &UsageInput {
            phone_number: "+355691110003".into(),
            date: "2024-05-05".into(),
            category: "data".into(),
            amount: "12.50".into(),
            currency: "usd".into(),
            description: Some("roaming".into()),
        },
    )
    .unwrap();
    let b = generate_breakdown(&mut conn, may()).unwrap();
    assert_eq!(b.costs.data_cost, dec!(23.10));
}

#[test]
fn missing_period_reads_as_not_generated() {
    let conn = setup();
    let b = cost_by_category(&conn, BillingMonth::new(2024, 4).unwrap()).unwrap();
    assert!(!b.generated);
    assert!(b.costs.is_zero());
    assert!(cost_by_line(&conn, may()).unwrap().is_empty());
}

#[test]
fn month_outside_calendar_is_rejected() {
    assert_eq!(
        BillingMonth::new(2024, 13).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!("2024-00".parse::<BillingMonth>().is_err());
    assert_eq!("2024-05".parse::<BillingMonth>().unwrap(), may());
}

#[test]
fn trends_list_generated_periods_oldest_first() {
    let mut conn = setup();
    usage(&conn, "+355691110001", "2024-03-02", "data", "1");
    generate_breakdown(&mut conn, may()).unwrap();
    generate_breakdown(&mut conn, BillingMonth::new(2024, 3).unwrap()).unwrap();

    let t = cost_trends(&conn, 6).unwrap();
    let periods: Vec<&str> = t.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, ["2024-03", "2024-05"]);

    let t = cost_trends(&conn, 1).unwrap();
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].month, 5);

    for bad in [0, 61] {
        assert_eq!(cost_trends(&conn, bad).unwrap_err().kind(), ErrorKind::Validation);
    }
}
