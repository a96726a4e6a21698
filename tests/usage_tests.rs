// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use costdesk::commands::lines::{add_line, list_lines};
use costdesk::commands::usage::{self, UsageInput, import_usage, list_usage, record_usage};
use costdesk::error::ErrorKind;
use costdesk::models::{BillingMonth, CostCategory};
use costdesk::cli;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::NamedTempFile;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    add_line(&conn, "+355691110001", "Arta", None).unwrap();
    add_line(&conn, "+355691110002", "Besnik", None).unwrap();
    conn
}

fn csv_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,phone_number,category,amount,currency,description").unwrap();
    write!(file, "{}", body).unwrap();
    file.flush().unwrap();
    file
}

fn count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM usage_records", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn importer_trims_cli_path_argument() {
    let mut conn = base_conn();
    let file = csv_file("2024-05-03, +355691110001 ,Data,4.20,eur,  bundle top-up  \n");
    let padded = format!("  {}  ", file.path().to_str().unwrap());
    let matches = cli::build_cli().get_matches_from(["costdesk", "usage", "import", "--path", &padded]);
    if let Some(("usage", m)) = matches.subcommand() {
        usage::handle(&mut conn, m).unwrap();
    } else {
        panic!("no usage subcommand");
    }

    let recs = list_usage(&conn, None).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].category, CostCategory::Data);
    assert_eq!(recs[0].amount, dec!(4.20));
    assert_eq!(recs[0].currency, "EUR");
    assert_eq!(recs[0].description.as_deref(), Some("bundle top-up"));
}

#[test]
fn bad_row_aborts_the_whole_import() {
    let mut conn = base_conn();
    let file = csv_file(
        "2024-05-03,+355691110001,data,4.20,EUR,\n\
         2024-05-04,+355691110002,fax,1.00,EUR,\n",
    );
    let err = import_usage(&mut conn, file.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("row 3"), "{err}");
    assert_eq!(count(&conn), 0);
}

#[test]
fn unknown_line_is_rejected() {
    let mut conn = base_conn();
    let file = csv_file("2024-05-03,+355699999999,calls,1,EUR,\n");
    assert!(import_usage(&mut conn, file.path()).is_err());
    assert_eq!(count(&conn), 0);
}

#[test]
fn negative_amounts_and_bad_dates_are_validation_errors() {
    let conn = base_conn();
    let input = |date: &str, amount: &str| UsageInput {
        phone_number: "+355691110001".into(),
        date: date.into(),
        category: "sms".into(),
        amount: amount.into(),
        currency: "EUR".into(),
        description: None,
    };
    for (date, amount) in [("2024-05-03", "-1"), ("2024-02-30", "1"), ("2024-05-03", "abc")] {
        let err = record_usage(&conn, &input(date, amount)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{date} {amount}");
    }
    assert_eq!(count(&conn), 0);
}

#[test]
fn list_filters_by_month() {
    let mut conn = base_conn();
    let file = csv_file(
        "2024-04-30,+355691110001,data,1,EUR,\n\
         2024-05-01,+355691110002,calls,2,EUR,\n\
         2024-05-31,+355691110001,other,3,EUR,\n",
    );
    assert_eq!(import_usage(&mut conn, file.path()).unwrap(), 3);
    let may = list_usage(&conn, Some(BillingMonth::new(2024, 5).unwrap())).unwrap();
    assert_eq!(may.len(), 2);
    assert_eq!(may[0].date.to_string(), "2024-05-31");
}

#[test]
fn lines_validate_phone_numbers() {
    let conn = base_conn();
    let err = add_line(&conn, "call me", "Nobody", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = add_line(&conn, "+355691110001", "Again", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = add_line(&conn, "+355691110009", "Arben", Some("Nowhere")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(list_lines(&conn).unwrap().len(), 2);
}
