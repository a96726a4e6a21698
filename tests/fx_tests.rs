// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use costdesk::commands::fx::{distinct_currencies, list_rates, set_rate};
use costdesk::utils::{fx_convert, get_base_currency, set_base_currency};
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    conn
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn base_defaults_to_eur_and_can_change() {
    let conn = setup();
    assert_eq!(get_base_currency(&conn).unwrap(), "EUR");
    set_base_currency(&conn, "usd").unwrap();
    assert_eq!(get_base_currency(&conn).unwrap(), "USD");
    assert!(set_base_currency(&conn, "dollars").is_err());
}

#[test]
fn fx_triangulation_and_reciprocal() {
    let conn = setup();
    // EUR->ALL and EUR->USD available
    set_rate(&conn, day(2024, 5, 1), "EUR", "ALL", dec!(100)).unwrap();
    set_rate(&conn, day(2024, 5, 1), "EUR", "USD", dec!(1.25)).unwrap();

    // USD 125 -> ALL via the EUR hub: 125 / 1.25 = 100 EUR; * 100 = 10000 ALL
    let res = fx_convert(&conn, day(2024, 5, 15), dec!(125), "USD", "ALL").unwrap();
    assert_eq!(format!("{:.2}", res.round_dp(2)), "10000.00");

    // ALL -> EUR using only EUR->ALL
    let res = fx_convert(&conn, day(2024, 5, 15), dec!(250), "ALL", "EUR").unwrap();
    assert_eq!(format!("{:.2}", res.round_dp(2)), "2.50");
}

#[test]
fn latest_rate_on_or_before_date_wins() {
    let conn = setup();
    set_rate(&conn, day(2024, 5, 1), "EUR", "USD", dec!(1.10)).unwrap();
    set_rate(&conn, day(2024, 5, 10), "EUR", "USD", dec!(1.20)).unwrap();
    let before = fx_convert(&conn, day(2024, 5, 9), dec!(10), "EUR", "USD").unwrap();
    let after = fx_convert(&conn, day(2024, 5, 10), dec!(10), "EUR", "USD").unwrap();
    assert_eq!(before, dec!(11));
    assert_eq!(after, dec!(12));

    // replacing a rate keeps one row per day
    set_rate(&conn, day(2024, 5, 10), "EUR", "USD", dec!(1.30)).unwrap();
    assert_eq!(list_rates(&conn).unwrap().len(), 2);
}

#[test]
fn missing_rate_leaves_amount_unchanged() {
    let conn = setup();
    let amt = Decimal::new(4200, 2);
    assert_eq!(fx_convert(&conn, day(2024, 5, 1), amt, "USD", "EUR").unwrap(), amt);
}

#[test]
fn rates_must_be_positive_iso_codes() {
    let conn = setup();
    assert!(set_rate(&conn, day(2024, 5, 1), "EUR", "US", dec!(1)).is_err());
    assert!(set_rate(&conn, day(2024, 5, 1), "EUR", "USD", dec!(0)).is_err());
    assert!(list_rates(&conn).unwrap().is_empty());
    assert!(distinct_currencies(&conn).unwrap().is_empty());
}
