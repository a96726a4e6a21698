// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use costdesk::commands::recommendations::{
    add_recommendation, import_recommendations, list_recommendations,
};
use costdesk::error::ErrorKind;
use costdesk::models::RecommendationDetails;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::NamedTempFile;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    costdesk::db::init_schema(&conn).unwrap();
    conn
}

#[test]
fn recommendations_keep_their_tagged_details() {
    let conn = setup();
    add_recommendation(
        &conn,
        dec!(12.5),
        &RecommendationDetails::InternationalCallingPlan {
            phone_number: "+355691110001".into(),
            call_cost: dec!(40),
        },
    )
    .unwrap();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"type":"shared_data_plan","department":"Sales","line_count":4,"current_cost":"120","potential_savings":"30"}},
            {{"type":"data_plan_downgrade","phone_number":"+355691110002","current_plan":"20GB","current_usage_gb":"3.2","suggested_plan":"5GB","potential_savings":"8"}}
        ]"#
    )
    .unwrap();
    file.flush().unwrap();
    assert_eq!(import_recommendations(&conn, file.path()).unwrap(), 2);

    let recs = list_recommendations(&conn).unwrap();
    assert_eq!(recs.len(), 3);
    assert!(matches!(
        recs[1].details,
        RecommendationDetails::SharedDataPlan { line_count: 4, .. }
    ));
    assert_eq!(recs[2].potential_savings, dec!(8));

    let json = serde_json::to_value(&recs[0]).unwrap();
    assert_eq!(json["type"], "international_calling_plan");
    assert_eq!(json["potential_savings"], "12.5");
}

#[test]
fn negative_savings_are_rejected() {
    let conn = setup();
    let err = add_recommendation(
        &conn,
        dec!(-1),
        &RecommendationDetails::SharedDataPlan {
            department: "Sales".into(),
            line_count: 2,
            current_cost: dec!(10),
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(list_recommendations(&conn).unwrap().is_empty());
}
