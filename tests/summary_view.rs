mod test_support;

use serde_json::{json, Value};
use test_support::{record, record_with_marks, request_err, request_ok, seeded_state};

use rosterd::gateway::GatewayError;

fn histogram_counts(result: &Value) -> Vec<u64> {
    result
        .get("histogram")
        .and_then(Value::as_array)
        .map(|bins| {
            bins.iter()
                .filter_map(|b| b.get("count").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn summary_of_the_three_record_scenario() {
    let (mut state, store) = seeded_state(vec![
        record("1", "Asha Verma", "R10", "A", 90),
        record("2", "Bela Khan", "R20", "A", 70),
        record("3", "Chitra Rao", "R30", "B", 50),
    ]);

    let result = request_ok(&mut state, "1", "summary.load", json!({}));
    assert_eq!(result.get("total").and_then(Value::as_u64), Some(3));
    assert_eq!(result.get("average").and_then(Value::as_f64), Some(70.0));
    assert_eq!(
        result
            .get("highest")
            .and_then(|s| s.get("marks"))
            .and_then(Value::as_f64),
        Some(90.0)
    );
    assert_eq!(
        result
            .get("highest")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str),
        Some("Asha Verma")
    );
    assert_eq!(
        result
            .get("lowest")
            .and_then(|s| s.get("studentClass"))
            .and_then(Value::as_str),
        Some("B")
    );

    let classes = result.get("classes").and_then(Value::as_array).expect("classes");
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].get("studentClass").and_then(Value::as_str), Some("A"));
    assert_eq!(classes[0].get("average").and_then(Value::as_f64), Some(80.0));
    assert_eq!(classes[0].get("count").and_then(Value::as_u64), Some(2));
    assert_eq!(classes[1].get("average").and_then(Value::as_f64), Some(50.0));

    assert_eq!(histogram_counts(&result), vec![0, 0, 1, 1, 1]);

    // The dashboard asks for the roster ranked by marks.
    assert!(store.has_call("list sort_by=marks order=desc"));
}

#[test]
fn empty_roster_summarizes_to_zeroes() {
    let (mut state, _store) = seeded_state(Vec::new());

    let result = request_ok(&mut state, "1", "summary.load", json!({}));
    assert_eq!(result.get("total").and_then(Value::as_u64), Some(0));
    assert_eq!(result.get("average").and_then(Value::as_f64), Some(0.0));
    assert!(result.get("highest").is_none());
    assert!(result.get("lowest").is_none());
    assert_eq!(
        result.get("classes").and_then(Value::as_array).map(Vec::len),
        Some(0)
    );
    assert_eq!(histogram_counts(&result), vec![0, 0, 0, 0, 0]);
}

#[test]
fn boundary_marks_land_in_the_specified_buckets() {
    let (mut state, _store) = seeded_state(vec![
        record("1", "A", "R1", "X", 20),
        record("2", "B", "R2", "X", 100),
        record("3", "C", "R3", "X", 19),
    ]);

    let result = request_ok(&mut state, "1", "summary.load", json!({}));
    assert_eq!(histogram_counts(&result), vec![1, 1, 0, 0, 1]);
}

#[test]
fn unparseable_marks_are_counted_but_not_charted() {
    let (mut state, _store) = seeded_state(vec![
        record("1", "Asha Verma", "R10", "A", 60),
        record_with_marks("2", "Bela Khan", "R20", "A", json!("absent")),
    ]);

    let result = request_ok(&mut state, "1", "summary.load", json!({}));
    assert_eq!(result.get("total").and_then(Value::as_u64), Some(2));
    assert_eq!(result.get("average").and_then(Value::as_f64), Some(60.0));
    assert_eq!(
        result
            .get("highest")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str),
        Some("Asha Verma")
    );
    assert_eq!(histogram_counts(&result).iter().sum::<u64>(), 1);
}

#[test]
fn summary_load_failure_is_an_error_envelope() {
    let (mut state, store) = seeded_state(vec![record("1", "Asha Verma", "R10", "A", 60)]);
    *store.fail_next_read.borrow_mut() = Some(GatewayError::Api {
        status: 500,
        message: "boom".to_string(),
    });

    let error = request_err(&mut state, "1", "summary.load", json!({}));
    assert_eq!(
        error.get("code").and_then(Value::as_str),
        Some("gateway_error")
    );
}
