use crate::config::{CohortSpec, DashboardConfig};
use crate::db::{locate_database, MetricsStore};
use crate::errors::{AppError, AppResult};
use crate::models::{
    CohortView, LoadOutcome, LoadReport, MetricRecord, MetricRow, RawPayload, RowOutcome, StoredRow, RUN_NAME_KEY,
    STEP_KEY, TIMESTAMP_KEY,
};
use regex::{Regex, RegexBuilder};
use serde_json::Value;

pub const NO_DATA_STATUS: &str = "no data found";

/// Runs one load and folds every failure into the status line.
pub fn load(config: &DashboardConfig) -> LoadOutcome {
    match try_load(config) {
        Ok(outcome) => outcome,
        Err(AppError::MissingData(detail)) => {
            tracing::warn!(detail = %detail, "no metrics database available");
            LoadOutcome::degraded(NO_DATA_STATUS, LoadReport::default())
        }
        Err(error) => {
            tracing::warn!(error = %error, "metrics load failed");
            LoadOutcome::degraded(format!("error: {}", error.detail()), LoadReport::default())
        }
    }
}

pub fn try_load(config: &DashboardConfig) -> AppResult<LoadOutcome> {
    let db_path = locate_database(config)?;
    let rows = {
        let store = MetricsStore::open(&db_path)?;
        store.read_rows()?
    };

    let mut report = LoadReport {
        database: Some(db_path),
        rows_read: rows.len(),
        ..LoadReport::default()
    };

    let mut records = Vec::with_capacity(rows.len());
    for stored in &rows {
        let outcome = match stored {
            StoredRow::Valid(row) => decode_row(row),
            StoredRow::Malformed { row_id, reason } => RowOutcome::Skipped {
                row_id: *row_id,
                reason: reason.clone(),
            },
        };
        match outcome {
            RowOutcome::Decoded(record) => records.push(record),
            RowOutcome::Skipped { row_id, reason } => {
                tracing::debug!(row_id, reason = %reason, "skipping undecodable metrics row");
                report.rows_skipped += 1;
            }
        }
    }
    report.rows_decoded = records.len();

    let (cohort_a, cohort_b) = partition(records, &config.cohort_a, &config.cohort_b)?;
    let status = status_message(&cohort_a, &cohort_b, &report);

    tracing::info!(
        rows_read = report.rows_read,
        rows_skipped = report.rows_skipped,
        cohort_a = cohort_a.len(),
        cohort_b = cohort_b.len(),
        "loaded training metrics"
    );

    Ok(LoadOutcome {
        cohort_a: Some(cohort_a),
        cohort_b: Some(cohort_b),
        status,
        report,
    })
}

/// Decodes the payload and stamps the row's own columns over it.
pub fn decode_row(row: &MetricRow) -> RowOutcome {
    match decode_payload(&row.payload) {
        Ok(mut fields) => {
            let run_name = row.run_name.clone().map(Value::String).unwrap_or(Value::Null);
            fields.insert(RUN_NAME_KEY.to_string(), run_name);
            fields.insert(TIMESTAMP_KEY.to_string(), Value::from(row.timestamp));
            fields.insert(STEP_KEY.to_string(), Value::from(row.step));
            RowOutcome::Decoded(MetricRecord::new(fields))
        }
        Err(error) => RowOutcome::Skipped {
            row_id: row.id,
            reason: error.detail().to_string(),
        },
    }
}

fn decode_payload(payload: &RawPayload) -> AppResult<serde_json::Map<String, Value>> {
    let text = match payload {
        RawPayload::Text(text) => text.as_str(),
        RawPayload::Bytes(bytes) => std::str::from_utf8(bytes)
            .map_err(|err| AppError::Decode(format!("payload is not utf-8: {}", err)))?,
        RawPayload::Null => return Err(AppError::Decode("payload is empty".to_string())),
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(AppError::Decode(format!("payload is not an object: {}", json_kind(&other)))),
        Err(err) => Err(AppError::Decode(format!("malformed payload: {}", err))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Splits records by case-insensitive marker match on `run_name`. The two
/// cohorts may overlap. A null `run_name` counts as absent, so when every
/// row's `run_name` column is NULL cohort A takes everything and cohort B is
/// empty.
pub fn partition(
    records: Vec<MetricRecord>,
    spec_a: &CohortSpec,
    spec_b: &CohortSpec,
) -> AppResult<(CohortView, CohortView)> {
    if !records.iter().any(|record| record.run_name().is_some()) {
        return Ok((
            CohortView::new(spec_a.label.as_str(), records),
            CohortView::new(spec_b.label.as_str(), Vec::new()),
        ));
    }

    let matcher_a = marker_regex(&spec_a.marker)?;
    let matcher_b = marker_regex(&spec_b.marker)?;
    let select = |matcher: &Regex| {
        records
            .iter()
            .filter(|record| record.run_name().map(|name| matcher.is_match(name)).unwrap_or(false))
            .cloned()
            .collect::<Vec<_>>()
    };

    Ok((
        CohortView::new(spec_a.label.as_str(), select(&matcher_a)),
        CohortView::new(spec_b.label.as_str(), select(&matcher_b)),
    ))
}

fn marker_regex(marker: &str) -> AppResult<Regex> {
    RegexBuilder::new(&regex::escape(marker))
        .case_insensitive(true)
        .build()
        .map_err(|err| AppError::Config(format!("invalid cohort marker '{}': {}", marker, err)))
}

pub fn status_message(cohort_a: &CohortView, cohort_b: &CohortView, report: &LoadReport) -> String {
    let mut message = format!("{} {} entries", cohort_a.len(), cohort_a.label);
    if !cohort_b.is_empty() {
        message.push_str(&format!(" + {} {} entries", cohort_b.len(), cohort_b.label));
    }
    if report.rows_skipped > 0 {
        message.push_str(&format!(" ({} rows skipped)", report.rows_skipped));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::{decode_row, partition, status_message};
    use crate::config::CohortSpec;
    use crate::models::{LoadReport, MetricRecord, MetricRow, RawPayload, RowOutcome};
    use serde_json::json;

    fn row(id: i64, run_name: Option<&str>, payload: RawPayload) -> MetricRow {
        MetricRow {
            id,
            run_name: run_name.map(ToString::to_string),
            timestamp: 1_700_000_000 + id,
            step: id,
            payload,
        }
    }

    fn decoded(row: &MetricRow) -> MetricRecord {
        match decode_row(row) {
            RowOutcome::Decoded(record) => record,
            RowOutcome::Skipped { reason, .. } => panic!("unexpected skip: {}", reason),
        }
    }

    fn specs() -> (CohortSpec, CohortSpec) {
        (CohortSpec::new("Q8", "q8"), CohortSpec::new("Q3", "q3"))
    }

    #[test]
    fn row_columns_overwrite_payload_keys() {
        let payload = RawPayload::Text(r#"{"run_name":"other","step":99,"timestamp":1,"val_f1":0.4}"#.to_string());
        let record = decoded(&row(7, Some("q8_a"), payload));
        assert_eq!(record.run_name(), Some("q8_a"));
        assert_eq!(record.get("step"), Some(&json!(7)));
        assert_eq!(record.get("timestamp"), Some(&json!(1_700_000_007i64)));
        assert_eq!(record.number("val_f1"), Some(0.4));
    }

    #[test]
    fn blob_payload_decodes_like_text() {
        let text = decoded(&row(1, Some("q8"), RawPayload::Text(r#"{"epoch":1}"#.to_string())));
        let bytes = decoded(&row(1, Some("q8"), RawPayload::Bytes(br#"{"epoch":1}"#.to_vec())));
        assert_eq!(text, bytes);
    }

    #[test]
    fn undecodable_payloads_are_skipped_with_reason() {
        let cases = [
            RawPayload::Text("{not json".to_string()),
            RawPayload::Bytes(vec![0xff, 0xfe, b'{']),
            RawPayload::Text("[1, 2]".to_string()),
            RawPayload::Null,
        ];
        for payload in cases {
            match decode_row(&row(3, Some("q8"), payload)) {
                RowOutcome::Skipped { row_id, reason } => {
                    assert_eq!(row_id, 3);
                    assert!(!reason.is_empty());
                }
                RowOutcome::Decoded(record) => panic!("expected skip, got {:?}", record),
            }
        }
    }

    #[test]
    fn partition_is_case_insensitive_substring() {
        let (a, b) = specs();
        let records = vec![
            decoded(&row(1, Some("BiLSTM_Q8_run"), RawPayload::Text("{}".to_string()))),
            decoded(&row(2, Some("q3_test"), RawPayload::Text("{}".to_string()))),
            decoded(&row(3, Some("baseline"), RawPayload::Text("{}".to_string()))),
        ];
        let (q8, q3) = partition(records, &a, &b).expect("partition");
        assert_eq!(q8.len(), 1);
        assert_eq!(q8.records[0].run_name(), Some("BiLSTM_Q8_run"));
        assert_eq!(q3.len(), 1);
        assert_eq!(q3.records[0].run_name(), Some("q3_test"));
    }

    #[test]
    fn overlapping_run_lands_in_both_cohorts() {
        let (a, b) = specs();
        let records = vec![decoded(&row(1, Some("q8_q3_mixed"), RawPayload::Text("{}".to_string())))];
        let (q8, q3) = partition(records, &a, &b).expect("partition");
        assert_eq!(q8.len(), 1);
        assert_eq!(q3.len(), 1);
    }

    #[test]
    fn without_any_run_name_cohort_a_takes_everything() {
        let (a, b) = specs();
        let records = vec![
            decoded(&row(1, None, RawPayload::Text(r#"{"epoch":1}"#.to_string()))),
            decoded(&row(2, None, RawPayload::Text(r#"{"epoch":2}"#.to_string()))),
        ];
        let (q8, q3) = partition(records, &a, &b).expect("partition");
        assert_eq!(q8.len(), 2);
        assert_eq!(q8.label, "Q8");
        assert!(q3.is_empty());
    }

    #[test]
    fn null_run_name_joins_neither_cohort_when_others_are_named() {
        let (a, b) = specs();
        let records = vec![
            decoded(&row(1, None, RawPayload::Text("{}".to_string()))),
            decoded(&row(2, Some("q8_a"), RawPayload::Text("{}".to_string()))),
        ];
        let (q8, q3) = partition(records, &a, &b).expect("partition");
        assert_eq!(q8.len(), 1);
        assert!(q3.is_empty());
    }

    #[test]
    fn marker_is_matched_literally() {
        let records = vec![decoded(&row(1, Some("run-a.b"), RawPayload::Text("{}".to_string())))];
        let (dotted, _) = partition(records, &CohortSpec::new("Dot", "a.b"), &CohortSpec::new("X", "axb"))
            .expect("partition");
        assert_eq!(dotted.len(), 1);

        let records = vec![decoded(&row(1, Some("run-axb"), RawPayload::Text("{}".to_string())))];
        let (dotted, _) = partition(records, &CohortSpec::new("Dot", "a.b"), &CohortSpec::new("X", "zzz"))
            .expect("partition");
        assert!(dotted.is_empty());
    }

    #[test]
    fn status_reports_cohorts_and_skips() {
        let (a, b) = specs();
        let records = vec![
            decoded(&row(1, Some("q8_a"), RawPayload::Text("{}".to_string()))),
            decoded(&row(2, Some("q8_a"), RawPayload::Text("{}".to_string()))),
            decoded(&row(3, Some("q3_a"), RawPayload::Text("{}".to_string()))),
        ];
        let (q8, q3) = partition(records, &a, &b).expect("partition");

        let clean = LoadReport::default();
        assert_eq!(status_message(&q8, &q3, &clean), "2 Q8 entries + 1 Q3 entries");

        let lossy = LoadReport {
            rows_skipped: 4,
            ..LoadReport::default()
        };
        assert_eq!(status_message(&q8, &q3, &lossy), "2 Q8 entries + 1 Q3 entries (4 rows skipped)");
    }

    #[test]
    fn status_omits_empty_second_cohort() {
        let (a, b) = specs();
        let (q8, q3) = partition(Vec::new(), &a, &b).expect("partition");
        assert_eq!(status_message(&q8, &q3, &LoadReport::default()), "0 Q8 entries");
    }
}
