use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const RUN_NAME_KEY: &str = "run_name";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const STEP_KEY: &str = "step";
pub const EPOCH_KEY: &str = "epoch";
pub const VAL_F1_KEY: &str = "val_f1";
pub const BEST_VAL_F1_KEY: &str = "best_val_f1";
pub const TRAIN_LOSS_KEY: &str = "train_loss";

/// The `metrics` column as SQLite handed it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    Text(String),
    Bytes(Vec<u8>),
    Null,
}

/// One row of the `metrics` table, undecoded.
#[derive(Debug, Clone)]
pub struct MetricRow {
    pub id: i64,
    pub run_name: Option<String>,
    pub timestamp: i64,
    pub step: i64,
    pub payload: RawPayload,
}

/// A `metrics` row as read back, or the reason its relational columns were unusable.
#[derive(Debug, Clone)]
pub enum StoredRow {
    Valid(MetricRow),
    Malformed { row_id: i64, reason: String },
}

/// A decoded payload annotated with the row's own `run_name`, `timestamp` and `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord {
    fields: Map<String, Value>,
}

impl MetricRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn run_name(&self) -> Option<&str> {
        self.fields.get(RUN_NAME_KEY).and_then(Value::as_str)
    }

    /// Finite numeric value of `key`; nulls, strings and NaN-like values read as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields
            .get(key)
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite())
    }

    pub fn epoch(&self) -> Option<f64> {
        self.number(EPOCH_KEY)
    }

    pub fn is_epoch_record(&self) -> bool {
        self.epoch().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortView {
    pub label: String,
    pub records: Vec<MetricRecord>,
}

impl CohortView {
    pub fn new(label: impl Into<String>, records: Vec<MetricRecord>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn epoch_records(&self) -> impl Iterator<Item = &MetricRecord> {
        self.records.iter().filter(|record| record.is_epoch_record())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub epoch_count: u32,
    pub peak_score: f64,
    pub final_loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub epoch: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    pub loss: Vec<PlotPoint>,
    pub score: Vec<PlotPoint>,
    pub peak: Option<PlotPoint>,
}

impl PlotSeries {
    pub fn is_empty(&self) -> bool {
        self.loss.is_empty() && self.score.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Decoded(MetricRecord),
    Skipped { row_id: i64, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub database: Option<PathBuf>,
    pub rows_read: usize,
    pub rows_decoded: usize,
    pub rows_skipped: usize,
}

/// Result of one load: both cohorts, the status line and the row accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub cohort_a: Option<CohortView>,
    pub cohort_b: Option<CohortView>,
    pub status: String,
    pub report: LoadReport,
}

impl LoadOutcome {
    pub fn degraded(status: impl Into<String>, report: LoadReport) -> Self {
        Self {
            cohort_a: None,
            cohort_b: None,
            status: status.into(),
            report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortCard {
    pub label: String,
    pub present: bool,
    pub stats: SummaryStats,
    pub series: PlotSeries,
}

/// Everything one refresh produces for the presentation sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub status: String,
    pub report: LoadReport,
    pub cards: [CohortCard; 2],
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
