use crate::config::DashboardConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{MetricRow, RawPayload, StoredRow};
use ignore::WalkBuilder;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

const SELECT_METRICS_SQL: &str =
    "SELECT id, run_name, timestamp, step, metrics FROM metrics ORDER BY timestamp";

/// Resolves the database file for a load: the configured path, or the first
/// `*.db` file under the search root in path order.
pub fn locate_database(config: &DashboardConfig) -> AppResult<PathBuf> {
    if let Some(path) = &config.database {
        if path.is_file() {
            return Ok(path.clone());
        }
        return Err(AppError::MissingData(format!(
            "database {} does not exist",
            path.display()
        )));
    }

    discover_database(&config.search_root)?.ok_or_else(|| {
        AppError::MissingData(format!("no database under {}", config.search_root.display()))
    })
}

pub fn discover_database(root: &Path) -> AppResult<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(error = %error, "skipping unreadable entry during discovery");
                continue;
            }
        };
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        let is_db = entry
            .path()
            .extension()
            .map(|ext| ext == "db")
            .unwrap_or(false);
        if is_file && is_db {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}

/// Read-only handle on a metrics database. Dropping it closes the connection.
#[derive(Debug)]
pub struct MetricsStore {
    conn: Connection,
    db_path: PathBuf,
}

impl MetricsStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(AppError::from)?;

        Ok(Self {
            conn,
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Every row of `metrics` in ascending timestamp order. A row whose columns
    /// cannot be coerced comes back as `StoredRow::Malformed`; only a failing
    /// query fails the read.
    pub fn read_rows(&self) -> AppResult<Vec<StoredRow>> {
        let mut stmt = self.conn.prepare(SELECT_METRICS_SQL)?;
        let rows = stmt.query_map([], parse_metric_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }
}

fn parse_metric_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    let id: i64 = row.get(0)?;
    let malformed = |reason: String| StoredRow::Malformed { row_id: id, reason };

    let run_name = match row.get_ref(1)? {
        ValueRef::Null => None,
        ValueRef::Text(text) | ValueRef::Blob(text) => match std::str::from_utf8(text) {
            Ok(name) => Some(name.to_string()),
            Err(err) => return Ok(malformed(format!("run_name is not utf-8: {}", err))),
        },
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
    };
    let timestamp = match integer_column(row.get_ref(2)?) {
        Ok(value) => value,
        Err(reason) => return Ok(malformed(format!("timestamp {}", reason))),
    };
    let step = match integer_column(row.get_ref(3)?) {
        Ok(value) => value,
        Err(reason) => return Ok(malformed(format!("step {}", reason))),
    };

    // Text stays raw when it is not valid utf-8 so the decoder rejects it like a blob.
    let payload = match row.get_ref(4)? {
        ValueRef::Text(text) => match std::str::from_utf8(text) {
            Ok(text) => RawPayload::Text(text.to_string()),
            Err(_) => RawPayload::Bytes(text.to_vec()),
        },
        ValueRef::Blob(bytes) => RawPayload::Bytes(bytes.to_vec()),
        ValueRef::Null | ValueRef::Integer(_) | ValueRef::Real(_) => RawPayload::Null,
    };

    Ok(StoredRow::Valid(MetricRow {
        id,
        run_name,
        timestamp,
        step,
        payload,
    }))
}

/// Integer column coerced the way a dataframe read would: NULL as 0, REAL
/// truncated, numeric TEXT parsed.
fn integer_column(value: ValueRef<'_>) -> Result<i64, String> {
    match value {
        ValueRef::Null => Ok(0),
        ValueRef::Integer(value) => Ok(value),
        ValueRef::Real(value) if value.is_finite() => Ok(value.trunc() as i64),
        ValueRef::Real(value) => Err(format!("is not finite: {}", value)),
        ValueRef::Text(text) => {
            let text = std::str::from_utf8(text).map_err(|_| "is not utf-8".to_string())?.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
                .ok_or_else(|| format!("is not numeric: {:?}", text))
        }
        ValueRef::Blob(_) => Err("is a blob".to_string()),
    }
}
