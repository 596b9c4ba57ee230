pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod models;
pub mod render;
pub mod server;
pub mod summary;

use crate::config::DashboardConfig;
use crate::models::{CohortCard, CohortView, DashboardView};
use crate::summary::{extract_plot_series, summarize};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// One refresh: load both cohorts, reduce each, and hand back what the sinks need.
pub fn show_dashboard(config: &DashboardConfig) -> DashboardView {
    let outcome = loader::load(config);
    let cards = [
        cohort_card(outcome.cohort_a.as_ref(), &config.cohort_a.label),
        cohort_card(outcome.cohort_b.as_ref(), &config.cohort_b.label),
    ];

    DashboardView {
        status: outcome.status,
        report: outcome.report,
        cards,
        generated_at: chrono::Utc::now(),
    }
}

fn cohort_card(view: Option<&CohortView>, label: &str) -> CohortCard {
    CohortCard {
        label: view.map(|view| view.label.clone()).unwrap_or_else(|| label.to_string()),
        present: view.map(|view| !view.is_empty()).unwrap_or(false),
        stats: summarize(view),
        series: extract_plot_series(view),
    }
}

/// JSON lines to a daily rolling file when `log_dir` is set, otherwise
/// human-readable output on stderr.
pub fn init_tracing(log_dir: Option<&Path>, verbose: bool) -> Result<(), String> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| error.to_string())
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| error.to_string()),
    }
}
