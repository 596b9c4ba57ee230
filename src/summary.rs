use crate::models::{
    CohortView, MetricRecord, PlotPoint, PlotSeries, SummaryStats, BEST_VAL_F1_KEY, TRAIN_LOSS_KEY, VAL_F1_KEY,
};

/// Reconciles the per-epoch maximum with the pre-aggregated "best so far"
/// maximum. A missing side counts as negative infinity; both missing is 0.0.
pub fn merge_peak_scores(per_epoch_max: Option<f64>, best_so_far_max: Option<f64>) -> f64 {
    match (per_epoch_max, best_so_far_max) {
        (Some(a), Some(b)) => a.max(b),
        (Some(value), None) | (None, Some(value)) => value,
        (None, None) => 0.0,
    }
}

pub fn summarize(view: Option<&CohortView>) -> SummaryStats {
    let Some(view) = view.filter(|view| !view.is_empty()) else {
        return SummaryStats::default();
    };

    let peak_score = merge_peak_scores(
        max_of(view.records.iter(), VAL_F1_KEY),
        max_of(view.records.iter(), BEST_VAL_F1_KEY),
    );

    let epoch_count = view
        .epoch_records()
        .filter_map(MetricRecord::epoch)
        .fold(None, |acc: Option<f64>, epoch| Some(acc.map_or(epoch, |current| current.max(epoch))))
        .map(|max_epoch| max_epoch.max(0.0) as u32)
        .unwrap_or(0);

    let final_loss = view
        .epoch_records()
        .last()
        .and_then(|record| record.number(TRAIN_LOSS_KEY))
        .unwrap_or(0.0);

    SummaryStats {
        epoch_count,
        peak_score,
        final_loss,
    }
}

/// Loss and score series over epoch records in row order, plus the first
/// point reaching the highest `val_f1` among them.
pub fn extract_plot_series(view: Option<&CohortView>) -> PlotSeries {
    let Some(view) = view else {
        return PlotSeries::default();
    };

    let points = |key: &str| {
        view.epoch_records()
            .filter_map(|record| {
                let epoch = record.epoch()?;
                let value = record.number(key)?;
                Some(PlotPoint { epoch, value })
            })
            .collect::<Vec<_>>()
    };

    let loss = points(TRAIN_LOSS_KEY);
    let score = points(VAL_F1_KEY);
    let peak = score.iter().copied().fold(None, |best: Option<PlotPoint>, point| match best {
        Some(current) if current.value >= point.value => Some(current),
        _ => Some(point),
    });

    PlotSeries { loss, score, peak }
}

fn max_of<'a>(records: impl Iterator<Item = &'a MetricRecord>, key: &str) -> Option<f64> {
    records
        .filter_map(|record| record.number(key))
        .fold(None, |acc, value| Some(acc.map_or(value, |current: f64| current.max(value))))
}
