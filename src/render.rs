//! HTML and SVG sinks for a [`DashboardView`].

use crate::models::{CohortCard, DashboardView, PlotPoint};
use html_escape::encode_text;
use std::fmt::Write as _;

const CARD_GRADIENTS: [(&str, &str); 2] = [("#3B82F6", "#1E40AF"), ("#8B5CF6", "#6D28D9")];
const LOSS_COLORS: [&str; 2] = ["#EF4444", "#F59E0B"];
const SCORE_COLORS: [&str; 2] = ["#10B981", "#8B5CF6"];
const PEAK_FILL: &str = "#FBBF24";
const PEAK_STROKE: &str = "#F59E0B";
const GRID_COLOR: &str = "#374151";
const TEXT_COLOR: &str = "#E5E7EB";

const CHART_WIDTH: f64 = 1000.0;
const CHART_HEIGHT: f64 = 700.0;
const CHART_TOP: f64 = 50.0;
const PANEL_GAP: f64 = 40.0;
const PANEL_PAD_LEFT: f64 = 50.0;
const PANEL_PAD_RIGHT: f64 = 15.0;
const PANEL_PAD_TOP: f64 = 30.0;
const PANEL_PAD_BOTTOM: f64 = 40.0;

pub fn render_status(view: &DashboardView) -> String {
    format!(
        "<div class=\"status\"><h1>Protein Structure Prediction</h1><p>{}</p></div>",
        encode_text(&view.status)
    )
}

pub fn render_cards(cards: &[CohortCard; 2]) -> String {
    let mut html = String::from(
        "<div style=\"display: grid; grid-template-columns: repeat(auto-fit, minmax(350px, 1fr)); gap: 25px; margin: 25px 0;\">",
    );
    for (card, (from, to)) in cards.iter().zip(CARD_GRADIENTS) {
        if !card.present {
            continue;
        }
        let _ = write!(
            html,
            "<div class=\"card\" style=\"background: linear-gradient(135deg, {from} 0%, {to} 100%); padding: 30px; border-radius: 15px; color: white;\">\
             <h2 style=\"margin: 0 0 20px 0;\">{label} Model</h2>\
             <div style=\"display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px\">\
             {epochs}{peak}{loss}\
             </div></div>",
            label = encode_text(&card.label),
            epochs = stat_cell("Epochs", &card.stats.epoch_count.to_string()),
            peak = stat_cell("Peak F1", &format!("{:.3}", card.stats.peak_score)),
            loss = stat_cell("Final Loss", &format!("{:.3}", card.stats.final_loss)),
        );
    }
    html.push_str("</div>");
    html
}

fn stat_cell(name: &str, value: &str) -> String {
    format!(
        "<div><div style=\"font-size: 13px; opacity: 0.85;\">{name}</div>\
         <div style=\"font-size: 36px; font-weight: 700;\">{value}</div></div>"
    )
}

struct Panel<'a> {
    title: String,
    points: &'a [PlotPoint],
    color: &'a str,
    peak: Option<PlotPoint>,
}

/// Four panels in a 2x2 grid: loss and F1 for cohort A on top, cohort B below.
pub fn render_chart(cards: &[CohortCard; 2]) -> String {
    let mut panels = Vec::with_capacity(4);
    for (index, card) in cards.iter().enumerate() {
        panels.push(Panel {
            title: format!("{} Loss", card.label),
            points: &card.series.loss,
            color: LOSS_COLORS[index],
            peak: None,
        });
        panels.push(Panel {
            title: format!("{} F1 Score", card.label),
            points: &card.series.score,
            color: SCORE_COLORS[index],
            peak: card.series.peak,
        });
    }

    let panel_width = (CHART_WIDTH - PANEL_GAP) / 2.0;
    let panel_height = (CHART_HEIGHT - CHART_TOP - PANEL_GAP) / 2.0;

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" \
         style=\"background: #1F2937; font-family: sans-serif; font-size: 12px;\" fill=\"{TEXT_COLOR}\">\
         <text x=\"{x}\" y=\"30\" text-anchor=\"middle\" font-size=\"18\" font-weight=\"bold\">Training Progress</text>",
        x = CHART_WIDTH / 2.0,
    );

    for (index, panel) in panels.iter().enumerate() {
        let left = (index % 2) as f64 * (panel_width + PANEL_GAP);
        let top = CHART_TOP + (index / 2) as f64 * (panel_height + PANEL_GAP);
        render_panel(&mut svg, panel, left, top, panel_width, panel_height);
    }

    svg.push_str("</svg>");
    svg
}

fn render_panel(svg: &mut String, panel: &Panel<'_>, left: f64, top: f64, width: f64, height: f64) {
    let plot_left = left + PANEL_PAD_LEFT;
    let plot_top = top + PANEL_PAD_TOP;
    let plot_width = width - PANEL_PAD_LEFT - PANEL_PAD_RIGHT;
    let plot_height = height - PANEL_PAD_TOP - PANEL_PAD_BOTTOM;

    let _ = write!(
        svg,
        "<g class=\"panel\"><text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"middle\" font-size=\"14\">{title}</text>\
         <rect x=\"{plot_left:.1}\" y=\"{plot_top:.1}\" width=\"{plot_width:.1}\" height=\"{plot_height:.1}\" fill=\"#111827\" stroke=\"{GRID_COLOR}\"/>\
         <text x=\"{x:.1}\" y=\"{label_y:.1}\" text-anchor=\"middle\">Epoch</text>",
        x = plot_left + plot_width / 2.0,
        y = top + 18.0,
        title = encode_text(&panel.title),
        label_y = top + height - 5.0,
    );

    if panel.points.is_empty() {
        let _ = write!(
            svg,
            "<text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"middle\" fill=\"#94A3B8\">No data</text></g>",
            x = plot_left + plot_width / 2.0,
            y = plot_top + plot_height / 2.0,
        );
        return;
    }

    let x_range = padded_range(panel.points.iter().map(|point| point.epoch));
    let y_range = padded_range(panel.points.iter().map(|point| point.value));
    let project = |point: &PlotPoint| {
        (
            plot_left + (point.epoch - x_range.0) / (x_range.1 - x_range.0) * plot_width,
            plot_top + plot_height - (point.value - y_range.0) / (y_range.1 - y_range.0) * plot_height,
        )
    };

    for step in 0..=4 {
        let fraction = step as f64 / 4.0;
        let y = plot_top + plot_height - fraction * plot_height;
        let value = y_range.0 + fraction * (y_range.1 - y_range.0);
        let _ = write!(
            svg,
            "<line x1=\"{plot_left:.1}\" y1=\"{y:.1}\" x2=\"{x2:.1}\" y2=\"{y:.1}\" stroke=\"{GRID_COLOR}\"/>\
             <text x=\"{tx:.1}\" y=\"{ty:.1}\" text-anchor=\"end\">{value:.2}</text>",
            x2 = plot_left + plot_width,
            tx = plot_left - 5.0,
            ty = y + 4.0,
        );
    }

    let polyline = panel
        .points
        .iter()
        .map(|point| {
            let (x, y) = project(point);
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        svg,
        "<polyline points=\"{polyline}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"3\"/>",
        color = panel.color,
    );
    for point in panel.points {
        let (x, y) = project(point);
        let _ = write!(svg, "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"3.5\" fill=\"{}\"/>", panel.color);
    }

    if let Some(peak) = panel.peak {
        let (x, y) = project(&peak);
        let _ = write!(
            svg,
            "<circle class=\"peak\" cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"8\" fill=\"{PEAK_FILL}\" stroke=\"{PEAK_STROKE}\" stroke-width=\"2\"/>"
        );
    }

    svg.push_str("</g>");
}

/// Min/max with a margin; a single distinct value gets a unit-wide window.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
        (lo.min(value), hi.max(value))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 0.5, max + 0.5);
    }
    let margin = (max - min) * 0.05;
    (min - margin, max + margin)
}

pub fn render_page(view: &DashboardView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Protein Structure Dashboard</title>
    <style>
        body {{ background: #0F172A; color: {TEXT_COLOR}; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 30px; }}
        .banner {{ text-align: center; padding: 40px; background: linear-gradient(135deg, #1E3A8A 0%, #7C3AED 100%); border-radius: 20px; margin-bottom: 30px; }}
        .banner h1 {{ color: white; margin: 0; font-size: 32px; }}
        .banner p {{ color: rgba(255,255,255,0.9); margin: 15px 0 0 0; font-size: 16px; }}
        .refresh {{ display: inline-block; background: #3B82F6; color: white; padding: 12px 28px; border-radius: 8px; text-decoration: none; font-weight: 600; }}
        .status h1 {{ font-size: 24px; }}
        .chart {{ background: #1E293B; border-radius: 12px; padding: 10px; }}
        footer {{ color: #94A3B8; font-size: 12px; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="banner">
        <h1>Protein Secondary Structure</h1>
        <p>BiLSTM + CNN</p>
    </div>
    <a class="refresh" href="/refresh">Refresh</a>
    {status}
    {cards}
    <div class="chart">{chart}</div>
    <footer>Generated at {generated_at}</footer>
</body>
</html>
"#,
        status = render_status(view),
        cards = render_cards(&view.cards),
        chart = render_chart(&view.cards),
        generated_at = view.generated_at.to_rfc3339(),
    )
}

/// Plain-text rendering for the terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut text = format!("Protein Structure Prediction\n{}\n", view.status);
    for card in view.cards.iter().filter(|card| card.present) {
        let _ = writeln!(
            text,
            "{} Model  epochs={} peak_f1={:.3} final_loss={:.3}",
            card.label, card.stats.epoch_count, card.stats.peak_score, card.stats.final_loss
        );
    }
    text
}
