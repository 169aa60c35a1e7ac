//! Plain-text rendering of a dashboard report

use cpi_forecast::data::{Observation, SeriesSummary};
use cpi_forecast::pipeline::{BacktestOutcome, DashboardReport, ForecastOutcome};
use cpi_forecast::ForecastTable;

pub fn render_report(report: &DashboardReport) -> String {
    let mut out = String::new();
    out.push_str(&render_summary(&report.summary));
    out.push('\n');
    out.push_str(&render_history(&report.history));
    for outcome in &report.outcomes {
        out.push('\n');
        out.push_str(&render_outcome(outcome));
    }
    if !report.backtests.is_empty() {
        out.push('\n');
        out.push_str(&render_backtests(&report.backtests));
    }
    out
}

pub fn render_summary(summary: &SeriesSummary) -> String {
    format!(
        "CPI history\n  {} months, {} to {}\n  min {:.3}  max {:.3}  mean {:.3}  last {:.3}\n",
        summary.observations,
        summary.first_month.format("%Y-%m"),
        summary.last_month.format("%Y-%m"),
        summary.min,
        summary.max,
        summary.mean,
        summary.last_value
    )
}

pub fn render_history(history: &[Observation]) -> String {
    let mut out = format!("{:<10} {:>10}\n", "Date", "CPI");
    for obs in history {
        out.push_str(&format!(
            "{:<10} {:>10.3}\n",
            obs.date.format("%Y-%m").to_string(),
            obs.value
        ));
    }
    out
}

pub fn render_outcome(outcome: &ForecastOutcome) -> String {
    match outcome {
        ForecastOutcome::Succeeded(table) => render_table(table),
        ForecastOutcome::Failed {
            strategy,
            horizon,
            message,
        } => format!("{} / {} months: FAILED\n  {}\n", strategy, horizon, message),
    }
}

pub fn render_table(table: &ForecastTable) -> String {
    let bounds = table.has_intervals();
    let mut out = format!(
        "{} / {} months ({})\n{:<10} {:>15} {:>15}",
        table.strategy, table.horizon, table.model, "Date", "Forecasted CPI", "Percent Change"
    );
    if bounds {
        out.push_str(&format!(" {:>10} {:>10}", "Lower", "Upper"));
    }
    out.push('\n');

    for row in &table.rows {
        out.push_str(&format!(
            "{:<10} {:>15.3} {:>14.3}%",
            row.timestamp.format("%Y-%m").to_string(),
            row.forecasted_cpi,
            row.percent_change
        ));
        if let (true, Some(lo), Some(hi)) = (bounds, row.lower, row.upper) {
            out.push_str(&format!(" {:>10.3} {:>10.3}", lo, hi));
        }
        out.push('\n');
    }
    out
}

pub fn render_backtests(backtests: &[BacktestOutcome]) -> String {
    let mut out = String::from("Back-test\n");
    for outcome in backtests {
        let line = match outcome {
            BacktestOutcome::Succeeded(bt) => format!(
                "  {:<12} {} months  {}\n",
                bt.strategy, bt.holdout_months, bt.metrics
            ),
            BacktestOutcome::Failed { strategy, message } => {
                format!("  {:<12} FAILED: {}\n", strategy, message)
            }
        };
        out.push_str(&line);
    }
    out
}
