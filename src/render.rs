//! Table rendering for the CLI report. The core returns plain data; all
//! presentation lives here.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use core_types::{ClusterId, FeatureRecord, Forecast, Recommendation, RollingStats, TradeMetrics};
use patterns::ClusterModel;

pub fn print_report(
    stats: &RollingStats,
    model: &ClusterModel,
    subject: &FeatureRecord,
    subject_metrics: &TradeMetrics,
    forecast: &Forecast,
    recommendations: &[Recommendation],
) {
    println!("\nRolling window for account {}", stats.scope.account_id);
    print_stats(stats);

    println!("\nDiscovered setups (model {})", model.version);
    print_clusters(model);

    println!(
        "\nMost recent trade {} ({} {})",
        subject.trade_id, subject.symbol, subject.entry_time
    );
    print_subject(subject_metrics, forecast);

    println!("\nRecommendations");
    print_recommendations(recommendations);
}

fn print_stats(stats: &RollingStats) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Trades", "Wins", "Losses", "Win rate", "Expectancy", "Profit factor", "Net P&L",
        "Max DD", "Streak", "Flags",
    ]);
    table.add_row(vec![
        Cell::new(stats.trades),
        Cell::new(stats.wins),
        Cell::new(stats.losses),
        Cell::new(
            stats
                .win_rate
                .map(|w| format!("{}%", (w * rust_decimal::Decimal::from(100)).round_dp(1)))
                .unwrap_or_else(|| "n/a".into()),
        ),
        Cell::new(
            stats
                .expectancy
                .map(|e| format!("{}R", e.round_dp(2)))
                .unwrap_or_else(|| "n/a".into()),
        ),
        Cell::new(stats.profit_factor.to_string()),
        Cell::new(stats.net_pnl.round_dp(2)),
        Cell::new(stats.max_drawdown.round_dp(2)),
        Cell::new(stats.streak),
        Cell::new(stats.compliance.len()),
    ]);
    println!("{table}");

    if stats.insufficient_data {
        println!("(window below the configured minimum sample; treat with care)");
    }
    for flag in &stats.compliance {
        println!(
            "  BREACH: {} (limit {}, observed {}, trade {})",
            flag.rule, flag.limit, flag.observed, flag.triggered_by
        );
    }
}

fn print_clusters(model: &ClusterModel) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Cluster", "Members", "Win rate", "Avg R"]);
    for cluster in &model.clusters {
        table.add_row(vec![
            Cell::new(cluster.id.to_string()),
            Cell::new(cluster.members),
            Cell::new(
                cluster
                    .win_rate
                    .map(|w| format!("{}%", (w * rust_decimal::Decimal::from(100)).round_dp(1)))
                    .unwrap_or_else(|| "n/a".into()),
            ),
            Cell::new(
                cluster
                    .avg_r_multiple
                    .map(|r| format!("{}R", r.round_dp(2)))
                    .unwrap_or_else(|| "n/a".into()),
            ),
        ]);
    }
    println!("{table}");
}

fn print_subject(metrics: &TradeMetrics, forecast: &Forecast) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "R:R", "Hold", "MFE", "MAE", "Matched", "P(win)", "E[R]", "Confidence",
    ]);
    let rr = match metrics.r_r_ratio {
        Some(rr) if metrics.risk_estimated => format!("{} (est.)", rr.round_dp(2)),
        Some(rr) => rr.round_dp(2).to_string(),
        None => "n/a".into(),
    };
    table.add_row(vec![
        Cell::new(rr),
        Cell::new(
            metrics
                .hold_secs
                .map(|s| format!("{}m", s / 60))
                .unwrap_or_else(|| "open".into()),
        ),
        Cell::new(fmt_opt_decimal(metrics.mfe)),
        Cell::new(fmt_opt_decimal(metrics.mae)),
        Cell::new(match forecast.cluster_id {
            ClusterId::Unclustered if forecast.degraded => "unclustered (global)".to_string(),
            id => id.to_string(),
        }),
        Cell::new(format!("{:.0}%", forecast.win_probability * 100.0)),
        Cell::new(format!("{:+.2}R", forecast.expected_r)),
        Cell::new(format!(
            "{:.2}{}",
            forecast.confidence,
            if forecast.degraded { " (degraded)" } else { "" }
        )),
    ]);
    println!("{table}");
}

fn print_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        println!("(nothing to flag)");
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Urgency", "Action", "Why"]);
    for rec in recommendations {
        table.add_row(vec![
            Cell::new(format!("{:?}", rec.urgency)),
            Cell::new(&rec.action),
            Cell::new(&rec.rationale),
        ]);
    }
    println!("{table}");
}

fn fmt_opt_decimal(value: Option<rust_decimal::Decimal>) -> String {
    value
        .map(|v| v.round_dp(2).to_string())
        .unwrap_or_else(|| "n/a".into())
}
