//! Terminal rendering shared by the commands

use crate::signal::Signal;
use clap::ValueEnum;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Print signals as an aligned table
pub fn print_signal_table(signals: &[Signal]) {
    if signals.is_empty() {
        println!("No signals.");
        return;
    }

    println!(
        "{:<6} {:<24} {:<5} {:>6} {:>5} {:<8} {:>14} {:>6} {:<7} {:>5} {:<6}",
        "TICKER",
        "CONTRACT",
        "GRADE",
        "SCORE",
        "DTE",
        "SENT",
        "PREMIUM",
        "VOL/OI",
        "RISK",
        "SEEN",
        "SPREAD"
    );
    for signal in signals {
        let vol_oi = crate::decimal::count_ratio(signal.volume, signal.open_interest)
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "-".to_string());
        let spread = if signal.is_likely_spread {
            signal.spread_type.to_string()
        } else {
            "-".to_string()
        };
        println!(
            "{:<6} {:<24} {:<5} {:>6.3} {:>5} {:<8} {:>14.0} {:>6} {:<7} {:>5} {:<6}",
            signal.ticker,
            signal.option_symbol,
            signal.grade.to_string(),
            signal.overall_score,
            signal.days_to_expiry,
            signal.sentiment.to_string(),
            signal.premium_flow,
            vol_oi,
            signal.risk_level.to_string(),
            signal.detection_count,
            spread
        );
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
