//! Shared fixtures

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use unusual_flow::chain::{Chain, Contract, HistoricalBaseline, OptionType};

pub fn create_test_contract(
    ticker: &str,
    option_type: OptionType,
    strike: Decimal,
    volume: u64,
    snapshot: DateTime<Utc>,
) -> Contract {
    let side = match option_type {
        OptionType::Call => "C",
        OptionType::Put => "P",
    };
    Contract {
        symbol: format!("{}-{}-{}", ticker, side, strike),
        ticker: ticker.to_string(),
        strike,
        expiry: snapshot.date_naive() + Duration::days(30),
        option_type,
        last_price: dec!(4.00),
        bid: dec!(3.90),
        ask: dec!(4.10),
        volume,
        open_interest: 10_000,
        implied_volatility: Some(dec!(0.40)),
        greeks: None,
        snapshot_time: snapshot,
    }
}

/// One active call, one quiet call
pub fn create_test_chain(ticker: &str, snapshot: DateTime<Utc>) -> Chain {
    Chain {
        ticker: ticker.to_string(),
        underlying_price: dec!(100),
        snapshot_time: snapshot,
        contracts: vec![
            create_test_contract(ticker, OptionType::Call, dec!(101), 6_000, snapshot),
            create_test_contract(ticker, OptionType::Call, dec!(110), 150, snapshot),
        ],
    }
}

pub fn create_test_baseline(ticker: &str) -> HistoricalBaseline {
    let mut baseline = HistoricalBaseline::new(ticker);
    baseline.insert(format!("{}-C-101", ticker), 500, 10_000);
    baseline.insert(format!("{}-C-110", ticker), 150, 10_000);
    baseline
}

/// Write `<TICKER>.chain.json` and `<TICKER>.baseline.json` snapshots
pub fn write_snapshot(dir: &Path, chain: &Chain, baseline: Option<&HistoricalBaseline>) {
    std::fs::write(
        dir.join(format!("{}.chain.json", chain.ticker)),
        serde_json::to_vec_pretty(chain).unwrap(),
    )
    .unwrap();
    if let Some(baseline) = baseline {
        std::fs::write(
            dir.join(format!("{}.baseline.json", chain.ticker)),
            serde_json::to_vec_pretty(baseline).unwrap(),
        )
        .unwrap();
    }
}

pub fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
