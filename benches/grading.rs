//! Benchmarks for chain analysis: detection, spread matching and grading

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use unusual_flow::chain::{Chain, Contract, HistoricalBaseline, OptionType};
use unusual_flow::provider::{CacheConfig, CachedProvider, FileChainProvider};
use unusual_flow::scan::{ScanConfig, Scanner};

fn synthetic_chain(ticker: &str, strikes: i64) -> (Chain, HistoricalBaseline) {
    let now = Utc::now();
    let underlying = dec!(100);
    let mut contracts = Vec::new();
    let mut baseline = HistoricalBaseline::new(ticker);

    for i in 0..strikes {
        let strike = dec!(80) + Decimal::from(i);
        for (option_type, side) in [(OptionType::Call, "C"), (OptionType::Put, "P")] {
            for weeks in [3, 6, 10] {
                let symbol = format!("{}-{}-{}-{}", ticker, side, strike, weeks);
                let volume = if i % 7 == 0 { 8_000 } else { 400 + (i as u64) * 10 };
                contracts.push(Contract {
                    symbol: symbol.clone(),
                    ticker: ticker.to_string(),
                    strike,
                    expiry: now.date_naive() + Duration::weeks(weeks),
                    option_type,
                    last_price: dec!(3.50),
                    bid: dec!(3.45),
                    ask: dec!(3.55),
                    volume,
                    open_interest: 6_000,
                    implied_volatility: Some(dec!(0.35)),
                    greeks: None,
                    snapshot_time: now,
                });
                baseline.insert(symbol, 500, 4_000);
            }
        }
    }

    let chain = Chain {
        ticker: ticker.to_string(),
        underlying_price: underlying,
        snapshot_time: now,
        contracts,
    };
    (chain, baseline)
}

fn benchmark_analyze_chain(c: &mut Criterion) {
    let scanner = Scanner::new(FileChainProvider::new("."), ScanConfig::default());
    let (chain, baseline) = synthetic_chain("XYZ", 40);

    c.bench_function("analyze_chain_240_contracts", |b| {
        b.iter(|| scanner.analyze_chain(black_box(&chain), black_box(Some(&baseline))))
    });

    c.bench_function("analyze_chain_heuristic", |b| {
        b.iter(|| scanner.analyze_chain(black_box(&chain), None))
    });
}

fn benchmark_cached_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let tickers: Vec<String> = ["AAA", "BBB", "CCC", "DDD"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    for ticker in &tickers {
        let (chain, baseline) = synthetic_chain(ticker, 20);
        std::fs::write(
            dir.path().join(format!("{}.chain.json", ticker)),
            serde_json::to_vec(&chain).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(format!("{}.baseline.json", ticker)),
            serde_json::to_vec(&baseline).unwrap(),
        )
        .unwrap();
    }

    let provider = CachedProvider::new(FileChainProvider::new(dir.path()), &CacheConfig::default());
    let scanner = Scanner::new(provider, ScanConfig::default());
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let scanner = &scanner;
    let tickers = &tickers;

    c.bench_function("scan_four_tickers_cached", |b| {
        b.to_async(&runtime)
            .iter(|| async move { scanner.scan(black_box(tickers)).await.unwrap() })
    });
}

criterion_group!(benches, benchmark_analyze_chain, benchmark_cached_scan);
criterion_main!(benches);
