//! Contract and chain snapshot types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Option right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Greeks as reported by the upstream snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Option<Decimal>,
    pub gamma: Option<Decimal>,
    pub theta: Option<Decimal>,
    pub vega: Option<Decimal>,
}

/// One option instrument at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract symbol (e.g. OCC "AAPL261120C00200000")
    pub symbol: String,
    /// Underlying ticker
    pub ticker: String,
    /// Strike price
    pub strike: Decimal,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Call or put
    pub option_type: OptionType,
    /// Last traded price
    pub last_price: Decimal,
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Contracts traded in the session
    pub volume: u64,
    /// Outstanding contracts
    pub open_interest: u64,
    /// Implied volatility, if the provider supplied one
    #[serde(default)]
    pub implied_volatility: Option<Decimal>,
    #[serde(default)]
    pub greeks: Option<Greeks>,
    /// When the snapshot was taken
    pub snapshot_time: DateTime<Utc>,
}

/// Reasons a contract snapshot is unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Empty contract symbol")]
    EmptySymbol,
    #[error("Non-positive strike: {0}")]
    InvalidStrike(Decimal),
    #[error("Negative price field: {0}")]
    NegativePrice(Decimal),
    #[error("Inverted quote: bid {bid} > ask {ask}")]
    InvertedQuote { bid: Decimal, ask: Decimal },
}

impl Contract {
    /// Reject malformed snapshots before they reach detection
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.symbol.trim().is_empty() {
            return Err(ContractError::EmptySymbol);
        }
        if self.strike <= Decimal::ZERO {
            return Err(ContractError::InvalidStrike(self.strike));
        }
        for price in [self.bid, self.ask, self.last_price] {
            if price < Decimal::ZERO {
                return Err(ContractError::NegativePrice(price));
            }
        }
        if self.bid > self.ask {
            return Err(ContractError::InvertedQuote {
                bid: self.bid,
                ask: self.ask,
            });
        }
        Ok(())
    }

    /// Calendar days from the snapshot date to expiry (negative once expired)
    pub fn days_to_expiry(&self) -> i64 {
        (self.expiry - self.snapshot_time.date_naive()).num_days()
    }

    /// Midpoint of the quoted market
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }

    /// Bid-ask width relative to mid, `None` when there is no mid
    pub fn spread_pct(&self) -> Option<Decimal> {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return None;
        }
        Some((self.ask - self.bid) / mid)
    }

    /// Estimated dollars spent: price x volume x 100 shares per contract
    pub fn premium(&self) -> Decimal {
        self.last_price * Decimal::from(self.volume) * dec!(100)
    }

    /// |strike - underlying| / underlying
    pub fn strike_distance_pct(&self, underlying_price: Decimal) -> Option<Decimal> {
        if underlying_price <= Decimal::ZERO {
            return None;
        }
        Some((self.strike - underlying_price).abs() / underlying_price)
    }

    /// How far out of the money, as a fraction of the underlying (zero when ITM)
    pub fn otm_pct(&self, underlying_price: Decimal) -> Decimal {
        if underlying_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let distance = match self.option_type {
            OptionType::Call => self.strike - underlying_price,
            OptionType::Put => underlying_price - self.strike,
        };
        (distance / underlying_price).max(Decimal::ZERO)
    }
}

/// A full options chain for one underlying at one poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub ticker: String,
    pub underlying_price: Decimal,
    pub snapshot_time: DateTime<Utc>,
    pub contracts: Vec<Contract>,
}

impl Chain {
    /// Total traded volume per side as (calls, puts)
    pub fn volume_by_side(&self) -> (u64, u64) {
        self.contracts
            .iter()
            .filter(|c| c.validate().is_ok())
            .fold((0, 0), |(calls, puts), c| match c.option_type {
                OptionType::Call => (calls + c.volume, puts),
                OptionType::Put => (calls, puts + c.volume),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
