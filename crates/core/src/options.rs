//! Option contract, quote and chain types shared by the engine and adapters.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Contract multiplier for standard US equity options.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Options contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CALL" | "C" => Some(Self::Call),
            "PUT" | "P" => Some(Self::Put),
            _ => None,
        }
    }

    /// Single-letter code used in OCC symbols.
    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listed option, identified independently of any quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub underlying: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
}

impl OptionContract {
    #[must_use]
    pub fn new(underlying: &str, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Self {
        Self {
            underlying: underlying.to_uppercase(),
            expiry,
            strike,
            right,
        }
    }

    /// OCC-style symbol, e.g. `QQQ   250117P00597000`.
    ///
    /// Root padded to six characters, `YYMMDD` expiry, right code, strike in
    /// thousandths padded to eight digits.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the strike is negative or too large to encode.
    pub fn symbol(&self) -> Result<String, EngineError> {
        let thousandths = (self.strike * Decimal::ONE_THOUSAND)
            .trunc()
            .to_u64()
            .filter(|v| *v < 100_000_000)
            .ok_or_else(|| {
                EngineError::invalid_input(format!("strike {} cannot be encoded", self.strike))
            })?;
        Ok(format!(
            "{:<6}{}{}{:08}",
            self.underlying,
            self.expiry.format("%y%m%d"),
            self.right.code(),
            thousandths
        ))
    }

    /// Human-readable description (e.g., "QQQ 597 PUT 2025-01-17").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {} {} {}",
            self.underlying, self.strike, self.right, self.expiry
        )
    }
}

/// Top-of-book snapshot for a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
}

impl OptionQuote {
    /// Price a seller can expect when opening: the bid.
    #[must_use]
    pub fn sell_price(&self) -> Option<Decimal> {
        (self.bid > Decimal::ZERO).then_some(self.bid)
    }

    /// Price to buy the option back: the ask, falling back to last trade.
    #[must_use]
    pub fn buy_price(&self) -> Option<Decimal> {
        if self.ask > Decimal::ZERO {
            Some(self.ask)
        } else if self.last > Decimal::ZERO {
            Some(self.last)
        } else {
            None
        }
    }
}

/// One contract of a chain together with its quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub contract: OptionContract,
    pub quote: OptionQuote,
}

/// Option chain snapshot for one underlying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub underlying_price: Decimal,
    pub entries: Vec<ChainEntry>,
}

impl OptionChain {
    /// Looks up the contract with exactly this expiry, strike and right.
    #[must_use]
    pub fn find(&self, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Option<&ChainEntry> {
        self.entries.iter().find(|e| {
            e.contract.expiry == expiry && e.contract.right == right && e.contract.strike == strike
        })
    }

    /// Distinct strikes available for an expiry and right, ascending.
    #[must_use]
    pub fn strikes(&self, expiry: NaiveDate, right: OptionRight) -> Vec<Decimal> {
        let mut strikes: Vec<Decimal> = self
            .entries
            .iter()
            .filter(|e| e.contract.expiry == expiry && e.contract.right == right)
            .map(|e| e.contract.strike)
            .collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()
    }

    #[test]
    fn occ_symbol_pads_root_and_strike() {
        let put = OptionContract::new("qqq", expiry(), dec!(597), OptionRight::Put);
        assert_eq!(put.symbol().unwrap(), "QQQ   250117P00597000");

        let call = OptionContract::new("QQQ", expiry(), dec!(512.5), OptionRight::Call);
        assert_eq!(call.symbol().unwrap(), "QQQ   250117C00512500");
    }

    #[test]
    fn negative_strike_is_rejected() {
        let bad = OptionContract::new("QQQ", expiry(), dec!(-1), OptionRight::Put);
        assert!(matches!(bad.symbol(), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn quote_prices_fall_back_sensibly() {
        let quote = OptionQuote {
            symbol: "X".into(),
            bid: dec!(0),
            ask: dec!(0),
            last: dec!(1.10),
        };
        assert_eq!(quote.sell_price(), None);
        assert_eq!(quote.buy_price(), Some(dec!(1.10)));

        let empty = OptionQuote {
            last: dec!(0),
            ..quote
        };
        assert_eq!(empty.buy_price(), None);
    }

    #[test]
    fn chain_lookup_matches_strike_expiry_and_right() {
        let mk = |strike, right| {
            let contract = OptionContract::new("QQQ", expiry(), strike, right);
            ChainEntry {
                quote: OptionQuote {
                    symbol: contract.symbol().unwrap(),
                    bid: dec!(1.00),
                    ask: dec!(1.05),
                    last: dec!(1.02),
                },
                contract,
            }
        };
        let chain = OptionChain {
            underlying: "QQQ".into(),
            underlying_price: dec!(597.40),
            entries: vec![
                mk(dec!(598), OptionRight::Call),
                mk(dec!(597), OptionRight::Put),
                mk(dec!(596), OptionRight::Put),
            ],
        };

        let hit = chain.find(expiry(), dec!(597), OptionRight::Put).unwrap();
        assert_eq!(hit.quote.symbol, "QQQ   250117P00597000");
        assert!(chain.find(expiry(), dec!(597), OptionRight::Call).is_none());
        assert_eq!(
            chain.strikes(expiry(), OptionRight::Put),
            vec![dec!(596), dec!(597)]
        );
    }
}
