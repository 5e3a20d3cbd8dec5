//! Conversion of the raw chain JSON into the typed `OptionChain`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;
use zdte_core::{ChainEntry, OptionChain, OptionContract, OptionQuote, OptionRight};

use crate::error::{Result, SchwabError};
use crate::types::{RawChain, RawOptionContract};

/// Flattens both expiry maps into chain entries, keeping only `expiry`.
///
/// # Errors
/// Returns `Parse` when an expiry key or `putCall` value is malformed.
pub fn parse_chain(raw: RawChain, expiry: NaiveDate) -> Result<OptionChain> {
    let mut entries = Vec::new();
    for (right, map) in [
        (OptionRight::Call, &raw.call_exp_date_map),
        (OptionRight::Put, &raw.put_exp_date_map),
    ] {
        for (key, strikes) in map {
            if parse_expiry_key(key)? != expiry {
                continue;
            }
            for contract in strikes.values().flatten() {
                entries.push(entry(&raw.symbol, expiry, right, contract)?);
            }
        }
    }
    entries.sort_by(|a, b| {
        (a.contract.strike, a.contract.right.as_str()).cmp(&(b.contract.strike, b.contract.right.as_str()))
    });
    debug!(underlying = raw.symbol, %expiry, contracts = entries.len(), "Parsed option chain");

    Ok(OptionChain {
        underlying: raw.symbol,
        underlying_price: raw.underlying_price,
        entries,
    })
}

fn parse_expiry_key(key: &str) -> Result<NaiveDate> {
    let date = key.split(':').next().unwrap_or(key);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| SchwabError::Parse(format!("bad expiry key '{key}': {e}")))
}

fn entry(underlying: &str, expiry: NaiveDate, right: OptionRight, raw: &RawOptionContract) -> Result<ChainEntry> {
    let declared = OptionRight::parse(&raw.put_call)
        .ok_or_else(|| SchwabError::Parse(format!("bad putCall '{}'", raw.put_call)))?;
    if declared != right {
        return Err(SchwabError::Parse(format!(
            "{} listed under the {right} map",
            raw.symbol
        )));
    }
    Ok(ChainEntry {
        contract: OptionContract::new(underlying, expiry, raw.strike_price.normalize(), right),
        quote: OptionQuote {
            symbol: raw.symbol.clone(),
            bid: raw.bid.max(Decimal::ZERO),
            ask: raw.ask.max(Decimal::ZERO),
            last: raw.last.max(Decimal::ZERO),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn chain_json() -> serde_json::Value {
        serde_json::json!({
            "symbol": "QQQ",
            "status": "SUCCESS",
            "underlyingPrice": 597.4,
            "putExpDateMap": {
                "2025-01-17:0": {
                    "597.0": [{"putCall": "PUT", "symbol": "QQQ   250117P00597000",
                               "bid": 1.2, "ask": 1.25, "last": 1.22, "strikePrice": 597.0}],
                    "596.0": [{"putCall": "PUT", "symbol": "QQQ   250117P00596000",
                               "bid": 0.9, "ask": 0.95, "last": 0.91, "strikePrice": 596.0}]
                },
                "2025-01-24:7": {
                    "597.0": [{"putCall": "PUT", "symbol": "QQQ   250124P00597000",
                               "bid": 4.1, "ask": 4.2, "last": 4.15, "strikePrice": 597.0}]
                }
            },
            "callExpDateMap": {
                "2025-01-17:0": {
                    "598.0": [{"putCall": "CALL", "symbol": "QQQ   250117C00598000",
                               "bid": 0.8, "ask": 0.85, "last": 0.82, "strikePrice": 598.0}]
                }
            }
        })
    }

    #[test]
    fn test_parse_chain_keeps_requested_expiry() {
        let raw: RawChain = serde_json::from_value(chain_json()).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
        let chain = parse_chain(raw, expiry).unwrap();

        assert_eq!(chain.entries.len(), 3);
        assert_eq!(chain.underlying_price, dec!(597.4));

        let put = chain.find(expiry, dec!(597), OptionRight::Put).unwrap();
        assert_eq!(put.quote.symbol, "QQQ   250117P00597000");
        assert_eq!(put.quote.bid, dec!(1.2));
        assert_eq!(put.quote.sell_price(), Some(dec!(1.2)));

        let call = chain.find(expiry, dec!(598), OptionRight::Call).unwrap();
        assert_eq!(call.quote.ask, dec!(0.85));
        assert!(chain.find(expiry, dec!(599), OptionRight::Call).is_none());
    }

    #[test]
    fn test_parse_chain_rejects_mislabelled_contract() {
        let mut json = chain_json();
        json["callExpDateMap"]["2025-01-17:0"]["598.0"][0]["putCall"] = "PUT".into();
        let raw: RawChain = serde_json::from_value(json).unwrap();

        let err = parse_chain(raw, NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()).unwrap_err();
        assert!(matches!(err, SchwabError::Parse(_)));
    }
}
