use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{StringRecord, Writer};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use zdte_core::{OptionContract, OptionQuote, OptionRight, PriceSample, Trade};

/// One option quote observed at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSnapshot {
    pub timestamp: DateTime<Utc>,
    pub contract: OptionContract,
    pub quote: OptionQuote,
}

pub struct CsvStorage;

impl CsvStorage {
    /// Reads minute bars.
    ///
    /// Accepts either `timestamp,ticker,price,volume` or the OHLCV layout
    /// `timestamp,symbol,open,high,low,close,volume`, in which case the close
    /// is used as the price. Rows are returned in file order.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or a row is malformed.
    pub fn read_bars(path: impl AsRef<Path>) -> Result<Vec<PriceSample>> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open bar file: {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let ts_col = column(&headers, &["timestamp", "datetime", "time"])?;
        let ticker_col = column(&headers, &["ticker", "symbol"])?;
        let price_col = column(&headers, &["price", "close"])?;
        let volume_col = column(&headers, &["volume"])?;

        let mut bars = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let row = line + 2;
            let timestamp = parse_timestamp(field(&record, ts_col)?)
                .with_context(|| format!("{}:{row}: bad timestamp", path.display()))?;
            let price = Decimal::from_str(field(&record, price_col)?)
                .with_context(|| format!("{}:{row}: bad price", path.display()))?;
            let volume = parse_volume(field(&record, volume_col)?)
                .with_context(|| format!("{}:{row}: bad volume", path.display()))?;
            bars.push(PriceSample::new(field(&record, ticker_col)?, timestamp, price, volume));
        }
        Ok(bars)
    }

    /// Reads option quotes laid out as
    /// `timestamp,underlying,expiry,strike,right,bid,ask,last`.
    ///
    /// Empty bid/ask/last cells read as zero (no quote on that side).
    ///
    /// # Errors
    /// Returns error if the file cannot be read or a row is malformed.
    pub fn read_quotes(path: impl AsRef<Path>) -> Result<Vec<QuoteSnapshot>> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open quote file: {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let cols = [
            column(&headers, &["timestamp", "datetime", "time"])?,
            column(&headers, &["underlying", "ticker"])?,
            column(&headers, &["expiry", "expiration", "expiration_date"])?,
            column(&headers, &["strike", "strike_price"])?,
            column(&headers, &["right", "option_type", "type"])?,
            column(&headers, &["bid"])?,
            column(&headers, &["ask"])?,
            column(&headers, &["last"])?,
        ];

        let mut quotes = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let row = line + 2;
            let context = || format!("{}:{row}: malformed quote row", path.display());

            let timestamp = parse_timestamp(field(&record, cols[0])?).with_context(context)?;
            let expiry = NaiveDate::parse_from_str(field(&record, cols[2])?, "%Y-%m-%d")
                .with_context(context)?;
            let strike = Decimal::from_str(field(&record, cols[3])?).with_context(context)?;
            let right_raw = field(&record, cols[4])?;
            let right = OptionRight::parse(right_raw)
                .ok_or_else(|| anyhow!("unknown option right '{right_raw}'"))
                .with_context(context)?;
            let contract = OptionContract::new(field(&record, cols[1])?, expiry, strike, right);
            let symbol = contract.symbol().with_context(context)?;

            let quote = OptionQuote {
                symbol,
                bid: optional_decimal(field(&record, cols[5])?).with_context(context)?,
                ask: optional_decimal(field(&record, cols[6])?).with_context(context)?,
                last: optional_decimal(field(&record, cols[7])?).with_context(context)?,
            };
            quotes.push(QuoteSnapshot {
                timestamp,
                contract,
                quote,
            });
        }
        quotes.sort_by_key(|q| q.timestamp);
        Ok(quotes)
    }

    /// Writes trade legs for offline review.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_trades(path: impl AsRef<Path>, trades: &[Trade]) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record([
            "position_id",
            "option_symbol",
            "action",
            "contracts",
            "price",
            "credit_debit",
            "order_id",
            "trade_timestamp",
            "signal_timestamp",
        ])?;
        for trade in trades {
            writer.write_record(&[
                trade.position_id.to_string(),
                trade.option_symbol.clone(),
                trade.action.as_str().to_string(),
                trade.contracts.to_string(),
                trade.price.to_string(),
                trade.credit_debit.to_string(),
                trade.order_id.clone(),
                trade.trade_timestamp.to_rfc3339(),
                trade.signal_timestamp.to_rfc3339(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn column(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .ok_or_else(|| anyhow!("missing column, expected one of {names:?}"))
}

fn field(record: &StringRecord, idx: usize) -> Result<&str> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| anyhow!("row has no column {idx}"))
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")?;
    Ok(naive.and_utc())
}

fn parse_volume(raw: &str) -> Result<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    // Some exports write volume as a decimal ("1200.0").
    let v = Decimal::from_str(raw)?;
    if v.is_sign_negative() || !v.fract().is_zero() {
        bail!("volume must be a non-negative integer, got {raw}");
    }
    v.to_u64().ok_or_else(|| anyhow!("volume out of range: {raw}"))
}

fn optional_decimal(raw: &str) -> Result<Decimal> {
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Ok(Decimal::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("zdte-{}-{name}", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_bars_price_layout() {
        let path = temp_csv(
            "bars.csv",
            "timestamp,ticker,price,volume\n\
             2025-01-17T14:30:00Z,qqq,600.00,1000\n\
             2025-01-17T14:31:00Z,qqq,599.50,1200.0\n",
        );
        let bars = CsvStorage::read_bars(&path).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker, "QQQ");
        assert_eq!(bars[1].price, dec!(599.50));
        assert_eq!(bars[1].volume, 1200);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_bars_ohlcv_layout_uses_close() {
        let path = temp_csv(
            "ohlcv.csv",
            "timestamp,symbol,open,high,low,close,volume\n\
             2025-01-17 14:30:00,QQQ,600,601,599,600.25,500\n",
        );
        let bars = CsvStorage::read_bars(&path).unwrap();

        assert_eq!(bars[0].price, dec!(600.25));
        assert_eq!(bars[0].timestamp.to_rfc3339(), "2025-01-17T14:30:00+00:00");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_bars_rejects_fractional_volume() {
        let path = temp_csv(
            "badvol.csv",
            "timestamp,ticker,price,volume\n2025-01-17T14:30:00Z,QQQ,600,10.5\n",
        );
        assert!(CsvStorage::read_bars(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_quotes_builds_occ_symbols() {
        let path = temp_csv(
            "quotes.csv",
            "timestamp,underlying,expiry,strike,right,bid,ask,last\n\
             2025-01-17T15:00:00Z,QQQ,2025-01-17,597,PUT,1.20,1.25,1.22\n\
             2025-01-17T14:59:00Z,QQQ,2025-01-17,598,call,,0.40,\n",
        );
        let quotes = CsvStorage::read_quotes(&path).unwrap();

        assert_eq!(quotes.len(), 2);
        // sorted by time
        assert_eq!(quotes[0].contract.right, OptionRight::Call);
        assert_eq!(quotes[0].quote.bid, Decimal::ZERO);
        assert_eq!(quotes[1].quote.symbol, "QQQ   250117P00597000");
        std::fs::remove_file(path).ok();
    }
}
