//! `MarketData` over the Schwab market-data endpoints.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use tracing::{debug, warn};
use zdte_core::{EngineError, MarketData, OptionChain, OptionQuote, PriceSample};

use crate::client::SchwabClient;
use crate::error::SchwabError;
use crate::options_chain::parse_chain;
use crate::types::{RawChain, RawPriceHistory, RawQuotes};

#[derive(Debug, Clone)]
pub struct SchwabMarketData {
    client: SchwabClient,
}

impl SchwabMarketData {
    #[must_use]
    pub fn new(client: SchwabClient) -> Self {
        Self { client }
    }

    /// Today's regular-session one-minute bars, oldest first.
    async fn minute_bars(&self, ticker: &str) -> Result<Vec<PriceSample>, SchwabError> {
        let history: RawPriceHistory = self
            .client
            .get(
                "/marketdata/v1/pricehistory",
                &[
                    ("symbol", ticker.to_string()),
                    ("periodType", "day".to_string()),
                    ("period", "1".to_string()),
                    ("frequencyType", "minute".to_string()),
                    ("frequency", "1".to_string()),
                    ("needExtendedHoursData", "false".to_string()),
                ],
            )
            .await?;

        if history.empty || history.candles.is_empty() {
            return Err(SchwabError::NotFound {
                symbol: ticker.to_string(),
            });
        }

        history
            .candles
            .into_iter()
            .map(|c| {
                let ts = DateTime::from_timestamp_millis(c.datetime)
                    .ok_or_else(|| SchwabError::Parse(format!("bad candle time {}", c.datetime)))?;
                Ok(PriceSample::new(ticker, ts, c.close, c.volume))
            })
            .collect()
    }
}

#[async_trait]
impl MarketData for SchwabMarketData {
    async fn latest_bar(&self, ticker: &str) -> Result<PriceSample, EngineError> {
        let mut bars = self.minute_bars(ticker).await?;
        bars.pop()
            .ok_or_else(|| EngineError::MarketData(format!("no bars for {ticker}")))
    }

    async fn recent_bars(&self, ticker: &str, lookback: usize) -> Result<Vec<PriceSample>, EngineError> {
        let mut bars = self.minute_bars(ticker).await?;
        let start = bars.len().saturating_sub(lookback);
        let bars = bars.split_off(start);
        debug!(ticker, bars = bars.len(), "Fetched minute bars");
        Ok(bars)
    }

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<OptionChain, EngineError> {
        let date = expiry.format("%Y-%m-%d").to_string();
        let raw: RawChain = self
            .client
            .get(
                "/marketdata/v1/chains",
                &[
                    ("symbol", ticker.to_string()),
                    ("contractType", "ALL".to_string()),
                    ("fromDate", date.clone()),
                    ("toDate", date),
                ],
            )
            .await?;

        if raw.status.as_deref() == Some("FAILED") {
            return Err(EngineError::quote_unavailable(ticker, "chain request failed"));
        }
        let chain = parse_chain(raw, expiry)?;
        if chain.is_empty() {
            warn!(ticker, %expiry, "Option chain is empty");
            return Err(EngineError::quote_unavailable(ticker, format!("no contracts expiring {expiry}")));
        }
        Ok(chain)
    }

    async fn option_quote(&self, option_symbol: &str) -> Result<OptionQuote, EngineError> {
        let mut quotes: RawQuotes = self
            .client
            .get("/marketdata/v1/quotes", &[("symbols", option_symbol.to_string())])
            .await?;

        let quote = quotes
            .remove(option_symbol)
            .and_then(|envelope| envelope.quote)
            .ok_or_else(|| EngineError::quote_unavailable(option_symbol, "not in quote response"))?;

        Ok(OptionQuote {
            symbol: option_symbol.to_string(),
            bid: quote.bid_price,
            ask: quote.ask_price,
            last: quote.last_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SchwabClientConfig;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn market(server: &MockServer) -> SchwabMarketData {
        let config = SchwabClientConfig::default()
            .with_base_url(server.uri())
            .with_access_token("token");
        SchwabMarketData::new(SchwabClient::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_recent_bars_keeps_lookback_tail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketdata/v1/pricehistory"))
            .and(query_param("symbol", "QQQ"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "QQQ",
                "empty": false,
                "candles": [
                    {"open": 600.0, "high": 600.5, "low": 599.5, "close": 600.1, "volume": 1000, "datetime": 1737124200000i64},
                    {"open": 600.1, "high": 600.6, "low": 599.9, "close": 600.3, "volume": 1100, "datetime": 1737124260000i64},
                    {"open": 600.3, "high": 600.4, "low": 599.0, "close": 599.2, "volume": 900, "datetime": 1737124320000i64}
                ]
            })))
            .mount(&server)
            .await;

        let bars = market(&server).recent_bars("QQQ", 2).await.unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].price, dec!(600.3));
        assert_eq!(bars[1].price, dec!(599.2));
        assert_eq!(bars[1].volume, 900);
        assert_eq!(bars[1].timestamp.timestamp_millis(), 1_737_124_320_000);
    }

    #[tokio::test]
    async fn test_option_quote_missing_symbol_is_quote_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketdata/v1/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = market(&server)
            .option_quote("QQQ   250117P00597000")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::QuoteUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_option_quote_reads_book() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketdata/v1/quotes"))
            .and(query_param("symbols", "QQQ   250117P00597000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "QQQ   250117P00597000": {
                    "symbol": "QQQ   250117P00597000",
                    "quote": {"bidPrice": 1.2, "askPrice": 1.25, "lastPrice": 1.22}
                }
            })))
            .mount(&server)
            .await;

        let quote = market(&server)
            .option_quote("QQQ   250117P00597000")
            .await
            .unwrap();
        assert_eq!(quote.buy_price(), Some(dec!(1.25)));
        assert_eq!(quote.sell_price(), Some(dec!(1.2)));
    }

    #[tokio::test]
    async fn test_server_error_is_market_data_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketdata/v1/pricehistory"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = market(&server).latest_bar("QQQ").await.unwrap_err();
        assert!(matches!(err, EngineError::MarketData(_)));
        assert!(err.is_transient());
    }
}
