//! Order submission through the Schwab trader API.

use async_trait::async_trait;
use tracing::{error, info};
use zdte_core::{EngineError, OrderGateway, OrderRequest};

use crate::client::SchwabClient;
use crate::error::SchwabError;
use crate::types::{RawInstrument, RawOrder, RawOrderLeg};

#[derive(Debug, Clone)]
pub struct SchwabOrderGateway {
    client: SchwabClient,
}

impl SchwabOrderGateway {
    #[must_use]
    pub fn new(client: SchwabClient) -> Self {
        Self { client }
    }
}

/// Single-leg DAY limit order.
#[must_use]
pub fn build_order(order: &OrderRequest) -> RawOrder {
    RawOrder {
        order_type: "LIMIT",
        session: "NORMAL",
        duration: "DAY",
        order_strategy_type: "SINGLE",
        price: format!("{:.2}", order.limit_price),
        order_leg_collection: vec![RawOrderLeg {
            instruction: order.instruction.as_str(),
            quantity: order.contracts,
            instrument: RawInstrument {
                symbol: order.option_symbol.clone(),
                asset_type: "OPTION",
            },
        }],
    }
}

/// Maps a failed submission. Only failures that prove the order never
/// reached the broker are plain rejections; anything else leaves the order
/// state unknown.
fn submit_error(e: SchwabError, timeout_secs: u64) -> EngineError {
    match e {
        SchwabError::Timeout(_) | SchwabError::Network(_) => EngineError::Timeout {
            operation: "submit_order",
            secs: timeout_secs,
        },
        SchwabError::Api { status_code, .. } if status_code >= 500 => EngineError::Timeout {
            operation: "submit_order",
            secs: timeout_secs,
        },
        other => EngineError::OrderRejected(other.to_string()),
    }
}

#[async_trait]
impl OrderGateway for SchwabOrderGateway {
    async fn submit(&self, order: &OrderRequest) -> Result<String, EngineError> {
        let account = self.client.account_hash();
        if account.is_empty() {
            return Err(EngineError::OrderRejected(
                "no Schwab account hash configured".to_string(),
            ));
        }
        let body = build_order(order);
        let path = format!("/trader/v1/accounts/{account}/orders");

        let response = match self.client.post(&path, &body).await {
            Ok(r) => r,
            Err(e) => {
                error!(
                    account_id = order.account_id,
                    symbol = order.option_symbol,
                    instruction = %order.instruction,
                    contracts = order.contracts,
                    limit = %order.limit_price,
                    error = %e,
                    "Order submission failed"
                );
                return Err(submit_error(e, self.client.timeout_secs()));
            }
        };

        // The new order id is the last segment of the Location header.
        let order_id = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Timeout {
                operation: "submit_order",
                secs: self.client.timeout_secs(),
            })?;

        info!(
            order_id,
            symbol = order.option_symbol,
            instruction = %order.instruction,
            contracts = order.contracts,
            limit = %order.limit_price,
            "Order accepted"
        );
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SchwabClientConfig;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zdte_core::TradeAction;

    fn request() -> OrderRequest {
        OrderRequest {
            account_id: "ACCT-1".to_string(),
            option_symbol: "QQQ   250117P00597000".to_string(),
            instruction: TradeAction::SellToOpen,
            contracts: 25,
            limit_price: dec!(1.2),
        }
    }

    fn gateway(server: &MockServer) -> SchwabOrderGateway {
        let config = SchwabClientConfig::default()
            .with_base_url(server.uri())
            .with_access_token("token")
            .with_account_hash("HASH");
        SchwabOrderGateway::new(SchwabClient::new(config).unwrap())
    }

    #[test]
    fn test_build_order_shape() {
        let json = serde_json::to_value(build_order(&request())).unwrap();
        assert_eq!(json["orderType"], "LIMIT");
        assert_eq!(json["price"], "1.20");
        assert_eq!(json["orderLegCollection"][0]["instruction"], "SELL_TO_OPEN");
        assert_eq!(json["orderLegCollection"][0]["quantity"], 25);
        assert_eq!(json["orderLegCollection"][0]["instrument"]["assetType"], "OPTION");
    }

    #[tokio::test]
    async fn test_submit_returns_order_id_from_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trader/v1/accounts/HASH/orders"))
            .and(body_partial_json(serde_json::json!({"orderType": "LIMIT"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "https://api.schwabapi.com/trader/v1/accounts/HASH/orders/1002003004"),
            )
            .mount(&server)
            .await;

        let id = gateway(&server).submit(&request()).await.unwrap();
        assert_eq!(id, "1002003004");
    }

    #[tokio::test]
    async fn test_rejected_order_is_order_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trader/v1/accounts/HASH/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_string("insufficient buying power"))
            .mount(&server)
            .await;

        let err = gateway(&server).submit(&request()).await.unwrap_err();
        assert!(matches!(err, EngineError::OrderRejected(ref m) if m.contains("buying power")));
        assert!(err.requires_operator());
    }

    #[tokio::test]
    async fn test_server_error_leaves_order_state_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trader/v1/accounts/HASH/orders"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = gateway(&server).submit(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Timeout {
                operation: "submit_order",
                ..
            }
        ));
        assert!(err.requires_operator());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_submit_error_mapping() {
        let unknown = submit_error(SchwabError::Network("connection reset".into()), 10);
        assert!(matches!(unknown, EngineError::Timeout { secs: 10, .. }));

        let failed = submit_error(SchwabError::api(500, "internal"), 10);
        assert!(matches!(failed, EngineError::Timeout { .. }));

        let refused = submit_error(SchwabError::api(422, "invalid price"), 10);
        assert!(matches!(refused, EngineError::OrderRejected(_)));

        let throttled = submit_error(SchwabError::RateLimit { retry_after_secs: 1 }, 10);
        assert!(matches!(throttled, EngineError::OrderRejected(_)));
    }
}
