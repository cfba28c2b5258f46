//! Bybit KlineSource + AccountProvider 구현.
//!
//! ```text
//! BybitExchangeProvider
//! ├── KlineSource
//! │   └── fetch_kline_page() - GET /v5/market/kline
//! ├── AccountProvider
//! │   ├── fetch_positions()      - GET /v5/position/list
//! │   ├── fetch_wallet_balance() - GET /v5/account/wallet-balance
//! │   └── close_position()       - POST /v5/order/create (reduceOnly)
//! └── client: Arc<BybitClient>
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use trader_core::{Candle, ExchangePosition, WalletBalance};

use super::{AccountProvider, KlinePageRequest, KlineSource};
use crate::connector::bybit::types::CreateOrderRequest;
use crate::connector::bybit::BybitClient;
use crate::ExchangeError;

/// Bybit provider.
pub struct BybitExchangeProvider {
    client: Arc<BybitClient>,
    /// 계좌 작업에 사용할 상품 카테고리 (기본 "linear")
    category: String,
    /// 지갑 계좌 유형 (기본 "UNIFIED")
    account_type: String,
}

impl BybitExchangeProvider {
    pub fn new(client: Arc<BybitClient>) -> Self {
        Self {
            client,
            category: "linear".to_string(),
            account_type: "UNIFIED".to_string(),
        }
    }

    /// BybitClient에서 생성.
    pub fn from_client(client: BybitClient) -> Self {
        Self::new(Arc::new(client))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = account_type.into();
        self
    }
}

#[async_trait]
impl KlineSource for BybitExchangeProvider {
    async fn fetch_kline_page(
        &self,
        request: &KlinePageRequest,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.client
            .get_klines(
                &request.category,
                &request.symbol,
                request.interval,
                request.start_ms,
                request.limit,
            )
            .await
    }
}

#[async_trait]
impl AccountProvider for BybitExchangeProvider {
    fn exchange_name(&self) -> &str {
        "Bybit"
    }

    async fn fetch_positions(
        &self,
        settle_coin: &str,
    ) -> Result<Vec<ExchangePosition>, ExchangeError> {
        self.client.get_positions(&self.category, settle_coin).await
    }

    async fn fetch_wallet_balance(&self) -> Result<WalletBalance, ExchangeError> {
        self.client.get_wallet_balance(&self.account_type).await
    }

    async fn close_position(&self, position: &ExchangePosition) -> Result<String, ExchangeError> {
        let request = CreateOrderRequest {
            category: self.category.clone(),
            symbol: position.symbol.clone(),
            side: position.side.opposite().as_str().to_string(),
            order_type: "Market".to_string(),
            qty: position.size.normalize().to_string(),
            reduce_only: true,
        };

        debug!(symbol = %request.symbol, side = %request.side, qty = %request.qty, "reduce-only 주문");
        let result = self.client.create_order(&request).await?;
        Ok(result.order_id)
    }
}
