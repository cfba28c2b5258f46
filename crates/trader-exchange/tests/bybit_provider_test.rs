//! Bybit provider HTTP 레벨 테스트 (mockito).

use mockito::{Matcher, Server};
use rust_decimal_macros::dec;

use trader_core::{Interval, PositionSide};
use trader_exchange::{
    AccountProvider, BybitClient, BybitCredentials, BybitExchangeProvider, ExchangeError,
    KlinePageRequest, KlineSource,
};

fn page_request() -> KlinePageRequest {
    KlinePageRequest {
        category: "linear".to_string(),
        symbol: "BTCUSDT".to_string(),
        interval: Interval::Minutes(60),
        start_ms: 1_704_067_200_000,
        limit: 1000,
    }
}

fn provider(server: &Server) -> BybitExchangeProvider {
    BybitExchangeProvider::from_client(BybitClient::new(server.url()).unwrap())
}

fn signed_provider(server: &Server) -> BybitExchangeProvider {
    let client = BybitClient::new(server.url())
        .unwrap()
        .with_credentials(BybitCredentials::new("test-key", "test-secret"));
    BybitExchangeProvider::from_client(client)
}

#[tokio::test]
async fn test_kline_page_parsed_in_exchange_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("category".into(), "linear".into()),
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("interval".into(), "60".into()),
            Matcher::UrlEncoded("start".into(), "1704067200000".into()),
            Matcher::UrlEncoded("limit".into(), "1000".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"retCode":0,"retMsg":"OK","result":{"symbol":"BTCUSDT","category":"linear","list":[
                ["1704070800000","42100","42300","42000","42200","8.5","358000"],
                ["1704067200000","42000","42150","41950","42100","10.2","429000"]
            ]},"time":1704071000000}"#,
        )
        .create_async()
        .await;

    let candles = provider(&server)
        .fetch_kline_page(&page_request())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].timestamp_ms, 1_704_070_800_000);
    assert_eq!(candles[1].close, dec!(42100));
}

#[tokio::test]
async fn test_rate_limit_ret_code() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"retCode":10006,"retMsg":"Too many visits!","result":{}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .fetch_kline_page(&page_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::RateLimited { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_api_error_ret_code() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"retCode":10001,"retMsg":"params error: symbol invalid","result":{}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .fetch_kline_page(&page_request())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExchangeError::ApiError {
            code: 10001,
            message: "params error: symbol invalid".to_string()
        }
    );
}

#[tokio::test]
async fn test_missing_list_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"symbol":"BTCUSDT"}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .fetch_kline_page(&page_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::ParseError(_)));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;

    let err = provider(&server)
        .fetch_kline_page(&page_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::NetworkError(_)));
}

#[tokio::test]
async fn test_signed_positions_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v5/position/list")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("category".into(), "linear".into()),
            Matcher::UrlEncoded("settleCoin".into(), "USDT".into()),
        ]))
        .match_header("X-BAPI-API-KEY", "test-key")
        .match_header("X-BAPI-RECV-WINDOW", "5000")
        .match_header("X-BAPI-SIGN", Matcher::Regex("^[0-9a-f]{64}$".into()))
        .match_header("X-BAPI-TIMESTAMP", Matcher::Regex("^[0-9]+$".into()))
        .with_status(200)
        .with_body(
            r#"{"retCode":0,"retMsg":"OK","result":{"list":[
                {"symbol":"BTCUSDT","side":"Buy","size":"0.01","avgPrice":"42000","markPrice":"42500","unrealisedPnl":"5"},
                {"symbol":"ETHUSDT","side":"","size":"0","avgPrice":"0","markPrice":"2200","unrealisedPnl":"0"}
            ]}}"#,
        )
        .create_async()
        .await;

    let positions = signed_provider(&server)
        .fetch_positions("USDT")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol, "BTCUSDT");
    assert_eq!(positions[0].side, PositionSide::Buy);
    assert_eq!(positions[0].size, dec!(0.01));
}

#[tokio::test]
async fn test_signed_request_without_credentials() {
    let server = Server::new_async().await;
    let err = provider(&server).fetch_positions("USDT").await.unwrap_err();
    assert!(matches!(err, ExchangeError::MissingCredentials(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_wallet_balance() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/account/wallet-balance")
        .match_query(Matcher::UrlEncoded("accountType".into(), "UNIFIED".into()))
        .with_status(200)
        .with_body(
            r#"{"retCode":0,"retMsg":"OK","result":{"list":[{"accountType":"UNIFIED","totalEquity":"1430.5","coin":[
                {"coin":"USDT","equity":"1000","walletBalance":"1000","usdValue":"1000"},
                {"coin":"BTC","equity":"0.01","walletBalance":"0.01","usdValue":"430.5"}
            ]}]}}"#,
        )
        .create_async()
        .await;

    let balance = signed_provider(&server)
        .fetch_wallet_balance()
        .await
        .unwrap();

    assert_eq!(balance.holdings.len(), 2);
    assert_eq!(balance.total_usd(), dec!(1430.5));
    assert_eq!(balance.holdings[1].coin, "BTC");
}

#[tokio::test]
async fn test_close_position_sends_reduce_only_market_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v5/order/create")
        .match_header("X-BAPI-API-KEY", "test-key")
        .match_body(Matcher::PartialJsonString(
            r#"{"category":"linear","symbol":"ETHUSDT","side":"Buy","orderType":"Market","qty":"1.5","reduceOnly":true}"#
                .into(),
        ))
        .with_status(200)
        .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"abc-123","orderLinkId":""}}"#)
        .create_async()
        .await;

    let position = trader_core::ExchangePosition {
        symbol: "ETHUSDT".to_string(),
        side: PositionSide::Sell,
        size: dec!(1.50),
        avg_price: dec!(2200),
        mark_price: dec!(2210),
        unrealised_pnl: dec!(-15),
    };

    let order_id = signed_provider(&server)
        .close_position(&position)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(order_id, "abc-123");
}

#[tokio::test]
async fn test_invalid_signature_is_unauthorized() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v5/account/wallet-balance")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"retCode":10004,"retMsg":"error sign!","result":{}}"#)
        .create_async()
        .await;

    let err = signed_provider(&server)
        .fetch_wallet_balance()
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Unauthorized(_)));
}
