//! Bybit v5 REST 커넥터.
//!
//! - 공개: `GET /v5/market/kline`
//! - 서명: `GET /v5/position/list`, `GET /v5/account/wallet-balance`,
//!   `POST /v5/order/create`
//!
//! 서명 요청은 `timestamp + api_key + recv_window + payload`의 HMAC-SHA256 값을
//! `X-BAPI-*` 헤더로 전송합니다.

mod client;
pub mod types;

pub use client::{BybitClient, BybitCredentials, DEFAULT_BASE_URL, DEFAULT_RECV_WINDOW_MS};
