use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, error};

use trader_core::{Candle, ExchangePosition, Interval, WalletBalance};

use super::types::{
    parse_kline_row, BybitResponse, CreateOrderRequest, CreateOrderResult, KlineResult,
    PositionListResult, WalletBalanceResult, RET_CODES_AUTH, RET_CODE_RATE_LIMIT,
};
use crate::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// Bybit 메인넷 REST 엔드포인트.
pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

/// 기본 수신 허용 시간 (밀리초).
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("trader-exchange/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// 자격 증명
// ============================================================================

/// Bybit API 자격 증명.
///
/// 시크릿은 [`SecretString`]으로 보관되며 Debug 출력에 노출되지 않습니다.
#[derive(Clone)]
pub struct BybitCredentials {
    pub api_key: String,
    api_secret: SecretString,
    pub recv_window_ms: u64,
}

impl std::fmt::Debug for BybitCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

impl BybitCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        }
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// 환경 변수에서 로드.
    ///
    /// - `BYBIT_API_KEY` (필수)
    /// - `BYBIT_API_SECRET` (필수)
    /// - `BYBIT_RECV_WINDOW` (기본 5000)
    pub fn from_env() -> Result<Self, ExchangeError> {
        let api_key = non_empty_env("BYBIT_API_KEY")?;
        let api_secret = non_empty_env("BYBIT_API_SECRET")?;
        let recv_window_ms = std::env::var("BYBIT_RECV_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RECV_WINDOW_MS);

        Ok(Self::new(api_key, api_secret).with_recv_window(recv_window_ms))
    }

    /// HMAC-SHA256(timestamp + api_key + recv_window + payload) 서명 생성.
    pub fn sign(&self, timestamp_ms: i64, payload: &str) -> Result<String, ExchangeError> {
        let prehash = format!(
            "{}{}{}{}",
            timestamp_ms, self.api_key, self.recv_window_ms, payload
        );

        let mut mac = HmacSha256::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(format!("잘못된 API 시크릿: {}", e)))?;
        mac.update(prehash.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn non_empty_env(name: &str) -> Result<String, ExchangeError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ExchangeError::MissingCredentials(format!(
            "{} 환경 변수가 설정되지 않았습니다",
            name
        ))),
    }
}

// ============================================================================
// Bybit 클라이언트
// ============================================================================

/// Bybit v5 REST 클라이언트.
///
/// 공개 엔드포인트(kline)는 자격 증명 없이 호출할 수 있고,
/// 계좌 엔드포인트는 [`BybitClient::with_credentials`]가 필요합니다.
pub struct BybitClient {
    client: Client,
    base_url: String,
    credentials: Option<BybitCredentials>,
}

impl BybitClient {
    /// 새 클라이언트 생성.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// 자격 증명 설정.
    pub fn with_credentials(mut self, credentials: BybitCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    // ========================================================================
    // 시장 데이터
    // ========================================================================

    /// kline 한 페이지 조회.
    ///
    /// 거래소가 반환한 순서(최신 캔들 먼저)를 그대로 유지합니다.
    pub async fn get_klines(
        &self,
        category: &str,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let query = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("interval", interval.token()),
            ("start", start_ms.to_string()),
            ("limit", limit.to_string()),
        ];

        let result: KlineResult = self.public_get("/v5/market/kline", &query).await?;

        result
            .list
            .iter()
            .map(|row| parse_kline_row(row))
            .collect()
    }

    // ========================================================================
    // 계좌
    // ========================================================================

    /// 열린 포지션 조회 (수량 0인 항목 제외).
    pub async fn get_positions(
        &self,
        category: &str,
        settle_coin: &str,
    ) -> Result<Vec<ExchangePosition>, ExchangeError> {
        let query = [
            ("category", category.to_string()),
            ("settleCoin", settle_coin.to_string()),
        ];

        let result: PositionListResult = self.signed_get("/v5/position/list", &query).await?;

        let mut positions = Vec::new();
        for raw in result.list {
            if let Some(position) = raw.into_position()? {
                if position.is_open() {
                    positions.push(position);
                }
            }
        }
        Ok(positions)
    }

    /// 지갑 잔고 조회.
    pub async fn get_wallet_balance(
        &self,
        account_type: &str,
    ) -> Result<WalletBalance, ExchangeError> {
        let query = [("accountType", account_type.to_string())];

        let result: WalletBalanceResult =
            self.signed_get("/v5/account/wallet-balance", &query).await?;

        let mut balance = WalletBalance::new("Bybit", account_type);
        for account in result.list {
            if let Ok(total) = account.total_equity.parse() {
                balance.total_equity_usd = Some(total);
            }
            for coin in account.coin {
                balance.add_holding(coin.into());
            }
        }
        Ok(balance)
    }

    /// 주문 생성.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResult, ExchangeError> {
        self.signed_post("/v5/order/create", request).await
    }

    // ========================================================================
    // 요청 헬퍼
    // ========================================================================

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let query_string = encode_query(query)?;
        let url = format!("{}{}?{}", self.base_url, path, query_string);

        debug!(path, query = %query_string, "Bybit 공개 요청");
        self.send(self.client.get(&url)).await
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let query_string = encode_query(query)?;
        let url = format!("{}{}?{}", self.base_url, path, query_string);

        debug!(path, query = %query_string, "Bybit 서명 GET 요청");
        let builder = self.sign_request(self.client.get(&url), &query_string)?;
        self.send(builder).await
    }

    async fn signed_post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ExchangeError> {
        let body = serde_json::to_string(body)
            .map_err(|e| ExchangeError::ParseError(format!("요청 본문 직렬화 실패: {}", e)))?;
        let url = format!("{}{}", self.base_url, path);

        debug!(path, "Bybit 서명 POST 요청");
        let builder = self.sign_request(self.client.post(&url), &body)?;
        self.send(
            builder
                .header("Content-Type", "application/json")
                .body(body),
        )
        .await
    }

    fn sign_request(
        &self,
        builder: RequestBuilder,
        payload: &str,
    ) -> Result<RequestBuilder, ExchangeError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ExchangeError::MissingCredentials("서명 요청에는 API 키가 필요합니다".to_string())
        })?;

        let timestamp = Utc::now().timestamp_millis();
        let signature = credentials.sign(timestamp, payload)?;

        Ok(builder
            .header("X-BAPI-API-KEY", &credentials.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-RECV-WINDOW", credentials.recv_window_ms.to_string()))
    }

    /// 요청 전송 및 `{retCode, retMsg, result}` 봉투 해석.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ExchangeError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ExchangeError::RateLimited {
                    message: format!("HTTP {}", status),
                    retry_after_ms: None,
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ExchangeError::Unauthorized(format!("HTTP {}", status)));
            }
            s if s.is_server_error() => {
                return Err(ExchangeError::NetworkError(format!("HTTP {}", status)));
            }
            s if !s.is_success() => {
                return Err(ExchangeError::ApiError {
                    code: i64::from(status.as_u16()),
                    message: body,
                });
            }
            _ => {}
        }

        let envelope: BybitResponse<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::ParseError(format!("응답 봉투: {}", e)))?;

        match envelope.ret_code {
            0 => {}
            RET_CODE_RATE_LIMIT => {
                return Err(ExchangeError::RateLimited {
                    message: envelope.ret_msg,
                    retry_after_ms: None,
                });
            }
            code if RET_CODES_AUTH.contains(&code) => {
                return Err(ExchangeError::Unauthorized(envelope.ret_msg));
            }
            code => {
                error!(code, message = %envelope.ret_msg, "Bybit API 오류");
                return Err(ExchangeError::ApiError {
                    code,
                    message: envelope.ret_msg,
                });
            }
        }

        let result = envelope
            .result
            .ok_or_else(|| ExchangeError::ParseError("result 필드 없음".to_string()))?;

        serde_json::from_value(result)
            .map_err(|e| ExchangeError::ParseError(format!("result 형식: {}", e)))
    }
}

fn encode_query(query: &[(&str, String)]) -> Result<String, ExchangeError> {
    serde_urlencoded::to_string(query)
        .map_err(|e| ExchangeError::ParseError(format!("쿼리 인코딩 실패: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic_hex() {
        let credentials = BybitCredentials::new("key", "secret");
        let a = credentials.sign(1_700_000_000_000, "category=linear").unwrap();
        let b = credentials.sign(1_700_000_000_000, "category=linear").unwrap();
        let c = credentials.sign(1_700_000_000_001, "category=linear").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_credentials_debug_masks_secret() {
        let credentials = BybitCredentials::new("my-key", "my-secret");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("my-secret"));
        assert!(!debug.contains("my-key"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = BybitClient::new("http://localhost:1234/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
        assert!(!client.has_credentials());
    }
}
