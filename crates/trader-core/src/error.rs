//! 코어 에러 타입 정의.

use thiserror::Error;

/// 도메인 타입 파싱/검증 에러.
///
/// 모두 설정 또는 입력 데이터 문제이며, 재시도로 해결되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 인식할 수 없는 인터벌 토큰
    #[error("알 수 없는 인터벌 토큰: '{0}' (분 단위 숫자, D, W, M 중 하나)")]
    InvalidInterval(String),

    /// 날짜 문자열 형식 오류
    #[error("날짜 형식 오류: '{0}' (YYYY-MM-DD 또는 YYYY-MM-DD HH:MM:SS)")]
    InvalidDate(String),

    /// OHLCV 관계가 맞지 않는 캔들
    #[error("잘못된 캔들 데이터 (timestamp_ms={timestamp_ms}): {reason}")]
    InvalidCandle { timestamp_ms: i64, reason: String },
}

/// Result 타입 별칭
pub type CoreResult<T> = std::result::Result<T, CoreError>;
