//! 공통 유틸리티 함수.

use trader_core::Candle;

/// 타임스탬프 기준 오름차순 정렬 후 중복 제거.
///
/// 같은 타임스탬프가 여러 번 나오면 입력 순서상 처음 것을 유지합니다.
pub fn sort_dedup(mut candles: Vec<Candle>) -> Vec<Candle> {
    // 안정 정렬이므로 동일 키의 입력 순서가 보존됨
    candles.sort_by_key(|c| c.timestamp_ms);
    candles.dedup_by_key(|c| c.timestamp_ms);
    candles
}

/// `[start_ms, end_ms]` 구간 밖의 캔들 제거.
pub fn clip_range(candles: Vec<Candle>, start_ms: i64, end_ms: i64) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| c.timestamp_ms >= start_ms && c.timestamp_ms <= end_ms)
        .collect()
}

/// 엄격한 오름차순 여부 (중복 없음).
pub fn is_strictly_increasing(candles: &[Candle]) -> bool {
    candles
        .windows(2)
        .all(|w| w[0].timestamp_ms < w[1].timestamp_ms)
}
