//! 과거 캔들 수집기.
//!
//! 거래소 kline 엔드포인트를 페이지 단위로 순회하여 요청 구간 전체를 내려받고,
//! 정렬/중복 제거된 캔들을 CSV로 저장합니다.
//!
//! - [`modules::fetch_klines`]: 페이지네이션 + 재시도 루프
//! - [`modules::csv_store`]: 캔들 CSV 읽기/쓰기/병합
//! - [`CollectorConfig`]: 환경 변수 기반 설정

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, KlineFetchConfig};
pub use error::{CollectorError, Result};
pub use stats::FetchStats;
