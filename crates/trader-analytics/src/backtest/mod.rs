//! 백테스팅 모듈
//!
//! 피처가 붙은 바 시리즈로 결정 함수를 시뮬레이션하고 성과를 분석합니다.
//!
//! # 주요 구성요소
//!
//! - [`BacktestConfig`]: 백테스트 설정 (초기 현금, 진입 금액, 수수료 등)
//! - [`BacktestEngine`]: 백테스트 실행 엔진
//! - [`BacktestReport`]: 백테스트 결과 리포트
//! - [`DecisionFunction`]: 바 단위 매매 결정
//! - [`Portfolio`]: 현금과 롱 포지션 상태

mod decision;
pub mod engine;
mod portfolio;

pub use decision::{Decision, DecisionCounts, DecisionFunction};
pub use engine::{BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult};
pub use portfolio::{ClosedTrade, EntryRejection, Portfolio, Position};
