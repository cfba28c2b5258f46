//! 피처 계산, 모델 추론, 바 단위 백테스트.
//!
//! # 모듈
//!
//! - [`features`]: 캔들 → 10개 기술적 지표 피처
//! - [`indicators`]: Wilder 평활 RSI/ATR
//! - [`model`]: 스케일러 + SVM 분류기 아티팩트
//! - [`backtest`]: 바 시뮬레이터
//! - [`performance`]: 성과 지표
//! - [`export`]: 학습 데이터셋/자산 곡선 CSV

pub mod backtest;
pub mod export;
pub mod features;
pub mod indicators;
pub mod model;
pub mod performance;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult, Decision,
    DecisionFunction,
};
pub use features::{
    annotate_features, compute_features, label_next_bar_direction, Bar, FeatureError,
    FeatureVector, FEATURE_COUNT, FEATURE_NAMES,
};
pub use model::{model_tag, ClassifierDecision, ModelArtifacts, ModelError};
pub use performance::{BacktestMetrics, EquityPoint};
