//! 바 단위 매매 결정.

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// 한 바에 대한 매매 결정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// 롱 진입 (한도/현금 허용 시)
    EnterLong,
    /// 보유 중인 롱 전량 청산
    ExitLong,
    /// 아무것도 하지 않음
    Hold,
}

/// 피처 벡터를 받아 결정을 내리는 함수.
///
/// 현재 바의 피처만 전달되며, 미래 바는 볼 수 없습니다.
pub trait DecisionFunction {
    fn decide(&mut self, features: &FeatureVector) -> Decision;
}

impl<F> DecisionFunction for F
where
    F: FnMut(&FeatureVector) -> Decision,
{
    fn decide(&mut self, features: &FeatureVector) -> Decision {
        self(features)
    }
}

/// 결정 횟수 집계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub enter_long: usize,
    pub exit_long: usize,
    pub hold: usize,
}

impl DecisionCounts {
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::EnterLong => self.enter_long += 1,
            Decision::ExitLong => self.exit_long += 1,
            Decision::Hold => self.hold += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.enter_long + self.exit_long + self.hold
    }
}
