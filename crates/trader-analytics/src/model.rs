//! SVM 모델 아티팩트 로드 및 추론.
//!
//! 외부 학습기가 내보낸 두 JSON 파일을 사용합니다.
//!
//! - 스케일러: `{"feature_names": [...], "mean": [...], "scale": [...]}`
//! - 분류기: 이진 SVC의 서포트 벡터, 쌍대 계수, 절편, 클래스 레이블
//!
//! ```json
//! {
//!   "kernel": {"type": "rbf", "gamma": 0.01},
//!   "support_vectors": [[0.1, ...], ...],
//!   "dual_coef": [0.5, ...],
//!   "intercept": -0.2,
//!   "classes": [0, 1]
//! }
//! ```
//!
//! 아티팩트 경로는 호출자가 명시적으로 넘깁니다.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::backtest::{Decision, DecisionFunction};
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// 모델 아티팩트 에러.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("아티팩트 읽기 실패 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("아티팩트 파싱 실패 ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("차원 불일치: {0}")]
    Dimension(String),

    #[error("피처 이름 불일치: expected={expected:?}, found={found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

// =============================================================================
// 스케일러
// =============================================================================

/// 표준화 스케일러 (`(x - mean) / scale`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// 피처 벡터 표준화. scale이 0인 피처는 1로 나눕니다.
    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = *features;
        for ((x, mean), scale) in out.iter_mut().zip(&self.mean).zip(&self.scale) {
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *x = (*x - mean) / scale;
        }
        out
    }

    /// 피처 이름과 차원 검증.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(ModelError::FeatureMismatch {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: self.feature_names.clone(),
            });
        }
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(ModelError::Dimension(format!(
                "스케일러 mean/scale 길이는 {}이어야 합니다 (mean={}, scale={})",
                FEATURE_COUNT,
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// 분류기
// =============================================================================

/// SVM 커널.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    pub fn apply(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Linear => dot(a, b),
            Self::Rbf { gamma } => {
                let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            Self::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot(a, b) + coef0).powi(*degree as i32),
            Self::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 학습된 이진 SVM 분류기.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmClassifier {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    /// `[음성, 양성]` 클래스 레이블
    pub classes: Vec<i64>,
}

impl SvmClassifier {
    /// 결정 함수 `Σ αᵢ K(svᵢ, x) + b`.
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, alpha)| alpha * self.kernel.apply(sv, x))
            .sum::<f64>()
            + self.intercept
    }

    /// 결정 값이 양수면 `classes[1]`, 아니면 `classes[0]`.
    pub fn predict(&self, x: &[f64]) -> i64 {
        if self.decision_function(x) > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes.len() != 2 {
            return Err(ModelError::Dimension(format!(
                "이진 분류기만 지원합니다 (classes={})",
                self.classes.len()
            )));
        }
        if self.support_vectors.is_empty() {
            return Err(ModelError::Dimension("서포트 벡터가 없습니다".to_string()));
        }
        if self.dual_coef.len() != self.support_vectors.len() {
            return Err(ModelError::Dimension(format!(
                "dual_coef({})와 support_vectors({}) 길이가 다릅니다",
                self.dual_coef.len(),
                self.support_vectors.len()
            )));
        }
        if let Some((i, sv)) = self
            .support_vectors
            .iter()
            .enumerate()
            .find(|(_, sv)| sv.len() != FEATURE_COUNT)
        {
            return Err(ModelError::Dimension(format!(
                "support_vectors[{}] 길이 {} != {}",
                i,
                sv.len(),
                FEATURE_COUNT
            )));
        }
        Ok(())
    }
}

// =============================================================================
// 아티팩트 묶음
// =============================================================================

/// 스케일러 + 분류기.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub scaler: StandardScaler,
    pub classifier: SvmClassifier,
}

impl ModelArtifacts {
    /// 검증된 아티팩트 생성.
    pub fn new(scaler: StandardScaler, classifier: SvmClassifier) -> Result<Self, ModelError> {
        scaler.validate()?;
        classifier.validate()?;
        Ok(Self { scaler, classifier })
    }

    /// 두 JSON 파일에서 로드.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ModelError> {
        let classifier: SvmClassifier = read_json(model_path)?;
        let scaler: StandardScaler = read_json(scaler_path)?;
        let artifacts = Self::new(scaler, classifier)?;

        info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            kernel = ?artifacts.classifier.kernel,
            support_vectors = artifacts.classifier.support_vectors.len(),
            "모델 아티팩트 로드"
        );
        Ok(artifacts)
    }

    /// 원본 피처 벡터로 예측.
    pub fn predict(&self, features: &FeatureVector) -> i64 {
        self.classifier.predict(&self.scaler.transform(features))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// 분류기 예측을 매매 결정으로 변환.
///
/// 예측 1 → [`Decision::EnterLong`], 그 외 → [`Decision::ExitLong`].
#[derive(Debug, Clone)]
pub struct ClassifierDecision {
    artifacts: ModelArtifacts,
}

impl ClassifierDecision {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self { artifacts }
    }
}

impl DecisionFunction for ClassifierDecision {
    fn decide(&mut self, features: &FeatureVector) -> Decision {
        if self.artifacts.predict(features) == 1 {
            Decision::EnterLong
        } else {
            Decision::ExitLong
        }
    }
}

/// 모델 파일명에서 `Kernel-*`, `C-*`, `Gamma-*` 조각을 뽑아 태그 생성.
///
/// 해당 조각이 없으면 `"model"`.
pub fn model_tag(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tags: Vec<&str> = stem
        .split('_')
        .filter(|part| {
            let lower = part.to_ascii_lowercase();
            ["kernel-", "c-", "gamma-"]
                .iter()
                .any(|prefix| lower.starts_with(prefix))
        })
        .collect();

    if tags.is_empty() {
        "model".to_string()
    } else {
        tags.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> StandardScaler {
        StandardScaler {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            mean: vec![1.0; FEATURE_COUNT],
            scale: vec![2.0; FEATURE_COUNT],
        }
    }

    fn linear_on_first_feature() -> SvmClassifier {
        let mut sv = vec![0.0; FEATURE_COUNT];
        sv[0] = 1.0;
        SvmClassifier {
            kernel: Kernel::Linear,
            support_vectors: vec![sv],
            dual_coef: vec![1.0],
            intercept: 0.0,
            classes: vec![0, 1],
        }
    }

    #[test]
    fn test_scaler_transform() {
        let mut s = scaler();
        s.scale[1] = 0.0;
        let out = s.transform(&[3.0; FEATURE_COUNT]);
        assert_eq!(out[0], 1.0);
        // scale 0 → 1로 나눔
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn test_kernels() {
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];
        assert_eq!(Kernel::Linear.apply(&a, &b), 11.0);
        assert!((Kernel::Rbf { gamma: 0.5 }.apply(&a, &b) - (-4.0f64).exp()).abs() < 1e-12);
        assert_eq!(
            Kernel::Poly {
                gamma: 1.0,
                coef0: 1.0,
                degree: 2
            }
            .apply(&a, &b),
            144.0
        );
        assert!((Kernel::Sigmoid { gamma: 0.0, coef0: 0.0 }.apply(&a, &b)).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_json_format() {
        let kernel: Kernel = serde_json::from_str(r#"{"type":"rbf","gamma":0.01}"#).unwrap();
        assert_eq!(kernel, Kernel::Rbf { gamma: 0.01 });
        let kernel: Kernel = serde_json::from_str(r#"{"type":"linear"}"#).unwrap();
        assert_eq!(kernel, Kernel::Linear);
    }

    #[test]
    fn test_predict_uses_scaled_features() {
        let artifacts = ModelArtifacts::new(scaler(), linear_on_first_feature()).unwrap();

        let mut x = [0.0; FEATURE_COUNT];
        x[0] = 3.0; // (3 - 1) / 2 = 1 > 0
        assert_eq!(artifacts.predict(&x), 1);
        x[0] = 0.5; // 음수
        assert_eq!(artifacts.predict(&x), 0);

        let mut decision = ClassifierDecision::new(artifacts);
        assert_eq!(decision.decide(&x), Decision::ExitLong);
        x[0] = 5.0;
        assert_eq!(decision.decide(&x), Decision::EnterLong);
    }

    #[test]
    fn test_validation_errors() {
        let mut s = scaler();
        s.feature_names.swap(0, 1);
        assert!(matches!(
            ModelArtifacts::new(s, linear_on_first_feature()),
            Err(ModelError::FeatureMismatch { .. })
        ));

        let mut c = linear_on_first_feature();
        c.dual_coef.push(1.0);
        assert!(matches!(
            ModelArtifacts::new(scaler(), c),
            Err(ModelError::Dimension(_))
        ));

        let mut c = linear_on_first_feature();
        c.support_vectors[0].pop();
        assert!(matches!(
            ModelArtifacts::new(scaler(), c),
            Err(ModelError::Dimension(_))
        ));

        let mut c = linear_on_first_feature();
        c.classes = vec![0, 1, 2];
        assert!(ModelArtifacts::new(scaler(), c).is_err());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("BTCUSDT_60m_Kernel-rbf_C-1.0_Gamma-0p01_Target-1pds_model.json");
        let scaler_path = dir.path().join("scaler.json");
        fs::write(&model_path, serde_json::to_string(&linear_on_first_feature()).unwrap()).unwrap();
        fs::write(&scaler_path, serde_json::to_string(&scaler()).unwrap()).unwrap();

        let artifacts = ModelArtifacts::load(&model_path, &scaler_path).unwrap();
        assert_eq!(artifacts.classifier.kernel, Kernel::Linear);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ModelArtifacts::load(&missing, &scaler_path),
            Err(ModelError::Io { .. })
        ));

        fs::write(&scaler_path, "{not json").unwrap();
        assert!(matches!(
            ModelArtifacts::load(&model_path, &scaler_path),
            Err(ModelError::Parse { .. })
        ));
    }

    #[test]
    fn test_model_tag() {
        assert_eq!(
            model_tag(Path::new("m/BTCUSDT_60m_Kernel-rbf_C-1.0_Gamma-0p01_Target-1pds_model.json")),
            "Kernel-rbf_C-1.0_Gamma-0p01"
        );
        assert_eq!(model_tag(Path::new("svm.json")), "model");
    }
}
