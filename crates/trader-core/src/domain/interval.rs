//! 캔들 간격(Interval) 타입.
//!
//! 거래소 kline 인터벌 토큰을 파싱합니다.
//!
//! | 토큰 | 의미 |
//! |------|------|
//! | `N` (양의 정수) | N분 |
//! | `D` | 1일 |
//! | `W` | 7일 |
//! | `M` | 30일 (커서 전진용 근사값) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 24 * 60 * MINUTE_MS;

/// 캔들 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    /// N분 (N > 0)
    Minutes(u32),
    /// 일봉
    Day,
    /// 주봉
    Week,
    /// 월봉
    Month,
}

impl Interval {
    /// 인터벌 길이 (밀리초).
    pub fn as_millis(&self) -> i64 {
        match self {
            Self::Minutes(n) => i64::from(*n) * MINUTE_MS,
            Self::Day => DAY_MS,
            Self::Week => 7 * DAY_MS,
            Self::Month => 30 * DAY_MS,
        }
    }

    /// 거래소 API 토큰 (`"60"`, `"D"` 등).
    pub fn token(&self) -> String {
        match self {
            Self::Minutes(n) => n.to_string(),
            Self::Day => "D".to_string(),
            Self::Week => "W".to_string(),
            Self::Month => "M".to_string(),
        }
    }

    /// 파일명 태그. 분 단위는 `"60m"`, 나머지는 토큰 그대로.
    pub fn file_tag(&self) -> String {
        match self {
            Self::Minutes(n) => format!("{}m", n),
            _ => self.token(),
        }
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token {
            "D" => Ok(Self::Day),
            "W" => Ok(Self::Week),
            "M" => Ok(Self::Month),
            _ => match token.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Self::Minutes(n)),
                _ => Err(CoreError::InvalidInterval(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.token()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}
