//! CLI 명령어 구현.

pub mod account;
pub mod backtest;
pub mod features;
