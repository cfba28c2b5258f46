//! 데이터 수집 모듈.

pub mod csv_store;
pub mod kline_fetch;
pub mod utils;

pub use csv_store::{default_output_path, merge_candles, read_candles, write_candles};
pub use kline_fetch::{fetch_klines, FetchOutcome, FetchRequest, StopReason};
