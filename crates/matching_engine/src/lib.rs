//! # Matching Engine
//!
//! Run-execution core between dispatch and reporting.
//!
//! 负责：
//! - 期望值比较语法 (精确、容差、必须为空、忽略)
//! - 两阶段事件关联 (发件人 → 主题)
//! - 有时间窗口的事件流消费
//! - 最终 verdict 与运行摘要
//! - 运行前置条件检查
//!
//! ## 使用示例
//!
//! ```ignore
//! use matching_engine::{finalize, summarize, Watermark, WindowConsumer};
//!
//! let watermark = Watermark::now();
//! // ... dispatch ...
//! let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
//! let consumer = WindowConsumer::new(source, decoder, matching, window, watermark, cancel_rx);
//! let outcome = consumer.run(rows).await;
//! let verdicts = finalize(&outcome.rows, &kinds);
//! let summary = summarize(&outcome.rows, &verdicts, &outcome.stats);
//! ```

pub mod comparator;
mod consumer;
mod correlator;
mod error;
pub mod preconditions;
mod verdict;

pub use comparator::{compare, evaluate_fields, FieldOutcome, MUST_BE_EMPTY};
pub use consumer::{
    ConsumerStats, StopReason, Watermark, WindowConsumer, WindowOutcome, WindowState,
};
pub use correlator::{CorrelationOutcome, CorrelationStats, Correlator, MatchStage};
pub use error::{EngineError, Result};
pub use verdict::{finalize, summarize};
