//! # Dispatcher
//!
//! 刺激邮件发送模块。
//!
//! 负责：
//! - 为每个启用的行组装 `OutboundMessage`
//! - 在并发上限内发送，单次发送带超时
//! - 发送失败 / 超时 / panic 只影响当前行（`SendFailed`）

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod metrics;
pub mod senders;

pub use contracts::{MessageSender, OutboundMessage};
pub use dispatcher::{skip_rows, DispatchReport, Dispatcher, SendOutcome};
pub use error::DispatcherError;
pub use message::compose_message;
pub use metrics::{MetricsSnapshot, SendMetrics};
pub use senders::{create_sender, ConfiguredSender, LogSender, PickupDirConfig, PickupDirSender};
