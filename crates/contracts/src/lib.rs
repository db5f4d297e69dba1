//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Stream records carry the broker timestamp (`DateTime<Utc>`)
//! - `run_start` is the watermark captured once per run; records before it are never attributed
//! - Send timestamps are wall-clock and diagnostic only

mod blueprint;
mod error;
mod event;
mod message;
mod report;
mod row;
mod run_settings;
mod sender;
mod stream_source;

pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use message::OutboundMessage;
pub use report::*;
pub use row::*;
pub use run_settings::*;
pub use sender::*;
pub use stream_source::{EventDecoder, LocalStreamSource, StreamSource};
