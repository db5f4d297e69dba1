//! # Ingestion
//!
//! Stream-side collaborators for the window consumer.
//!
//! Responsibilities:
//! - Serve raw records from a replay file or a live channel (`StreamSource`)
//! - Decode JSON payloads into flattened field maps (`EventDecoder`)
//! - Build the configured source from the `[stream]` section
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{create_source, JsonEventDecoder};
//!
//! let source = create_source(&blueprint.stream).await?;
//! let decoder = JsonEventDecoder::from_blueprint(&blueprint);
//! ```

mod channel;
mod decoder;
mod error;
mod metrics;
mod replay;

// Re-exports
pub use channel::{channel_source, ChannelStreamSource};
pub use contracts::{EventDecoder, RawRecord, StreamSource};
pub use decoder::JsonEventDecoder;
pub use error::{IngestionError, Result};
pub use metrics::{MetricsSnapshot, SourceMetrics};
pub use replay::ReplayFileSource;

use contracts::{StreamConfig, StreamKind};
use tracing::instrument;

/// Open the stream source selected by `[stream].kind`
#[instrument(name = "ingestion_create_source", skip(config), fields(kind = ?config.kind, topic = %config.topic))]
pub async fn create_source(config: &StreamConfig) -> Result<ReplayFileSource> {
    match config.kind {
        StreamKind::ReplayFile => ReplayFileSource::from_config(config).await,
    }
}
