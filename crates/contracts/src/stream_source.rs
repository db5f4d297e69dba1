//! Stream boundary: poll raw records, decode payloads.

use std::time::Duration;

use crate::{ContractError, FieldMap, RawRecord};

/// Stream of produced events
#[trait_variant::make(StreamSource: Send)]
pub trait LocalStreamSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Fetch the next batch, waiting at most `max_wait` when nothing is available.
    ///
    /// An empty batch is a normal result.
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<RawRecord>, ContractError>;

    /// Release the underlying connection/file
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Decoder adapter: raw payload bytes to an ordered field map.
///
/// Selected once at run setup; the engine never branches on the payload format.
pub trait EventDecoder: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<FieldMap, ContractError>;
}

impl<F> EventDecoder for F
where
    F: Fn(&[u8]) -> Result<FieldMap, ContractError> + Send + Sync,
{
    fn decode(&self, payload: &[u8]) -> Result<FieldMap, ContractError> {
        self(payload)
    }
}
