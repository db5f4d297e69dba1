//! ChannelStreamSource - records pushed through an async channel
//!
//! Used for live feeding and for tests that interleave sends with stream records.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TryRecvError};
use contracts::{ContractError, RawRecord, StreamSource};
use tracing::{debug, trace};

use crate::metrics::SourceMetrics;

/// Create a channel-backed source and the sender feeding it
pub fn channel_source(
    name: impl Into<String>,
    capacity: usize,
    batch_size: usize,
) -> (Sender<RawRecord>, ChannelStreamSource) {
    let (tx, rx) = bounded(capacity.max(1));
    let source = ChannelStreamSource {
        name: name.into(),
        rx,
        batch_size: batch_size.max(1),
        metrics: Arc::new(SourceMetrics::new()),
    };
    (tx, source)
}

/// Stream source over an `async_channel::Receiver`
pub struct ChannelStreamSource {
    name: String,
    rx: Receiver<RawRecord>,
    batch_size: usize,
    metrics: Arc<SourceMetrics>,
}

impl ChannelStreamSource {
    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl StreamSource for ChannelStreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// Wait up to `max_wait` for the first record, then drain without waiting.
    ///
    /// A closed and empty channel yields empty batches; the window decides when to stop.
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<RawRecord>, ContractError> {
        let first = match tokio::time::timeout(max_wait, self.rx.recv()).await {
            Ok(Ok(record)) => record,
            Ok(Err(_closed)) => {
                trace!(source = %self.name, "Channel closed, nothing buffered");
                self.metrics.record_poll(0);
                return Ok(Vec::new());
            }
            Err(_elapsed) => {
                self.metrics.record_poll(0);
                return Ok(Vec::new());
            }
        };

        let mut batch = Vec::with_capacity(self.batch_size.min(self.rx.len() + 1));
        batch.push(first);
        while batch.len() < self.batch_size {
            match self.rx.try_recv() {
                Ok(record) => batch.push(record),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        self.metrics.record_poll(batch.len());
        trace!(source = %self.name, records = batch.len(), "Channel batch");
        Ok(batch)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        let dropped = self.rx.len();
        self.rx.close();
        debug!(source = %self.name, dropped, "Channel source closed");
        Ok(())
    }
}
