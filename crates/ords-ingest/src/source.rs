use async_trait::async_trait;
use thiserror::Error;

/// One raw message plus whatever the source needs to acknowledge it later.
#[derive(Debug, Clone)]
pub struct InboundMessage<H> {
    pub payload: Vec<u8>,
    pub handle: H,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Retry after a pause (broker unreachable, rebalance, poll error).
    #[error("transient source error: {0}")]
    Transient(String),

    /// The source cannot continue; the ingestion loop ends with an error.
    #[error("fatal source error: {0}")]
    Fatal(String),

    /// No more messages will ever arrive.
    #[error("message source closed")]
    Closed,
}

/// At-least-once message stream.
///
/// A message that is never committed is redelivered after a restart or a
/// consumer-group rebalance.
#[async_trait]
pub trait MessageSource: Send {
    type Handle: Send + Sync;

    /// Block until the next message is available.
    async fn next(&mut self) -> Result<InboundMessage<Self::Handle>, SourceError>;

    /// Mark the message behind `handle` (and everything before it on the same
    /// partition) as processed.
    async fn commit(&mut self, handle: &Self::Handle) -> Result<(), SourceError>;
}
