//! ords-ingest
//!
//! Consumes raw order messages, validates and persists them, refreshes the
//! cache, and only then acknowledges the message to the source.
//!
//! Delivery is at-least-once: anything not committed is redelivered, and the
//! store's idempotent insert absorbs the repeats.

mod channel;
mod handle;
mod kafka;
mod pipeline;
mod process;
mod source;

pub use channel::{ChannelSender, ChannelSource, CommitLog};
pub use handle::{spawn_ingest, IngestHandle};
pub use kafka::{KafkaOffset, KafkaSource};
pub use pipeline::{run_ingest_loop, IngestContext, IngestCounters, IngestError, IngestStats};
pub use process::{process_message, ProcessError};
pub use source::{InboundMessage, MessageSource, SourceError};
