use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::source::{InboundMessage, MessageSource, SourceError};

/// Sending half of a [`ChannelSource`]. Push `Err(..)` to simulate a broker
/// error; drop every sender to close the source.
pub type ChannelSender = mpsc::Sender<Result<Vec<u8>, SourceError>>;

/// Sequence numbers committed by a [`ChannelSource`], shared so the caller can
/// inspect them after the source has been moved into the ingest task.
#[derive(Debug, Clone, Default)]
pub struct CommitLog(Arc<Mutex<Vec<u64>>>);

impl CommitLog {
    pub fn snapshot(&self) -> Vec<u64> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, seq: u64) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(seq);
    }
}

/// In-process source backed by a tokio mpsc channel. Each message gets a
/// sequence number, starting at 0, that serves as its commit handle.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Vec<u8>, SourceError>>,
    next_seq: u64,
    commits: CommitLog,
}

impl ChannelSource {
    pub fn new(buffer: usize) -> (ChannelSender, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let source = Self {
            rx,
            next_seq: 0,
            commits: CommitLog::default(),
        };
        (tx, source)
    }

    pub fn commit_log(&self) -> CommitLog {
        self.commits.clone()
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    type Handle = u64;

    async fn next(&mut self) -> Result<InboundMessage<u64>, SourceError> {
        let payload = self.rx.recv().await.ok_or(SourceError::Closed)??;
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(InboundMessage {
            payload,
            handle: seq,
        })
    }

    async fn commit(&mut self, handle: &u64) -> Result<(), SourceError> {
        self.commits.push(*handle);
        Ok(())
    }
}
