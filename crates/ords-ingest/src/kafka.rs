//! Kafka-backed MessageSource.
//!
//! Offsets are committed manually (enable.auto.commit=false) and only after the
//! pipeline has persisted the order, so a crash between receive and persist
//! causes redelivery, never loss.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ords_config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tracing::info;

use crate::source::{InboundMessage, MessageSource, SourceError};

/// Position of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    /// Create the consumer and subscribe to `cfg.topic`.
    pub fn from_config(cfg: &KafkaConfig) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &cfg.brokers)
            .set("group.id", &cfg.group_id)
            .set("auto.offset.reset", &cfg.auto_offset_reset)
            .set("session.timeout.ms", cfg.session_timeout_ms.to_string())
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .create()
            .context("failed to create kafka consumer")?;

        consumer
            .subscribe(&[cfg.topic.as_str()])
            .with_context(|| format!("failed to subscribe to topic {}", cfg.topic))?;

        info!(brokers = %cfg.brokers, topic = %cfg.topic, group_id = %cfg.group_id, "kafka consumer subscribed");

        Ok(Self {
            consumer,
            topic: cfg.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    type Handle = KafkaOffset;

    async fn next(&mut self) -> Result<InboundMessage<KafkaOffset>, SourceError> {
        let msg = self.consumer.recv().await.map_err(classify)?;

        Ok(InboundMessage {
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            handle: KafkaOffset {
                topic: msg.topic().to_string(),
                partition: msg.partition(),
                offset: msg.offset(),
            },
        })
    }

    async fn commit(&mut self, handle: &KafkaOffset) -> Result<(), SourceError> {
        let mut tpl = TopicPartitionList::new();
        // The committed offset is the next one to read.
        tpl.add_partition_offset(&handle.topic, handle.partition, Offset::Offset(handle.offset + 1))
            .map_err(classify)?;

        self.consumer
            .commit(&tpl, CommitMode::Sync)
            .map_err(classify)
    }
}

fn classify(err: KafkaError) -> SourceError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => SourceError::Fatal(err.to_string()),
        _ => SourceError::Transient(err.to_string()),
    }
}
