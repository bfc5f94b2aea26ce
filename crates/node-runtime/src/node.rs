//! # Block Node
//!
//! Entry point for producers and consumers.
//!
//! ```text
//!  ProducerSession ──publish──► BroadcastMediator ──► PersistenceHandler ─┐
//!         ▲                           │          └──► VerificationHandler ─┤
//!         │                           ▼                                    ▼
//!         └──── acks / end-of-stream ◄──── AckCoordinator ◄────────────────┘
//!                                     │
//!  ConsumerSession ◄── LiveConsumerHandler
//! ```

use std::sync::Arc;

use bn_02_persistence::{BlockStorage, FileBlockStorage};
use bn_04_acknowledgment::AckCoordinator;
use bn_telemetry::BlockNodeMetrics;
use shared_bus::BroadcastMediator;
use shared_crypto::SignatureVerifier;
use shared_types::ServiceStatus;
use tokio::sync::mpsc;
use tracing::info;

use crate::adapters::verifier_from_config;
use crate::container::{NodeConfig, SubsystemContainer};
use crate::errors::NodeError;
use crate::handlers::LiveConsumerHandler;
use crate::session::{ConsumerSession, ProducerSession};

pub struct BlockNode {
    container: SubsystemContainer,
}

impl BlockNode {
    /// Start a node storing blocks under `config.persistence.root_path` and
    /// checking signatures with the configured producer key.
    pub async fn start(config: NodeConfig) -> Result<Self, NodeError> {
        let storage = Arc::new(FileBlockStorage::new(
            config.persistence.root_path.clone(),
            config.persistence.compression_config(),
        ));
        let verifier = verifier_from_config(config.verification.public_key_hex.as_deref())?;
        info!(root = ?config.persistence.root_path, "Using file block storage");
        Self::start_with(config, storage, verifier).await
    }

    /// Start a node over the given storage and verifier.
    pub async fn start_with(
        config: NodeConfig,
        storage: Arc<dyn BlockStorage>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, NodeError> {
        let container = SubsystemContainer::build(config, storage, verifier).await?;
        info!("Block node running");
        Ok(Self { container })
    }

    /// Connect a producer. Refused once the node stopped accepting streams.
    pub fn open_producer(&self) -> Result<ProducerSession, NodeError> {
        if !self.container.service_status.is_running() {
            return Err(NodeError::NotAvailable);
        }
        Ok(ProducerSession::new(
            Arc::clone(&self.container.mediator),
            Arc::clone(&self.container.service_status),
            self.container.notifier.subscribe(),
        ))
    }

    /// Connect a live consumer.
    ///
    /// `start_block` of `None` means the live tip. Otherwise it must be the
    /// next block to be acknowledged: later blocks are invalid and earlier
    /// ones are historic, which live streaming does not serve.
    pub async fn open_consumer(
        &self,
        start_block: Option<u64>,
    ) -> Result<ConsumerSession, NodeError> {
        if !self.container.service_status.is_running() {
            return Err(NodeError::NotAvailable);
        }
        if let Some(requested) = start_block {
            let next = self.next_block_number();
            if requested > next {
                return Err(NodeError::InvalidStartBlock { requested, next });
            }
            if requested < next {
                return Err(NodeError::HistoricNotAvailable { requested, next });
            }
        }

        let consumer_config = &self.container.config.consumer;
        let (sender, receiver) = mpsc::channel(consumer_config.buffer_capacity);
        let handler = Arc::new(LiveConsumerHandler::new(
            sender,
            consumer_config.timeout_threshold,
            Arc::clone(&self.container.metrics),
        ));
        let id = self.container.mediator.subscribe(handler).await;
        Ok(ConsumerSession::new(
            id,
            Arc::clone(&self.container.mediator),
            receiver,
        ))
    }

    /// Stop accepting streams, interrupt in-flight work and drop every
    /// subscriber.
    pub async fn shutdown(&self) {
        info!("Shutting down block node");
        self.container.service_status.stop_running();
        self.container.signal_shutdown();
        self.container.mediator.unsubscribe_all().await;
    }

    /// Resolves once the node's listener should stop, after a failure.
    pub async fn stopped(&self) {
        self.container.service_status.listener_stopped().await;
    }

    /// Whether in-flight writers and sessions have been told to stop.
    pub fn is_shutdown(&self) -> bool {
        self.container.is_shutdown()
    }

    /// The block number the next acknowledgement will carry.
    pub fn next_block_number(&self) -> u64 {
        self.container
            .service_status
            .latest_acked_block()
            .map_or(self.container.config.ack.first_block_number, |b| {
                b.block_number.saturating_add(1)
            })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.container.config
    }

    pub fn service_status(&self) -> &Arc<ServiceStatus> {
        &self.container.service_status
    }

    pub fn metrics(&self) -> &Arc<BlockNodeMetrics> {
        &self.container.metrics
    }

    pub fn storage(&self) -> &Arc<dyn BlockStorage> {
        &self.container.storage
    }

    pub fn mediator(&self) -> &Arc<BroadcastMediator> {
        &self.container.mediator
    }

    pub fn coordinator(&self) -> &Arc<AckCoordinator> {
        &self.container.coordinator
    }
}
