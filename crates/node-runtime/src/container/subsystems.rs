//! # Subsystem Container
//!
//! Builds every subsystem of one node and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: metrics, service status, mediator
//! Phase 2: acknowledgment coordinator (needs mediator + storage)
//! Phase 3: persistence router   ──subscribe──► mediator
//! Phase 4: verification router  ──subscribe──► mediator
//! ```
//!
//! Both routers report to the coordinator, which is the only component that
//! flips the service status. The coordinator also holds the shutdown signal
//! so a failed node interrupts its own writers and sessions.

use std::sync::Arc;

use bn_02_persistence::{BlockStorage, InFlightBlocks, PersistenceHandler, WriterFactory};
use bn_03_verification::{SessionFactory, VerificationHandler};
use bn_04_acknowledgment::{AckCoordinator, BroadcastNotifier};
use bn_telemetry::BlockNodeMetrics;
use shared_bus::{BroadcastMediator, SubscriberId};
use shared_crypto::SignatureVerifier;
use shared_types::{AckHandler, ServiceStatus};
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::adapters::{MediatorConsumerTerminator, StorageArtifactStore};
use crate::container::config::NodeConfig;
use crate::errors::NodeError;

/// Central container holding all subsystem instances of one node.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub metrics: Arc<BlockNodeMetrics>,
    pub service_status: Arc<ServiceStatus>,
    pub mediator: Arc<BroadcastMediator>,
    pub storage: Arc<dyn BlockStorage>,
    pub notifier: Arc<BroadcastNotifier>,
    pub coordinator: Arc<AckCoordinator>,
    pub persistence_subscriber: SubscriberId,
    pub verification_subscriber: SubscriberId,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SubsystemContainer {
    /// Must be called from within a tokio runtime.
    #[instrument(name = "subsystem_init", skip_all)]
    pub async fn build(
        config: NodeConfig,
        storage: Arc<dyn BlockStorage>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        // =====================================================================
        // PHASE 1: Shared Infrastructure
        // =====================================================================
        let metrics = Arc::new(BlockNodeMetrics::new()?);
        let service_status = Arc::new(ServiceStatus::new(config.service.shutdown_delay));
        let mediator = Arc::new(BroadcastMediator::new(
            config.mediator.clone(),
            Arc::clone(&metrics),
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shutdown = Arc::new(shutdown);
        let in_flight = InFlightBlocks::new();

        // =====================================================================
        // PHASE 2: Acknowledgment
        // =====================================================================
        let notifier = Arc::new(BroadcastNotifier::new(
            config.service.response_capacity,
            Arc::clone(&metrics),
        ));
        let coordinator = Arc::new(AckCoordinator::new(
            config.ack.clone(),
            Arc::clone(&service_status),
            notifier.clone(),
            Arc::new(MediatorConsumerTerminator::new(Arc::clone(&mediator))),
            Arc::new(StorageArtifactStore::new(
                Arc::clone(&storage),
                in_flight.clone(),
            )),
            Arc::clone(&metrics),
            Arc::clone(&shutdown),
        ));
        let ack_handler: Arc<dyn AckHandler> = coordinator.clone();
        mediator.set_escalation(Arc::clone(&ack_handler));

        // =====================================================================
        // PHASE 3: Persistence
        // =====================================================================
        let writers = WriterFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ack_handler),
            Arc::clone(&metrics),
            shutdown_rx.clone(),
            config.persistence.writer_queue_capacity,
        )
        .with_in_flight(in_flight);
        let persistence_subscriber = mediator
            .subscribe(Arc::new(PersistenceHandler::new(
                writers,
                Arc::clone(&ack_handler),
            )))
            .await;

        // =====================================================================
        // PHASE 4: Verification
        // =====================================================================
        let sessions = SessionFactory::new(
            config.verification.clone(),
            verifier,
            Arc::clone(&metrics),
            shutdown_rx.clone(),
        )?;
        let verification_subscriber = mediator
            .subscribe(Arc::new(VerificationHandler::new(
                sessions,
                ack_handler,
                Arc::clone(&metrics),
                shutdown_rx,
            )))
            .await;

        info!(
            session_type = ?config.verification.session_type,
            skip_acknowledgement = config.ack.skip_acknowledgement,
            first_block_number = config.ack.first_block_number,
            "Block node subsystems initialized"
        );

        Ok(Self {
            config,
            metrics,
            service_status,
            mediator,
            storage,
            notifier,
            coordinator,
            persistence_subscriber,
            verification_subscriber,
            shutdown,
        })
    }

    /// Interrupt every in-flight writer and verification session.
    pub fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
