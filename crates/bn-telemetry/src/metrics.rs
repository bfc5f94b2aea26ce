//! Prometheus metrics for the block node pipeline.
//!
//! All metrics follow the naming convention: `bn_<component>_<metric>`
//!
//! Each node owns one [`BlockNodeMetrics`] with its own registry, so
//! counters in one node (or one test) never leak into another.

use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};

use crate::TelemetryError;

pub struct BlockNodeMetrics {
    registry: Registry,

    // =========================================================================
    // MEDIATOR
    // =========================================================================
    /// Items accepted by the mediator
    pub items_published: IntCounter,
    /// Currently subscribed handlers
    pub subscribers: IntGauge,
    /// Subscribers removed for saturation or handler failure
    pub subscribers_evicted: IntCounter,

    // =========================================================================
    // PERSISTENCE
    // =========================================================================
    pub blocks_persisted: IntCounter,
    pub block_persistence_errors: IntCounter,

    // =========================================================================
    // VERIFICATION
    // =========================================================================
    pub verification_blocks_received: IntCounter,
    pub verification_blocks_verified: IntCounter,
    pub verification_blocks_failed: IntCounter,
    pub verification_blocks_error: IntCounter,
    pub verification_block_time: Histogram,
    pub previous_hash_mismatches: IntCounter,

    // =========================================================================
    // ACKNOWLEDGMENT
    // =========================================================================
    pub acked_blocks: IntCounter,

    // =========================================================================
    // PRODUCERS & CONSUMERS
    // =========================================================================
    pub producers: IntGauge,
    pub live_block_items_received: IntCounter,
    pub live_block_items_consumed: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, TelemetryError> {
    let metric = IntCounter::new(name, help).map_err(metrics_err)?;
    registry
        .register(Box::new(metric.clone()))
        .map_err(metrics_err)?;
    Ok(metric)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, TelemetryError> {
    let metric = IntGauge::new(name, help).map_err(metrics_err)?;
    registry
        .register(Box::new(metric.clone()))
        .map_err(metrics_err)?;
    Ok(metric)
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

impl BlockNodeMetrics {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let buckets = exponential_buckets(0.0001, 2.0, 16).map_err(metrics_err)?;
        let verification_block_time = Histogram::with_opts(
            HistogramOpts::new(
                "bn_verification_block_time_seconds",
                "Time from session open to verification result",
            )
            .buckets(buckets),
        )
        .map_err(metrics_err)?;
        registry
            .register(Box::new(verification_block_time.clone()))
            .map_err(metrics_err)?;

        Ok(Self {
            items_published: counter(
                &registry,
                "bn_mediator_items_published_total",
                "Block items accepted by the mediator",
            )?,
            subscribers: gauge(
                &registry,
                "bn_mediator_subscribers",
                "Handlers currently subscribed to the mediator",
            )?,
            subscribers_evicted: counter(
                &registry,
                "bn_mediator_subscribers_evicted_total",
                "Subscribers removed after saturation or handler failure",
            )?,
            blocks_persisted: counter(
                &registry,
                "bn_persistence_blocks_persisted_total",
                "Blocks written or found already stored",
            )?,
            block_persistence_errors: counter(
                &registry,
                "bn_persistence_errors_total",
                "Writers that ended without a stored block",
            )?,
            verification_blocks_received: counter(
                &registry,
                "bn_verification_blocks_received_total",
                "Verification sessions opened",
            )?,
            verification_blocks_verified: counter(
                &registry,
                "bn_verification_blocks_verified_total",
                "Blocks whose hash and signature verified",
            )?,
            verification_blocks_failed: counter(
                &registry,
                "bn_verification_blocks_failed_total",
                "Blocks with an invalid hash or signature",
            )?,
            verification_blocks_error: counter(
                &registry,
                "bn_verification_blocks_error_total",
                "Blocks that could not be verified",
            )?,
            verification_block_time,
            previous_hash_mismatches: counter(
                &registry,
                "bn_verification_previous_hash_mismatches_total",
                "Headers whose previous hash differs from the last verified block",
            )?,
            acked_blocks: counter(
                &registry,
                "bn_ack_blocks_acknowledged_total",
                "Blocks acknowledged as final",
            )?,
            producers: gauge(&registry, "bn_producers", "Open producer sessions")?,
            live_block_items_received: counter(
                &registry,
                "bn_live_block_items_received_total",
                "Block items received from producers",
            )?,
            live_block_items_consumed: counter(
                &registry,
                "bn_live_block_items_consumed_total",
                "Block items delivered to live consumers",
            )?,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every metric.
    pub fn encode_text(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
