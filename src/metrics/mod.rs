use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Counters for the order lifecycle and a gauge for connected live-feed
// clients, all registered with one Registry and scraped via GET /metrics.
//
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created_total: IntCounter,
    pub orders_rejected_total: IntCounterVec,
    pub status_updates_total: IntCounterVec,
    pub live_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created_total = IntCounter::new(
            "orders_created_total",
            "Total orders accepted and persisted",
        )?;
        registry.register(Box::new(orders_created_total.clone()))?;

        let orders_rejected_total = IntCounterVec::new(
            Opts::new("orders_rejected_total", "Total rejected order operations"),
            &["reason"],
        )?;
        registry.register(Box::new(orders_rejected_total.clone()))?;

        let status_updates_total = IntCounterVec::new(
            Opts::new("status_updates_total", "Total successful status updates"),
            &["status"],
        )?;
        registry.register(Box::new(status_updates_total.clone()))?;

        let live_clients = IntGauge::new(
            "live_clients",
            "Currently connected live-feed subscribers",
        )?;
        registry.register(Box::new(live_clients.clone()))?;

        Ok(Self {
            registry,
            orders_created_total,
            orders_rejected_total,
            status_updates_total,
            live_clients,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
