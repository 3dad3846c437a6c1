use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Pipeline metrics. All collectors are gated behind `enabled`.
///
/// When disabled no registry is created and every recording call returns
/// immediately.
pub struct PipelineMetrics {
    enabled: bool,
    registry: Option<Registry>,
    /// Dispatcher admissions by outcome (`accepted`, `dropped`).
    pub dispatch_total: Option<IntCounterVec>,
    /// Producer results by outcome (`published`, `filtered`, ...).
    pub publish_total: Option<IntCounterVec>,
    pub broker_errors_total: Option<IntCounter>,
    pub workers_running: Option<IntGauge>,
}

impl PipelineMetrics {
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Access records offered to the dispatcher").namespace("stile"),
            &["outcome"],
        )?;
        let publish_total = IntCounterVec::new(
            Opts::new("publish_total", "Access records handled by the producer").namespace("stile"),
            &["outcome"],
        )?;
        let broker_errors_total = IntCounter::with_opts(
            Opts::new("broker_errors_total", "Errors reported by the broker client").namespace("stile"),
        )?;
        let workers_running = IntGauge::with_opts(
            Opts::new("workers_running", "Publish tasks currently holding a dispatcher slot")
                .namespace("stile"),
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(publish_total.clone()))?;
        registry.register(Box::new(broker_errors_total.clone()))?;
        registry.register(Box::new(workers_running.clone()))?;

        Ok(Self {
            enabled: true,
            registry: Some(registry),
            dispatch_total: Some(dispatch_total),
            publish_total: Some(publish_total),
            broker_errors_total: Some(broker_errors_total),
            workers_running: Some(workers_running),
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            registry: None,
            dispatch_total: None,
            publish_total: None,
            broker_errors_total: None,
            workers_running: None,
        }
    }

    #[inline]
    pub fn record_dispatch(&self, outcome: &str) {
        if !self.enabled {
            return;
        }
        if let Some(ref counter) = self.dispatch_total {
            counter.with_label_values(&[outcome]).inc();
        }
    }

    #[inline]
    pub fn record_publish(&self, outcome: &str) {
        if !self.enabled {
            return;
        }
        if let Some(ref counter) = self.publish_total {
            counter.with_label_values(&[outcome]).inc();
        }
    }

    #[inline]
    pub fn record_broker_error(&self) {
        if let Some(ref counter) = self.broker_errors_total {
            counter.inc();
        }
    }

    #[inline]
    pub fn set_running(&self, running: usize) {
        if let Some(ref gauge) = self.workers_running {
            gauge.set(i64::try_from(running).unwrap_or(i64::MAX));
        }
    }

    /// Render prometheus text exposition format.
    pub fn render(&self) -> String {
        if let Some(ref registry) = self.registry {
            let encoder = TextEncoder::new();
            let metric_families = registry.gather();
            let mut buffer = Vec::new();
            encoder.encode(&metric_families, &mut buffer).unwrap_or(());
            String::from_utf8(buffer).unwrap_or_default()
        } else {
            String::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
