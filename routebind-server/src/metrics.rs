//! Dispatch metrics definitions
//!
//! OpenTelemetry instruments recorded by the route table when a
//! [`Registrar`](crate::Registrar) is built with
//! [`with_metrics`](crate::Registrar::with_metrics). They are exported by
//! whatever meter provider `init_telemetry` installed; without one the global
//! no-op provider swallows them.
//!
//! # Metrics Collected
//!
//! - **requests_total**: Handler invocations by handler and outcome (counter)
//! - **duration**: Time from parameter resolution to dispatch completion (histogram)
//! - **binding_failures_total**: Requests rejected during parameter resolution (counter)
//!
//! Outcomes are `ok`, `middleware`, `bad_request` and `handler_error`. For a
//! middleware step the duration includes the rest of the pipeline it
//! continued into.
//!
//! # Examples
//!
//! ```rust,no_run
//! use routebind_server::DispatchMetrics;
//!
//! let metrics = DispatchMetrics::new("users-api");
//! metrics.record_dispatch("users.find", "ok", 0.004);
//! metrics.record_binding_failure("users.find", "validation");
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Instruments for route dispatch, all under `routebind.dispatch.*`
pub struct DispatchMetrics {
    /// Total number of handler invocations
    pub requests_total: Counter<u64>,
    /// Dispatch duration in seconds
    pub duration: Histogram<f64>,
    /// Requests rejected with 400 before the handler ran
    pub binding_failures_total: Counter<u64>,
}

impl DispatchMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Build the instruments on a caller-supplied meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("routebind.dispatch.requests.total")
                .with_description("Total number of handler dispatches")
                .build(),
            duration: meter
                .f64_histogram("routebind.dispatch.duration")
                .with_description("Dispatch duration in seconds")
                .build(),
            binding_failures_total: meter
                .u64_counter("routebind.dispatch.binding_failures.total")
                .with_description("Requests rejected during parameter binding")
                .build(),
        }
    }

    pub fn record_dispatch(&self, handler: &str, outcome: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("handler", handler.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.duration.record(duration_secs, attributes);
    }

    /// `kind` is `missing` or `validation`
    pub fn record_binding_failure(&self, handler: &str, kind: &str) {
        let attributes = &[
            KeyValue::new("handler", handler.to_string()),
            KeyValue::new("kind", kind.to_string()),
        ];
        self.binding_failures_total.add(1, attributes);
    }
}
