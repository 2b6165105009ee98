//! # parley-observability
//!
//! Observability-Crate fuer Parley:
//! - Prometheus-kompatible Metriken (`/metrics`), zugleich Event-Bus des
//!   Signaling-Kerns
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, ParleyMetrics};
pub use middleware::{request_timing_layer, timing_middleware};
