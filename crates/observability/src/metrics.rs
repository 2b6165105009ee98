//! Prometheus-kompatible Metriken fuer Parley
//!
//! Registrierte Metriken:
//! - `parley_connected_clients` – Gauge: Offene WebSocket-Verbindungen
//! - `parley_online_peers` – Gauge: Registrierte Kennungen
//! - `parley_active_calls` – Gauge: Klingelnde und verbundene Sessions
//! - `parley_signaling_messages_total` – Counter: Verarbeitete Nachrichten (event)
//! - `parley_call_outcomes_total` – Counter: Anruf-Ergebnisse (outcome)
//! - `parley_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `parley_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! `ParleyMetrics` ist gleichzeitig der `EventBus` des Signaling-Kerns.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use parley_core::event::{CallOutcome, EventBus, ParleyEvent};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Alle Parley-Prometheus-Metriken
#[derive(Clone)]
pub struct ParleyMetrics {
    pub registry: Arc<Registry>,

    // Signaling-Metriken
    pub connected_clients: IntGauge,
    pub online_peers: IntGauge,
    pub active_calls: IntGauge,
    pub signaling_messages_total: IntCounterVec,
    pub call_outcomes_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl ParleyMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Signaling-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "parley_connected_clients",
            "Anzahl offener WebSocket-Verbindungen",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let online_peers = IntGauge::with_opts(Opts::new(
            "parley_online_peers",
            "Anzahl registrierter Peer-Kennungen",
        ))?;
        registry.register(Box::new(online_peers.clone()))?;

        let active_calls = IntGauge::with_opts(Opts::new(
            "parley_active_calls",
            "Anzahl klingelnder oder verbundener Sessions",
        ))?;
        registry.register(Box::new(active_calls.clone()))?;

        let signaling_messages_total = IntCounterVec::new(
            Opts::new(
                "parley_signaling_messages_total",
                "Verarbeitete Signaling-Nachrichten",
            ),
            &["event"],
        )?;
        registry.register(Box::new(signaling_messages_total.clone()))?;

        let call_outcomes_total = IntCounterVec::new(
            Opts::new("parley_call_outcomes_total", "Anruf-Ergebnisse"),
            &["outcome"],
        )?;
        registry.register(Box::new(call_outcomes_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("parley_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "parley_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            online_peers,
            active_calls,
            signaling_messages_total,
            call_outcomes_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn outcome_zaehlen(&self, outcome: CallOutcome) {
        self.call_outcomes_total
            .with_label_values(&[outcome.label()])
            .inc();
    }
}

impl EventBus for ParleyMetrics {
    fn senden(&self, event: ParleyEvent) -> parley_core::Result<()> {
        match event {
            ParleyEvent::NachrichtVerarbeitet { event } => {
                self.signaling_messages_total
                    .with_label_values(&[event.as_str()])
                    .inc();
            }
            ParleyEvent::AnrufGestartet { .. } => {}
            ParleyEvent::AnrufAbgewiesen { outcome } => self.outcome_zaehlen(outcome),
            ParleyEvent::AnrufVerbunden { .. } => self.outcome_zaehlen(CallOutcome::Verbunden),
            ParleyEvent::AnrufBeendet { outcome, .. } => self.outcome_zaehlen(outcome),
            ParleyEvent::ZustandAktualisiert {
                verbindungen,
                online_peers,
                aktive_anrufe,
            } => {
                self.connected_clients.set(verbindungen as i64);
                self.online_peers.set(online_peers as i64);
                self.active_calls.set(aktive_anrufe as i64);
            }
        }
        Ok(())
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: ParleyMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<ParleyMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
