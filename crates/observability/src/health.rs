//! Health-Check-Endpunkt fuer Parley
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, Online-Peers und aktiven Anrufen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::ParleyMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    ShuttingDown,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub online_peers: i64,
    pub active_calls: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub gestartet_um: DateTime<Utc>,
    herunterfahren: Arc<AtomicBool>,
    metriken: Option<ParleyMetrics>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            gestartet_um: Utc::now(),
            herunterfahren: Arc::new(AtomicBool::new(false)),
            metriken: None,
        }
    }

    /// Liest Online-Peers und aktive Anrufe aus den Metriken
    pub fn mit_metriken(mut self, metriken: ParleyMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend (`/health` liefert dann 503)
    pub fn herunterfahren_melden(&self) {
        self.herunterfahren.store(true, Ordering::Release);
    }

    pub fn faehrt_herunter(&self) -> bool {
        self.herunterfahren.load(Ordering::Acquire)
    }

    /// Erstellt die aktuelle Health-Antwort
    pub fn antwort(&self) -> HealthResponse {
        let (online_peers, active_calls) = self
            .metriken
            .as_ref()
            .map(|m| (m.online_peers.get(), m.active_calls.get()))
            .unwrap_or_default();

        HealthResponse {
            status: if self.faehrt_herunter() {
                HealthStatus::ShuttingDown
            } else {
                HealthStatus::Healthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: self.gestartet_um,
            uptime_seconds: self.uptime_seconds(),
            online_peers,
            active_calls,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();

    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}
