//! parley-server – Bibliotheks-Root
//!
//! Verdrahtet Signaling-Kern, WebSocket-Endpunkt und Observability zu einem
//! axum-Server und stellt den oeffentlichen Einstiegspunkt fuer
//! Integrationstests bereit.

pub mod config;

use anyhow::Result;
use axum::Router;
use config::ServerConfig;
use parley_observability::{
    health_router, metrics_router, request_timing_layer, timing_middleware, HealthState,
    ParleyMetrics,
};
use parley_signaling::{signaling_router, SignalingCore, SignalingState, WsState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

/// Wartezeit auf das Ende des Signaling-Kerns nach dem HTTP-Shutdown
const KERN_STOPP_TIMEOUT: Duration = Duration::from_secs(5);

/// Haelt den Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Signaling-Kern und bindet den HTTP-Listener
    ///
    /// Reihenfolge:
    /// 1. Metriken anlegen (zugleich Event-Bus des Kerns)
    /// 2. Signaling-Kern als eigenen Task starten
    /// 3. Router aus `/ws`, `/health` und optional `/metrics` bauen
    /// 4. TCP-Listener binden
    pub async fn binden(self) -> Result<LaufenderServer> {
        let metriken = ParleyMetrics::neu()?;
        let signaling_config = Arc::new(self.config.signaling_config());

        let state = SignalingState::neu(signaling_config.as_ref().clone())
            .mit_event_bus(Arc::new(metriken.clone()));
        let (core, kern) = SignalingCore::starten(state);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let health = HealthState::neu().mit_metriken(metriken.clone());

        let mut app = Router::new()
            .merge(signaling_router(WsState::neu(
                core,
                signaling_config,
                shutdown_rx.clone(),
            )))
            .merge(health_router(health.clone()));
        if self.config.observability.metriken_aktiviert {
            app = app.merge(metrics_router(metriken.clone()));
        }
        let app = app
            .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
            .layer(request_timing_layer())
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(self.config.bind_adresse()).await?;
        let lokale_adresse = listener.local_addr()?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %lokale_adresse,
            max_clients = self.config.server.max_clients,
            klingel_timeout_sek = ?self.config.signaling.klingel_timeout_sek,
            metriken = self.config.observability.metriken_aktiviert,
            "Server gebunden"
        );

        Ok(LaufenderServer {
            listener,
            app,
            lokale_adresse,
            shutdown_tx,
            shutdown_rx,
            health,
            kern,
        })
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn starten(self) -> Result<()> {
        let laufend = self.binden().await?;

        let shutdown_tx = laufend.shutdown_sender();
        let health = laufend.health.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    health.herunterfahren_melden();
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden"),
            }
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        laufend.laufen().await
    }
}

/// Gebundener, noch nicht laufender Server
pub struct LaufenderServer {
    listener: TcpListener,
    app: Router,
    lokale_adresse: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    health: HealthState,
    kern: JoinHandle<()>,
}

impl LaufenderServer {
    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn lokale_adresse(&self) -> SocketAddr {
        self.lokale_adresse
    }

    /// Sender fuer das Shutdown-Signal (`true` = herunterfahren)
    pub fn shutdown_sender(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// Bedient HTTP und WebSocket bis das Shutdown-Signal kommt
    ///
    /// Offene WebSocket-Verbindungen erhalten einen Close-Frame; danach
    /// endet der Signaling-Kern, sobald alle Verbindungs-Tasks beendet sind.
    pub async fn laufen(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx;

        axum::serve(
            self.listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stopp| *stopp).await;
        })
        .await?;

        tracing::info!("HTTP-Server gestoppt");

        match tokio::time::timeout(KERN_STOPP_TIMEOUT, self.kern).await {
            Ok(Ok(())) => tracing::info!("Signaling-Kern sauber beendet"),
            Ok(Err(e)) => tracing::error!(fehler = %e, "Signaling-Kern abgestuerzt"),
            Err(_) => tracing::warn!("Signaling-Kern nach Timeout noch aktiv"),
        }

        Ok(())
    }
}
