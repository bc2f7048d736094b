//! Prediction web server
//!
//! Serves the booking form and a single prediction endpoint backed by the
//! trained model artifact.

mod api;
mod error;
mod form;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use form::{BookingForm, FormError};
pub use handlers::PREDICTION_FAILED;
pub use state::{AppState, FeatureLayout, CANONICAL_FEATURES};

use crate::config::AppConfig;
use crate::training::ModelArtifact;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl ServerConfig {
    /// Settings from the `Server` section and artifact layout; `API_HOST` and
    /// `API_PORT` override the configured address.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| config.server.host.clone()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(config.server.port),
            model_path: config.artifact_paths().model_file,
        }
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

/// Load the model artifact and build the shared state
pub fn load_state(config: &ServerConfig) -> error::Result<AppState> {
    let model = ModelArtifact::load(&config.model_path)?;
    info!(
        model = %config.model_path.display(),
        features = model.n_features(),
        trained_at = %model.trained_at.to_rfc3339(),
        "Loaded model artifact"
    );
    AppState::new(model)
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(load_state(&config)?);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Address(format!("{}:{}: {}", config.host, config.port, e)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            model_path: dir.path().join("lgbm.bin"),
        };
        assert!(matches!(load_state(&config), Err(ServerError::Model(_))));
    }
}
