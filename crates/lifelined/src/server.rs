//! HTTP server for lifelined

use anyhow::Result;
use axum::Router;
use lifeline_shared::{EmergencyContacts, TriageEngine};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::emergency_log::{EmergencyLogger, JsonlEmergencyLog, MemoryEmergencyLog};
use crate::enhancer::{GuidanceEnhancer, LlmEnhancer};
use crate::facilities::{FacilityLookup, OverpassLookup};
use crate::llm_client::HttpLlmClient;
use crate::merger::GuidanceMerger;
use crate::registry::SessionRegistry;
use crate::routes;

/// Request bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Upper bound for a request, above the LLM and Overpass timeouts
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Application state shared across handlers
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            start_time: Instant::now(),
        }
    }

    /// Wire collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let contacts: EmergencyContacts = config.contacts.clone();

        let enhancer: Option<Arc<dyn GuidanceEnhancer>> = if config.llm.enabled {
            let client = HttpLlmClient::new(config.llm.clone())?;
            info!("  Enhancer: {} at {}", config.llm.model, config.llm.endpoint);
            Some(Arc::new(LlmEnhancer::new(Arc::new(client), contacts.clone())))
        } else {
            info!("  Enhancer: disabled, local guidance only");
            None
        };

        let logger: Arc<dyn EmergencyLogger> = if config.emergency_log.in_memory {
            info!("  Emergency log: in memory");
            Arc::new(MemoryEmergencyLog::new())
        } else {
            info!("  Emergency log: {}", config.emergency_log.path.display());
            Arc::new(JsonlEmergencyLog::new(
                &config.emergency_log.path,
                config.emergency_log.max_entries,
            ))
        };

        let facilities: Option<Arc<dyn FacilityLookup>> = if config.facilities.enabled {
            info!("  Facilities: {}", config.facilities.overpass_url);
            Some(Arc::new(OverpassLookup::new(config.facilities.clone())?))
        } else {
            info!("  Facilities: disabled");
            None
        };

        let merger = GuidanceMerger::new(TriageEngine::new(contacts), enhancer, logger);
        let registry = SessionRegistry::new(
            Arc::new(merger),
            facilities,
            config.daemon.max_sessions,
        );
        Ok(Self::new(registry))
    }
}

/// Router with all routes and layers
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::session_routes())
        .merge(routes::first_aid_routes())
        .merge(routes::emergency_routes())
        .merge(routes::places_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: Arc<AppState>, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

/// Periodically drop idle sessions
pub fn spawn_pruner(registry: Arc<SessionRegistry>, interval: Duration, ttl: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            registry.prune_idle(ttl).await;
        }
    })
}
