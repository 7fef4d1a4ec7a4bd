//! Live sessions keyed by id.

use lifeline_shared::Location;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::facilities::FacilityLookup;
use crate::merger::GuidanceMerger;
use crate::service::GuidanceService;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Session limit reached ({0})")]
    Full(usize),
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, GuidanceService>>,
    merger: Arc<GuidanceMerger>,
    facilities: Option<Arc<dyn FacilityLookup>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(
        merger: Arc<GuidanceMerger>,
        facilities: Option<Arc<dyn FacilityLookup>>,
        max_sessions: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            merger,
            facilities,
            max_sessions,
        }
    }

    pub fn merger(&self) -> &Arc<GuidanceMerger> {
        &self.merger
    }

    pub fn facilities(&self) -> Option<&Arc<dyn FacilityLookup>> {
        self.facilities.as_ref()
    }

    pub async fn create(&self, location: Option<Location>) -> Result<(Uuid, GuidanceService), RegistryError> {
        if self.sessions.read().await.len() >= self.max_sessions {
            return Err(RegistryError::Full(self.max_sessions));
        }

        let service = GuidanceService::with_location(
            Arc::clone(&self.merger),
            self.facilities.clone(),
            location,
        )
        .await;
        let id = Uuid::new_v4();

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(RegistryError::Full(self.max_sessions));
        }
        sessions.insert(id, service.clone());
        info!("Session {} created ({} live)", id, sessions.len());
        Ok((id, service))
    }

    pub async fn get(&self, id: &Uuid) -> Option<GuidanceService> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!("Session {} removed", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle longer than `ttl`. Returns how many were dropped.
    pub async fn prune_idle(&self, ttl: Duration) -> usize {
        let snapshot: Vec<(Uuid, GuidanceService)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, service) in snapshot {
            if service.idle_for().await > ttl {
                expired.push(id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            sessions.remove(id);
        }
        info!("Pruned {} idle sessions ({} live)", expired.len(), sessions.len());
        expired.len()
    }
}
