pub mod clock;
pub mod lifecycle;
pub mod session;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{roster::RosterProvider, session_store::SessionStore, storage::StorageResult},
    error::ServiceError,
    state::{clock::ClockController, session::SessionRuntime},
};

pub use self::sse::SseHub;

/// Cheaply clonable handle to the shared application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the persistence handle, the registry of
/// live session runtimes, the countdown task registry, and the SSE hub.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn SessionStore>,
    roster: Arc<dyn RosterProvider>,
    sessions: DashMap<Uuid, Arc<RwLock<SessionRuntime>>>,
    clock: ClockController,
    sse: SseHub,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        roster: Arc<dyn RosterProvider>,
    ) -> SharedState {
        let sse = SseHub::new(config.sse_capacity);
        Arc::new(Self {
            config,
            store,
            roster,
            sessions: DashMap::new(),
            clock: ClockController::new(),
            sse,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the persistence backend.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Handle to the read-only roster collaborator.
    pub fn roster(&self) -> Arc<dyn RosterProvider> {
        self.roster.clone()
    }

    /// Countdown task registry.
    pub fn clock(&self) -> &ClockController {
        &self.clock
    }

    /// Broadcast hub used for the snapshot SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Register a freshly created session runtime.
    pub fn insert_runtime(&self, runtime: SessionRuntime) -> Arc<RwLock<SessionRuntime>> {
        let id = runtime.session.id;
        let handle = Arc::new(RwLock::new(runtime));
        self.sessions.insert(id, handle.clone());
        handle
    }

    /// Live runtime for a session, if it is already resident.
    pub fn runtime(&self, session_id: Uuid) -> Option<Arc<RwLock<SessionRuntime>>> {
        self.sessions.get(&session_id).map(|entry| entry.clone())
    }

    /// Live runtime for a session, hydrating it from the store on first use.
    pub async fn load_runtime(
        &self,
        session_id: Uuid,
    ) -> Result<Arc<RwLock<SessionRuntime>>, ServiceError> {
        if let Some(handle) = self.runtime(session_id) {
            return Ok(handle);
        }

        let Some(entity) = self.store.find_session(session_id).await? else {
            return Err(ServiceError::NotFound(format!(
                "session `{session_id}` not found"
            )));
        };
        let lineup = self.store.find_lineup(session_id).await?;

        // Two tasks racing the first hydration both build the same runtime;
        // the entry call keeps only one.
        let handle = self
            .sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(RwLock::new(SessionRuntime::from_entities(entity, lineup))))
            .clone();
        Ok(handle)
    }

    /// Persist the session row and lineup rows for a runtime.
    pub async fn persist_runtime(&self, runtime: &SessionRuntime) -> StorageResult<()> {
        self.store.save_session(runtime.to_entity()).await?;
        self.store
            .replace_lineup(runtime.session.id, runtime.lineup_entities())
            .await
    }
}
