pub mod appresult;
pub mod clock;
pub mod config;
pub mod db;
pub mod identity;
pub mod messages;
pub mod participants;
pub mod reaper;
pub mod sanitize;

use axum::{extract::FromRef, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
use db::Store;
use messages::MessageStore;
use participants::Registry;
use reaper::{Reaper, ReaperHandle};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub registry: Registry,
    pub messages: MessageStore,
}

impl AppState {
    pub fn new(store: Store) -> AppState {
        AppState {
            registry: Registry::new(store.clone()),
            messages: MessageStore::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(participants::router())
        .merge(messages::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Everything the running server owns: the store handle, the request state and the reaper.
pub struct App {
    store: Store,
    state: AppState,
    reaper: ReaperHandle,
}

impl App {
    pub async fn start(config: &Config) -> anyhow::Result<App> {
        let store = Store::connect(&config.database_url, config.max_connections).await?;
        Ok(App::with_store(store, config))
    }

    /// Must be called from within a tokio runtime; spawns the reaper.
    pub fn with_store(store: Store, config: &Config) -> App {
        let reaper = Reaper::new(store.clone(), config.idle_threshold).spawn(config.reap_interval);
        tracing::info!(
            interval = ?config.reap_interval,
            threshold = ?config.idle_threshold,
            "reaper started"
        );

        App {
            state: AppState::new(store.clone()),
            store,
            reaper,
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Stops the reaper, then releases the store.
    pub async fn shutdown(self) {
        self.reaper.shutdown().await;
        self.store.close().await;
        tracing::info!("shut down");
    }
}
