mod join;
mod list;
mod status;

use axum::{routing::{get, post}, Router};

use crate::{clock, db::{MessageType, Participant, Store, BROADCAST}, sanitize, AppError, AppResult, AppState};

pub const ENTERED: &str = "entered the room";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/participants", get(list::list).post(join::join))
        .route("/status", post(status::status))
}

/// Who is in the room and when they were last heard from.
#[derive(Clone)]
pub struct Registry {
    store: Store,
}

impl Registry {
    pub fn new(store: Store) -> Registry {
        Registry { store }
    }

    /// Adds `raw_name` to the room and announces it.
    ///
    /// The participant insert and the entry notice are two separate writes: a reader can see the
    /// participant before its entry notice, and a failed notice does not undo the registration.
    pub async fn register(&self, raw_name: &str) -> AppResult<Participant> {
        let name = sanitize::clean(raw_name);
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }

        if self.store.find_participant(&name).await?.is_some() {
            return Err(AppError::NameTaken);
        }

        let now = clock::now_ms();
        let participant = match self.store.insert_participant(&name, now).await {
            Ok(participant) => participant,
            // lost a race against a concurrent registration of the same name
            Err(err) if err.as_database_error().is_some_and(|e| e.is_unique_violation()) => {
                return Err(AppError::NameTaken);
            }
            Err(err) => return Err(err.into()),
        };

        self.store
            .insert_message(&name, BROADCAST, ENTERED, MessageType::Status, now)
            .await?;

        tracing::info!(name = %participant.name, "participant joined");
        Ok(participant)
    }

    /// `name` is an identity already cleaned by the `User` extractor.
    pub async fn heartbeat(&self, name: &str) -> AppResult<()> {
        if !self.store.touch_participant(name, clock::now_ms()).await? {
            tracing::debug!(%name, "heartbeat from unknown participant");
            return Err(AppError::not_found("participant"));
        }
        Ok(())
    }

    pub async fn list(&self) -> AppResult<Vec<Participant>> {
        Ok(self.store.list_participants().await?)
    }
}
