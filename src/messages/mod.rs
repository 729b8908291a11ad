mod edit;
mod list;
mod send;

use axum::{routing::{get, put}, Router};
use serde::Deserialize;

use crate::{clock, db::{Message, MessageType, Store}, sanitize, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list::list).post(send::send))
        .route("/messages/{id}", put(edit::update).delete(edit::remove))
}

/// Body shared by `POST /messages` and `PUT /messages/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    pub to: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Cleaned and checked client input for a message.
struct Draft {
    to: String,
    text: String,
    kind: MessageType,
}

impl Draft {
    fn parse(to: &str, text: &str, kind: &str) -> AppResult<Draft> {
        let to = sanitize::clean(to);
        let text = sanitize::clean(text);
        let kind = sanitize::clean(kind);

        if to.is_empty() {
            return Err(AppError::validation("to must not be empty"));
        }
        if text.is_empty() {
            return Err(AppError::validation("text must not be empty"));
        }
        let kind = MessageType::from_client(&kind)?;

        Ok(Draft { to, text, kind })
    }
}

/// Message access with the visibility and ownership rules applied.
///
/// Sender, requester and user names arrive already cleaned by the `User` extractor; only the
/// message fields are cleaned here.
#[derive(Clone)]
pub struct MessageStore {
    store: Store,
}

impl MessageStore {
    pub fn new(store: Store) -> MessageStore {
        MessageStore { store }
    }

    pub async fn send(&self, from: &str, to: &str, text: &str, kind: &str) -> AppResult<Message> {
        let draft = Draft::parse(to, text, kind)?;
        self.require_active(from).await?;

        let now = clock::now_ms();
        let message = self.store
            .insert_message(from, &draft.to, &draft.text, draft.kind, now)
            .await?;

        // sending counts as a sign of life; a concurrent reap may already have removed the sender
        self.store.touch_participant(from, now).await?;

        Ok(message)
    }

    /// Oldest first. With `limit`, the most recent `limit` visible messages.
    pub async fn list_for(&self, user: &str, limit: Option<u32>) -> AppResult<Vec<Message>> {
        if limit == Some(0) {
            return Err(AppError::validation("limit must be a positive integer"));
        }
        Ok(self.store.list_visible_messages(user, limit).await?)
    }

    pub async fn remove(&self, id: &str, requester: &str) -> AppResult<()> {
        self.owned_by(id, requester).await?;

        if !self.store.delete_message(id).await? {
            return Err(AppError::not_found("message"));
        }
        tracing::debug!(%id, %requester, "message deleted");
        Ok(())
    }

    pub async fn update(&self, id: &str, requester: &str, to: &str, text: &str, kind: &str) -> AppResult<()> {
        let draft = Draft::parse(to, text, kind)?;
        self.require_active(requester).await?;
        self.owned_by(id, requester).await?;

        if !self.store.update_message(id, &draft.to, &draft.text, draft.kind).await? {
            return Err(AppError::not_found("message"));
        }
        Ok(())
    }

    async fn require_active(&self, name: &str) -> AppResult<()> {
        match self.store.find_participant(name).await? {
            Some(_) => Ok(()),
            None => Err(AppError::UnknownSender),
        }
    }

    async fn owned_by(&self, id: &str, requester: &str) -> AppResult<Message> {
        let message = self.store
            .find_message(id)
            .await?
            .ok_or_else(|| AppError::not_found("message"))?;

        if message.from != requester {
            return Err(AppError::Forbidden);
        }
        Ok(message)
    }
}
