use axum::{debug_handler, extract::State, Json};

use crate::{db::Participant, AppResult};

use super::Registry;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(State(registry): State<Registry>) -> AppResult<Json<Vec<Participant>>> {
    Ok(Json(registry.list().await?))
}
