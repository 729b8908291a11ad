use axum::{debug_handler, extract::State, http::StatusCode};

use crate::{identity::User, AppResult};

use super::Registry;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn status(
    State(registry): State<Registry>,
    User(user): User,
) -> AppResult<StatusCode> {
    registry.heartbeat(&user).await?;
    Ok(StatusCode::OK)
}
