use axum::{extract::State, Extension, Json};
use pantry_menu::{build_prompt, LlmClient, MenuOptions, MenuRequest, GENERATION_FAILED_TEXT};
use pantry_storage::InventoryStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::session::SessionId;
use crate::state::{AppState, Backends};

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub model: String,
    pub menu: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentMenu {
    pub menu: Option<String>,
}

pub async fn options<B: Backends>(State(state): State<AppState<B>>) -> Json<MenuOptions> {
    Json(state.menu.options())
}

pub async fn suggest<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
    ApiJson(request): ApiJson<MenuRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    let llm = state
        .llm
        .clone()
        .ok_or(ApiError::NotConfigured("Menu suggestion (GOOGLE_API_KEY)"))?;

    let model = state
        .menu
        .resolve(request.model.as_deref())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unknown model '{}'",
                request.model.as_deref().unwrap_or_default()
            ))
        })?
        .to_string();

    let items = state.store.list().await?;
    if items.is_empty() {
        return Err(ApiError::EmptyInventory);
    }

    let prompt = build_prompt(&request, &items);
    tracing::info!(%model, ingredients = items.len(), "Requesting menu suggestion");

    match llm.generate(&model, &prompt).await {
        Ok(menu) => {
            let stored = menu.clone();
            state
                .sessions
                .update(session, |s| s.suggested_menu = Some(stored))
                .await;
            Ok(Json(Suggestion { model, menu }))
        }
        Err(e) => {
            tracing::error!(%model, error = %e, "Menu generation failed");
            state
                .sessions
                .update(session, |s| {
                    s.suggested_menu = Some(GENERATION_FAILED_TEXT.to_string())
                })
                .await;
            Err(ApiError::Upstream(format!("{GENERATION_FAILED_TEXT} ({e})")))
        }
    }
}

pub async fn current<B: Backends>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<SessionId>,
) -> Json<CurrentMenu> {
    Json(CurrentMenu {
        menu: state.sessions.get(session).await.suggested_menu,
    })
}
