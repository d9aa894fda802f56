//! Handlers for categories, tags, and the admin dashboard.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/categories` | Sorted by name |
//! | `POST`   | `/categories` | Admin; body: [`NewCategory`] |
//! | `PATCH`  | `/categories/{id}` | Admin; `"parent_id": null` moves to the top level |
//! | `DELETE` | `/categories/{id}` | Admin; articles move to `General` |
//! | `GET`    | `/tags` | |
//! | `DELETE` | `/tags/{id}` | Admin |
//! | `GET`    | `/stats` | Admin |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use lore_core::{
  category::{Category, CategoryUpdate, NewCategory, Tag},
  store::{KnowledgeStore, Stats},
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Json, Path},
};

// ─── Categories ──────────────────────────────────────────────────────────────

/// `GET /categories`
pub async fn list_categories<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<Category>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let categories = state.store.list_categories().await.map_err(ApiError::from_store)?;
  Ok(Json(categories))
}

/// `POST /categories`
pub async fn create_category<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let category = state
    .store
    .create_category(user.actor(), body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

/// `PATCH /categories/{id}`
pub async fn update_category<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<CategoryUpdate>,
) -> Result<Json<Category>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let category = state
    .store
    .update_category(user.actor(), id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(category))
}

/// `DELETE /categories/{id}`
pub async fn delete_category<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  state
    .store
    .delete_category(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Tags ────────────────────────────────────────────────────────────────────

/// `GET /tags`
pub async fn list_tags<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let tags = state.store.list_tags().await.map_err(ApiError::from_store)?;
  Ok(Json(tags))
}

/// `DELETE /tags/{id}`
pub async fn delete_tag<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  state
    .store
    .delete_tag(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// `GET /stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Stats>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let stats = state.store.stats(user.actor()).await.map_err(ApiError::from_store)?;
  Ok(Json(stats))
}
