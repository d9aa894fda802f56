//! Handlers for accounts.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/register` | Unauthenticated; always creates a plain user |
//! | `GET`    | `/me` | The authenticated account |
//! | `GET`    | `/users` | Admin |
//! | `POST`   | `/users` | Admin; may pick the role |
//! | `PATCH`  | `/users/{id}` | Admin; body: [`UserUpdate`] |
//! | `DELETE` | `/users/{id}` | Admin; never self |
//! | `PUT`    | `/users/{id}/password` | Self or admin |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use lore_core::{
  store::KnowledgeStore,
  user::{Actor, NewUser, Role, User, UserUpdate},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentUser, hash_password},
  error::ApiError,
  extract::{Json, Path},
};

#[derive(Debug, Deserialize)]
pub struct UserBody {
  pub username:  String,
  pub email:     String,
  pub full_name: Option<String>,
  pub password:  String,
  /// Ignored unless an admin is creating the account.
  #[serde(default)]
  pub role:      Role,
}

impl UserBody {
  fn into_new_user(self) -> Result<NewUser, ApiError> {
    Ok(NewUser {
      password_hash: hash_password(&self.password)?,
      username:      self.username,
      email:         self.email,
      full_name:     self.full_name,
      role:          self.role,
    })
  }
}

async fn create_as<S>(
  state: &AppState<S>,
  actor: Option<Actor>,
  body: UserBody,
) -> Result<(StatusCode, Json<User>), ApiError>
where
  S: KnowledgeStore + 'static,
{
  let user = state
    .store
    .create_user(actor, body.into_new_user()?)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<UserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  create_as(&state, None, body).await
}

/// `GET /me`
pub async fn me<S>(user: CurrentUser) -> Json<User>
where
  S: KnowledgeStore + 'static,
{
  Json(user.0)
}

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let users = state.store.list_users(user.actor()).await.map_err(ApiError::from_store)?;
  Ok(Json(users))
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<UserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  if !user.actor().is_admin() {
    return Err(ApiError::Forbidden("only admins may create accounts".into()));
  }
  create_as(&state, Some(user.actor()), body).await
}

/// `PATCH /users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UserUpdate>,
) -> Result<Json<User>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let updated = state
    .store
    .update_user(user.actor(), id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(updated))
}

/// `DELETE /users/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  state
    .store
    .delete_user(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
  pub password: String,
}

/// `PUT /users/{id}/password`
pub async fn set_password<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<PasswordBody>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let hash = hash_password(&body.password)?;
  state
    .store
    .set_password_hash(user.actor(), id, hash)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
