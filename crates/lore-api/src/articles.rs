//! Handlers for `/articles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/articles` | `?status=<status\|any>&include_archived&category_id&tag&q&limit&offset` |
//! | `POST`   | `/articles` | Body: [`CreateBody`]; returns 201 |
//! | `GET`    | `/articles/{id}` | 404 if absent or hidden from the caller |
//! | `PATCH`  | `/articles/{id}` | Body: [`UpdateBody`] |
//! | `DELETE` | `/articles/{id}` | Admin only |
//! | `POST`   | `/articles/{id}/status` | Body: `{"status":"in_review"}` |
//! | `POST`   | `/articles/{id}/editor` | Body: `{"editor_id":null}` clears |
//! | `GET`    | `/articles/{id}/versions` | Newest first |
//! | `GET`    | `/articles/{id}/versions/{version_id}` | |
//! | `GET`    | `/articles/{id}/history` | Newest first |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use lore_core::{
  article::{Article, ArticleStatus, ArticleUpdate, NewArticle},
  history::HistoryEntry,
  store::{ArticleQuery, KnowledgeStore},
  version::ArticleVersion,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Json, Path, Query},
};

/// Statuses arrive as strings so that legacy names and unknown values get a
/// proper validation message.
fn parse_status(s: Option<&str>) -> Result<Option<ArticleStatus>, ApiError> {
  s.map(ArticleStatus::parse).transpose().map_err(ApiError::from)
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Defaults to approved; `any` disables the status filter.
  pub status:           Option<String>,
  #[serde(default)]
  pub include_archived: bool,
  pub category_id:      Option<Uuid>,
  pub tag:              Option<String>,
  /// Free text over title and body.
  pub q:                Option<String>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

impl ListParams {
  fn into_query(self) -> Result<ArticleQuery, ApiError> {
    let status = match self.status.as_deref() {
      None => Some(ArticleStatus::Approved),
      Some("any") => None,
      Some(s) => parse_status(Some(s))?,
    };
    Ok(ArticleQuery {
      status,
      include_archived: self.include_archived,
      category_id: self.category_id,
      tag: self.tag,
      text: self.q,
      limit: self.limit,
      offset: self.offset,
    })
  }
}

/// `GET /articles`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Article>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let articles = state
    .store
    .list_articles(user.actor(), params.into_query()?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(articles))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:       String,
  pub body:        String,
  pub category_id: Option<Uuid>,
  pub status:      Option<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
}

/// `POST /articles`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let mut input = NewArticle::new(body.title, body.body);
  input.category_id = body.category_id;
  input.status = parse_status(body.status.as_deref())?;
  input.tags = body.tags;

  let article = state
    .store
    .create_article(user.actor(), input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(article)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /articles/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Article>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let article = state
    .store
    .get_article(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(article))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Omitted fields are left untouched; `tags` replaces the whole set.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub title:       Option<String>,
  pub body:        Option<String>,
  pub category_id: Option<Uuid>,
  pub status:      Option<String>,
  pub tags:        Option<Vec<String>>,
}

/// `PATCH /articles/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Article>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let update = ArticleUpdate {
    title:       body.title,
    body:        body.body,
    category_id: body.category_id,
    status:      parse_status(body.status.as_deref())?,
    tags:        body.tags,
    attachments: Vec::new(),
  };
  let article = state
    .store
    .update_article(user.actor(), id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(article))
}

/// `DELETE /articles/{id}`
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
    .delete_article(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status and editor ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

/// `POST /articles/{id}/status`
pub async fn change_status<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Article>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let status = ArticleStatus::parse(&body.status)?;
  let article = state
    .store
    .change_status(user.actor(), id, status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(article))
}

#[derive(Debug, Deserialize)]
pub struct EditorBody {
  pub editor_id: Option<Uuid>,
}

/// `POST /articles/{id}/editor`
pub async fn assign_editor<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<EditorBody>,
) -> Result<Json<Article>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let article = state
    .store
    .assign_editor(user.actor(), id, body.editor_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(article))
}

// ─── Versions and history ────────────────────────────────────────────────────

/// `GET /articles/{id}/versions`
pub async fn versions<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ArticleVersion>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let versions = state
    .store
    .list_versions(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(versions))
}

/// `GET /articles/{id}/versions/{version_id}`
pub async fn version<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path((id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ArticleVersion>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let version = state
    .store
    .get_version(user.actor(), id, version_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(version))
}

/// `GET /articles/{id}/history`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let entries = state
    .store
    .list_history(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_defaults_to_approved() {
    let query = ListParams::default().into_query().unwrap();
    assert_eq!(query.status, Some(ArticleStatus::Approved));
  }

  #[test]
  fn list_accepts_any_and_legacy_names() {
    let any = ListParams { status: Some("any".into()), ..Default::default() };
    assert_eq!(any.into_query().unwrap().status, None);

    let legacy = ListParams { status: Some("em_analise".into()), ..Default::default() };
    assert_eq!(legacy.into_query().unwrap().status, Some(ArticleStatus::InReview));

    let bogus = ListParams { status: Some("published".into()), ..Default::default() };
    assert!(matches!(bogus.into_query(), Err(ApiError::BadRequest(_))));
  }
}
