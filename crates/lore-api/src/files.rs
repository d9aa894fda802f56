//! Handlers for the file catalogue and article attachments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/files` | Newest upload first |
//! | `POST`   | `/files?filename=<name>&description=<text>` | Raw body; `Content-Type` is the MIME type |
//! | `GET`    | `/files/{id}` | Metadata |
//! | `DELETE` | `/files/{id}` | Admin or uploader |
//! | `GET`    | `/files/{id}/content` | The bytes; images and PDFs are served inline |
//! | `GET`    | `/articles/{id}/files` | Links of a visible article |
//! | `POST`   | `/articles/{id}/files` | Body: `{"file_id":…, "reference_text":…}` |
//! | `DELETE` | `/articles/{id}/files?file_id=<id>` | No-op when not linked |

use std::path::PathBuf;

use axum::{
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use lore_core::{
  file::{ArticleFile, File, FileContent, NewFile, StorageLocation, storage_name},
  permission,
  store::KnowledgeStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  extract::{Json, Path, Query},
};

const FALLBACK_MIME: &str = "application/octet-stream";

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// `GET /files`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<File>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let files = state.store.list_files().await.map_err(ApiError::from_store)?;
  Ok(Json(files))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename:    String,
  pub description: Option<String>,
}

/// `POST /files`
///
/// With an upload directory configured the bytes are written there first and
/// the record points at them; otherwise they are stored in the database.
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let actor = user.actor();
  if !permission::can_upload(&actor) {
    return Err(ApiError::Forbidden("only editors and admins may upload files".into()));
  }

  let mime_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or(FALLBACK_MIME)
    .to_owned();

  let mut input = NewFile::inline(params.filename, mime_type, body.to_vec());
  input.description = params.description;

  let written = match &state.config.upload_dir {
    Some(dir) => {
      let path = write_to_disk(dir, &input).await?;
      input.content = FileContent::OnDisk { path: path.clone(), size: body.len() as u64 };
      Some(path)
    }
    None => None,
  };

  match state.store.upload_file(actor, input).await {
    Ok(file) => Ok((StatusCode::CREATED, Json(file))),
    Err(err) => {
      if let Some(path) = written {
        remove_quietly(&path).await;
      }
      Err(ApiError::from_store(err))
    }
  }
}

/// Validate `input` and write its bytes under `dir` with a fresh storage name.
async fn write_to_disk(dir: &std::path::Path, input: &NewFile) -> Result<PathBuf, ApiError> {
  let (_, ext) = input.checked_name()?;
  let FileContent::Inline(bytes) = &input.content else {
    return Err(ApiError::BadRequest("upload has no content".into()));
  };
  if bytes.is_empty() {
    return Err(ApiError::BadRequest("upload is empty".into()));
  }

  let path = dir.join(storage_name(&ext));
  tokio::fs::create_dir_all(dir)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  tokio::fs::write(&path, bytes)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(path)
}

async fn remove_quietly(path: &std::path::Path) {
  if let Err(e) = tokio::fs::remove_file(path).await {
    tracing::warn!(path = %path.display(), error = %e, "could not remove stored file");
  }
}

async fn require_file<S>(state: &AppState<S>, id: Uuid) -> Result<File, ApiError>
where
  S: KnowledgeStore + 'static,
{
  state
    .store
    .get_file(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("file {id} not found")))
}

/// `GET /files/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<File>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  Ok(Json(require_file(&state, id).await?))
}

/// `DELETE /files/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let file = state
    .store
    .delete_file(user.actor(), id)
    .await
    .map_err(ApiError::from_store)?;
  if let StorageLocation::Filesystem { path } = &file.location {
    remove_quietly(path).await;
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /files/{id}/content`
pub async fn content<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let file = require_file(&state, id).await?;
  let bytes = match &file.location {
    StorageLocation::Database => state
      .store
      .file_content(id)
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| ApiError::NotFound(format!("content of file {id} not found")))?,
    StorageLocation::Filesystem { path } => match tokio::fs::read(path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(ApiError::NotFound(format!("content of file {id} not found")));
      }
      Err(e) => return Err(ApiError::Store(Box::new(e))),
    },
  };

  let disposition = if file.is_image() || file.is_pdf() { "inline" } else { "attachment" };
  let headers = [
    (header::CONTENT_TYPE, file.mime_type.clone()),
    (
      header::CONTENT_DISPOSITION,
      format!("{disposition}; filename=\"{}\"", file.original_filename),
    ),
  ];
  Ok((headers, bytes))
}

// ─── Article links ───────────────────────────────────────────────────────────

/// `GET /articles/{id}/files`
pub async fn list_links<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(article_id): Path<Uuid>,
) -> Result<Json<Vec<ArticleFile>>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let links = state
    .store
    .list_article_files(user.actor(), article_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub file_id:        Uuid,
  pub reference_text: Option<String>,
}

/// `POST /articles/{id}/files`
pub async fn link<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(article_id): Path<Uuid>,
  Json(body): Json<LinkBody>,
) -> Result<Json<ArticleFile>, ApiError>
where
  S: KnowledgeStore + 'static,
{
  let link = state
    .store
    .link_file(user.actor(), article_id, body.file_id, body.reference_text)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(link))
}

#[derive(Debug, Deserialize)]
pub struct UnlinkParams {
  pub file_id: Uuid,
}

/// `DELETE /articles/{id}/files?file_id=<id>`
pub async fn unlink<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(article_id): Path<Uuid>,
  Query(params): Query<UnlinkParams>,
) -> Result<StatusCode, ApiError>
where
  S: KnowledgeStore + 'static,
{
  state
    .store
    .unlink_file(user.actor(), article_id, params.file_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
