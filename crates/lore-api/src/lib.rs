//! JSON REST API for Lore.
//!
//! Exposes an axum [`Router`] backed by any [`KnowledgeStore`]. Every route
//! except `/register` requires HTTP Basic credentials of an active user.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lore_api::router(state))
//! ```

pub mod articles;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod files;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post, put},
};
use lore_core::store::KnowledgeStore;

pub use error::ApiError;

/// Largest upload accepted when nothing else is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// API-level settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub max_upload_bytes: usize,
  /// Where uploads are written. `None` keeps file bytes in the store.
  pub upload_dir:       Option<PathBuf>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES, upload_dir: None }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig) -> Self {
    Self { store, config: Arc::new(config) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), config: self.config.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: KnowledgeStore + 'static,
{
  let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  Router::new()
    // Articles
    .route("/articles", get(articles::list::<S>).post(articles::create::<S>))
    .route(
      "/articles/{id}",
      get(articles::get_one::<S>)
        .patch(articles::update::<S>)
        .delete(articles::delete::<S>),
    )
    .route("/articles/{id}/status", post(articles::change_status::<S>))
    .route("/articles/{id}/editor", post(articles::assign_editor::<S>))
    .route("/articles/{id}/versions", get(articles::versions::<S>))
    .route("/articles/{id}/versions/{version_id}", get(articles::version::<S>))
    .route("/articles/{id}/history", get(articles::history::<S>))
    .route(
      "/articles/{id}/files",
      get(files::list_links::<S>)
        .post(files::link::<S>)
        .delete(files::unlink::<S>),
    )
    // Files
    .route(
      "/files",
      get(files::list::<S>).post(files::upload::<S>).layer(upload_limit),
    )
    .route("/files/{id}", get(files::get_one::<S>).delete(files::delete::<S>))
    .route("/files/{id}/content", get(files::content::<S>))
    // Catalogue
    .route(
      "/categories",
      get(catalog::list_categories::<S>).post(catalog::create_category::<S>),
    )
    .route(
      "/categories/{id}",
      patch(catalog::update_category::<S>).delete(catalog::delete_category::<S>),
    )
    .route("/tags", get(catalog::list_tags::<S>))
    .route("/tags/{id}", axum::routing::delete(catalog::delete_tag::<S>))
    .route("/stats", get(catalog::stats::<S>))
    // Users
    .route("/register", post(users::register::<S>))
    .route("/me", get(users::me::<S>))
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route(
      "/users/{id}",
      patch(users::update::<S>).delete(users::delete::<S>),
    )
    .route("/users/{id}/password", put(users::set_password::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
