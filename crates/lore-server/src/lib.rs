//! Wiring for the Lore server binary: configuration, store start-up, and the
//! top-level axum application.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use lore_api::{ApiConfig, AppState, DEFAULT_MAX_UPLOAD_BYTES};
use lore_core::user::{NewUser, Role};
use lore_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LORE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
  /// Directory for uploaded files. Unset keeps uploads in the database.
  #[serde(default)]
  pub upload_dir:       Option<PathBuf>,
  /// Account created on start-up if no user of that name exists yet.
  #[serde(default)]
  pub bootstrap_admin:  Option<BootstrapAdmin>,
}

fn default_max_upload_bytes() -> usize { DEFAULT_MAX_UPLOAD_BYTES }

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
  pub username:      String,
  pub email:         String,
  /// argon2 PHC string, as printed by `lore --hash-password`.
  pub password_hash: String,
}

impl ServerConfig {
  /// Load from an optional TOML file overlaid with `LORE_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LORE").separator("__"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.upload_dir = cfg.upload_dir.as_deref().map(expand_tilde);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  fn api_config(&self) -> ApiConfig {
    ApiConfig {
      max_upload_bytes: self.max_upload_bytes,
      upload_dir:       self.upload_dir.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Start-up ────────────────────────────────────────────────────────────────

/// Open the store and create the bootstrap admin if one is configured.
pub async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  if let Some(admin) = &cfg.bootstrap_admin {
    bootstrap(&store, admin).await?;
  }
  Ok(store)
}

async fn bootstrap(store: &SqliteStore, admin: &BootstrapAdmin) -> anyhow::Result<()> {
  let created = store
    .bootstrap_admin(NewUser {
      username:      admin.username.clone(),
      email:         admin.email.clone(),
      full_name:     None,
      password_hash: admin.password_hash.clone(),
      role:          Role::Admin,
    })
    .await
    .context("failed to create bootstrap admin")?;

  match created {
    Some(user) => tracing::info!(username = %user.username, "created bootstrap admin"),
    None => tracing::debug!(username = %admin.username, "bootstrap admin already present"),
  }
  Ok(())
}

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app(store: SqliteStore, cfg: &ServerConfig) -> Router {
  let state = AppState::new(Arc::new(store), cfg.api_config());
  Router::new()
    .nest("/api", lore_api::router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use config::{File, FileFormat};
  use tower::ServiceExt as _;

  use super::*;

  const CONFIG: &str = r#"
    host = "127.0.0.1"
    port = 8080
    store_path = ":memory:"

    [bootstrap_admin]
    username = "root"
    email = "root@example.com"
    password_hash = "PLACEHOLDER"
  "#;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  fn with_password(password: &str) -> ServerConfig {
    let mut cfg = parse(CONFIG);
    let hash = lore_api::auth::hash_password(password).unwrap();
    if let Some(admin) = cfg.bootstrap_admin.as_mut() {
      admin.password_hash = hash;
    }
    cfg
  }

  #[test]
  fn optional_settings_have_defaults() {
    let cfg = parse("host = \"0.0.0.0\"\nport = 80\nstore_path = \"lore.db\"\n");
    assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    assert!(cfg.upload_dir.is_none());
    assert!(cfg.bootstrap_admin.is_none());
    assert_eq!(cfg.address(), "0.0.0.0:80");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/lore.db")), PathBuf::from(home).join("lore.db"));
    assert_eq!(expand_tilde(Path::new("/var/lore.db")), PathBuf::from("/var/lore.db"));
  }

  #[tokio::test]
  async fn bootstrap_admin_can_sign_in_under_api_prefix() {
    let cfg = with_password("s3cret");
    let store = open_store(&cfg).await.unwrap();
    // A second start-up leaves the existing account alone.
    bootstrap(&store, cfg.bootstrap_admin.as_ref().unwrap()).await.unwrap();

    let req = Request::builder()
      .uri("/api/me")
      .header(header::AUTHORIZATION, format!("Basic {}", B64.encode("root:s3cret")))
      .body(Body::empty())
      .unwrap();
    let resp = app(store, &cfg).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
