use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use lore_core::user::{NewUser, Role};
use lore_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;
use crate::auth::hash_password;

const ADMIN: (&str, &str) = ("admin", "admin-pass");
const EDITOR: (&str, &str) = ("eva", "editor-pass");
const READER: (&str, &str) = ("rui", "reader-pass");

fn basic((user, pass): (&str, &str)) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

async fn make_state(config: ApiConfig) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .bootstrap_admin(NewUser {
      username:      ADMIN.0.into(),
      email:         "admin@example.com".into(),
      full_name:     None,
      password_hash: hash_password(ADMIN.1).unwrap(),
      role:          Role::Admin,
    })
    .await
    .unwrap();
  AppState::new(Arc::new(store), config)
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  creds: Option<(&str, &str)>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(creds) = creds {
    builder = builder.header(header::AUTHORIZATION, basic(creds));
  }
  let body = match body {
    Some(value) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(value.to_string())
    }
    None => Body::empty(),
  };
  router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_of(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

/// Admin, one editor created by the admin, and one self-registered reader.
async fn populated(config: ApiConfig) -> AppState<SqliteStore> {
  let state = make_state(config).await;

  let resp = send(
    &state,
    "POST",
    "/users",
    Some(ADMIN),
    Some(json!({
      "username": EDITOR.0, "email": "eva@example.com",
      "password": EDITOR.1, "role": "editor",
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = send(
    &state,
    "POST",
    "/register",
    None,
    Some(json!({ "username": READER.0, "email": "rui@example.com", "password": READER.1 })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  state
}

async fn create_article(state: &AppState<SqliteStore>, title: &str) -> String {
  let resp = send(
    state,
    "POST",
    "/articles",
    Some(EDITOR),
    Some(json!({ "title": title, "body": "first text", "tags": ["hr"] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_of(resp).await["article_id"].as_str().unwrap().to_owned()
}

// ── Authentication ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_wrong_credentials_are_challenged() {
  let state = make_state(ApiConfig::default()).await;

  let resp = send(&state, "GET", "/articles", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let resp = send(&state, "GET", "/articles", Some((ADMIN.0, "nope")), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = send(&state, "GET", "/me", Some(ADMIN), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let me = json_of(resp).await;
  assert_eq!(me["role"], "admin");
  assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn registration_cannot_grant_a_role() {
  let state = make_state(ApiConfig::default()).await;
  let resp = send(
    &state,
    "POST",
    "/register",
    None,
    Some(json!({
      "username": "mallory", "email": "m@example.com",
      "password": "pw", "role": "admin",
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(json_of(resp).await["role"], "user");

  let resp = send(&state, "GET", "/users", Some(("mallory", "pw")), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_users_cannot_sign_in() {
  let state = populated(ApiConfig::default()).await;
  let me = json_of(send(&state, "GET", "/me", Some(READER), None).await).await;
  let id = me["user_id"].as_str().unwrap();

  let resp = send(
    &state,
    "PATCH",
    &format!("/users/{id}"),
    Some(ADMIN),
    Some(json!({ "active": false })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(&state, "GET", "/me", Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_replaces_old_credentials() {
  let state = populated(ApiConfig::default()).await;
  let me = json_of(send(&state, "GET", "/me", Some(READER), None).await).await;
  let id = me["user_id"].as_str().unwrap();

  let resp = send(
    &state,
    "PUT",
    &format!("/users/{id}/password"),
    Some(READER),
    Some(json!({ "password": "fresh" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(&state, "GET", "/me", Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let resp = send(&state, "GET", "/me", Some((READER.0, "fresh")), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

// ── Articles ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn drafts_stay_hidden_until_approved() {
  let state = populated(ApiConfig::default()).await;
  let id = create_article(&state, "Leave policy").await;

  let resp = send(&state, "GET", &format!("/articles/{id}"), Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = send(
    &state,
    "POST",
    &format!("/articles/{id}/status"),
    Some(EDITOR),
    Some(json!({ "status": "homologado" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_of(resp).await["status"], "approved");

  let resp = send(&state, "GET", &format!("/articles/{id}"), Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let list = json_of(send(&state, "GET", "/articles?tag=hr", Some(READER), None).await).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn edits_produce_versions_and_history() {
  let state = populated(ApiConfig::default()).await;
  let id = create_article(&state, "Expenses").await;

  let resp = send(
    &state,
    "PATCH",
    &format!("/articles/{id}"),
    Some(EDITOR),
    Some(json!({ "body": "second text", "status": "in_review" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let versions =
    json_of(send(&state, "GET", &format!("/articles/{id}/versions"), Some(EDITOR), None).await)
      .await;
  let versions = versions.as_array().unwrap();
  assert_eq!(versions.len(), 2);
  assert_eq!(versions[0]["version_number"], 2);
  assert_eq!(versions[0]["body"], "second text");

  let first = versions[1]["version_id"].as_str().unwrap();
  let resp = send(
    &state,
    "GET",
    &format!("/articles/{id}/versions/{first}"),
    Some(EDITOR),
    None,
  )
  .await;
  assert_eq!(json_of(resp).await["body"], "first text");

  let history =
    json_of(send(&state, "GET", &format!("/articles/{id}/history"), Some(EDITOR), None).await)
      .await;
  let actions: Vec<_> =
    history.as_array().unwrap().iter().map(|e| e["action"].clone()).collect();
  assert_eq!(actions, vec![json!("status_change"), json!("create")]);

  let resp = send(&state, "GET", &format!("/articles/{id}/history"), Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_input_is_a_bad_request() {
  let state = populated(ApiConfig::default()).await;

  let resp = send(
    &state,
    "POST",
    "/articles",
    Some(EDITOR),
    Some(json!({ "title": "  ", "body": "x" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&state, "GET", "/articles?status=published", Some(EDITOR), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(
    &state,
    "POST",
    "/articles",
    Some(READER),
    Some(json!({ "title": "Mine", "body": "x" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
  let state = populated(ApiConfig::default()).await;

  let resp = send(&state, "POST", "/articles", Some(EDITOR), Some(json!({ "title": "No body" })))
    .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(json_of(resp).await["error"].as_str().unwrap().contains("body"));

  let resp = send(&state, "GET", "/articles/not-a-uuid", Some(EDITOR), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(json_of(resp).await["error"].is_string());

  let resp = send(&state, "GET", "/articles?limit=many", Some(EDITOR), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(json_of(resp).await["error"].is_string());
}

#[tokio::test]
async fn same_status_change_is_a_bad_request() {
  let state = populated(ApiConfig::default()).await;
  let id = create_article(&state, "Unchanged").await;

  let resp = send(
    &state,
    "POST",
    &format!("/articles/{id}/status"),
    Some(EDITOR),
    Some(json!({ "status": "draft" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Catalogue ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn general_category_is_permanent() {
  let state = populated(ApiConfig::default()).await;
  let categories = json_of(send(&state, "GET", "/categories", Some(READER), None).await).await;
  let general = categories
    .as_array()
    .unwrap()
    .iter()
    .find(|c| c["name"] == "General")
    .unwrap()["category_id"]
    .as_str()
    .unwrap()
    .to_owned();

  let resp = send(&state, "DELETE", &format!("/categories/{general}"), Some(ADMIN), None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(
    &state,
    "POST",
    "/categories",
    Some(EDITOR),
    Some(json!({ "name": "Finance" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "GET", "/stats", Some(ADMIN), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_of(resp).await["users"], 3);
}

// ── Files ─────────────────────────────────────────────────────────────────

async fn upload(state: &AppState<SqliteStore>, name: &str, bytes: &'static [u8]) -> Response {
  let req = Request::builder()
    .method("POST")
    .uri(format!("/files?filename={name}&description=scan"))
    .header(header::AUTHORIZATION, basic(EDITOR))
    .header(header::CONTENT_TYPE, "application/pdf")
    .body(Body::from(bytes))
    .unwrap();
  router(state.clone()).oneshot(req).await.unwrap()
}

#[tokio::test]
async fn uploaded_files_link_to_articles() {
  let state = populated(ApiConfig::default()).await;
  let article = create_article(&state, "Travel").await;

  let resp = upload(&state, "form.pdf", b"%PDF-1.4").await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let file = json_of(resp).await;
  assert_eq!(file["location"]["kind"], "database");
  let file_id = file["file_id"].as_str().unwrap().to_owned();

  let resp = send(&state, "GET", &format!("/files/{file_id}/content"), Some(READER), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"%PDF-1.4");

  for text in ["see form", "see the form"] {
    let resp = send(
      &state,
      "POST",
      &format!("/articles/{article}/files"),
      Some(EDITOR),
      Some(json!({ "file_id": file_id, "reference_text": text })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }
  let links =
    json_of(send(&state, "GET", &format!("/articles/{article}/files"), Some(EDITOR), None).await)
      .await;
  let links = links.as_array().unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0]["reference_text"], "see the form");

  let resp = send(
    &state,
    "DELETE",
    &format!("/articles/{article}/files?file_id={file_id}"),
    Some(EDITOR),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn disallowed_or_empty_uploads_are_rejected() {
  let state = populated(ApiConfig::default()).await;
  assert_eq!(upload(&state, "run.exe", b"MZ").await.status(), StatusCode::BAD_REQUEST);
  assert_eq!(upload(&state, "empty.pdf", b"").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_go_to_disk_when_configured() {
  let dir = std::env::temp_dir().join(format!("lore-api-{}", uuid::Uuid::new_v4()));
  let config = ApiConfig { upload_dir: Some(dir.clone()), ..ApiConfig::default() };
  let state = populated(config).await;

  let file = json_of(upload(&state, "form.pdf", b"%PDF-1.4").await).await;
  assert_eq!(file["location"]["kind"], "filesystem");
  let path = std::path::PathBuf::from(file["location"]["path"].as_str().unwrap());
  assert!(path.starts_with(&dir));
  assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

  let file_id = file["file_id"].as_str().unwrap();
  let resp = send(&state, "DELETE", &format!("/files/{file_id}"), Some(EDITOR), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(!path.exists());

  let _ = std::fs::remove_dir_all(&dir);
}
