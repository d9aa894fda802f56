//! The article lifecycle: every mutation, its snapshot, and its history entry
//! share one transaction.
//!
//! Write operations open an `IMMEDIATE` transaction so that reading the next
//! version number and inserting the snapshot happen under the write lock.
//! Helpers take that transaction as their persistence context.

use chrono::Utc;
use lore_core::{
  Error as CoreError,
  article::{Article, ArticleStatus, ArticleUpdate, NewArticle},
  history::HistoryEntry,
  permission,
  store::ArticleQuery,
  user::{Actor, Role},
  version::ArticleVersion,
};
use rusqlite::{
  Connection, OptionalExtension as _, TransactionBehavior, params,
  params_from_iter,
};
use uuid::Uuid;

use crate::{
  Result, attachments, catalog,
  encode::{ARTICLE_COLUMNS, RawArticle, decode_uuid, encode_dt, encode_uuid},
  history, users, versioning,
};

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load an article with its tags, ignoring permissions.
pub fn load(conn: &Connection, id: Uuid) -> Result<Option<Article>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.article_id = ?1"),
      params![encode_uuid(id)],
      RawArticle::from_row,
    )
    .optional()?;
  match raw {
    Some(raw) => Ok(Some(raw.into_article(catalog::tags_for(conn, id)?)?)),
    None => Ok(None),
  }
}

/// Load an article the actor may view. Hidden articles are reported as
/// missing.
pub fn load_visible(conn: &Connection, actor: Actor, id: Uuid) -> Result<Article> {
  match load(conn, id)? {
    Some(article) if permission::can_view(&actor, &article) => Ok(article),
    _ => Err(CoreError::not_found("article", id).into()),
  }
}

/// Load an article the actor may edit.
pub fn load_editable(conn: &Connection, actor: Actor, id: Uuid) -> Result<Article> {
  let article = load_visible(conn, actor, id)?;
  if !permission::can_edit(&actor, &article) {
    return Err(CoreError::denied(format!("you may not edit article {id}")).into());
  }
  Ok(article)
}

fn load_with_history(conn: &Connection, actor: Actor, id: Uuid) -> Result<Article> {
  let article = load_visible(conn, actor, id)?;
  if !permission::can_view_history(&actor, &article) {
    return Err(CoreError::denied("only editors and admins may view history").into());
  }
  Ok(article)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn insert_row(conn: &Connection, article: &Article) -> Result<()> {
  conn.execute(
    "INSERT INTO articles (
       article_id, title, body, status, category_id, created_by,
       updated_by, assigned_editor_id, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(article.article_id),
      article.title,
      article.body,
      article.status.as_ref(),
      encode_uuid(article.category_id),
      encode_uuid(article.created_by),
      encode_uuid(article.updated_by),
      article.assigned_editor_id.map(encode_uuid),
      encode_dt(article.created_at),
      encode_dt(article.updated_at),
    ],
  )?;
  Ok(())
}

fn update_row(conn: &Connection, article: &Article) -> Result<()> {
  conn.execute(
    "UPDATE articles SET
       title = ?2, body = ?3, status = ?4, category_id = ?5,
       updated_by = ?6, assigned_editor_id = ?7, updated_at = ?8
     WHERE article_id = ?1",
    params![
      encode_uuid(article.article_id),
      article.title,
      article.body,
      article.status.as_ref(),
      encode_uuid(article.category_id),
      encode_uuid(article.updated_by),
      article.assigned_editor_id.map(encode_uuid),
      encode_dt(article.updated_at),
    ],
  )?;
  Ok(())
}

/// Create an article with its first snapshot and a `create` entry.
pub fn create(conn: &mut Connection, actor: Actor, input: &NewArticle) -> Result<Article> {
  if !permission::can_create(&actor) {
    return Err(CoreError::denied("only editors and admins may create articles").into());
  }
  input.validate()?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let category_id = match input.category_id {
    Some(id) => catalog::require_category(&tx, id)?.category_id,
    None => catalog::general_id(&tx)?,
  };

  let now = Utc::now();
  let mut article = Article {
    article_id: Uuid::new_v4(),
    title: input.title.trim().to_owned(),
    body: input.body.clone(),
    status: input.status.unwrap_or_default(),
    category_id,
    tags: Vec::new(),
    created_by: actor.id,
    updated_by: actor.id,
    assigned_editor_id: None,
    created_at: now,
    updated_at: now,
  };
  insert_row(&tx, &article)?;
  article.tags = catalog::replace_tags(&tx, article.article_id, &input.tags)?;

  for attachment in &input.attachments {
    let file = attachments::insert_file(&tx, actor.id, attachment)?;
    attachments::insert_link(&tx, article.article_id, file.file_id, None)?;
  }

  let version = versioning::create_snapshot(&tx, &article, actor.id)?;
  history::insert(&tx, &HistoryEntry::created(&article, actor.id, &version)?)?;
  tx.commit()?;

  tracing::info!(
    article_id = %article.article_id,
    status = %article.status,
    "article created"
  );
  Ok(article)
}

/// Apply `update`, snapshot the result, and record `update` or
/// `status_change`.
pub fn update(
  conn: &mut Connection,
  actor: Actor,
  id: Uuid,
  update: &ArticleUpdate,
) -> Result<Article> {
  save(conn, actor, id, update, false)
}

fn save(
  conn: &mut Connection,
  actor: Actor,
  id: Uuid,
  update: &ArticleUpdate,
  status_must_move: bool,
) -> Result<Article> {
  update.validate()?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let mut article = load_editable(&tx, actor, id)?;
  let old_status = article.status;
  if status_must_move && update.status == Some(old_status) {
    return Err(CoreError::validation(format!("article is already {old_status}")).into());
  }

  if let Some(category_id) = update.category_id {
    catalog::require_category(&tx, category_id)?;
  }
  update.apply_to(&mut article);
  article.updated_by = actor.id;
  article.updated_at = Utc::now();
  update_row(&tx, &article)?;

  if let Some(tags) = &update.tags {
    article.tags = catalog::replace_tags(&tx, id, tags)?;
  }
  for attachment in &update.attachments {
    let file = attachments::insert_file(&tx, actor.id, attachment)?;
    attachments::insert_link(&tx, id, file.file_id, None)?;
  }

  let version = versioning::create_snapshot(&tx, &article, actor.id)?;
  let entry = HistoryEntry::saved(&article, actor.id, old_status, &version)?;
  history::insert(&tx, &entry)?;
  tx.commit()?;

  tracing::info!(
    article_id = %id,
    version = version.version_number,
    action = %entry.action,
    "article saved"
  );
  Ok(article)
}

/// Move the article to `status`. Re-applying the current status is rejected
/// so that every `change_status` records a real `status_change`.
pub fn change_status(
  conn: &mut Connection,
  actor: Actor,
  id: Uuid,
  status: ArticleStatus,
) -> Result<Article> {
  let change = ArticleUpdate { status: Some(status), ..Default::default() };
  save(conn, actor, id, &change, true)
}

/// Set or clear the assigned editor. Not versioned.
pub fn assign_editor(
  conn: &mut Connection,
  actor: Actor,
  id: Uuid,
  editor_id: Option<Uuid>,
) -> Result<Article> {
  catalog::require_admin(&actor, "assign editors")?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let mut article = load(&tx, id)?.ok_or(CoreError::not_found("article", id))?;

  if let Some(editor_id) = editor_id {
    let editor = users::get(&tx, editor_id)?
      .ok_or_else(|| CoreError::validation(format!("unknown user {editor_id}")))?;
    if editor.role == Role::User || !editor.active {
      return Err(
        CoreError::validation(format!("{} cannot be assigned as an editor", editor.username))
          .into(),
      );
    }
  }

  article.assigned_editor_id = editor_id;
  tx.execute(
    "UPDATE articles SET assigned_editor_id = ?2 WHERE article_id = ?1",
    params![encode_uuid(id), editor_id.map(encode_uuid)],
  )?;
  tx.commit()?;

  tracing::info!(article_id = %id, editor_id = ?editor_id, "editor assigned");
  Ok(article)
}

/// Remove an article with its history, links and tags. Snapshots stay.
pub fn delete(conn: &mut Connection, actor: Actor, id: Uuid) -> Result<()> {
  catalog::require_admin(&actor, "delete articles")?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if load(&tx, id)?.is_none() {
    return Err(CoreError::not_found("article", id).into());
  }

  let id_str = encode_uuid(id);
  let entries = history::delete_for_article(&tx, id)?;
  let links = attachments::delete_links_for_article(&tx, id)?;
  tx.execute("DELETE FROM article_tags WHERE article_id = ?1", params![id_str])?;
  tx.execute("DELETE FROM articles WHERE article_id = ?1", params![id_str])?;
  tx.commit()?;

  tracing::info!(
    article_id = %id,
    history_removed = entries,
    links_removed = links,
    "article deleted"
  );
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Articles matching `query` that the actor may view, most recently updated
/// first.
pub fn list(conn: &Connection, actor: Actor, query: &ArticleQuery) -> Result<Vec<Article>> {
  let mut clauses: Vec<&str> = Vec::new();
  let mut args: Vec<String> = Vec::new();

  let (status, include_archived) = match actor.role {
    Role::User => (Some(ArticleStatus::Approved), false),
    Role::Admin | Role::Editor => (query.status, query.include_archived),
  };
  match status {
    Some(ArticleStatus::Approved) if include_archived => {
      clauses.push("a.status IN ('approved', 'archived')");
    }
    Some(status) => {
      clauses.push("a.status = ?");
      args.push(status.to_string());
    }
    None => {}
  }
  if let Some(category_id) = query.category_id {
    clauses.push("a.category_id = ?");
    args.push(encode_uuid(category_id));
  }
  if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    clauses.push(
      "EXISTS (SELECT 1 FROM article_tags l JOIN tags t ON t.tag_id = l.tag_id
               WHERE l.article_id = a.article_id AND t.name = ?)",
    );
    args.push(tag.to_owned());
  }
  if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    clauses.push("(a.title LIKE ? OR a.body LIKE ?)");
    let pattern = format!("%{text}%");
    args.push(pattern.clone());
    args.push(pattern);
  }

  let mut sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles a");
  if !clauses.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
  }
  sql.push_str(" ORDER BY a.updated_at DESC, a.rowid DESC");
  match (query.limit, query.offset) {
    (Some(limit), offset) => {
      sql.push_str(&format!(" LIMIT {limit} OFFSET {}", offset.unwrap_or(0)));
    }
    (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
    (None, None) => {}
  }

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(args.iter()), RawArticle::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut articles = Vec::with_capacity(raws.len());
  for raw in raws {
    let id = decode_uuid(&raw.article_id)?;
    let article = raw.into_article(catalog::tags_for(conn, id)?)?;
    if permission::can_view(&actor, &article) {
      articles.push(article);
    }
  }
  Ok(articles)
}

pub fn versions(conn: &Connection, actor: Actor, id: Uuid) -> Result<Vec<ArticleVersion>> {
  load_with_history(conn, actor, id)?;
  versioning::list(conn, id)
}

pub fn version(
  conn: &Connection,
  actor: Actor,
  article_id: Uuid,
  version_id: Uuid,
) -> Result<ArticleVersion> {
  load_with_history(conn, actor, article_id)?;
  versioning::get(conn, version_id)?
    .filter(|v| v.article_id == article_id)
    .ok_or_else(|| CoreError::not_found("version", version_id).into())
}

pub fn trail(conn: &Connection, actor: Actor, id: Uuid) -> Result<Vec<HistoryEntry>> {
  load_with_history(conn, actor, id)?;
  history::list(conn, id)
}
