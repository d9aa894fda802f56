//! [`SqliteStore`], the SQLite implementation of [`KnowledgeStore`].

use std::{collections::HashMap, path::Path, time::Duration};

use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use lore_core::{
  Error as CoreError,
  article::{Article, ArticleStatus, ArticleUpdate, NewArticle},
  category::{Category, CategoryUpdate, NewCategory, Tag},
  file::{ArticleFile, File, NewFile},
  history::HistoryEntry,
  store::{ArticleQuery, KnowledgeStore, Stats},
  user::{Actor, NewUser, User, UserUpdate},
  version::ArticleVersion,
};

use crate::{
  Error, Result, attachments, catalog,
  encode::decode_status,
  lifecycle,
  schema::SCHEMA,
  users,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lore knowledge base backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and seed
  /// the `General` category.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(catalog::seed_general(conn))
      })
      .await?
  }

  /// Create `input` as an admin unless its username is already registered.
  /// Returns the new user, or `None` if nothing was created.
  pub async fn bootstrap_admin(&self, input: NewUser) -> Result<Option<User>> {
    self.transact(move |conn| users::bootstrap_admin(conn, &input)).await
  }

  #[cfg(test)]
  pub(crate) fn conn_for_tests(&self) -> &tokio_rusqlite::Connection { &self.conn }

  /// Run a write operation on the database thread, retrying once if a
  /// concurrent writer took the same version number.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&mut Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(retry_on_version_conflict(conn, &op)))
      .await?
  }

  /// Like [`Self::write`], wrapping `op` in one `IMMEDIATE` transaction.
  async fn transact<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&Connection) -> Result<T> + Send + 'static,
  {
    self.write(move |conn| in_transaction(conn, &op)).await
  }

  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(&*conn))).await?
  }
}

fn in_transaction<T>(
  conn: &mut Connection,
  op: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let value = op(&tx)?;
  tx.commit()?;
  Ok(value)
}

pub(crate) fn retry_on_version_conflict<T>(
  conn: &mut Connection,
  op: impl Fn(&mut Connection) -> Result<T>,
) -> Result<T> {
  match op(conn) {
    Err(e) if e.is_version_conflict() => {
      tracing::warn!("version number taken by a concurrent writer, retrying");
      op(conn).map_err(|e| {
        if e.is_version_conflict() {
          CoreError::Conflict("the article was modified concurrently; try again".into())
            .into()
        } else {
          e
        }
      })
    }
    other => other,
  }
}

fn stats(conn: &Connection, actor: Actor) -> Result<Stats> {
  catalog::require_admin(&actor, "view statistics")?;

  let count = |table: &str| -> Result<u64> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
      row.get(0)
    })?;
    Ok(n.unsigned_abs())
  };

  let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM articles GROUP BY status")?;
  let rows = stmt
    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let mut by_status = HashMap::new();
  for (status, n) in rows {
    by_status.insert(decode_status(&status)?, n.unsigned_abs());
  }

  Ok(Stats {
    users: count("users")?,
    articles: count("articles")?,
    categories: count("categories")?,
    by_status,
  })
}

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, actor: Option<Actor>, input: NewUser) -> Result<User> {
    self.transact(move |conn| users::create(conn, actor, &input)).await
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.read(move |conn| users::get(conn, id)).await
  }

  async fn find_user_by_username(&self, username: String) -> Result<Option<User>> {
    self.read(move |conn| users::find_by_username(conn, &username)).await
  }

  async fn list_users(&self, actor: Actor) -> Result<Vec<User>> {
    self.read(move |conn| users::list(conn, actor)).await
  }

  async fn update_user(&self, actor: Actor, id: Uuid, update: UserUpdate) -> Result<User> {
    self.transact(move |conn| users::update(conn, actor, id, &update)).await
  }

  async fn set_password_hash(
    &self,
    actor: Actor,
    id: Uuid,
    password_hash: String,
  ) -> Result<()> {
    self
      .write(move |conn| users::set_password_hash(conn, actor, id, &password_hash))
      .await
  }

  async fn delete_user(&self, actor: Actor, id: Uuid) -> Result<()> {
    self.write(move |conn| users::delete(conn, actor, id)).await
  }

  // ── Categories and tags ───────────────────────────────────────────────────

  async fn list_categories(&self) -> Result<Vec<Category>> {
    self.read(catalog::list_categories).await
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    self.read(move |conn| catalog::get_category(conn, id)).await
  }

  async fn create_category(&self, actor: Actor, input: NewCategory) -> Result<Category> {
    self.transact(move |conn| catalog::create_category(conn, actor, &input)).await
  }

  async fn update_category(
    &self,
    actor: Actor,
    id: Uuid,
    update: CategoryUpdate,
  ) -> Result<Category> {
    self
      .transact(move |conn| catalog::update_category(conn, actor, id, &update))
      .await
  }

  async fn delete_category(&self, actor: Actor, id: Uuid) -> Result<()> {
    self.transact(move |conn| catalog::delete_category(conn, actor, id)).await
  }

  async fn list_tags(&self) -> Result<Vec<Tag>> { self.read(catalog::list_tags).await }

  async fn delete_tag(&self, actor: Actor, id: Uuid) -> Result<()> {
    self.transact(move |conn| catalog::delete_tag(conn, actor, id)).await
  }

  // ── Article lifecycle ─────────────────────────────────────────────────────

  async fn create_article(&self, actor: Actor, input: NewArticle) -> Result<Article> {
    self.write(move |conn| lifecycle::create(conn, actor, &input)).await
  }

  async fn update_article(
    &self,
    actor: Actor,
    id: Uuid,
    update: ArticleUpdate,
  ) -> Result<Article> {
    self.write(move |conn| lifecycle::update(conn, actor, id, &update)).await
  }

  async fn change_status(
    &self,
    actor: Actor,
    id: Uuid,
    status: ArticleStatus,
  ) -> Result<Article> {
    self
      .write(move |conn| lifecycle::change_status(conn, actor, id, status))
      .await
  }

  async fn assign_editor(
    &self,
    actor: Actor,
    id: Uuid,
    editor_id: Option<Uuid>,
  ) -> Result<Article> {
    self
      .write(move |conn| lifecycle::assign_editor(conn, actor, id, editor_id))
      .await
  }

  async fn delete_article(&self, actor: Actor, id: Uuid) -> Result<()> {
    self.write(move |conn| lifecycle::delete(conn, actor, id)).await
  }

  // ── Article reads ─────────────────────────────────────────────────────────

  async fn get_article(&self, actor: Actor, id: Uuid) -> Result<Article> {
    self.read(move |conn| lifecycle::load_visible(conn, actor, id)).await
  }

  async fn list_articles(&self, actor: Actor, query: ArticleQuery) -> Result<Vec<Article>> {
    self.read(move |conn| lifecycle::list(conn, actor, &query)).await
  }

  async fn list_versions(
    &self,
    actor: Actor,
    article_id: Uuid,
  ) -> Result<Vec<ArticleVersion>> {
    self.read(move |conn| lifecycle::versions(conn, actor, article_id)).await
  }

  async fn get_version(
    &self,
    actor: Actor,
    article_id: Uuid,
    version_id: Uuid,
  ) -> Result<ArticleVersion> {
    self
      .read(move |conn| lifecycle::version(conn, actor, article_id, version_id))
      .await
  }

  async fn list_history(&self, actor: Actor, article_id: Uuid) -> Result<Vec<HistoryEntry>> {
    self.read(move |conn| lifecycle::trail(conn, actor, article_id)).await
  }

  // ── Files and attachments ─────────────────────────────────────────────────

  async fn upload_file(&self, actor: Actor, input: NewFile) -> Result<File> {
    self.write(move |conn| attachments::upload(conn, actor, &input)).await
  }

  async fn get_file(&self, id: Uuid) -> Result<Option<File>> {
    self.read(move |conn| attachments::get_file(conn, id)).await
  }

  async fn file_content(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
    self.read(move |conn| attachments::content(conn, id)).await
  }

  async fn list_files(&self) -> Result<Vec<File>> {
    self.read(attachments::list_files).await
  }

  async fn delete_file(&self, actor: Actor, id: Uuid) -> Result<File> {
    self.transact(move |conn| attachments::delete_file(conn, actor, id)).await
  }

  async fn link_file(
    &self,
    actor: Actor,
    article_id: Uuid,
    file_id: Uuid,
    reference_text: Option<String>,
  ) -> Result<ArticleFile> {
    self
      .transact(move |conn| {
        attachments::link(conn, actor, article_id, file_id, reference_text.as_deref())
      })
      .await
  }

  async fn unlink_file(&self, actor: Actor, article_id: Uuid, file_id: Uuid) -> Result<()> {
    self
      .transact(move |conn| attachments::unlink(conn, actor, article_id, file_id))
      .await
  }

  async fn list_article_files(
    &self,
    actor: Actor,
    article_id: Uuid,
  ) -> Result<Vec<ArticleFile>> {
    self
      .read(move |conn| attachments::list_links(conn, actor, article_id))
      .await
  }

  // ── Admin ─────────────────────────────────────────────────────────────────

  async fn stats(&self, actor: Actor) -> Result<Stats> {
    self.read(move |conn| stats(conn, actor)).await
  }
}
