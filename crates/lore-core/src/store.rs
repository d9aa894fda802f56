//! The `KnowledgeStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `lore-store-sqlite`).
//! Higher layers (`lore-api`, `lore-server`) depend on this abstraction, not
//! on any concrete backend.
//!
//! Every mutating article operation is one atomic unit: the article row, its
//! version snapshot, its history entry, and any attachment links commit
//! together or not at all.

use std::{collections::HashMap, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  StoreError,
  article::{Article, ArticleStatus, ArticleUpdate, NewArticle},
  category::{Category, CategoryUpdate, NewCategory, Tag},
  file::{ArticleFile, File, NewFile},
  history::HistoryEntry,
  user::{Actor, NewUser, User, UserUpdate},
  version::ArticleVersion,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`KnowledgeStore::list_articles`].
///
/// Plain users only ever receive approved articles, whatever the filter says.
#[derive(Debug, Clone)]
pub struct ArticleQuery {
  /// `None` matches every status. Defaults to approved.
  pub status:           Option<ArticleStatus>,
  /// With `status == Some(Approved)`, also include archived articles.
  pub include_archived: bool,
  pub category_id:      Option<Uuid>,
  /// Tag name.
  pub tag:              Option<String>,
  /// Free-text filter over title and body.
  pub text:             Option<String>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

impl Default for ArticleQuery {
  fn default() -> Self {
    Self {
      status:           Some(ArticleStatus::Approved),
      include_archived: false,
      category_id:      None,
      tag:              None,
      text:             None,
      limit:            None,
      offset:           None,
    }
  }
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
  pub users:      u64,
  pub articles:   u64,
  pub categories: u64,
  pub by_status:  HashMap<ArticleStatus, u64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Lore knowledge-base backend.
///
/// Operations that act on behalf of a user take the [`Actor`] and enforce
/// the rules in [`crate::permission`] before writing anything. An article the
/// actor may not view is reported as not found.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait KnowledgeStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Register a user. Without an admin `actor` the role is forced to
  /// [`crate::user::Role::User`].
  fn create_user(
    &self,
    actor: Option<Actor>,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Admin only.
  fn list_users(
    &self,
    actor: Actor,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Admin only.
  fn update_user(
    &self,
    actor: Actor,
    id: Uuid,
    update: UserUpdate,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// The user themself or an admin.
  fn set_password_hash(
    &self,
    actor: Actor,
    id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Admin only; an admin cannot delete themself.
  fn delete_user(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Categories and tags ───────────────────────────────────────────────

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn create_category(
    &self,
    actor: Actor,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Rejects renaming `General` and any re-parenting that would form a cycle.
  fn update_category(
    &self,
    actor: Actor,
    id: Uuid,
    update: CategoryUpdate,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Moves the category's articles to `General` and its children to its own
  /// parent, then deletes it. `General` itself can never be deleted.
  fn delete_category(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn delete_tag(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Article lifecycle ─────────────────────────────────────────────────

  /// Persist a new article with its first version and a `create` history
  /// entry.
  fn create_article(
    &self,
    actor: Actor,
    input: NewArticle,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Apply `update`, snapshot the result, and record an `update` or
  /// `status_change` entry depending on whether the status moved.
  fn update_article(
    &self,
    actor: Actor,
    id: Uuid,
    update: ArticleUpdate,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  fn change_status(
    &self,
    actor: Actor,
    id: Uuid,
    status: ArticleStatus,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Admin only. `None` clears the assignment.
  fn assign_editor(
    &self,
    actor: Actor,
    id: Uuid,
    editor_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Admin only. History and attachment links go with the article; version
  /// snapshots are retained.
  fn delete_article(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Article reads ─────────────────────────────────────────────────────

  fn get_article(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Ordered by last update, newest first.
  fn list_articles(
    &self,
    actor: Actor,
    query: ArticleQuery,
  ) -> impl Future<Output = Result<Vec<Article>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_versions(
    &self,
    actor: Actor,
    article_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ArticleVersion>, Self::Error>> + Send + '_;

  fn get_version(
    &self,
    actor: Actor,
    article_id: Uuid,
    version_id: Uuid,
  ) -> impl Future<Output = Result<ArticleVersion, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_history(
    &self,
    actor: Actor,
    article_id: Uuid,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;

  // ── Files and attachments ─────────────────────────────────────────────

  fn upload_file(
    &self,
    actor: Actor,
    input: NewFile,
  ) -> impl Future<Output = Result<File, Self::Error>> + Send + '_;

  fn get_file(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<File>, Self::Error>> + Send + '_;

  /// The stored bytes of a database-held file; `None` for filesystem files.
  fn file_content(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + '_;

  /// Newest upload first.
  fn list_files(
    &self,
  ) -> impl Future<Output = Result<Vec<File>, Self::Error>> + Send + '_;

  /// Admin or uploader. Returns the removed record so the caller can clean
  /// up a filesystem copy.
  fn delete_file(
    &self,
    actor: Actor,
    id: Uuid,
  ) -> impl Future<Output = Result<File, Self::Error>> + Send + '_;

  /// Link a file to an article, or update the annotation of an existing
  /// link between the two.
  fn link_file(
    &self,
    actor: Actor,
    article_id: Uuid,
    file_id: Uuid,
    reference_text: Option<String>,
  ) -> impl Future<Output = Result<ArticleFile, Self::Error>> + Send + '_;

  /// Remove every link between the two; a no-op when there is none.
  fn unlink_file(
    &self,
    actor: Actor,
    article_id: Uuid,
    file_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_article_files(
    &self,
    actor: Actor,
    article_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ArticleFile>, Self::Error>> + Send + '_;

  // ── Admin ─────────────────────────────────────────────────────────────

  fn stats(
    &self,
    actor: Actor,
  ) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;
}
