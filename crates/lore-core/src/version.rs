//! Immutable article snapshots.
//!
//! A snapshot is taken *after* a mutation has been applied, so version `n`
//! holds the article exactly as it stood once the `n`th change committed.
//! Snapshots are never updated and are not deleted with their article.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::{Article, ArticleStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleVersion {
  pub version_id:     Uuid,
  pub article_id:     Uuid,
  /// 1-based, gap-free, strictly increasing per article.
  pub version_number: u32,
  pub title:          String,
  pub body:           String,
  pub status:         ArticleStatus,
  pub category_id:    Uuid,
  /// The actor whose change produced this snapshot.
  pub created_by:     Uuid,
  pub created_at:     DateTime<Utc>,
}

/// The number to assign to the next snapshot given the highest existing one.
pub fn next_version_number(current_max: Option<u32>) -> u32 {
  current_max.map_or(1, |n| n + 1)
}

impl ArticleVersion {
  /// Build (but do not persist) a snapshot of `article`'s current state.
  pub fn snapshot(article: &Article, version_number: u32, actor_id: Uuid) -> Self {
    Self {
      version_id: Uuid::new_v4(),
      article_id: article.article_id,
      version_number,
      title: article.title.clone(),
      body: article.body.clone(),
      status: article.status,
      category_id: article.category_id,
      created_by: actor_id,
      created_at: Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn article() -> Article {
    let now = Utc::now();
    let author = Uuid::new_v4();
    Article {
      article_id:         Uuid::new_v4(),
      title:              "Policy Draft".into(),
      body:               "...".into(),
      status:             ArticleStatus::InReview,
      category_id:        Uuid::new_v4(),
      tags:               vec![],
      created_by:         author,
      updated_by:         author,
      assigned_editor_id: None,
      created_at:         now,
      updated_at:         now,
    }
  }

  #[test]
  fn numbering_starts_at_one() {
    assert_eq!(next_version_number(None), 1);
    assert_eq!(next_version_number(Some(1)), 2);
    assert_eq!(next_version_number(Some(41)), 42);
  }

  #[test]
  fn snapshot_copies_current_state() {
    let a = article();
    let actor = Uuid::new_v4();
    let v = ArticleVersion::snapshot(&a, 3, actor);
    assert_eq!(v.article_id, a.article_id);
    assert_eq!(v.version_number, 3);
    assert_eq!(v.title, a.title);
    assert_eq!(v.body, a.body);
    assert_eq!(v.status, ArticleStatus::InReview);
    assert_eq!(v.category_id, a.category_id);
    assert_eq!(v.created_by, actor);
  }
}
