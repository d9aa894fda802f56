//! The append-only audit trail of article changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  article::{Article, ArticleStatus},
  version::ArticleVersion,
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryAction {
  Create,
  Update,
  StatusChange,
}

impl HistoryAction {
  /// Classify a save of an existing article by comparing its status before
  /// and after the change.
  pub fn classify(old: ArticleStatus, new: ArticleStatus) -> Self {
    if old == new { Self::Update } else { Self::StatusChange }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub history_id:  Uuid,
  pub article_id:  Uuid,
  pub user_id:     Uuid,
  pub action:      HistoryAction,
  pub old_status:  Option<ArticleStatus>,
  pub new_status:  Option<ArticleStatus>,
  pub recorded_at: DateTime<Utc>,
  /// The snapshot produced by the same action.
  pub version_id:  Option<Uuid>,
}

impl HistoryEntry {
  /// Build (but do not persist) an entry for `action` on `article`.
  ///
  /// A status change must carry both statuses, and a linked version must
  /// belong to the same article.
  pub fn record(
    article: &Article,
    user_id: Uuid,
    action: HistoryAction,
    old_status: Option<ArticleStatus>,
    new_status: Option<ArticleStatus>,
    version: Option<&ArticleVersion>,
  ) -> Result<Self> {
    if action == HistoryAction::StatusChange
      && (old_status.is_none() || new_status.is_none())
    {
      return Err(Error::validation(
        "a status change must record both the old and the new status",
      ));
    }
    if let Some(v) = version
      && v.article_id != article.article_id
    {
      return Err(Error::validation(format!(
        "version {} belongs to article {}, not {}",
        v.version_id, v.article_id, article.article_id
      )));
    }

    Ok(Self {
      history_id: Uuid::new_v4(),
      article_id: article.article_id,
      user_id,
      action,
      old_status,
      new_status,
      recorded_at: Utc::now(),
      version_id: version.map(|v| v.version_id),
    })
  }

  /// The entry for an article's first save.
  pub fn created(article: &Article, user_id: Uuid, version: &ArticleVersion) -> Result<Self> {
    Self::record(
      article,
      user_id,
      HistoryAction::Create,
      None,
      Some(article.status),
      Some(version),
    )
  }

  /// The entry for a later save, classified by whether the status moved.
  /// Statuses are only recorded on a status change.
  pub fn saved(
    article: &Article,
    user_id: Uuid,
    old_status: ArticleStatus,
    version: &ArticleVersion,
  ) -> Result<Self> {
    match HistoryAction::classify(old_status, article.status) {
      HistoryAction::StatusChange => Self::record(
        article,
        user_id,
        HistoryAction::StatusChange,
        Some(old_status),
        Some(article.status),
        Some(version),
      ),
      action => Self::record(article, user_id, action, None, None, Some(version)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn article(status: ArticleStatus) -> Article {
    let now = Utc::now();
    let author = Uuid::new_v4();
    Article {
      article_id: Uuid::new_v4(),
      title: "t".into(),
      body: "b".into(),
      status,
      category_id: Uuid::new_v4(),
      tags: vec![],
      created_by: author,
      updated_by: author,
      assigned_editor_id: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn classify_by_status_delta() {
    use ArticleStatus::*;
    assert_eq!(HistoryAction::classify(Draft, Draft), HistoryAction::Update);
    assert_eq!(
      HistoryAction::classify(Draft, InReview),
      HistoryAction::StatusChange
    );
    assert_eq!(
      HistoryAction::classify(Archived, Draft),
      HistoryAction::StatusChange
    );
  }

  #[test]
  fn created_entry_records_initial_status() {
    let a = article(ArticleStatus::Draft);
    let v = ArticleVersion::snapshot(&a, 1, a.created_by);
    let h = HistoryEntry::created(&a, a.created_by, &v).unwrap();
    assert_eq!(h.action, HistoryAction::Create);
    assert_eq!(h.old_status, None);
    assert_eq!(h.new_status, Some(ArticleStatus::Draft));
    assert_eq!(h.version_id, Some(v.version_id));
  }

  #[test]
  fn saved_entry_only_records_statuses_on_change() {
    let a = article(ArticleStatus::Draft);
    let v = ArticleVersion::snapshot(&a, 2, a.created_by);

    let plain = HistoryEntry::saved(&a, a.created_by, ArticleStatus::Draft, &v).unwrap();
    assert_eq!(plain.action, HistoryAction::Update);
    assert_eq!(plain.old_status, None);
    assert_eq!(plain.new_status, None);

    let moved =
      HistoryEntry::saved(&a, a.created_by, ArticleStatus::Approved, &v).unwrap();
    assert_eq!(moved.action, HistoryAction::StatusChange);
    assert_eq!(moved.old_status, Some(ArticleStatus::Approved));
    assert_eq!(moved.new_status, Some(ArticleStatus::Draft));
  }

  #[test]
  fn status_change_without_statuses_is_rejected() {
    let a = article(ArticleStatus::Draft);
    let err = HistoryEntry::record(
      &a,
      a.created_by,
      HistoryAction::StatusChange,
      Some(ArticleStatus::Draft),
      None,
      None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn foreign_version_link_is_rejected() {
    let a = article(ArticleStatus::Draft);
    let other = article(ArticleStatus::Draft);
    let v = ArticleVersion::snapshot(&other, 1, other.created_by);
    let err = HistoryEntry::created(&a, a.created_by, &v).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
