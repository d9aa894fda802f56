//! Articles: the mutable documents whose every change is versioned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, file::NewFile};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Publication status. Any status is reachable from any other by an actor
/// allowed to edit the article; there is no terminal state.
///
/// The legacy Portuguese names (`rascunho`, `em_analise`, `homologado`,
/// `arquivado`) are accepted on input and normalised.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
  #[default]
  #[serde(alias = "rascunho")]
  #[strum(to_string = "draft", serialize = "rascunho")]
  Draft,
  #[serde(alias = "em_analise")]
  #[strum(to_string = "in_review", serialize = "em_analise")]
  InReview,
  #[serde(alias = "homologado")]
  #[strum(to_string = "approved", serialize = "homologado")]
  Approved,
  #[serde(alias = "arquivado")]
  #[strum(to_string = "archived", serialize = "arquivado")]
  Archived,
}

impl ArticleStatus {
  /// Parse a boundary value, rejecting anything outside the fixed set.
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| Error::validation(format!("unknown article status: {s:?}")))
  }
}

// ─── Article ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
  pub article_id:         Uuid,
  pub title:              String,
  pub body:               String,
  pub status:             ArticleStatus,
  pub category_id:        Uuid,
  /// Tag names, sorted.
  pub tags:               Vec<String>,
  pub created_by:         Uuid,
  pub updated_by:         Uuid,
  pub assigned_editor_id: Option<Uuid>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::KnowledgeStore::create_article`].
#[derive(Debug, Clone)]
pub struct NewArticle {
  pub title:       String,
  pub body:        String,
  /// Falls back to the `General` category when omitted.
  pub category_id: Option<Uuid>,
  /// Defaults to [`ArticleStatus::Draft`].
  pub status:      Option<ArticleStatus>,
  /// Tag names; unknown names are created.
  pub tags:        Vec<String>,
  /// Files stored and linked in the same transaction as the article.
  pub attachments: Vec<NewFile>,
}

impl NewArticle {
  pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
    Self {
      title:       title.into(),
      body:        body.into(),
      category_id: None,
      status:      None,
      tags:        Vec::new(),
      attachments: Vec::new(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    require_text("title", &self.title)?;
    require_text("body", &self.body)?;
    Ok(())
  }
}

/// Input to [`crate::store::KnowledgeStore::update_article`]. `None` leaves a
/// field untouched; `tags: Some(..)` replaces the whole tag set.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
  pub title:       Option<String>,
  pub body:        Option<String>,
  pub category_id: Option<Uuid>,
  pub status:      Option<ArticleStatus>,
  pub tags:        Option<Vec<String>>,
  pub attachments: Vec<NewFile>,
}

impl ArticleUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title {
      require_text("title", title)?;
    }
    if let Some(body) = &self.body {
      require_text("body", body)?;
    }
    Ok(())
  }

  /// Apply the plain field changes to `article`. Tags and attachments are
  /// resolved by the store.
  pub fn apply_to(&self, article: &mut Article) {
    if let Some(title) = &self.title {
      article.title = title.trim().to_owned();
    }
    if let Some(body) = &self.body {
      article.body.clone_from(body);
    }
    if let Some(category_id) = self.category_id {
      article.category_id = category_id;
    }
    if let Some(status) = self.status {
      article.status = status;
    }
  }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(format!("{field} is required")));
  }
  Ok(())
}
