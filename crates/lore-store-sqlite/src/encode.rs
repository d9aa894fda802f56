//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enums are stored by their canonical
//! snake_case name.

use std::{path::PathBuf, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use lore_core::{
  article::{Article, ArticleStatus},
  category::{Category, Tag},
  file::{ArticleFile, File, StorageLocation},
  history::{HistoryAction, HistoryEntry},
  user::{Role, User},
  version::ArticleVersion,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// Fixed-width so that stored timestamps sort lexically.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

/// Parse a stored enum column through its strum `FromStr`.
fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<ArticleStatus> { decode_enum("article status", s) }

fn decode_opt_status(s: Option<&str>) -> Result<Option<ArticleStatus>> {
  s.map(decode_status).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ARTICLE_COLUMNS: &str = "a.article_id, a.title, a.body, a.status, \
   a.category_id, a.created_by, a.updated_by, a.assigned_editor_id, \
   a.created_at, a.updated_at";

/// Raw strings read directly from an `articles` row. Tags are loaded
/// separately.
pub struct RawArticle {
  pub article_id:         String,
  pub title:              String,
  pub body:               String,
  pub status:             String,
  pub category_id:        String,
  pub created_by:         String,
  pub updated_by:         String,
  pub assigned_editor_id: Option<String>,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawArticle {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      article_id:         row.get(0)?,
      title:              row.get(1)?,
      body:               row.get(2)?,
      status:             row.get(3)?,
      category_id:        row.get(4)?,
      created_by:         row.get(5)?,
      updated_by:         row.get(6)?,
      assigned_editor_id: row.get(7)?,
      created_at:         row.get(8)?,
      updated_at:         row.get(9)?,
    })
  }

  pub fn into_article(self, tags: Vec<String>) -> Result<Article> {
    Ok(Article {
      article_id: decode_uuid(&self.article_id)?,
      title: self.title,
      body: self.body,
      status: decode_status(&self.status)?,
      category_id: decode_uuid(&self.category_id)?,
      tags,
      created_by: decode_uuid(&self.created_by)?,
      updated_by: decode_uuid(&self.updated_by)?,
      assigned_editor_id: decode_opt_uuid(self.assigned_editor_id.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const VERSION_COLUMNS: &str = "version_id, article_id, version_number, \
   title, body, status, category_id, created_by, created_at";

pub struct RawVersion {
  pub version_id:     String,
  pub article_id:     String,
  pub version_number: u32,
  pub title:          String,
  pub body:           String,
  pub status:         String,
  pub category_id:    String,
  pub created_by:     String,
  pub created_at:     String,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:     row.get(0)?,
      article_id:     row.get(1)?,
      version_number: row.get(2)?,
      title:          row.get(3)?,
      body:           row.get(4)?,
      status:         row.get(5)?,
      category_id:    row.get(6)?,
      created_by:     row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_version(self) -> Result<ArticleVersion> {
    Ok(ArticleVersion {
      version_id:     decode_uuid(&self.version_id)?,
      article_id:     decode_uuid(&self.article_id)?,
      version_number: self.version_number,
      title:          self.title,
      body:           self.body,
      status:         decode_status(&self.status)?,
      category_id:    decode_uuid(&self.category_id)?,
      created_by:     decode_uuid(&self.created_by)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const HISTORY_COLUMNS: &str = "history_id, article_id, user_id, action, \
   old_status, new_status, recorded_at, version_id";

pub struct RawHistory {
  pub history_id:  String,
  pub article_id:  String,
  pub user_id:     String,
  pub action:      String,
  pub old_status:  Option<String>,
  pub new_status:  Option<String>,
  pub recorded_at: String,
  pub version_id:  Option<String>,
}

impl RawHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:  row.get(0)?,
      article_id:  row.get(1)?,
      user_id:     row.get(2)?,
      action:      row.get(3)?,
      old_status:  row.get(4)?,
      new_status:  row.get(5)?,
      recorded_at: row.get(6)?,
      version_id:  row.get(7)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      history_id:  decode_uuid(&self.history_id)?,
      article_id:  decode_uuid(&self.article_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      action:      decode_enum::<HistoryAction>("history action", &self.action)?,
      old_status:  decode_opt_status(self.old_status.as_deref())?,
      new_status:  decode_opt_status(self.new_status.as_deref())?,
      recorded_at: decode_dt(&self.recorded_at)?,
      version_id:  decode_opt_uuid(self.version_id.as_deref())?,
    })
  }
}

pub const USER_COLUMNS: &str = "user_id, username, email, full_name, \
   password_hash, role, active, created_at";

pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
  pub role:          String,
  pub active:        bool,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      full_name:     row.get(3)?,
      password_hash: row.get(4)?,
      role:          row.get(5)?,
      active:        row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      email:         self.email,
      full_name:     self.full_name,
      password_hash: self.password_hash,
      role:          decode_enum::<Role>("role", &self.role)?,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const CATEGORY_COLUMNS: &str =
  "category_id, name, description, parent_id, created_at";

pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub description: Option<String>,
  pub parent_id:   Option<String>,
  pub created_at:  String,
}

impl RawCategory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      parent_id:   row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      description: self.description,
      parent_id:   decode_opt_uuid(self.parent_id.as_deref())?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
  Ok((row.get(0)?, row.get(1)?))
}

pub fn into_tag((tag_id, name): (String, String)) -> Result<Tag> {
  Ok(Tag { tag_id: decode_uuid(&tag_id)?, name })
}

pub const FILE_COLUMNS: &str = "file_id, filename, original_filename, \
   mime_type, size, description, uploaded_by, uploaded_at, stored_in_db, \
   file_path";

pub struct RawFile {
  pub file_id:           String,
  pub filename:          String,
  pub original_filename: String,
  pub mime_type:         String,
  pub size:              i64,
  pub description:       Option<String>,
  pub uploaded_by:       String,
  pub uploaded_at:       String,
  pub stored_in_db:      bool,
  pub file_path:         Option<String>,
}

impl RawFile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      file_id:           row.get(0)?,
      filename:          row.get(1)?,
      original_filename: row.get(2)?,
      mime_type:         row.get(3)?,
      size:              row.get(4)?,
      description:       row.get(5)?,
      uploaded_by:       row.get(6)?,
      uploaded_at:       row.get(7)?,
      stored_in_db:      row.get(8)?,
      file_path:         row.get(9)?,
    })
  }

  pub fn into_file(self) -> Result<File> {
    let location = match (self.stored_in_db, self.file_path) {
      (true, _) => StorageLocation::Database,
      (false, Some(path)) => StorageLocation::Filesystem { path: PathBuf::from(path) },
      (false, None) => {
        return Err(Error::Decode(format!(
          "file {} has neither content nor path",
          self.file_id
        )));
      }
    };
    let size = u64::try_from(self.size)
      .map_err(|_| Error::Decode(format!("negative size for file {}", self.file_id)))?;

    Ok(File {
      file_id: decode_uuid(&self.file_id)?,
      filename: self.filename,
      original_filename: self.original_filename,
      mime_type: self.mime_type,
      size,
      description: self.description,
      uploaded_by: decode_uuid(&self.uploaded_by)?,
      uploaded_at: decode_dt(&self.uploaded_at)?,
      location,
    })
  }
}

pub const LINK_COLUMNS: &str =
  "link_id, article_id, file_id, reference_text, added_at";

pub struct RawLink {
  pub link_id:        String,
  pub article_id:     String,
  pub file_id:        String,
  pub reference_text: Option<String>,
  pub added_at:       String,
}

impl RawLink {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:        row.get(0)?,
      article_id:     row.get(1)?,
      file_id:        row.get(2)?,
      reference_text: row.get(3)?,
      added_at:       row.get(4)?,
    })
  }

  pub fn into_link(self) -> Result<ArticleFile> {
    Ok(ArticleFile {
      link_id:        decode_uuid(&self.link_id)?,
      article_id:     decode_uuid(&self.article_id)?,
      file_id:        decode_uuid(&self.file_id)?,
      reference_text: self.reference_text,
      added_at:       decode_dt(&self.added_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_survive_encoding() {
    let now = Utc::now();
    let back = decode_dt(&encode_dt(now)).unwrap();
    assert_eq!(back.timestamp_micros(), now.timestamp_micros());
    assert!(encode_dt(now).ends_with('Z'));
    assert!(matches!(decode_dt("yesterday"), Err(Error::Decode(_))));
  }

  #[test]
  fn stored_status_names_are_canonical() {
    assert_eq!(decode_status("in_review").unwrap(), ArticleStatus::InReview);
    assert!(matches!(decode_status("bogus"), Err(Error::Decode(_))));
  }
}
