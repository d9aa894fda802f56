//! Uploaded files and their links to articles.
//!
//! The core records where a file lives and which articles reference it; how
//! bytes reach disk or get served is the storage collaborator's business.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Extensions accepted on upload, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] =
  &["pdf", "zip", "png", "jpg", "jpeg", "gif"];

// ─── Storage location ────────────────────────────────────────────────────────

/// Where a file's bytes live. Exactly one per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageLocation {
  /// Bytes are held in the file row itself.
  Database,
  /// Bytes live on disk at `path`.
  Filesystem { path: PathBuf },
}

/// The payload of an upload.
#[derive(Debug, Clone)]
pub enum FileContent {
  Inline(Vec<u8>),
  /// Already written by the storage collaborator; `size` is reported by it.
  OnDisk { path: PathBuf, size: u64 },
}

impl FileContent {
  pub fn size(&self) -> u64 {
    match self {
      Self::Inline(bytes) => bytes.len() as u64,
      Self::OnDisk { size, .. } => *size,
    }
  }
}

// ─── File ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
  pub file_id:           Uuid,
  /// Generated storage name, `<uuid-hex>.<ext>`.
  pub filename:          String,
  pub original_filename: String,
  pub mime_type:         String,
  pub size:              u64,
  pub description:       Option<String>,
  pub uploaded_by:       Uuid,
  pub uploaded_at:       DateTime<Utc>,
  pub location:          StorageLocation,
}

impl File {
  pub fn is_image(&self) -> bool { self.mime_type.starts_with("image/") }

  pub fn is_pdf(&self) -> bool { self.mime_type == "application/pdf" }
}

/// Input to [`crate::store::KnowledgeStore::upload_file`].
#[derive(Debug, Clone)]
pub struct NewFile {
  pub original_filename: String,
  pub mime_type:         String,
  pub description:       Option<String>,
  pub content:           FileContent,
}

impl NewFile {
  pub fn inline(
    original_filename: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: Vec<u8>,
  ) -> Self {
    Self {
      original_filename: original_filename.into(),
      mime_type:         mime_type.into(),
      description:       None,
      content:           FileContent::Inline(bytes),
    }
  }

  /// The sanitised original name and its lowercase extension, or a
  /// validation error if the extension is missing or not allowed.
  pub fn checked_name(&self) -> Result<(String, String)> {
    let name = sanitize_filename(&self.original_filename);
    let ext = Path::new(&name)
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase)
      .ok_or_else(|| {
        Error::validation(format!("file {name:?} has no extension"))
      })?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
      return Err(Error::validation(format!(
        "file type .{ext} is not allowed"
      )));
    }
    Ok((name, ext))
  }
}

/// Generate the storage name for a new file with extension `ext`.
pub fn storage_name(ext: &str) -> String {
  format!("{}.{ext}", Uuid::new_v4().simple())
}

/// Strip directory components and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let cleaned: String = base
    .chars()
    .map(|c| match c {
      c if c.is_ascii_alphanumeric() => c,
      '.' | '-' | '_' => c,
      _ => '_',
    })
    .collect();
  cleaned.trim_start_matches('.').to_owned()
}

// ─── Article ↔ File ──────────────────────────────────────────────────────────

/// A reference from an article to a file, with optional annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleFile {
  pub link_id:        Uuid,
  pub article_id:     Uuid,
  pub file_id:        Uuid,
  pub reference_text: Option<String>,
  pub added_at:       DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitize_strips_paths_and_odd_characters() {
    assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_filename("C:\\docs\\My Report.PDF"), "My_Report.PDF");
    assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
  }

  #[test]
  fn checked_name_enforces_allow_list() {
    let ok = NewFile::inline("Scan.JPG", "image/jpeg", vec![1, 2, 3]);
    assert_eq!(ok.checked_name().unwrap(), ("Scan.JPG".into(), "jpg".into()));

    let exe = NewFile::inline("tool.exe", "application/octet-stream", vec![]);
    assert!(matches!(exe.checked_name(), Err(Error::Validation(_))));

    let bare = NewFile::inline("README", "text/plain", vec![]);
    assert!(matches!(bare.checked_name(), Err(Error::Validation(_))));
  }

  #[test]
  fn storage_name_keeps_extension() {
    let name = storage_name("pdf");
    assert!(name.ends_with(".pdf"));
    assert_eq!(name.len(), 32 + 4);
  }
}
