//! Version snapshots inside the caller's transaction.

use lore_core::{
  article::Article,
  version::{ArticleVersion, next_version_number},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawVersion, VERSION_COLUMNS, encode_dt, encode_uuid},
};

/// Snapshot `article` as it stands now and insert the snapshot.
///
/// Must run inside the write transaction that applied the change, so the
/// `max() + 1` read and the insert are covered by the same lock.
pub fn create_snapshot(
  conn: &Connection,
  article: &Article,
  actor_id: Uuid,
) -> Result<ArticleVersion> {
  let current_max: Option<u32> = conn.query_row(
    "SELECT MAX(version_number) FROM article_versions WHERE article_id = ?1",
    params![encode_uuid(article.article_id)],
    |row| row.get(0),
  )?;

  let version =
    ArticleVersion::snapshot(article, next_version_number(current_max), actor_id);

  conn.execute(
    "INSERT INTO article_versions (
       version_id, article_id, version_number, title, body,
       status, category_id, created_by, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(version.version_id),
      encode_uuid(version.article_id),
      version.version_number,
      version.title,
      version.body,
      version.status.as_ref(),
      encode_uuid(version.category_id),
      encode_uuid(version.created_by),
      encode_dt(version.created_at),
    ],
  )?;

  tracing::debug!(
    article_id = %version.article_id,
    version = version.version_number,
    "snapshot recorded"
  );
  Ok(version)
}

/// All snapshots of an article, newest first.
pub fn list(conn: &Connection, article_id: Uuid) -> Result<Vec<ArticleVersion>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VERSION_COLUMNS} FROM article_versions
     WHERE article_id = ?1
     ORDER BY version_number DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(article_id)], RawVersion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVersion::into_version).collect()
}

pub fn get(conn: &Connection, version_id: Uuid) -> Result<Option<ArticleVersion>> {
  conn
    .query_row(
      &format!("SELECT {VERSION_COLUMNS} FROM article_versions WHERE version_id = ?1"),
      params![encode_uuid(version_id)],
      RawVersion::from_row,
    )
    .optional()?
    .map(RawVersion::into_version)
    .transpose()
}
