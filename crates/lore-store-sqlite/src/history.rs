//! The audit trail inside the caller's transaction.

use lore_core::history::HistoryEntry;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{HISTORY_COLUMNS, RawHistory, encode_dt, encode_uuid},
};

pub fn insert(conn: &Connection, entry: &HistoryEntry) -> Result<()> {
  conn.execute(
    "INSERT INTO article_history (
       history_id, article_id, user_id, action,
       old_status, new_status, recorded_at, version_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(entry.history_id),
      encode_uuid(entry.article_id),
      encode_uuid(entry.user_id),
      entry.action.as_ref(),
      entry.old_status.map(|s| s.to_string()),
      entry.new_status.map(|s| s.to_string()),
      encode_dt(entry.recorded_at),
      entry.version_id.map(encode_uuid),
    ],
  )?;

  tracing::debug!(
    article_id = %entry.article_id,
    action = %entry.action,
    "history recorded"
  );
  Ok(())
}

/// An article's trail, newest first.
pub fn list(conn: &Connection, article_id: Uuid) -> Result<Vec<HistoryEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {HISTORY_COLUMNS} FROM article_history
     WHERE article_id = ?1
     ORDER BY rowid DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(article_id)], RawHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawHistory::into_entry).collect()
}

pub fn delete_for_article(conn: &Connection, article_id: Uuid) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM article_history WHERE article_id = ?1",
    params![encode_uuid(article_id)],
  )?)
}
