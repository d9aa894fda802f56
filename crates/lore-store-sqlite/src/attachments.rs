//! The file catalogue and article ↔ file links.

use chrono::Utc;
use lore_core::{
  Error as CoreError,
  file::{ArticleFile, File, FileContent, NewFile, StorageLocation, storage_name},
  permission,
  user::Actor,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{FILE_COLUMNS, LINK_COLUMNS, RawFile, RawLink, encode_dt, encode_uuid},
  lifecycle,
};

// ─── Files ───────────────────────────────────────────────────────────────────

/// Validate and insert a file record. Permission checks are the caller's.
pub fn insert_file(conn: &Connection, uploaded_by: Uuid, input: &NewFile) -> Result<File> {
  let (original_filename, ext) = input.checked_name()?;
  if input.content.size() == 0 {
    return Err(CoreError::validation(format!("file {original_filename:?} is empty")).into());
  }

  let (location, content, path) = match &input.content {
    FileContent::Inline(bytes) => (StorageLocation::Database, Some(bytes.as_slice()), None),
    FileContent::OnDisk { path, .. } => (
      StorageLocation::Filesystem { path: path.clone() },
      None,
      Some(path.to_string_lossy().into_owned()),
    ),
  };

  let file = File {
    file_id: Uuid::new_v4(),
    filename: storage_name(&ext),
    original_filename,
    mime_type: input.mime_type.clone(),
    size: input.content.size(),
    description: input.description.clone(),
    uploaded_by,
    uploaded_at: Utc::now(),
    location,
  };
  let size = i64::try_from(file.size)
    .map_err(|_| CoreError::validation("file is too large"))?;

  conn.execute(
    "INSERT INTO files (
       file_id, filename, original_filename, mime_type, size, description,
       uploaded_by, uploaded_at, stored_in_db, content, file_path
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      encode_uuid(file.file_id),
      file.filename,
      file.original_filename,
      file.mime_type,
      size,
      file.description,
      encode_uuid(file.uploaded_by),
      encode_dt(file.uploaded_at),
      content.is_some(),
      content,
      path,
    ],
  )?;

  tracing::debug!(file_id = %file.file_id, size = file.size, "file stored");
  Ok(file)
}

pub fn upload(conn: &Connection, actor: Actor, input: &NewFile) -> Result<File> {
  if !permission::can_upload(&actor) {
    return Err(CoreError::denied("only editors and admins may upload files").into());
  }
  insert_file(conn, actor.id, input)
}

pub fn get_file(conn: &Connection, id: Uuid) -> Result<Option<File>> {
  conn
    .query_row(
      &format!("SELECT {FILE_COLUMNS} FROM files WHERE file_id = ?1"),
      params![encode_uuid(id)],
      RawFile::from_row,
    )
    .optional()?
    .map(RawFile::into_file)
    .transpose()
}

/// Bytes of a database-held file. `None` if absent or held on disk.
pub fn content(conn: &Connection, id: Uuid) -> Result<Option<Vec<u8>>> {
  Ok(
    conn
      .query_row(
        "SELECT content FROM files WHERE file_id = ?1 AND stored_in_db = 1",
        params![encode_uuid(id)],
        |row| row.get(0),
      )
      .optional()?,
  )
}

pub fn list_files(conn: &Connection) -> Result<Vec<File>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {FILE_COLUMNS} FROM files ORDER BY uploaded_at DESC, rowid DESC"
  ))?;
  let raws = stmt
    .query_map([], RawFile::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawFile::into_file).collect()
}

pub fn delete_file(conn: &Connection, actor: Actor, id: Uuid) -> Result<File> {
  let file = get_file(conn, id)?.ok_or(CoreError::not_found("file", id))?;
  if !permission::can_delete_file(&actor, &file) {
    return Err(CoreError::denied("only the uploader or an admin may delete a file").into());
  }

  let id_str = encode_uuid(id);
  let unlinked =
    conn.execute("DELETE FROM article_files WHERE file_id = ?1", params![id_str])?;
  conn.execute("DELETE FROM files WHERE file_id = ?1", params![id_str])?;

  tracing::info!(file_id = %id, links_removed = unlinked, "file deleted");
  Ok(file)
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Insert a new link row unconditionally.
pub fn insert_link(
  conn: &Connection,
  article_id: Uuid,
  file_id: Uuid,
  reference_text: Option<&str>,
) -> Result<ArticleFile> {
  let link = ArticleFile {
    link_id: Uuid::new_v4(),
    article_id,
    file_id,
    reference_text: reference_text.map(str::to_owned),
    added_at: Utc::now(),
  };
  conn.execute(
    "INSERT INTO article_files (link_id, article_id, file_id, reference_text, added_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(link.link_id),
      encode_uuid(link.article_id),
      encode_uuid(link.file_id),
      link.reference_text,
      encode_dt(link.added_at),
    ],
  )?;
  Ok(link)
}

fn links_between(conn: &Connection, article_id: Uuid, file_id: Uuid) -> Result<Vec<ArticleFile>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {LINK_COLUMNS} FROM article_files
     WHERE article_id = ?1 AND file_id = ?2
     ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(
      params![encode_uuid(article_id), encode_uuid(file_id)],
      RawLink::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawLink::into_link).collect()
}

/// Link `file_id` to the article, or re-annotate the existing link(s).
pub fn link(
  conn: &Connection,
  actor: Actor,
  article_id: Uuid,
  file_id: Uuid,
  reference_text: Option<&str>,
) -> Result<ArticleFile> {
  lifecycle::load_editable(conn, actor, article_id)?;
  if get_file(conn, file_id)?.is_none() {
    return Err(CoreError::not_found("file", file_id).into());
  }

  let existing = links_between(conn, article_id, file_id)?;
  let Some(first) = existing.into_iter().next() else {
    let link = insert_link(conn, article_id, file_id, reference_text)?;
    tracing::debug!(%article_id, %file_id, "file linked");
    return Ok(link);
  };

  conn.execute(
    "UPDATE article_files SET reference_text = ?3
     WHERE article_id = ?1 AND file_id = ?2",
    params![encode_uuid(article_id), encode_uuid(file_id), reference_text],
  )?;
  Ok(ArticleFile {
    reference_text: reference_text.map(str::to_owned),
    ..first
  })
}

pub fn unlink(conn: &Connection, actor: Actor, article_id: Uuid, file_id: Uuid) -> Result<()> {
  lifecycle::load_editable(conn, actor, article_id)?;
  let removed = conn.execute(
    "DELETE FROM article_files WHERE article_id = ?1 AND file_id = ?2",
    params![encode_uuid(article_id), encode_uuid(file_id)],
  )?;
  tracing::debug!(%article_id, %file_id, removed, "file unlinked");
  Ok(())
}

pub fn list_links(conn: &Connection, actor: Actor, article_id: Uuid) -> Result<Vec<ArticleFile>> {
  lifecycle::load_visible(conn, actor, article_id)?;
  let mut stmt = conn.prepare(&format!(
    "SELECT {LINK_COLUMNS} FROM article_files
     WHERE article_id = ?1
     ORDER BY added_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(article_id)], RawLink::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawLink::into_link).collect()
}

pub fn delete_links_for_article(conn: &Connection, article_id: Uuid) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM article_files WHERE article_id = ?1",
    params![encode_uuid(article_id)],
  )?)
}
