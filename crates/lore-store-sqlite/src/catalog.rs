//! Categories and tags.

use chrono::Utc;
use lore_core::{
  Error as CoreError,
  category::{
    Category, CategoryUpdate, GENERAL_CATEGORY, NewCategory, Tag,
    normalize_tag_names,
  },
  permission,
  user::Actor,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CATEGORY_COLUMNS, RawCategory, decode_uuid, encode_dt, encode_uuid,
    into_tag, tag_from_row,
  },
  schema::SEED_GENERAL,
};

pub(crate) fn require_admin(actor: &Actor, what: &str) -> Result<()> {
  if !permission::can_administer(actor) {
    return Err(CoreError::denied(format!("only an admin may {what}")).into());
  }
  Ok(())
}

// ─── Categories ──────────────────────────────────────────────────────────────

/// Create the `General` category if this database does not have one yet.
pub fn seed_general(conn: &Connection) -> Result<()> {
  let inserted = conn.execute(
    SEED_GENERAL,
    params![encode_uuid(Uuid::new_v4()), GENERAL_CATEGORY, encode_dt(Utc::now())],
  )?;
  if inserted > 0 {
    tracing::info!("created the {GENERAL_CATEGORY} category");
  }
  Ok(())
}

pub fn general_id(conn: &Connection) -> Result<Uuid> {
  let id: String = conn.query_row(
    "SELECT category_id FROM categories WHERE name = ?1",
    params![GENERAL_CATEGORY],
    |row| row.get(0),
  )?;
  decode_uuid(&id)
}

pub fn get_category(conn: &Connection, id: Uuid) -> Result<Option<Category>> {
  conn
    .query_row(
      &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
      params![encode_uuid(id)],
      RawCategory::from_row,
    )
    .optional()?
    .map(RawCategory::into_category)
    .transpose()
}

/// Fails with a validation error when `id` names no category.
pub fn require_category(conn: &Connection, id: Uuid) -> Result<Category> {
  get_category(conn, id)?
    .ok_or_else(|| CoreError::validation(format!("unknown category {id}")).into())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
  ))?;
  let raws = stmt
    .query_map([], RawCategory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCategory::into_category).collect()
}

fn name_taken(conn: &Connection, name: &str, except: Option<Uuid>) -> Result<bool> {
  let found: Option<String> = conn
    .query_row(
      "SELECT category_id FROM categories WHERE name = ?1",
      params![name],
      |row| row.get(0),
    )
    .optional()?;
  Ok(match (found, except) {
    (Some(found), Some(except)) => found != encode_uuid(except),
    (found, _) => found.is_some(),
  })
}

pub fn create_category(
  conn: &Connection,
  actor: Actor,
  input: &NewCategory,
) -> Result<Category> {
  require_admin(&actor, "manage categories")?;
  input.validate()?;

  let name = input.name.trim().to_owned();
  if name_taken(conn, &name, None)? {
    return Err(CoreError::validation(format!("category {name:?} already exists")).into());
  }
  if let Some(parent) = input.parent_id {
    require_category(conn, parent)?;
  }

  let category = Category {
    category_id: Uuid::new_v4(),
    name,
    description: input.description.clone(),
    parent_id: input.parent_id,
    created_at: Utc::now(),
  };
  conn.execute(
    "INSERT INTO categories (category_id, name, description, parent_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(category.category_id),
      category.name,
      category.description,
      category.parent_id.map(encode_uuid),
      encode_dt(category.created_at),
    ],
  )?;

  tracing::info!(category_id = %category.category_id, name = %category.name, "category created");
  Ok(category)
}

/// Whether making `parent` the parent of `id` would close a loop.
fn would_cycle(conn: &Connection, id: Uuid, parent: Uuid) -> Result<bool> {
  let mut cursor = Some(parent);
  while let Some(current) = cursor {
    if current == id {
      return Ok(true);
    }
    cursor = get_category(conn, current)?.and_then(|c| c.parent_id);
  }
  Ok(false)
}

pub fn update_category(
  conn: &Connection,
  actor: Actor,
  id: Uuid,
  update: &CategoryUpdate,
) -> Result<Category> {
  require_admin(&actor, "manage categories")?;
  update.validate()?;

  let mut category =
    get_category(conn, id)?.ok_or(CoreError::not_found("category", id))?;

  if let Some(name) = &update.name {
    let name = name.trim();
    if name != category.name {
      if category.is_general() {
        return Err(
          CoreError::validation(format!("the {GENERAL_CATEGORY} category cannot be renamed"))
            .into(),
        );
      }
      if name_taken(conn, name, Some(id))? {
        return Err(CoreError::validation(format!("category {name:?} already exists")).into());
      }
      category.name = name.to_owned();
    }
  }
  if let Some(description) = &update.description {
    category.description = Some(description.clone());
  }
  if let Some(parent_id) = update.parent_id {
    if let Some(parent) = parent_id {
      require_category(conn, parent)?;
      if would_cycle(conn, id, parent)? {
        return Err(CoreError::validation("a category cannot descend from itself").into());
      }
    }
    category.parent_id = parent_id;
  }

  conn.execute(
    "UPDATE categories SET name = ?2, description = ?3, parent_id = ?4
     WHERE category_id = ?1",
    params![
      encode_uuid(id),
      category.name,
      category.description,
      category.parent_id.map(encode_uuid),
    ],
  )?;
  Ok(category)
}

/// Move the category's articles to `General` and its children up one level,
/// then remove it. Runs inside the caller's transaction.
pub fn delete_category(conn: &Connection, actor: Actor, id: Uuid) -> Result<()> {
  let category =
    get_category(conn, id)?.ok_or(CoreError::not_found("category", id))?;
  if category.is_general() {
    return Err(
      CoreError::validation(format!("the {GENERAL_CATEGORY} category cannot be deleted"))
        .into(),
    );
  }
  require_admin(&actor, "manage categories")?;

  let id_str = encode_uuid(id);
  let general = encode_uuid(general_id(conn)?);

  let moved = conn.execute(
    "UPDATE articles SET category_id = ?2 WHERE category_id = ?1",
    params![id_str, general],
  )?;
  let reparented = conn.execute(
    "UPDATE categories SET parent_id = ?2 WHERE parent_id = ?1",
    params![id_str, category.parent_id.map(encode_uuid)],
  )?;
  conn.execute("DELETE FROM categories WHERE category_id = ?1", params![id_str])?;

  tracing::info!(
    category_id = %id,
    articles_moved = moved,
    children_reparented = reparented,
    "category deleted"
  );
  Ok(())
}

// ─── Tags ────────────────────────────────────────────────────────────────────

/// The id of the tag called `name`, creating it if needed.
fn resolve_tag(conn: &Connection, name: &str) -> Result<String> {
  conn.execute(
    "INSERT INTO tags (tag_id, name) VALUES (?1, ?2)
     ON CONFLICT(name) DO NOTHING",
    params![encode_uuid(Uuid::new_v4()), name],
  )?;
  Ok(conn.query_row(
    "SELECT tag_id FROM tags WHERE name = ?1",
    params![name],
    |row| row.get(0),
  )?)
}

/// Replace an article's tag set and return the resulting names, sorted.
pub fn replace_tags(
  conn: &Connection,
  article_id: Uuid,
  names: &[String],
) -> Result<Vec<String>> {
  let article = encode_uuid(article_id);
  conn.execute("DELETE FROM article_tags WHERE article_id = ?1", params![article])?;

  let mut names = normalize_tag_names(names);
  for name in &names {
    let tag_id = resolve_tag(conn, name)?;
    conn.execute(
      "INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
      params![article, tag_id],
    )?;
  }
  names.sort();
  Ok(names)
}

pub fn tags_for(conn: &Connection, article_id: Uuid) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT t.name FROM tags t
     JOIN article_tags l ON l.tag_id = t.tag_id
     WHERE l.article_id = ?1
     ORDER BY t.name",
  )?;
  Ok(
    stmt
      .query_map(params![encode_uuid(article_id)], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?,
  )
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
  let mut stmt = conn.prepare("SELECT tag_id, name FROM tags ORDER BY name")?;
  let raws = stmt
    .query_map([], tag_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(into_tag).collect()
}

pub fn delete_tag(conn: &Connection, actor: Actor, id: Uuid) -> Result<()> {
  require_admin(&actor, "manage tags")?;
  let id_str = encode_uuid(id);
  conn.execute("DELETE FROM article_tags WHERE tag_id = ?1", params![id_str])?;
  if conn.execute("DELETE FROM tags WHERE tag_id = ?1", params![id_str])? == 0 {
    return Err(CoreError::not_found("tag", id).into());
  }
  Ok(())
}
