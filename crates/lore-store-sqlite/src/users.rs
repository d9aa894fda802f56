//! User accounts.

use chrono::Utc;
use lore_core::{
  Error as CoreError,
  permission,
  user::{Actor, NewUser, Role, User, UserUpdate},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::require_admin,
  encode::{RawUser, USER_COLUMNS, encode_dt, encode_uuid},
};

fn select_one(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
      params![value],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<User>> {
  select_one(conn, "user_id", &encode_uuid(id))
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
  select_one(conn, "username", username.trim())
}

fn require_unique(
  conn: &Connection,
  username: Option<&str>,
  email: Option<&str>,
  except: Option<Uuid>,
) -> Result<()> {
  let except = except.map(encode_uuid).unwrap_or_default();
  let taken = |column: &str, value: &str| -> Result<bool> {
    Ok(
      conn
        .query_row(
          &format!("SELECT 1 FROM users WHERE {column} = ?1 AND user_id != ?2"),
          params![value, except],
          |_| Ok(()),
        )
        .optional()?
        .is_some(),
    )
  };
  if let Some(username) = username
    && taken("username", username)?
  {
    return Err(CoreError::validation(format!("username {username:?} is already taken")).into());
  }
  if let Some(email) = email
    && taken("email", email)?
  {
    return Err(CoreError::validation(format!("email {email:?} is already registered")).into());
  }
  Ok(())
}

/// Register a user. Only an admin may pick a role other than `user`.
pub fn create(conn: &Connection, actor: Option<Actor>, input: &NewUser) -> Result<User> {
  let role = match actor {
    Some(actor) if permission::can_administer(&actor) => input.role,
    _ => Role::User,
  };
  insert(conn, input, role)
}

/// Create the initial admin unless a user with that name already exists.
pub fn bootstrap_admin(conn: &Connection, input: &NewUser) -> Result<Option<User>> {
  if find_by_username(conn, &input.username)?.is_some() {
    return Ok(None);
  }
  insert(conn, input, Role::Admin).map(Some)
}

fn insert(conn: &Connection, input: &NewUser, role: Role) -> Result<User> {
  input.validate()?;

  let username = input.username.trim().to_owned();
  let email = input.email.trim().to_owned();
  require_unique(conn, Some(&username), Some(&email), None)?;

  let user = User {
    user_id: Uuid::new_v4(),
    username,
    email,
    full_name: input.full_name.clone(),
    password_hash: input.password_hash.clone(),
    role,
    active: true,
    created_at: Utc::now(),
  };
  conn.execute(
    "INSERT INTO users (
       user_id, username, email, full_name, password_hash, role, active, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(user.user_id),
      user.username,
      user.email,
      user.full_name,
      user.password_hash,
      user.role.as_ref(),
      user.active,
      encode_dt(user.created_at),
    ],
  )?;

  tracing::info!(
    user_id = %user.user_id,
    username = %user.username,
    role = %user.role,
    "user created"
  );
  Ok(user)
}

pub fn list(conn: &Connection, actor: Actor) -> Result<Vec<User>> {
  require_admin(&actor, "list users")?;
  let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))?;
  let raws = stmt
    .query_map([], RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawUser::into_user).collect()
}

/// Admin edit of an account. Demoting or deactivating a user releases every
/// article they were assigned to edit, in the same transaction.
pub fn update(conn: &Connection, actor: Actor, id: Uuid, update: &UserUpdate) -> Result<User> {
  require_admin(&actor, "edit users")?;
  update.validate()?;

  let mut user = get(conn, id)?.ok_or(CoreError::not_found("user", id))?;
  if let Some(username) = &update.username {
    let username = username.trim();
    require_unique(conn, Some(username), None, Some(id))?;
    user.username = username.to_owned();
  }
  if let Some(email) = &update.email {
    let email = email.trim();
    require_unique(conn, None, Some(email), Some(id))?;
    user.email = email.to_owned();
  }
  if let Some(full_name) = &update.full_name {
    user.full_name = Some(full_name.clone());
  }
  if let Some(role) = update.role {
    user.role = role;
  }
  if let Some(active) = update.active {
    user.active = active;
  }

  conn.execute(
    "UPDATE users SET username = ?2, email = ?3, full_name = ?4, role = ?5, active = ?6
     WHERE user_id = ?1",
    params![
      encode_uuid(id),
      user.username,
      user.email,
      user.full_name,
      user.role.as_ref(),
      user.active,
    ],
  )?;

  if !user.role.is_editor() || !user.active {
    let released = conn.execute(
      "UPDATE articles SET assigned_editor_id = NULL WHERE assigned_editor_id = ?1",
      params![encode_uuid(id)],
    )?;
    if released > 0 {
      tracing::info!(user_id = %id, released, "editor assignments cleared");
    }
  }
  Ok(user)
}

pub fn set_password_hash(
  conn: &Connection,
  actor: Actor,
  id: Uuid,
  password_hash: &str,
) -> Result<()> {
  if actor.id != id && !permission::can_administer(&actor) {
    return Err(CoreError::denied("you may only change your own password").into());
  }
  if password_hash.is_empty() {
    return Err(CoreError::validation("password is required").into());
  }
  let changed = conn.execute(
    "UPDATE users SET password_hash = ?2 WHERE user_id = ?1",
    params![encode_uuid(id), password_hash],
  )?;
  if changed == 0 {
    return Err(CoreError::not_found("user", id).into());
  }
  Ok(())
}

/// Remove a user nobody references. Authors of articles, versions, history
/// or files cannot be removed; deactivate them instead.
pub fn delete(conn: &Connection, actor: Actor, id: Uuid) -> Result<()> {
  require_admin(&actor, "delete users")?;
  if actor.id == id {
    return Err(CoreError::validation("you cannot delete your own account").into());
  }

  let result = conn.execute("DELETE FROM users WHERE user_id = ?1", params![encode_uuid(id)]);
  match result.map_err(Error::from) {
    Ok(0) => Err(CoreError::not_found("user", id).into()),
    Ok(_) => {
      tracing::info!(user_id = %id, "user deleted");
      Ok(())
    }
    Err(e) if e.is_constraint_violation() => Err(
      CoreError::Conflict(format!("user {id} is still referenced; deactivate it instead")).into(),
    ),
    Err(e) => Err(e),
  }
}
