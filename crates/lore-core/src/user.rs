//! Users, roles, and the acting principal passed into every operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, article::require_text};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The closed set of roles. Editor capability is held by editors and admins.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Editor,
  #[default]
  User,
}

impl Role {
  pub fn is_admin(self) -> bool { matches!(self, Self::Admin) }

  /// Admins implicitly hold every editor capability.
  pub fn is_editor(self) -> bool {
    match self {
      Self::Admin | Self::Editor => true,
      Self::User => false,
    }
  }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The authenticated caller of an operation. The core trusts this value; it
/// is produced by the authentication layer from a stored [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:   Uuid,
  pub role: Role,
}

impl Actor {
  pub fn new(id: Uuid, role: Role) -> Self { Self { id, role } }

  pub fn is_admin(&self) -> bool { self.role.is_admin() }

  pub fn is_editor(&self) -> bool { self.role.is_editor() }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  /// argon2 PHC string. Never leaves the server.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role:          Role,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
}

impl User {
  pub fn actor(&self) -> Actor { Actor::new(self.user_id, self.role) }
}

/// Input to [`crate::store::KnowledgeStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
  pub role:          Role,
}

impl NewUser {
  pub fn validate(&self) -> Result<()> {
    require_text("username", &self.username)?;
    require_email(&self.email)?;
    require_text("password", &self.password_hash)?;
    Ok(())
  }
}

fn require_email(email: &str) -> Result<()> {
  match email.trim().split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
    _ => Err(Error::validation(format!("invalid email address: {email:?}"))),
  }
}

/// Admin-side edit of an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
  pub username:  Option<String>,
  pub email:     Option<String>,
  pub full_name: Option<String>,
  pub role:      Option<Role>,
  pub active:    Option<bool>,
}

impl UserUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(username) = &self.username {
      require_text("username", username)?;
    }
    match &self.email {
      Some(email) => require_email(email),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admin_holds_editor_capability() {
    assert!(Role::Admin.is_editor());
    assert!(Role::Editor.is_editor());
    assert!(!Role::User.is_editor());
    assert!(!Role::Editor.is_admin());
  }

  #[test]
  fn role_parses_from_lowercase() {
    assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
    assert_eq!(Role::Admin.to_string(), "admin");
    assert!("superuser".parse::<Role>().is_err());
  }

  #[test]
  fn new_user_needs_a_plausible_email() {
    let mut input = NewUser {
      username:      "ana".into(),
      email:         "ana@example.org".into(),
      full_name:     None,
      password_hash: "$argon2id$stub".into(),
      role:          Role::User,
    };
    assert!(input.validate().is_ok());

    input.email = "ana.example.org".into();
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    input.email = "ana@localhost".into();
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }
}
