//! Categories (a tree rooted at `General`) and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, article::require_text};

/// Name of the fallback category. It is created when a store is opened and
/// can never be deleted or renamed.
pub const GENERAL_CATEGORY: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub parent_id:   Option<Uuid>,
  pub created_at:  DateTime<Utc>,
}

impl Category {
  pub fn is_general(&self) -> bool { self.name == GENERAL_CATEGORY }
}

/// Input to [`crate::store::KnowledgeStore::create_category`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  pub description: Option<String>,
  pub parent_id:   Option<Uuid>,
}

impl NewCategory {
  pub fn validate(&self) -> Result<()> { require_text("category name", &self.name) }
}

/// Edit of an existing category. `parent_id: Some(None)` moves the category
/// to the top level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
  #[serde(default, deserialize_with = "double_option::deserialize")]
  pub parent_id:   Option<Option<Uuid>>,
}

impl CategoryUpdate {
  pub fn validate(&self) -> Result<()> {
    match &self.name {
      Some(name) => require_text("category name", name),
      None => Ok(()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id: Uuid,
  pub name:   String,
}

/// Trim, drop empties, and de-duplicate a list of tag names, preserving the
/// first spelling of each.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(names.len());
  for name in names {
    let name = name.trim();
    if !name.is_empty() && !out.iter().any(|n| n == name) {
      out.push(name.to_owned());
    }
  }
  out
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
  where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
  {
    Deserialize::deserialize(de).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tag_names_are_trimmed_and_deduplicated() {
    let raw = vec![
      " policy ".to_string(),
      "hr".to_string(),
      "".to_string(),
      "policy".to_string(),
    ];
    assert_eq!(normalize_tag_names(&raw), ["policy", "hr"]);
  }

  #[test]
  fn category_update_distinguishes_null_parent() {
    let absent: CategoryUpdate = serde_json::from_str("{}").unwrap();
    assert_eq!(absent.parent_id, None);

    let cleared: CategoryUpdate =
      serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
    assert_eq!(cleared.parent_id, Some(None));
  }
}
