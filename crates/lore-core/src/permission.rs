//! Access decisions. Pure functions of the actor and the target; no I/O.

use crate::{
  article::{Article, ArticleStatus},
  file::File,
  user::{Actor, Role},
};

/// Admins and editors see every article; plain users only approved ones.
pub fn can_view(actor: &Actor, article: &Article) -> bool {
  match actor.role {
    Role::Admin | Role::Editor => true,
    Role::User => article.status == ArticleStatus::Approved,
  }
}

/// Admins edit anything. Editors edit articles they created or are assigned
/// to. Plain users edit nothing.
pub fn can_edit(actor: &Actor, article: &Article) -> bool {
  match actor.role {
    Role::Admin => true,
    Role::Editor => {
      actor.id == article.created_by
        || article.assigned_editor_id == Some(actor.id)
    }
    Role::User => false,
  }
}

/// Version snapshots and the audit trail are visible to editors and admins.
pub fn can_view_history(actor: &Actor, _article: &Article) -> bool {
  actor.role.is_editor()
}

pub fn can_create(actor: &Actor) -> bool { actor.role.is_editor() }

/// Editor assignment, deletion, and catalogue management.
pub fn can_administer(actor: &Actor) -> bool { actor.role.is_admin() }

pub fn can_upload(actor: &Actor) -> bool { actor.role.is_editor() }

pub fn can_delete_file(actor: &Actor, file: &File) -> bool {
  actor.role.is_admin() || file.uploaded_by == actor.id
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn article(created_by: Uuid, status: ArticleStatus) -> Article {
    let now = Utc::now();
    Article {
      article_id: Uuid::new_v4(),
      title: "t".into(),
      body: "b".into(),
      status,
      category_id: Uuid::new_v4(),
      tags: vec![],
      created_by,
      updated_by: created_by,
      assigned_editor_id: None,
      created_at: now,
      updated_at: now,
    }
  }

  fn actor(role: Role) -> Actor { Actor::new(Uuid::new_v4(), role) }

  #[test]
  fn admin_views_every_status() {
    let admin = actor(Role::Admin);
    for status in [
      ArticleStatus::Draft,
      ArticleStatus::InReview,
      ArticleStatus::Approved,
      ArticleStatus::Archived,
    ] {
      assert!(can_view(&admin, &article(Uuid::new_v4(), status)));
    }
  }

  #[test]
  fn plain_user_views_only_approved() {
    let user = actor(Role::User);
    let author = Uuid::new_v4();
    assert!(can_view(&user, &article(author, ArticleStatus::Approved)));
    assert!(!can_view(&user, &article(author, ArticleStatus::Draft)));
    assert!(!can_view(&user, &article(author, ArticleStatus::InReview)));
    assert!(!can_view(&user, &article(author, ArticleStatus::Archived)));
  }

  #[test]
  fn editor_edit_rights_follow_ownership_and_assignment() {
    let creator = actor(Role::Editor);
    let assigned = actor(Role::Editor);
    let unrelated = actor(Role::Editor);

    let mut a = article(creator.id, ArticleStatus::Draft);
    a.assigned_editor_id = Some(assigned.id);

    assert!(can_edit(&creator, &a));
    assert!(can_edit(&assigned, &a));
    assert!(!can_edit(&unrelated, &a));
    assert!(can_edit(&actor(Role::Admin), &a));
  }

  #[test]
  fn plain_user_never_edits_even_own_article() {
    let user = actor(Role::User);
    let mut a = article(user.id, ArticleStatus::Approved);
    a.assigned_editor_id = Some(user.id);
    assert!(!can_edit(&user, &a));
  }

  #[test]
  fn history_is_for_editors_and_admins() {
    let a = article(Uuid::new_v4(), ArticleStatus::Approved);
    assert!(can_view_history(&actor(Role::Admin), &a));
    assert!(can_view_history(&actor(Role::Editor), &a));
    assert!(!can_view_history(&actor(Role::User), &a));
  }
}
