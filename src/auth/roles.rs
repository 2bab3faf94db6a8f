use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::extractors::CurrentUser;
use crate::error::AppError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

/// Whether the authenticated user's role is one of `allowed`.
pub fn allow(user: &CurrentUser, allowed: &HashSet<Role>) -> bool {
    allowed.contains(&user.role())
}

pub fn restrict_to(user: &CurrentUser, allowed: &HashSet<Role>) -> Result<(), AppError> {
    if allow(user, allowed) {
        return Ok(());
    }
    warn!(user_id = %user.id(), role = ?user.role(), "role not permitted");
    Err(AppError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user_with(role: Role) -> CurrentUser {
        CurrentUser(User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "t@x.com".into(),
            password_hash: "hash".into(),
            role,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    #[test]
    fn only_admin_passes_admin_set() {
        let admins = HashSet::from([Role::Admin]);
        assert!(allow(&user_with(Role::Admin), &admins));
        for role in [Role::User, Role::Guide, Role::LeadGuide] {
            assert!(!allow(&user_with(role), &admins), "{role:?} should be rejected");
        }
    }

    #[test]
    fn restrict_to_is_forbidden_not_unauthenticated() {
        let editors = HashSet::from([Role::Admin, Role::LeadGuide]);
        assert!(restrict_to(&user_with(Role::LeadGuide), &editors).is_ok());
        let err = restrict_to(&user_with(Role::Guide), &editors).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn empty_set_allows_nobody() {
        assert!(!allow(&user_with(Role::Admin), &HashSet::new()));
    }

    #[test]
    fn roles_use_kebab_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&Role::LeadGuide).unwrap(), "\"lead-guide\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(Role::default(), Role::User);
    }
}
