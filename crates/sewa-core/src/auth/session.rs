//! Logged-in session state and the capability gate.

use serde::{Deserialize, Serialize};

use super::{AuthError, AuthResult};
use crate::models::{Capability, OrgScope, PermissionSet, Role, User};

/// A logged-in session.
///
/// Serializes to JSON so a shell can stash it in local storage and restore it
/// on startup without re-authenticating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub username: String,
    pub role: Role,
    /// Organization context operations run in
    pub org: OrgScope,
    /// Effective permissions resolved at login time
    pub permissions: PermissionSet,
    pub fiscal_year: String,
}

impl Session {
    /// Build a session for an authenticated user.
    pub fn for_user(user: &User, fiscal_year: String) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            org: OrgScope::Org(user.org_id.clone()),
            permissions: user.effective_permissions(),
            fiscal_year,
        }
    }

    /// Whether the session holds a capability.
    pub fn can(&self, cap: Capability) -> bool {
        self.permissions.contains(cap)
    }

    /// Gate a mutating action on a capability.
    pub fn require(&self, cap: Capability) -> AuthResult<()> {
        if self.can(cap) {
            Ok(())
        } else {
            Err(AuthError::AccessDenied(cap))
        }
    }

    /// The organization writes go to.
    ///
    /// The cross-org view has no unambiguous owner, so it refuses every
    /// create/mutate path.
    pub fn writable_org(&self) -> AuthResult<&str> {
        self.org.org_id().ok_or(AuthError::AmbiguousOrganization)
    }

    /// Switch the organization filter.
    ///
    /// Only a super admin may look across organizations or into another
    /// branch; everyone else stays pinned to their own.
    pub fn select_scope(&mut self, scope: OrgScope) -> AuthResult<()> {
        if self.role != Role::SuperAdmin {
            match &scope {
                OrgScope::Org(id) if Some(id.as_str()) == self.org.org_id() => {}
                _ => {
                    return Err(AuthError::Forbidden(
                        "Only a super admin can change organization".into(),
                    ))
                }
            }
        }
        self.org = scope;
        Ok(())
    }

    /// Serialize for local session storage.
    pub fn to_json(&self) -> AuthResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore from local session storage.
    pub fn from_json(json: &str) -> AuthResult<Session> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(role: Role) -> Session {
        let user = User::new("kabita".into(), "x$y".into(), role, "MAIN".into());
        Session::for_user(&user, "2081/82".into())
    }

    #[test]
    fn test_capability_gate() {
        let session = make_session(Role::User);
        assert!(session.require(Capability::RegisterPatient).is_ok());

        let err = session.require(Capability::ManageUsers).unwrap_err();
        assert!(matches!(
            err,
            AuthError::AccessDenied(Capability::ManageUsers)
        ));
    }

    #[test]
    fn test_writable_org_refuses_all_scope() {
        let mut session = make_session(Role::SuperAdmin);
        assert_eq!(session.writable_org().unwrap(), "MAIN");

        session.select_scope(OrgScope::All).unwrap();
        assert!(matches!(
            session.writable_org(),
            Err(AuthError::AmbiguousOrganization)
        ));
    }

    #[test]
    fn test_only_super_admin_switches_scope() {
        let mut sub = make_session(Role::SubAdmin);
        assert!(sub.select_scope(OrgScope::All).is_err());
        assert!(sub
            .select_scope(OrgScope::Org("BRANCH-2".into()))
            .is_err());
        // Re-selecting the own org is a no-op, not an error
        assert!(sub.select_scope(OrgScope::Org("MAIN".into())).is_ok());

        let mut root = make_session(Role::SuperAdmin);
        assert!(root.select_scope(OrgScope::Org("BRANCH-2".into())).is_ok());
        assert!(root.select_scope(OrgScope::All).is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let session = make_session(Role::SubAdmin);
        let json = session.to_json().unwrap();
        let restored = Session::from_json(&json).unwrap();
        assert_eq!(restored, session);
    }
}
