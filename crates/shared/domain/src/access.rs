//! Role-based access control.
//!
//! A [`Principal`] is the verified identity attached to a request. Each
//! endpoint declares one or more [`Policy`] values; [`authorize_all`]
//! evaluates them in order and stops at the first denial.

use thiserror::Error;

use crate::user::UserRole;

/// Authenticated identity attached to a request.
///
/// `role` comes from the stored profile at request time, so a role change
/// applies from the next request on.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub role: UserRole,
}

impl Principal {
    /// Check if the principal has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if the principal is the given user
    pub fn is(&self, uid: &str) -> bool {
        self.uid == uid
    }
}

/// Access rule evaluated against an optional principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy<'a> {
    /// No principal required
    Public,
    /// Any verified principal
    AuthenticatedAny,
    /// The principal is the target user, or an admin
    SelfOrAdmin(&'a str),
    /// The principal created the resource, or is an admin.
    /// The resource must already have been fetched, so absence is reported
    /// as not-found before this policy runs.
    OwnerOrAdmin(&'a str),
    /// Admins only
    AdminOnly,
}

/// Why a policy denied access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Authentication token missing")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),
}

pub const MSG_ADMIN_REQUIRED: &str = "Access denied: admin privileges required";
pub const MSG_NOT_AUTHORIZED: &str = "Access denied: not authorized";
pub const MSG_NOT_OWNER: &str = "Access denied: you do not own this resource";

/// Evaluate a single policy.
pub fn authorize(principal: Option<&Principal>, policy: Policy<'_>) -> Result<(), AccessError> {
    if policy == Policy::Public {
        return Ok(());
    }

    let principal = principal.ok_or(AccessError::Unauthenticated)?;

    match policy {
        Policy::Public | Policy::AuthenticatedAny => Ok(()),
        Policy::SelfOrAdmin(target) => {
            if principal.is(target) || principal.is_admin() {
                Ok(())
            } else {
                Err(AccessError::Forbidden(MSG_NOT_AUTHORIZED.to_string()))
            }
        }
        Policy::OwnerOrAdmin(owner) => {
            if principal.is(owner) || principal.is_admin() {
                Ok(())
            } else {
                Err(AccessError::Forbidden(MSG_NOT_OWNER.to_string()))
            }
        }
        Policy::AdminOnly => {
            if principal.is_admin() {
                Ok(())
            } else {
                Err(AccessError::Forbidden(MSG_ADMIN_REQUIRED.to_string()))
            }
        }
    }
}

/// Evaluate policies in order, short-circuiting on the first denial.
pub fn authorize_all(
    principal: Option<&Principal>,
    policies: &[Policy<'_>],
) -> Result<(), AccessError> {
    policies
        .iter()
        .try_for_each(|policy| authorize(principal, *policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(uid: &str, role: UserRole) -> Principal {
        Principal {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
            email_verified: true,
            role,
        }
    }

    #[test]
    fn test_public_needs_no_principal() {
        assert_eq!(authorize(None, Policy::Public), Ok(()));
    }

    #[test]
    fn test_missing_principal_is_unauthenticated() {
        for policy in [
            Policy::AuthenticatedAny,
            Policy::SelfOrAdmin("a"),
            Policy::OwnerOrAdmin("a"),
            Policy::AdminOnly,
        ] {
            assert_eq!(authorize(None, policy), Err(AccessError::Unauthenticated));
        }
    }

    #[test]
    fn test_self_or_admin() {
        let alice = principal("alice", UserRole::User);
        let admin = principal("root", UserRole::Admin);

        assert!(authorize(Some(&alice), Policy::SelfOrAdmin("alice")).is_ok());
        assert!(authorize(Some(&admin), Policy::SelfOrAdmin("alice")).is_ok());
        assert_eq!(
            authorize(Some(&alice), Policy::SelfOrAdmin("bob")),
            Err(AccessError::Forbidden(MSG_NOT_AUTHORIZED.to_string()))
        );
    }

    #[test]
    fn test_owner_or_admin() {
        let alice = principal("alice", UserRole::User);
        let bob = principal("bob", UserRole::User);
        let admin = principal("root", UserRole::Admin);

        assert!(authorize(Some(&alice), Policy::OwnerOrAdmin("alice")).is_ok());
        assert!(authorize(Some(&admin), Policy::OwnerOrAdmin("alice")).is_ok());
        assert!(matches!(
            authorize(Some(&bob), Policy::OwnerOrAdmin("alice")),
            Err(AccessError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_only() {
        let alice = principal("alice", UserRole::User);
        let admin = principal("root", UserRole::Admin);

        assert!(authorize(Some(&admin), Policy::AdminOnly).is_ok());
        assert_eq!(
            authorize(Some(&alice), Policy::AdminOnly),
            Err(AccessError::Forbidden(MSG_ADMIN_REQUIRED.to_string()))
        );
    }

    #[test]
    fn test_authorize_all_stops_at_first_denial() {
        let alice = principal("alice", UserRole::User);

        let result = authorize_all(
            Some(&alice),
            &[Policy::SelfOrAdmin("bob"), Policy::AdminOnly],
        );
        assert_eq!(
            result,
            Err(AccessError::Forbidden(MSG_NOT_AUTHORIZED.to_string()))
        );

        assert!(authorize_all(Some(&alice), &[Policy::AuthenticatedAny, Policy::SelfOrAdmin("alice")]).is_ok());
    }
}
