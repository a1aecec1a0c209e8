//! Authorization predicate consumed by destructive operations.

use crate::domain::entities::ShortUrl;

/// An authenticated API caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Delete,
}

/// Decides whether `caller` may perform `action` on `resource`.
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, caller: &Principal, action: Action, resource: &ShortUrl) -> bool;
}

/// Admins may do anything; other callers only act on links they own.
///
/// Anonymous links have no owner, so only admins can delete them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl Authorizer for OwnershipPolicy {
    fn is_authorized(&self, caller: &Principal, action: Action, resource: &ShortUrl) -> bool {
        if caller.is_admin {
            return true;
        }

        match action {
            Action::Delete => resource.owner_id == Some(caller.id),
        }
    }
}
