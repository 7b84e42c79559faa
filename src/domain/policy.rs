//! Authorization policy for account mutation.
//!
//! A pure decision function: given who is acting, which account is being
//! touched and what is being done to it, return `Ok(())` or the [`Denial`]
//! that applies. The caller must read the target's role from the store before
//! applying any change and must not write anything when a denial comes back.

use super::{Role, UserId};
use thiserror::Error;

/// Identity and role of one side of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Requested change to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Delete,
    /// `role` is the value the request asks for, if the role field is present.
    Update { role: Option<Role> },
}

/// Why a mutation was refused. The [`Display`](std::fmt::Display) text is
/// returned to clients verbatim and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("cannot delete own account")]
    SelfDeletion,

    #[error("only admin-master may delete administrators")]
    DeleteAdministrator,

    #[error("insufficient privilege to delete users")]
    DeleteNotPermitted,

    #[error("only admin-master may edit an admin-master")]
    EditAdminMaster,

    #[error("cannot edit another administrator")]
    EditOtherAdministrator,

    #[error("cannot elevate a user to admin or admin-master via this path")]
    RoleElevation,

    #[error("insufficient privilege")]
    UpdateNotPermitted,

    #[error("cannot change own role")]
    OwnRoleChange,
}

/// Decides whether `actor` may apply `mutation` to `target`.
///
/// # Errors
///
/// Returns the first matching [`Denial`] of the delete or update table.
pub fn authorize(
    actor: Principal,
    target: Principal,
    mutation: Mutation,
) -> Result<(), Denial> {
    match mutation {
        Mutation::Delete => authorize_delete(actor, target),
        Mutation::Update { role } => authorize_update(actor, target, role),
    }
}

/// Delete table. Self-deletion is checked before any role rule.
///
/// # Errors
///
/// See [`Denial::SelfDeletion`], [`Denial::DeleteAdministrator`] and
/// [`Denial::DeleteNotPermitted`].
pub fn authorize_delete(actor: Principal, target: Principal) -> Result<(), Denial> {
    if actor.id == target.id {
        return Err(Denial::SelfDeletion);
    }

    match (actor.role, target.role) {
        (Role::AdminMaster, _) => Ok(()),
        (Role::Admin, Role::Admin | Role::AdminMaster) => Err(Denial::DeleteAdministrator),
        (Role::Admin, Role::User) => Ok(()),
        (Role::User, _) => Err(Denial::DeleteNotPermitted),
    }
}

/// Update table.
///
/// For admins any requested role other than `user` is refused, even when it
/// repeats the role the target already has. Plain users may not send a role
/// at all, not even their current one.
///
/// # Errors
///
/// See the update variants of [`Denial`].
pub fn authorize_update(
    actor: Principal,
    target: Principal,
    requested_role: Option<Role>,
) -> Result<(), Denial> {
    let is_self = actor.id == target.id;

    match actor.role {
        Role::AdminMaster => Ok(()),
        Role::Admin => {
            if target.role == Role::AdminMaster {
                return Err(Denial::EditAdminMaster);
            }
            if target.role == Role::Admin && !is_self {
                return Err(Denial::EditOtherAdministrator);
            }
            if matches!(requested_role, Some(Role::Admin | Role::AdminMaster)) {
                return Err(Denial::RoleElevation);
            }
            Ok(())
        }
        Role::User => {
            if !is_self {
                return Err(Denial::UpdateNotPermitted);
            }
            if requested_role.is_some() {
                return Err(Denial::OwnRoleChange);
            }
            Ok(())
        }
    }
}
