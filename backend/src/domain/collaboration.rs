//! Invitation lifecycle for collaborations.
//!
//! Stored status only ever moves `pending -> accepted` or `pending -> rejected`.
//! Expiry is never written back; it is derived from `expires_at` whenever an
//! invitation is displayed or acted upon.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_INVITATION_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationRole {
    Viewer,
    Editor,
    Approver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
    Publish,
}

impl CollaborationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaborationRole::Viewer => "viewer",
            CollaborationRole::Editor => "editor",
            CollaborationRole::Approver => "approver",
        }
    }

    pub fn allows(self, permission: Permission) -> bool {
        match permission {
            Permission::View => true,
            Permission::Edit => matches!(
                self,
                CollaborationRole::Editor | CollaborationRole::Approver
            ),
            Permission::Publish => matches!(self, CollaborationRole::Approver),
        }
    }
}

impl fmt::Display for CollaborationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollaborationRole {
    type Err = TransitionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(CollaborationRole::Viewer),
            "editor" => Ok(CollaborationRole::Editor),
            "approver" => Ok(CollaborationRole::Approver),
            other => Err(TransitionError::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl CollaborationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaborationStatus::Pending => "pending",
            CollaborationStatus::Accepted => "accepted",
            CollaborationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CollaborationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollaborationStatus {
    type Err = TransitionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(CollaborationStatus::Pending),
            "accepted" => Ok(CollaborationStatus::Accepted),
            "rejected" => Ok(CollaborationStatus::Rejected),
            other => Err(TransitionError::UnknownValue(other.to_string())),
        }
    }
}

/// How the caller reaches a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    Owner,
    Collaborator(CollaborationRole),
}

impl ProjectAccess {
    /// Picks the strongest role among the caller's accepted collaborations.
    pub fn from_roles(roles: impl IntoIterator<Item = CollaborationRole>) -> Option<Self> {
        roles.into_iter().max().map(ProjectAccess::Collaborator)
    }

    pub fn allows(self, permission: Permission) -> bool {
        match self {
            ProjectAccess::Owner => true,
            ProjectAccess::Collaborator(role) => role.allows(permission),
        }
    }

    pub fn is_owner(self) -> bool {
        matches!(self, ProjectAccess::Owner)
    }

    pub fn label(self) -> &'static str {
        match self {
            ProjectAccess::Owner => "owner",
            ProjectAccess::Collaborator(role) => role.as_str(),
        }
    }
}

/// What a client shows; `Expired` exists only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationAction {
    Accept,
    Reject,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invitation has already been {0}")]
    AlreadyResponded(CollaborationStatus),
    #[error("invitation has expired")]
    Expired,
    #[error("unknown collaboration value: {0}")]
    UnknownValue(String),
    #[error("expires_in_days must be between 0 and 365")]
    InvalidExpiry,
}

pub fn is_expired(
    status: CollaborationStatus,
    expires_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    status == CollaborationStatus::Pending && expires_at.is_some_and(|at| at <= now)
}

pub fn display_status(
    status: CollaborationStatus,
    expires_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> DisplayStatus {
    if is_expired(status, expires_at, now) {
        return DisplayStatus::Expired;
    }
    match status {
        CollaborationStatus::Pending => DisplayStatus::Pending,
        CollaborationStatus::Accepted => DisplayStatus::Accepted,
        CollaborationStatus::Rejected => DisplayStatus::Rejected,
    }
}

/// Applies the collaborator's response. An expired invitation can still be
/// rejected but no longer accepted.
pub fn transition(
    current: CollaborationStatus,
    action: InvitationAction,
    expires_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<CollaborationStatus, TransitionError> {
    if current != CollaborationStatus::Pending {
        return Err(TransitionError::AlreadyResponded(current));
    }
    match action {
        InvitationAction::Accept if is_expired(current, expires_at, now) => {
            Err(TransitionError::Expired)
        }
        InvitationAction::Accept => Ok(CollaborationStatus::Accepted),
        InvitationAction::Reject => Ok(CollaborationStatus::Rejected),
    }
}

/// `0` disables expiry.
pub fn expiry_after_days(
    now: NaiveDateTime,
    days: i64,
) -> Result<Option<NaiveDateTime>, TransitionError> {
    if !(0..=MAX_INVITATION_DAYS).contains(&days) {
        return Err(TransitionError::InvalidExpiry);
    }
    if days == 0 {
        return Ok(None);
    }
    Ok(Some(now + Duration::days(days)))
}
