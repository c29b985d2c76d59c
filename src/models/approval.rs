//! Approval history model
//!
//! Append-only audit trail of approval workflow transitions. The
//! performer name is denormalized at write time so the audit record
//! survives later renames of the actor.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::event::EventStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Submitted,
    Approved,
    RevisionRequested,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Submitted => "submitted",
            ApprovalAction::Approved => "approved",
            ApprovalAction::RevisionRequested => "revision_requested",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventApprovalHistory {
    pub id: i64,
    pub event_id: i64,
    pub action: ApprovalAction,
    pub performed_by: i64,
    pub performer_name: String,
    pub comments: Option<String>,
    pub status_before: EventStatus,
    pub status_after: EventStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new history record; the repository assigns id/created_at.
#[derive(Debug, Clone)]
pub struct NewApprovalRecord {
    pub event_id: i64,
    pub action: ApprovalAction,
    pub performed_by: i64,
    pub performer_name: String,
    pub comments: Option<String>,
    pub status_before: EventStatus,
    pub status_after: EventStatus,
}
