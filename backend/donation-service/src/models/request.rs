use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};

pub const SIBLING_ALLOTTED_REASON: &str = "Donation allotted to another receiver";
pub const DEFAULT_DECLINE_REASON: &str = "No reason provided";
pub const DONATION_EXPIRED_REASON: &str = "Donation expired";

/// Request status enum with state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Declined,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// pending -> confirmed -> completed, or pending -> declined / cancelled
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Confirmed)
                | (RequestStatus::Pending, RequestStatus::Declined)
                | (RequestStatus::Pending, RequestStatus::Cancelled)
                | (RequestStatus::Confirmed, RequestStatus::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Confirmed => "confirmed",
            RequestStatus::Declined => "declined",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

/// A receiver's interest in a donation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub receiver_id: Uuid,
    pub donor_id: Uuid,
    pub status: RequestStatus,
    pub note: Option<String>,
    pub reviewed: bool,
    pub decline_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Create new pending request; the donor is denormalized from the donation
    pub fn new(
        donation_id: Uuid,
        receiver_id: Uuid,
        donor_id: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            donation_id,
            receiver_id,
            donor_id,
            status: RequestStatus::Pending,
            note: note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            reviewed: false,
            decline_reason: None,
            cancellation_reason: None,
            confirmed_at: None,
            declined_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(RequestStatus::Confirmed, now)?;
        self.confirmed_at = Some(now);
        Ok(())
    }

    pub fn decline(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(RequestStatus::Declined, now)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_DECLINE_REASON.to_string());
        self.decline_reason = Some(reason);
        self.declined_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(RequestStatus::Completed, now)?;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(RequestStatus::Cancelled, now)?;
        self.cancellation_reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.cancelled_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, next: RequestStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Invalid request status transition: {} -> {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Request body for creating a request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    pub donation_id: Uuid,
    #[validate(length(max = 200, message = "Note must be at most 200 characters"))]
    pub note: Option<String>,
}

/// Request body for declining a request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DeclineRequestInput {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Request body for cancelling a request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelRequestInput {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Request {
        Request::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Some("  can pick up at 6pm  ".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn test_request_status_transitions() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Confirmed));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Declined));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Cancelled));
        assert!(RequestStatus::Confirmed.can_transition_to(RequestStatus::Completed));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Completed));
        assert!(!RequestStatus::Declined.can_transition_to(RequestStatus::Confirmed));
        assert!(!RequestStatus::Confirmed.can_transition_to(RequestStatus::Declined));
        assert!(!RequestStatus::Completed.can_transition_to(RequestStatus::Pending));
    }

    #[test]
    fn test_note_is_trimmed() {
        let request = pending();
        assert_eq!(request.note.as_deref(), Some("can pick up at 6pm"));
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!request.reviewed);
    }

    #[test]
    fn test_decline_defaults_reason() {
        let mut request = pending();
        request.decline(None, Utc::now()).unwrap();
        assert_eq!(request.status, RequestStatus::Declined);
        assert_eq!(request.decline_reason.as_deref(), Some(DEFAULT_DECLINE_REASON));
        assert!(request.declined_at.is_some());

        let mut blank = pending();
        blank.decline(Some("   ".to_string()), Utc::now()).unwrap();
        assert_eq!(blank.decline_reason.as_deref(), Some(DEFAULT_DECLINE_REASON));
    }

    #[test]
    fn test_complete_requires_confirmation() {
        let mut request = pending();
        assert!(request.complete(Utc::now()).is_err());

        request.confirm(Utc::now()).unwrap();
        request.complete(Utc::now()).unwrap();
        assert_eq!(request.status, RequestStatus::Completed);
        assert!(request.completed_at.is_some());
    }
}
