use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Receiver reports the donor for spoiled food
    ExpiredFood,
    /// Donor reports the receiver for not turning up
    NoShow,
    Other,
}

impl ReportType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expired_food" => Some(ReportType::ExpiredFood),
            "no_show" => Some(ReportType::NoShow),
            "other" => Some(ReportType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::ExpiredFood => "expired_food",
            ReportType::NoShow => "no_show",
            ReportType::Other => "other",
        }
    }
}

/// Report status; moderation moves it freely between the non-pending states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "reviewed" => Some(ReportStatus::Reviewed),
            "resolved" => Some(ReportStatus::Resolved),
            "dismissed" => Some(ReportStatus::Dismissed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// Moderation never sends a report back to pending
    pub fn is_moderation_outcome(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// Post-pickup complaint filed by one party of a donation against the other
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub donation_id: Uuid,
    pub report_type: ReportType,
    pub reason: String,
    pub evidence: Option<String>,
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        reporter_id: Uuid,
        reported_user_id: Uuid,
        donation_id: Uuid,
        report_type: ReportType,
        reason: String,
        evidence: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reporter_id,
            reported_user_id,
            donation_id,
            report_type,
            reason,
            evidence: evidence
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            status: ReportStatus::Pending,
            admin_notes: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an admin decision. Order is not enforced; repeated calls overwrite.
    pub fn moderate(
        &mut self,
        status: ReportStatus,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !status.is_moderation_outcome() {
            return Err(AppError::validation(
                "Report status must be reviewed, resolved or dismissed",
            ));
        }

        self.status = status;
        if let Some(notes) = admin_notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            self.admin_notes = Some(notes);
        }
        if status == ReportStatus::Resolved {
            self.resolved_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Request body for creating a report.
///
/// The reported user is derived from the donation, never taken from input.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub donation_id: Uuid,
    #[serde(rename = "type")]
    pub report_type: String,
    #[validate(length(min = 1, max = 500, message = "Reason is required (max 500 characters)"))]
    pub reason: String,
    #[validate(length(max = 1000, message = "Evidence must be at most 1000 characters"))]
    pub evidence: Option<String>,
}

/// Request body for report moderation
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModerateReportInput {
    pub status: String,
    #[validate(length(max = 2000, message = "Admin notes must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
}

/// Query string for admin report listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<String>,
}
