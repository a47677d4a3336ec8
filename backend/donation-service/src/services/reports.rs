use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{messages, LifecycleEngine};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::{
    CreateReportInput, Donation, ModerateReportInput, Report, ReportStatus, ReportType,
};
use crate::store::constraints;

/// Who a report of `report_type` filed by `reporter_id` is against.
///
/// Expired food goes from the receiver to the donor, no-show from the donor to
/// the receiver.
fn reported_party(donation: &Donation, reporter_id: Uuid, report_type: ReportType) -> Result<Uuid> {
    match report_type {
        ReportType::ExpiredFood => {
            if donation.receiver_id != Some(reporter_id) {
                return Err(AppError::forbidden(messages::ONLY_RECEIVER_EXPIRED_FOOD));
            }
            Ok(donation.donor_id)
        }
        ReportType::NoShow => {
            if donation.donor_id != reporter_id {
                return Err(AppError::forbidden(messages::ONLY_DONOR_NO_SHOW));
            }
            donation
                .receiver_id
                .ok_or_else(|| AppError::conflict(messages::DONATION_NOT_ALLOTTED))
        }
        ReportType::Other => Err(AppError::BadRequest(messages::INVALID_REPORT_TYPE.to_string())),
    }
}

impl LifecycleEngine {
    /// File a report about the other party of a donation
    pub async fn create_report(&self, reporter_id: Uuid, input: CreateReportInput) -> Result<Report> {
        let result = self.try_create_report(reporter_id, input, Utc::now()).await;
        metrics::record_operation("create_report", &result);
        result
    }

    async fn try_create_report(
        &self,
        reporter_id: Uuid,
        input: CreateReportInput,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        let report_type = match ReportType::parse(&input.report_type) {
            Some(t @ (ReportType::ExpiredFood | ReportType::NoShow)) => t,
            _ => return Err(AppError::BadRequest(messages::INVALID_REPORT_TYPE.to_string())),
        };
        input.validate()?;
        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::validation("Reason is required"));
        }

        let mut tx = self.store.begin().await?;
        let donation = tx
            .lock_donation(input.donation_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::DONATION_NOT_FOUND))?;

        let reported_user_id = reported_party(&donation, reporter_id, report_type)?;

        let report = Report::new(
            reporter_id,
            reported_user_id,
            donation.id,
            report_type,
            reason,
            input.evidence,
            now,
        );
        tx.insert_report(&report).await.map_err(|err| {
            if err.is_duplicate(constraints::REPORT_REPORTER_DONATION_TYPE) {
                AppError::conflict(messages::ALREADY_REPORTED)
            } else {
                err.into()
            }
        })?;
        tx.commit().await?;

        tracing::info!(
            report_id = %report.id,
            donation_id = %donation.id,
            report_type = report_type.as_str(),
            reported_user_id = %reported_user_id,
            "Report filed"
        );
        Ok(report)
    }

    /// Admin moves a report to reviewed, resolved or dismissed
    pub async fn moderate_report(
        &self,
        report_id: Uuid,
        input: ModerateReportInput,
    ) -> Result<Report> {
        let result = self.try_moderate_report(report_id, input, Utc::now()).await;
        metrics::record_operation("moderate_report", &result);
        result
    }

    async fn try_moderate_report(
        &self,
        report_id: Uuid,
        input: ModerateReportInput,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        input.validate()?;
        let status = ReportStatus::parse(&input.status)
            .ok_or_else(|| AppError::validation(messages::INVALID_REPORT_STATUS))?;

        let mut tx = self.store.begin().await?;
        let mut report = tx
            .lock_report(report_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::REPORT_NOT_FOUND))?;

        let previous = report.status;
        report.moderate(status, input.admin_notes, now)?;
        tx.update_report(&report).await?;
        tx.commit().await?;

        tracing::info!(
            report_id = %report.id,
            from = previous.as_str(),
            to = report.status.as_str(),
            "Report moderated"
        );
        Ok(report)
    }

    pub async fn list_reporter_reports(&self, reporter_id: Uuid) -> Result<Vec<Report>> {
        Ok(self.store.list_reports_by_reporter(reporter_id).await?)
    }

    pub async fn list_reports_against(&self, user_id: Uuid) -> Result<Vec<Report>> {
        Ok(self.store.list_reports_against(user_id).await?)
    }

    /// Admin listing; `status` must be a known report status when given
    pub async fn list_reports(&self, status: Option<&str>) -> Result<Vec<Report>> {
        let status = match status {
            Some(s) => Some(
                ReportStatus::parse(s)
                    .ok_or_else(|| AppError::validation(messages::INVALID_REPORT_STATUS))?,
            ),
            None => None,
        };
        Ok(self.store.list_reports(status).await?)
    }
}
