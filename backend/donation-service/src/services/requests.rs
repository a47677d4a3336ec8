use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::{messages, LifecycleEngine};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::{
    CreateRequestInput, Donation, DonationStatus, Request, RequestStatus,
    SIBLING_ALLOTTED_REASON,
};
use crate::store::{constraints, LifecycleTx, StoreError};

/// Outcome of confirming a request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allotment {
    pub request: Request,
    pub donation: Donation,
    /// Sibling requests declined by this allotment
    pub declined_requests: Vec<Request>,
}

/// Outcome of completing a request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub request: Request,
    pub donation: Donation,
}

/// Which party of the request may act on it
#[derive(Debug, Clone, Copy)]
enum Party {
    Donor,
    Receiver,
}

/// Request and its donation, both locked for the rest of the transaction
struct LockedRequest {
    request: Request,
    donation: Donation,
}

/// Look up a request, check who is acting on it, then lock donation and request
/// in that order. The donation lock is what serializes competing transitions.
async fn lock_for_actor(
    tx: &mut (dyn LifecycleTx + '_),
    request_id: Uuid,
    actor_id: Uuid,
    party: Party,
) -> Result<LockedRequest> {
    let peek = tx
        .get_request(request_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::REQUEST_NOT_FOUND))?;

    let owner = match party {
        Party::Donor => peek.donor_id,
        Party::Receiver => peek.receiver_id,
    };
    if owner != actor_id {
        return Err(AppError::forbidden(messages::NOT_AUTHORIZED));
    }

    let donation = tx
        .lock_donation(peek.donation_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::DONATION_NOT_FOUND))?;
    let request = tx
        .lock_request(request_id)
        .await?
        .ok_or_else(|| AppError::not_found(messages::REQUEST_NOT_FOUND))?;

    Ok(LockedRequest { request, donation })
}

/// A lost race on the one-winner index reads the same as a stale status
fn winner_conflict(err: StoreError) -> AppError {
    if err.is_duplicate(constraints::REQUEST_ONE_WINNER) {
        AppError::conflict(messages::REQUEST_PROCESSED)
    } else {
        err.into()
    }
}

impl LifecycleEngine {
    /// Receiver asks for a pending donation
    pub async fn create_request(
        &self,
        receiver_id: Uuid,
        input: CreateRequestInput,
    ) -> Result<Request> {
        let result = self.try_create_request(receiver_id, input, Utc::now()).await;
        metrics::record_operation("create_request", &result);
        result
    }

    async fn try_create_request(
        &self,
        receiver_id: Uuid,
        input: CreateRequestInput,
        now: DateTime<Utc>,
    ) -> Result<Request> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let donation = tx
            .lock_donation(input.donation_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::DONATION_NOT_FOUND))?;

        if !donation.is_available(now) {
            return Err(AppError::conflict(messages::DONATION_UNAVAILABLE));
        }

        if tx.find_request(donation.id, receiver_id).await?.is_some() {
            return Err(AppError::conflict(messages::ALREADY_REQUESTED));
        }

        let request = Request::new(donation.id, receiver_id, donation.donor_id, input.note, now);
        tx.insert_request(&request).await.map_err(|err| {
            if err.is_duplicate(constraints::REQUEST_DONATION_RECEIVER) {
                AppError::conflict(messages::ALREADY_REQUESTED)
            } else {
                err.into()
            }
        })?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            donation_id = %donation.id,
            receiver_id = %receiver_id,
            "Request created"
        );
        Ok(request)
    }

    /// Donor accepts one request: the donation is allotted to its receiver and
    /// every other pending request on the donation is declined.
    pub async fn confirm_request(&self, request_id: Uuid, donor_id: Uuid) -> Result<Allotment> {
        let result = self.try_confirm_request(request_id, donor_id, Utc::now()).await;
        metrics::record_operation("confirm_request", &result);
        result
    }

    async fn try_confirm_request(
        &self,
        request_id: Uuid,
        donor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Allotment> {
        let mut tx = self.store.begin().await?;
        let LockedRequest {
            mut request,
            mut donation,
        } = lock_for_actor(tx.as_mut(), request_id, donor_id, Party::Donor).await?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::conflict(messages::REQUEST_PROCESSED));
        }
        if donation.status != DonationStatus::Pending {
            return Err(AppError::conflict(messages::DONATION_UNAVAILABLE));
        }

        request.confirm(now)?;
        donation.allot(request.receiver_id, now)?;
        tx.update_request(&request).await.map_err(winner_conflict)?;
        tx.update_donation(&donation).await?;

        let siblings = tx
            .lock_pending_requests(donation.id, Some(request.id))
            .await?;
        let mut declined_requests = Vec::with_capacity(siblings.len());
        for mut sibling in siblings {
            sibling.decline(Some(SIBLING_ALLOTTED_REASON.to_string()), now)?;
            tx.update_request(&sibling).await?;
            declined_requests.push(sibling);
        }

        tx.commit().await?;

        metrics::record_siblings_declined(declined_requests.len());
        tracing::info!(
            request_id = %request.id,
            donation_id = %donation.id,
            receiver_id = %request.receiver_id,
            siblings_declined = declined_requests.len(),
            "Request confirmed, donation allotted"
        );
        Ok(Allotment {
            request,
            donation,
            declined_requests,
        })
    }

    /// Donor turns down a pending request; the donation stays open
    pub async fn decline_request(
        &self,
        request_id: Uuid,
        donor_id: Uuid,
        reason: Option<String>,
    ) -> Result<Request> {
        let result = self
            .try_decline_request(request_id, donor_id, reason, Utc::now())
            .await;
        metrics::record_operation("decline_request", &result);
        result
    }

    async fn try_decline_request(
        &self,
        request_id: Uuid,
        donor_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Request> {
        let mut tx = self.store.begin().await?;
        let LockedRequest { mut request, .. } =
            lock_for_actor(tx.as_mut(), request_id, donor_id, Party::Donor).await?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::conflict(messages::REQUEST_PROCESSED));
        }

        request.decline(reason, now)?;
        tx.update_request(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            donation_id = %request.donation_id,
            reason = request.decline_reason.as_deref().unwrap_or_default(),
            "Request declined"
        );
        Ok(request)
    }

    /// Donor marks a confirmed request as handed over
    pub async fn complete_request(&self, request_id: Uuid, donor_id: Uuid) -> Result<Completion> {
        let result = self
            .try_complete_request(request_id, donor_id, Utc::now())
            .await;
        metrics::record_operation("complete_request", &result);
        result
    }

    async fn try_complete_request(
        &self,
        request_id: Uuid,
        donor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Completion> {
        let mut tx = self.store.begin().await?;
        let LockedRequest {
            mut request,
            mut donation,
        } = lock_for_actor(tx.as_mut(), request_id, donor_id, Party::Donor).await?;

        if request.status != RequestStatus::Confirmed {
            return Err(AppError::conflict(messages::COMPLETE_REQUIRES_CONFIRMED));
        }

        request.complete(now)?;
        donation.mark_picked_up(now)?;
        tx.update_request(&request).await?;
        tx.update_donation(&donation).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            donation_id = %donation.id,
            receiver_id = %request.receiver_id,
            "Request completed, donation picked up"
        );
        Ok(Completion { request, donation })
    }

    /// Receiver withdraws their own pending request
    pub async fn cancel_request(
        &self,
        request_id: Uuid,
        receiver_id: Uuid,
        reason: Option<String>,
    ) -> Result<Request> {
        let result = self
            .try_cancel_request(request_id, receiver_id, reason, Utc::now())
            .await;
        metrics::record_operation("cancel_request", &result);
        result
    }

    async fn try_cancel_request(
        &self,
        request_id: Uuid,
        receiver_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Request> {
        let mut tx = self.store.begin().await?;
        let LockedRequest { mut request, .. } =
            lock_for_actor(tx.as_mut(), request_id, receiver_id, Party::Receiver).await?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::conflict(messages::REQUEST_PROCESSED));
        }

        request.cancel(reason, now)?;
        tx.update_request(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            donation_id = %request.donation_id,
            "Request cancelled by receiver"
        );
        Ok(request)
    }

    /// Requests a receiver has made, newest first
    pub async fn list_receiver_requests(&self, receiver_id: Uuid) -> Result<Vec<Request>> {
        Ok(self.store.list_requests_by_receiver(receiver_id).await?)
    }

    /// Requests against a donor's donations, newest first
    pub async fn list_incoming_requests(&self, donor_id: Uuid) -> Result<Vec<Request>> {
        Ok(self.store.list_requests_by_donor(donor_id).await?)
    }
}
