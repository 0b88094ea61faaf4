//! Document verification and the cancellation-driven reallocation cascade.

use serde::{Deserialize, Serialize};

use super::allocation::assignment_order;
use super::domain::{
    AdmissionSnapshot, AdmissionStatus, ApplicantId, DocumentStatus, SeatAuditError,
};

/// Reviewer decision applied to a `Selected` applicant's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    Approve,
    Reject,
}

/// Result of a verification transition, including any backfill promotion it caused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub applicant: ApplicantId,
    pub status: AdmissionStatus,
    /// Waiting applicant promoted into the freed seat, when rejection released one.
    pub promoted: Option<ApplicantId>,
}

/// Errors raised by the verification transition.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("applicant {0} not found")]
    ApplicantNotFound(ApplicantId),
    #[error("applicant {id} is not awaiting verification (status {status})")]
    NotAwaitingVerification { id: ApplicantId, status: &'static str },
    #[error("applicant {id} holds a seat in unknown department {department}")]
    UnknownDepartment { id: ApplicantId, department: String },
    #[error(transparent)]
    Seats(#[from] SeatAuditError),
}

/// Apply a document verification decision to a `Selected` applicant.
///
/// Approval confirms the admission with no seat movement. Rejection cancels it,
/// releases the seat, clears the allocation, and runs exactly one backfill scan
/// over the waiting queue. This transition is the only path that frees a seat.
pub fn verify_documents(
    snapshot: &mut AdmissionSnapshot,
    id: ApplicantId,
    action: VerificationAction,
) -> Result<VerificationOutcome, VerificationError> {
    let applicant = snapshot
        .applicant_mut(id)
        .ok_or(VerificationError::ApplicantNotFound(id))?;
    if applicant.status != AdmissionStatus::Selected {
        return Err(VerificationError::NotAwaitingVerification {
            id,
            status: applicant.status.label(),
        });
    }

    match action {
        VerificationAction::Approve => {
            applicant.status = AdmissionStatus::Confirmed;
            applicant.document_status = Some(DocumentStatus::Verified);
            Ok(VerificationOutcome {
                applicant: id,
                status: AdmissionStatus::Confirmed,
                promoted: None,
            })
        }
        VerificationAction::Reject => {
            applicant.status = AdmissionStatus::Cancelled;
            applicant.document_status = Some(DocumentStatus::Rejected);
            let category = applicant.category;
            let vacated = applicant.allocated_department.take();

            let Some(vacated) = vacated else {
                // Selected without an allocation is bookkeeping drift, not policy.
                return Err(SeatAuditError::StatusDrift { applicant: id }.into());
            };
            let department = snapshot.departments.get_mut(&vacated).ok_or_else(|| {
                VerificationError::UnknownDepartment {
                    id,
                    department: vacated.clone(),
                }
            })?;
            department.release(category)?;

            let promoted = reallocate_waiting(snapshot)?;
            Ok(VerificationOutcome {
                applicant: id,
                status: AdmissionStatus::Cancelled,
                promoted,
            })
        }
    }
}

/// Promote at most one waiting applicant into currently admittable capacity.
///
/// Candidates are scanned in ascending rank order (unranked last). The first whose
/// preference list reaches a department with quota headroom for their category
/// takes the seat and leaves the queue. One cancellation frees one seat, so the
/// scan stops after a single promotion. Returns the promoted applicant, or `None`
/// when nobody in the queue qualifies — the freed seat then simply stays open.
pub fn reallocate_waiting(
    snapshot: &mut AdmissionSnapshot,
) -> Result<Option<ApplicantId>, SeatAuditError> {
    let mut queue: Vec<(u32, ApplicantId)> = snapshot
        .waiting
        .iter()
        .map(|&id| {
            let rank = snapshot.applicant(id).and_then(|applicant| applicant.rank);
            assignment_order(rank, id)
        })
        .collect();
    queue.sort();
    snapshot.waiting = queue.iter().map(|&(_, id)| id).collect();

    for &(_, id) in &queue {
        let Some(candidate) = snapshot.applicant(id) else {
            continue;
        };
        if candidate.status != AdmissionStatus::Waiting {
            continue;
        }

        let category = candidate.category;
        let Some(choice) = candidate
            .preferences
            .iter()
            .find(|preference| {
                snapshot
                    .departments
                    .get(preference.as_str())
                    .is_some_and(|department| department.can_admit(category))
            })
            .cloned()
        else {
            continue;
        };

        if let Some(department) = snapshot.departments.get_mut(&choice) {
            department.admit(category)?;
        }
        if let Some(candidate) = snapshot.applicant_mut(id) {
            candidate.status = AdmissionStatus::Selected;
            candidate.document_status = Some(DocumentStatus::Pending);
            candidate.allocated_department = Some(choice);
        }
        snapshot.waiting.retain(|&waiting| waiting != id);
        return Ok(Some(id));
    }

    Ok(None)
}
