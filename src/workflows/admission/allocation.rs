//! Seat allocation pass.

use serde::Serialize;

use super::domain::{
    AdmissionSnapshot, AdmissionStatus, ApplicantId, DocumentStatus, SeatAuditError,
};

/// Sort key that orders unranked applicants last instead of failing the pass.
pub(crate) fn assignment_order(rank: Option<u32>, id: ApplicantId) -> (u32, ApplicantId) {
    (rank.unwrap_or(u32::MAX), id)
}

/// Per-pass summary of what the allocator decided, for callers to notify on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationOutcome {
    pub selected: Vec<ApplicantId>,
    pub waitlisted: Vec<ApplicantId>,
    pub rejected: Vec<ApplicantId>,
    /// Applicants processed without a rank; non-zero means the merit pass has not
    /// run over the current set.
    pub unranked: usize,
}

/// Assign seats to every `Applied` applicant in ascending rank order.
///
/// Preferences are honoured in the order given. A preference counts only when it
/// names a configured department, and a department admits only while the
/// applicant's own category quota has headroom. Applicants with a valid preference
/// but no current headroom join the waiting queue; applicants with no valid
/// preference at all are rejected outright. The pass never revisits an applicant
/// it already deferred — freed capacity is only re-examined by the reallocation
/// cascade.
///
/// Already-decided applicants are skipped, so the pass is safely re-runnable over
/// a mixed-state snapshot.
pub fn allocate_seats(
    snapshot: &mut AdmissionSnapshot,
) -> Result<AllocationOutcome, SeatAuditError> {
    let mut order: Vec<usize> = (0..snapshot.applicants.len())
        .filter(|&index| snapshot.applicants[index].status == AdmissionStatus::Applied)
        .collect();
    order.sort_by_key(|&index| {
        let applicant = &snapshot.applicants[index];
        assignment_order(applicant.rank, applicant.id)
    });

    let mut outcome = AllocationOutcome::default();
    let AdmissionSnapshot {
        applicants,
        departments,
        waiting,
    } = snapshot;

    for index in order {
        let applicant = &mut applicants[index];
        if applicant.rank.is_none() {
            outcome.unranked += 1;
        }

        let mut placement = None;
        let mut has_valid_preference = false;
        for preference in &applicant.preferences {
            let Some(department) = departments.get_mut(preference) else {
                continue;
            };
            has_valid_preference = true;
            if department.can_admit(applicant.category) {
                department.admit(applicant.category)?;
                placement = Some(preference.clone());
                break;
            }
        }

        match placement {
            Some(department) => {
                applicant.status = AdmissionStatus::Selected;
                applicant.document_status = Some(DocumentStatus::Pending);
                applicant.allocated_department = Some(department);
                outcome.selected.push(applicant.id);
            }
            None if has_valid_preference => {
                applicant.status = AdmissionStatus::Waiting;
                if !waiting.contains(&applicant.id) {
                    waiting.push(applicant.id);
                }
                outcome.waitlisted.push(applicant.id);
            }
            None => {
                applicant.status = AdmissionStatus::Rejected;
                outcome.rejected.push(applicant.id);
            }
        }
    }

    Ok(outcome)
}
