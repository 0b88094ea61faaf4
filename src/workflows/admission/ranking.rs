//! Merit ranking pass.
//!
//! Scores are a fixed-weight composite of the qualifying and entrance marks. Exact
//! score ties rank the older applicant first; that ordering is long-standing
//! admissions policy and the ordering tests pin it down.

use super::domain::{Applicant, ApplicantId};

/// Weight applied to the prior-qualification score.
pub const QUALIFYING_WEIGHT: f32 = 0.6;
/// Weight applied to the entrance-exam score.
pub const ENTRANCE_WEIGHT: f32 = 0.4;

/// Composite merit score for a single applicant.
pub fn final_score(applicant: &Applicant) -> f32 {
    applicant.qualifying_score * QUALIFYING_WEIGHT + applicant.entrance_score * ENTRANCE_WEIGHT
}

/// Recompute every applicant's composite score and assign dense ranks starting at 1.
///
/// Ordering is final score descending, then age descending, then registration id,
/// so the order is total and re-running over an unchanged set yields identical
/// ranks. Statuses are left untouched. Returns the ids in merit order.
pub fn generate_merit_list(applicants: &mut [Applicant]) -> Vec<ApplicantId> {
    for applicant in applicants.iter_mut() {
        applicant.final_score = final_score(applicant);
    }

    let mut order: Vec<usize> = (0..applicants.len()).collect();
    order.sort_by(|&left, &right| {
        let a = &applicants[left];
        let b = &applicants[right];
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| b.age.cmp(&a.age))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut merit = Vec::with_capacity(order.len());
    for (position, index) in order.into_iter().enumerate() {
        applicants[index].rank = Some(position as u32 + 1);
        merit.push(applicants[index].id);
    }

    merit
}
