use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::allocation::AllocationOutcome;
use super::domain::{
    AdmissionSnapshot, AdmissionStatus, Applicant, ApplicantId, Category, Department,
    SeatAuditError,
};
use super::repository::{
    AdmissionNotice, AdmissionRepository, ApplicantStatusView, NoticeError, NoticePublisher,
    RepositoryError,
};
use super::roster::RosterError;
use super::verification::{VerificationAction, VerificationError, VerificationOutcome};
use super::{allocation, ranking, roster, verification};

/// Youngest age accepted at registration.
pub const MINIMUM_AGE: u8 = 16;

/// Registration payload accepted from collaborators before an applicant id exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub age: u8,
    pub qualifying_score: f32,
    pub entrance_score: f32,
    pub preferences: Vec<String>,
    pub category: Category,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
}

/// Validation errors for inbound registrations.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("applicant must be at least {MINIMUM_AGE} years old, got {0}")]
    AgeBelowMinimum(u8),
    #[error("{field} must be between 0 and 100, got {value}")]
    ScoreOutOfRange { field: &'static str, value: f32 },
    #[error("at least one department preference is required")]
    MissingPreferences,
}

static APPLICANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_applicant_id() -> ApplicantId {
    ApplicantId(APPLICANT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Service composing the repository, notification hooks, and the allocation engine.
///
/// Every engine pass runs over a freshly loaded snapshot, is audited, and is
/// committed as a whole; callers are expected to serialize operations — the engine
/// takes no internal locks.
pub struct AdmissionService<R, N> {
    repository: Arc<R>,
    notices: Arc<N>,
}

impl<R, N> AdmissionService<R, N>
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    pub fn new(repository: Arc<R>, notices: Arc<N>) -> Self {
        Self { repository, notices }
    }

    /// Register a new applicant in `Applied` state.
    pub fn register(&self, form: RegistrationForm) -> Result<Applicant, AdmissionServiceError> {
        validate_form(&form)?;

        let RegistrationForm {
            name,
            age,
            qualifying_score,
            entrance_score,
            preferences,
            category,
            registered_on,
        } = form;

        let mut applicant = Applicant::new(
            next_applicant_id(),
            name,
            age,
            qualifying_score,
            entrance_score,
            preferences,
            category,
        );
        applicant.registered_on = registered_on;

        let stored = self.repository.insert(applicant)?;
        Ok(stored)
    }

    /// Bulk-register applicants from a roster CSV export.
    pub fn import_roster<Rd: Read>(
        &self,
        reader: Rd,
    ) -> Result<Vec<Applicant>, AdmissionServiceError> {
        let forms = roster::parse_roster(reader)?;
        let mut stored = Vec::with_capacity(forms.len());
        for form in forms {
            stored.push(self.register(form)?);
        }
        info!(count = stored.len(), "roster import registered applicants");
        Ok(stored)
    }

    /// Run the merit pass over the whole applicant set and persist the ranks.
    ///
    /// Returns the applicants in merit order.
    pub fn generate_merit_list(&self) -> Result<Vec<ApplicantStatusView>, AdmissionServiceError> {
        let mut snapshot = self.repository.snapshot()?;
        let merit = ranking::generate_merit_list(&mut snapshot.applicants);

        let views = merit
            .iter()
            .filter_map(|&id| snapshot.applicant(id))
            .map(ApplicantStatusView::of)
            .collect();

        self.repository.commit(snapshot)?;
        Ok(views)
    }

    /// Run the allocation pass and notify every newly selected applicant.
    pub fn allocate(&self) -> Result<AllocationOutcome, AdmissionServiceError> {
        let mut snapshot = self.repository.snapshot()?;
        let outcome = allocation::allocate_seats(&mut snapshot)?;
        snapshot.audit()?;

        if outcome.unranked > 0 {
            warn!(
                unranked = outcome.unranked,
                "allocation ran over applicants with no rank; run the merit pass first"
            );
        }

        let mut notices = Vec::with_capacity(outcome.selected.len());
        for &id in &outcome.selected {
            if let Some(applicant) = snapshot.applicant(id) {
                notices.push(selection_notice(applicant));
            }
        }

        self.repository.commit(snapshot)?;
        for notice in notices {
            self.notices.publish(notice)?;
        }

        Ok(outcome)
    }

    /// Apply a reviewer's document decision and persist the resulting cascade.
    pub fn verify(
        &self,
        id: ApplicantId,
        action: VerificationAction,
    ) -> Result<VerificationOutcome, AdmissionServiceError> {
        let mut snapshot = self.repository.snapshot()?;
        let outcome = verification::verify_documents(&mut snapshot, id, action)?;
        snapshot.audit()?;

        let mut notices = Vec::new();
        match outcome.status {
            AdmissionStatus::Confirmed => notices.push(AdmissionNotice {
                template: "admission_confirmed".to_string(),
                applicant_id: id,
                details: BTreeMap::new(),
            }),
            AdmissionStatus::Cancelled => {
                notices.push(AdmissionNotice {
                    template: "admission_cancelled".to_string(),
                    applicant_id: id,
                    details: BTreeMap::new(),
                });
                if let Some(promoted) = outcome.promoted {
                    if let Some(applicant) = snapshot.applicant(promoted) {
                        notices.push(selection_notice(applicant));
                    }
                }
            }
            _ => {}
        }

        self.repository.commit(snapshot)?;
        for notice in notices {
            self.notices.publish(notice)?;
        }

        Ok(outcome)
    }

    /// Fetch a single applicant's exposed admission state.
    pub fn status(&self, id: ApplicantId) -> Result<ApplicantStatusView, AdmissionServiceError> {
        let applicant = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(ApplicantStatusView::of(&applicant))
    }

    /// Applicants currently waiting, in promotion order.
    pub fn waiting_list(&self) -> Result<Vec<ApplicantStatusView>, AdmissionServiceError> {
        let snapshot = self.repository.snapshot()?;
        let mut waiting: Vec<&Applicant> = snapshot
            .waiting
            .iter()
            .filter_map(|&id| snapshot.applicant(id))
            .collect();
        waiting.sort_by_key(|applicant| {
            allocation::assignment_order(applicant.rank, applicant.id)
        });

        Ok(waiting.into_iter().map(ApplicantStatusView::of).collect())
    }

    /// Full snapshot view for dashboards: applicant table plus the seat matrix.
    pub fn dashboard(&self) -> Result<DashboardView, AdmissionServiceError> {
        let snapshot = self.repository.snapshot()?;
        Ok(DashboardView::of(&snapshot))
    }
}

fn validate_form(form: &RegistrationForm) -> Result<(), RegistrationError> {
    if form.age < MINIMUM_AGE {
        return Err(RegistrationError::AgeBelowMinimum(form.age));
    }
    for (field, value) in [
        ("qualifying score", form.qualifying_score),
        ("entrance score", form.entrance_score),
    ] {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(RegistrationError::ScoreOutOfRange { field, value });
        }
    }
    if form.preferences.iter().all(|preference| preference.trim().is_empty()) {
        return Err(RegistrationError::MissingPreferences);
    }
    Ok(())
}

fn selection_notice(applicant: &Applicant) -> AdmissionNotice {
    let mut details = BTreeMap::new();
    if let Some(department) = &applicant.allocated_department {
        details.insert("department".to_string(), department.clone());
    }
    AdmissionNotice {
        template: "applicant_selected".to_string(),
        applicant_id: applicant.id,
        details,
    }
}

/// Aggregated read model for the dashboard endpoint and the demo CLI.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub applicants: Vec<ApplicantStatusView>,
    pub departments: Vec<DepartmentView>,
    pub waiting: Vec<ApplicantId>,
}

impl DashboardView {
    pub fn of(snapshot: &AdmissionSnapshot) -> Self {
        Self {
            applicants: snapshot.applicants.iter().map(ApplicantStatusView::of).collect(),
            departments: snapshot.departments.values().map(DepartmentView::of).collect(),
            waiting: snapshot.waiting.clone(),
        }
    }
}

/// Occupancy summary for one department.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentView {
    pub name: String,
    pub total_seats: u32,
    pub occupied: u32,
    pub available: u32,
    pub seats: Vec<CategorySeatView>,
}

impl DepartmentView {
    pub fn of(department: &Department) -> Self {
        let seats = Category::ordered()
            .into_iter()
            .filter(|&category| department.quota(category) > 0)
            .map(|category| CategorySeatView {
                category: category.label(),
                quota: department.quota(category),
                filled: department.filled(category),
            })
            .collect();

        Self {
            name: department.name.clone(),
            total_seats: department.total_seats,
            occupied: department.occupied(),
            available: department.available_seats(),
            seats,
        }
    }
}

/// Per-category slice of a department's seat matrix.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySeatView {
    pub category: &'static str,
    pub quota: u32,
    pub filled: u32,
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionServiceError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Seats(#[from] SeatAuditError),
    #[error(transparent)]
    Notice(#[from] NoticeError),
}
