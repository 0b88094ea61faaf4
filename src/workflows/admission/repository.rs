use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::{AdmissionSnapshot, Applicant, ApplicantId, Department};

/// Storage abstraction so the engine and service can be exercised in isolation.
///
/// Engine passes operate on a whole snapshot as one unit of work: load, mutate in
/// memory, then commit or discard. Implementations must apply `commit` atomically
/// with respect to other callers — a partially applied pass must never become
/// visible.
pub trait AdmissionRepository: Send + Sync {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn fetch(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn snapshot(&self) -> Result<AdmissionSnapshot, RepositoryError>;
    fn commit(&self, snapshot: AdmissionSnapshot) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound notification hooks (e.g., e-mail or SMS adapters).
/// The engine never delivers anything itself; it only surfaces the affected
/// applicants through these payloads.
pub trait NoticePublisher: Send + Sync {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError>;
}

/// Notification payload handed to the external notifier after a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionNotice {
    pub template: String,
    pub applicant_id: ApplicantId,
    pub details: BTreeMap<String, String>,
}

/// Notice dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an applicant's exposed admission state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantStatusView {
    pub applicant_id: ApplicantId,
    pub name: String,
    pub category: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_status: Option<&'static str>,
    pub final_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_department: Option<String>,
}

impl ApplicantStatusView {
    pub fn of(applicant: &Applicant) -> Self {
        Self {
            applicant_id: applicant.id,
            name: applicant.name.clone(),
            category: applicant.category.label(),
            status: applicant.status.label(),
            document_status: applicant.document_status.map(|status| status.label()),
            final_score: applicant.final_score,
            rank: applicant.rank,
            allocated_department: applicant.allocated_department.clone(),
        }
    }
}

/// In-memory repository backing the demo CLI and the default server wiring.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<AdmissionSnapshot>,
}

impl MemoryRepository {
    /// Empty store over the given department matrix.
    pub fn seeded(departments: BTreeMap<String, Department>) -> Self {
        Self {
            state: Mutex::new(AdmissionSnapshot::new(departments)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, AdmissionSnapshot>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("state mutex poisoned".to_string()))
    }
}

impl AdmissionRepository for MemoryRepository {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut state = self.lock()?;
        if state
            .applicants
            .iter()
            .any(|existing| existing.id == applicant.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.applicants.push(applicant.clone());
        Ok(applicant)
    }

    fn fetch(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.applicant(id).cloned())
    }

    fn snapshot(&self) -> Result<AdmissionSnapshot, RepositoryError> {
        let state = self.lock()?;
        Ok(state.clone())
    }

    fn commit(&self, snapshot: AdmissionSnapshot) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        *state = snapshot;
        Ok(())
    }
}
