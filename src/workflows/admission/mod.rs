//! Merit ranking, quota-aware seat allocation, and the cancellation cascade.
//!
//! The engine is a fixed pipeline over one in-memory snapshot: the merit pass
//! assigns ranks, the allocation pass assigns seats or defers applicants, and the
//! verification transition confirms or cancels an offer — a cancellation frees the
//! seat and backfills at most one applicant from the waiting queue. The service
//! facade wraps each pass in a load/audit/commit unit of work and surfaces
//! notification events for external delivery.

pub mod allocation;
pub mod domain;
pub mod ranking;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use allocation::{allocate_seats, AllocationOutcome};
pub use domain::{
    standard_departments, AdmissionSnapshot, AdmissionStatus, Applicant, ApplicantId, Category,
    Department, DocumentStatus, SeatAuditError,
};
pub use ranking::{final_score, generate_merit_list, ENTRANCE_WEIGHT, QUALIFYING_WEIGHT};
pub use repository::{
    AdmissionNotice, AdmissionRepository, ApplicantStatusView, MemoryRepository, NoticeError,
    NoticePublisher, RepositoryError,
};
pub use roster::{parse_roster, RosterError};
pub use router::admission_router;
pub use service::{
    AdmissionService, AdmissionServiceError, CategorySeatView, DashboardView, DepartmentView,
    RegistrationError, RegistrationForm, MINIMUM_AGE,
};
pub use verification::{
    reallocate_waiting, verify_documents, VerificationAction, VerificationError,
    VerificationOutcome,
};
