use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::workflows::admission::domain::{
    AdmissionSnapshot, Applicant, ApplicantId, Category, Department,
};
use crate::workflows::admission::ranking;
use crate::workflows::admission::repository::{
    AdmissionNotice, MemoryRepository, NoticeError, NoticePublisher,
};
use crate::workflows::admission::service::{AdmissionService, RegistrationForm};

pub(super) fn applicant(
    id: u64,
    name: &str,
    age: u8,
    qualifying: f32,
    entrance: f32,
    preferences: &[&str],
    category: Category,
) -> Applicant {
    Applicant::new(
        ApplicantId(id),
        name,
        age,
        qualifying,
        entrance,
        preferences.iter().map(|p| p.to_string()).collect(),
        category,
    )
}

pub(super) fn department(
    name: &str,
    total_seats: u32,
    quotas: &[(Category, u32)],
) -> Department {
    Department::with_quotas(name, total_seats, quotas.iter().copied().collect())
        .expect("quota fits capacity")
}

pub(super) fn departments(entries: Vec<Department>) -> BTreeMap<String, Department> {
    entries
        .into_iter()
        .map(|department| (department.name.clone(), department))
        .collect()
}

pub(super) fn snapshot(
    applicants: Vec<Applicant>,
    departments: BTreeMap<String, Department>,
) -> AdmissionSnapshot {
    AdmissionSnapshot {
        applicants,
        departments,
        waiting: Vec::new(),
    }
}

/// Snapshot with merit ranks already assigned, ready for allocation.
pub(super) fn ranked_snapshot(
    mut applicants: Vec<Applicant>,
    departments: BTreeMap<String, Department>,
) -> AdmissionSnapshot {
    ranking::generate_merit_list(&mut applicants);
    snapshot(applicants, departments)
}

pub(super) fn registration(
    name: &str,
    age: u8,
    qualifying: f32,
    entrance: f32,
    preferences: &[&str],
    category: Category,
) -> RegistrationForm {
    RegistrationForm {
        name: name.to_string(),
        age,
        qualifying_score: qualifying,
        entrance_score: entrance,
        preferences: preferences.iter().map(|p| p.to_string()).collect(),
        category,
        registered_on: None,
    }
}

#[derive(Default)]
pub(super) struct MemoryNotices {
    events: Arc<Mutex<Vec<AdmissionNotice>>>,
}

impl MemoryNotices {
    pub(super) fn events(&self) -> Vec<AdmissionNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NoticePublisher for MemoryNotices {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) fn build_service(
    departments: BTreeMap<String, Department>,
) -> (
    AdmissionService<MemoryRepository, MemoryNotices>,
    Arc<MemoryRepository>,
    Arc<MemoryNotices>,
) {
    let repository = Arc::new(MemoryRepository::seeded(departments));
    let notices = Arc::new(MemoryNotices::default());
    let service = AdmissionService::new(repository.clone(), notices.clone());
    (service, repository, notices)
}

/// The department matrix most scenario tests run against: CS with General and OBC
/// quotas, MECH with a single General seat.
pub(super) fn campus() -> BTreeMap<String, Department> {
    departments(vec![
        department("CS", 3, &[(Category::General, 2), (Category::Obc, 1)]),
        department("MECH", 1, &[(Category::General, 1)]),
    ])
}
