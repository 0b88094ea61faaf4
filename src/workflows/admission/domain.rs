use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned to an applicant at registration; stable for the life of the record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ApplicantId(pub u64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reservation categories recognized by the seat matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    #[serde(rename = "General")]
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "EWS")]
    Ews,
}

impl Category {
    pub const fn ordered() -> [Self; 5] {
        [Self::General, Self::Obc, Self::Sc, Self::St, Self::Ews]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Obc => "OBC",
            Self::Sc => "SC",
            Self::St => "ST",
            Self::Ews => "EWS",
        }
    }

    /// Lenient lookup used by roster imports; matching is case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Some(Self::General),
            "OBC" => Some(Self::Obc),
            "SC" => Some(Self::Sc),
            "ST" => Some(Self::St),
            "EWS" => Some(Self::Ews),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Admission lifecycle for an applicant. `Rejected` and `Cancelled` are terminal:
/// a rejected applicant had no usable preference, a cancelled one never re-enters
/// allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Applied,
    Selected,
    Waiting,
    Rejected,
    Cancelled,
    Confirmed,
}

impl AdmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Selected => "Selected",
            Self::Waiting => "Waiting",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Confirmed => "Confirmed",
        }
    }
}

/// Outcome of document scrutiny for an applicant holding a seat offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        }
    }
}

/// A registered claimant competing for a seat.
///
/// Inputs are fixed at registration; the scoring and allocation fields are mutated
/// in place by the engine passes. Records are never deleted — terminal states are
/// retained for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub name: String,
    pub age: u8,
    pub qualifying_score: f32,
    pub entrance_score: f32,
    /// Department names in preference order; entries need not name a configured
    /// department.
    pub preferences: Vec<String>,
    pub category: Category,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
    pub final_score: f32,
    pub rank: Option<u32>,
    pub status: AdmissionStatus,
    /// Unset until a seat has been offered.
    pub document_status: Option<DocumentStatus>,
    pub allocated_department: Option<String>,
}

impl Applicant {
    pub fn new(
        id: ApplicantId,
        name: impl Into<String>,
        age: u8,
        qualifying_score: f32,
        entrance_score: f32,
        preferences: Vec<String>,
        category: Category,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            age,
            qualifying_score,
            entrance_score,
            preferences,
            category,
            registered_on: None,
            final_score: 0.0,
            rank: None,
            status: AdmissionStatus::Applied,
            document_status: None,
            allocated_department: None,
        }
    }

    /// True while the applicant occupies a seat in some department.
    pub fn holds_seat(&self) -> bool {
        matches!(
            self.status,
            AdmissionStatus::Selected | AdmissionStatus::Confirmed
        )
    }
}

/// Fatal seat-accounting violations.
///
/// These indicate a broken call contract rather than a policy outcome, so the
/// engine aborts the operation instead of clamping counts; a clamped count would
/// poison every later admissibility decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatAuditError {
    #[error("department {department} would exceed the {category} quota of {quota}")]
    QuotaExceeded {
        department: String,
        category: Category,
        quota: u32,
    },
    #[error("department {department} would exceed its capacity of {total_seats} seats")]
    CapacityExceeded {
        department: String,
        total_seats: u32,
    },
    #[error("department {department} has no {category} seat to release")]
    ReleaseUnderflow {
        department: String,
        category: Category,
    },
    #[error(
        "department {department} reserves {reserved} seats against a capacity of {total_seats}"
    )]
    QuotaOverCommitted {
        department: String,
        reserved: u32,
        total_seats: u32,
    },
    #[error(
        "department {department} records {recorded} filled {category} seats but {holding} applicants hold one"
    )]
    OccupancyDrift {
        department: String,
        category: Category,
        recorded: u32,
        holding: u32,
    },
    #[error("applicant {applicant} status disagrees with its allocated department")]
    StatusDrift { applicant: ApplicantId },
    #[error("applicant {applicant} waiting-queue membership disagrees with its status")]
    WaitingDrift { applicant: ApplicantId },
}

/// A resource pool with fixed capacity subdivided into per-category quotas.
///
/// Exhausting one category's quota never borrows from another's headroom, and
/// capacity left unreserved by the quota map is deliberately unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    pub total_seats: u32,
    quotas: BTreeMap<Category, u32>,
    filled: BTreeMap<Category, u32>,
}

fn zeroed_occupancy() -> BTreeMap<Category, u32> {
    Category::ordered()
        .into_iter()
        .map(|category| (category, 0))
        .collect()
}

impl Department {
    /// Department whose whole capacity is reserved for the General category.
    pub fn new(name: impl Into<String>, total_seats: u32) -> Self {
        Self {
            name: name.into(),
            total_seats,
            quotas: BTreeMap::from([(Category::General, total_seats)]),
            filled: zeroed_occupancy(),
        }
    }

    /// Department with an explicit quota map; the reserved sum must fit the capacity.
    pub fn with_quotas(
        name: impl Into<String>,
        total_seats: u32,
        quotas: BTreeMap<Category, u32>,
    ) -> Result<Self, SeatAuditError> {
        let name = name.into();
        let reserved: u32 = quotas.values().sum();
        if reserved > total_seats {
            return Err(SeatAuditError::QuotaOverCommitted {
                department: name,
                reserved,
                total_seats,
            });
        }

        Ok(Self {
            name,
            total_seats,
            quotas,
            filled: zeroed_occupancy(),
        })
    }

    pub fn quota(&self, category: Category) -> u32 {
        self.quotas.get(&category).copied().unwrap_or(0)
    }

    pub fn filled(&self, category: Category) -> u32 {
        self.filled.get(&category).copied().unwrap_or(0)
    }

    pub fn occupied(&self) -> u32 {
        self.filled.values().sum()
    }

    pub fn available_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.occupied())
    }

    /// Whether this department can currently admit one more applicant of `category`.
    pub fn can_admit(&self, category: Category) -> bool {
        self.filled(category) < self.quota(category)
    }

    /// Claim one seat for `category`, failing loudly on any accounting violation.
    pub(crate) fn admit(&mut self, category: Category) -> Result<(), SeatAuditError> {
        if !self.can_admit(category) {
            return Err(SeatAuditError::QuotaExceeded {
                department: self.name.clone(),
                category,
                quota: self.quota(category),
            });
        }
        if self.occupied() >= self.total_seats {
            return Err(SeatAuditError::CapacityExceeded {
                department: self.name.clone(),
                total_seats: self.total_seats,
            });
        }

        *self.filled.entry(category).or_insert(0) += 1;
        Ok(())
    }

    /// Return one `category` seat to the pool.
    pub(crate) fn release(&mut self, category: Category) -> Result<(), SeatAuditError> {
        let occupancy = self.filled.entry(category).or_insert(0);
        if *occupancy == 0 {
            return Err(SeatAuditError::ReleaseUnderflow {
                department: self.name.clone(),
                category,
            });
        }

        *occupancy -= 1;
        Ok(())
    }
}

/// In-memory unit of work for the engine passes.
///
/// Entry points mutate the snapshot in place and callers persist or discard it as
/// a whole; a partially applied pass must never be committed. The waiting queue
/// stores ids into the applicant store, never a second copy of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionSnapshot {
    pub applicants: Vec<Applicant>,
    pub departments: BTreeMap<String, Department>,
    pub waiting: Vec<ApplicantId>,
}

impl AdmissionSnapshot {
    pub fn new(departments: BTreeMap<String, Department>) -> Self {
        Self {
            applicants: Vec::new(),
            departments,
            waiting: Vec::new(),
        }
    }

    pub fn applicant(&self, id: ApplicantId) -> Option<&Applicant> {
        self.applicants.iter().find(|applicant| applicant.id == id)
    }

    pub fn applicant_mut(&mut self, id: ApplicantId) -> Option<&mut Applicant> {
        self.applicants
            .iter_mut()
            .find(|applicant| applicant.id == id)
    }

    /// Verify every seat-count and bookkeeping invariant, returning the first
    /// violation found.
    pub fn audit(&self) -> Result<(), SeatAuditError> {
        for department in self.departments.values() {
            let reserved: u32 = Category::ordered()
                .into_iter()
                .map(|category| department.quota(category))
                .sum();
            if reserved > department.total_seats {
                return Err(SeatAuditError::QuotaOverCommitted {
                    department: department.name.clone(),
                    reserved,
                    total_seats: department.total_seats,
                });
            }

            for category in Category::ordered() {
                let recorded = department.filled(category);
                if recorded > department.quota(category) {
                    return Err(SeatAuditError::QuotaExceeded {
                        department: department.name.clone(),
                        category,
                        quota: department.quota(category),
                    });
                }

                let holding = self
                    .applicants
                    .iter()
                    .filter(|applicant| {
                        applicant.category == category
                            && applicant.holds_seat()
                            && applicant.allocated_department.as_deref()
                                == Some(department.name.as_str())
                    })
                    .count() as u32;
                if holding != recorded {
                    return Err(SeatAuditError::OccupancyDrift {
                        department: department.name.clone(),
                        category,
                        recorded,
                        holding,
                    });
                }
            }

            if department.occupied() > department.total_seats {
                return Err(SeatAuditError::CapacityExceeded {
                    department: department.name.clone(),
                    total_seats: department.total_seats,
                });
            }
        }

        for applicant in &self.applicants {
            if applicant.holds_seat() != applicant.allocated_department.is_some() {
                return Err(SeatAuditError::StatusDrift {
                    applicant: applicant.id,
                });
            }

            let queued = self
                .waiting
                .iter()
                .filter(|&&waiting| waiting == applicant.id)
                .count();
            let expected = usize::from(applicant.status == AdmissionStatus::Waiting);
            if queued != expected {
                return Err(SeatAuditError::WaitingDrift {
                    applicant: applicant.id,
                });
            }
        }

        if let Some(&orphan) = self
            .waiting
            .iter()
            .find(|&&id| self.applicant(id).is_none())
        {
            return Err(SeatAuditError::WaitingDrift { applicant: orphan });
        }

        Ok(())
    }
}

/// Seed department matrix used by the demo CLI and the default server repository.
pub fn standard_departments() -> BTreeMap<String, Department> {
    let matrix = [
        (
            "CS",
            4,
            BTreeMap::from([(Category::General, 2), (Category::Obc, 1), (Category::Ews, 1)]),
        ),
        (
            "MECH",
            2,
            BTreeMap::from([(Category::General, 1), (Category::Sc, 1)]),
        ),
        (
            "CIVIL",
            2,
            BTreeMap::from([(Category::General, 1), (Category::St, 1)]),
        ),
    ];

    matrix
        .into_iter()
        .map(|(name, total_seats, quotas)| {
            (
                name.to_string(),
                Department {
                    name: name.to_string(),
                    total_seats,
                    quotas,
                    filled: zeroed_occupancy(),
                },
            )
        })
        .collect()
}
