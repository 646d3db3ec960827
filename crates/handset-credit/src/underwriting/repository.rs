use std::fmt;

use super::domain::{
    Applicant, ApplicantId, Device, DeviceId, LoanApplication, LoanId, RiskGroup, RiskGroupId,
};

/// Unique constraints the storage layer is expected to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    IdentityNumber,
    RiskGroupOrdinal,
    ApplicantLoan,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniqueConstraint::IdentityNumber => "applicants.identity_number",
            UniqueConstraint::RiskGroupOrdinal => "risk_groups.ordinal",
            UniqueConstraint::ApplicantLoan => "loans.applicant_id",
        };
        f.write_str(name)
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint {0} violated")]
    Conflict(UniqueConstraint),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait ApplicantRepository: Send + Sync {
    fn find_applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn find_applicant_by_identity(
        &self,
        identity_number: &str,
    ) -> Result<Option<Applicant>, RepositoryError>;
    /// Newest first.
    fn list_applicants(&self) -> Result<Vec<Applicant>, RepositoryError>;
    /// Fails with `Conflict(IdentityNumber)` when the identity number is already stored.
    fn insert_applicant(&self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn update_applicant(&self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn count_applicants(&self) -> Result<usize, RepositoryError>;
}

pub trait DeviceRepository: Send + Sync {
    fn find_device(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError>;
    /// Ordered by ascending cash price.
    fn list_devices(&self) -> Result<Vec<Device>, RepositoryError>;
    fn insert_device(&self, device: Device) -> Result<Device, RepositoryError>;
    fn count_devices(&self) -> Result<usize, RepositoryError>;
}

pub trait RiskGroupRepository: Send + Sync {
    fn find_risk_group(&self, id: RiskGroupId) -> Result<Option<RiskGroup>, RepositoryError>;
    fn find_risk_group_by_ordinal(&self, ordinal: u8)
        -> Result<Option<RiskGroup>, RepositoryError>;
    /// Ordered by ascending ordinal.
    fn list_risk_groups(&self) -> Result<Vec<RiskGroup>, RepositoryError>;
    /// Fails with `Conflict(RiskGroupOrdinal)` when the ordinal is already taken.
    fn insert_risk_group(&self, group: RiskGroup) -> Result<RiskGroup, RepositoryError>;
    fn count_risk_groups(&self) -> Result<usize, RepositoryError>;
}

pub trait LoanRepository: Send + Sync {
    fn find_loan(&self, id: LoanId) -> Result<Option<LoanApplication>, RepositoryError>;
    fn find_loan_for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<LoanApplication>, RepositoryError>;
    /// Insert the loan and link it to its applicant as one unit of work.
    ///
    /// Fails with `Conflict(ApplicantLoan)` if the applicant already holds a loan and with
    /// `NotFound` if the applicant is gone; nothing is written in either case.
    fn insert_for_applicant(
        &self,
        loan: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError>;
    fn update_loan(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn count_loans(&self) -> Result<usize, RepositoryError>;
}

/// Storage capability injected into the underwriting service.
pub trait UnderwritingStore:
    ApplicantRepository + DeviceRepository + RiskGroupRepository + LoanRepository
{
}

impl<T> UnderwritingStore for T where
    T: ApplicantRepository + DeviceRepository + RiskGroupRepository + LoanRepository
{
}
