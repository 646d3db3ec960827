use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Applicant, ApplicantId, Device, DeviceId, LoanApplication, LoanId, RiskGroup, RiskGroupId,
};
use super::repository::{
    ApplicantRepository, DeviceRepository, LoanRepository, RepositoryError, RiskGroupRepository,
    UniqueConstraint,
};

#[derive(Debug, Default)]
struct Tables {
    applicants: HashMap<ApplicantId, Applicant>,
    identity_index: HashMap<String, ApplicantId>,
    devices: HashMap<DeviceId, Device>,
    risk_groups: HashMap<RiskGroupId, RiskGroup>,
    loans: HashMap<LoanId, LoanApplication>,
}

/// Process-local store backing the service and tests.
///
/// Every table sits behind a single mutex so multi-table writes (loan insert plus applicant
/// link) commit together, and the unique indexes are checked inside the same critical section
/// as the write they guard.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ApplicantRepository for InMemoryStore {
    fn find_applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self.tables()?.applicants.get(&id).cloned())
    }

    fn find_applicant_by_identity(
        &self,
        identity_number: &str,
    ) -> Result<Option<Applicant>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .identity_index
            .get(identity_number)
            .and_then(|id| tables.applicants.get(id))
            .cloned())
    }

    fn list_applicants(&self) -> Result<Vec<Applicant>, RepositoryError> {
        let mut applicants: Vec<Applicant> =
            self.tables()?.applicants.values().cloned().collect();
        applicants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applicants)
    }

    fn insert_applicant(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.identity_index.contains_key(&applicant.identity_number) {
            return Err(RepositoryError::Conflict(UniqueConstraint::IdentityNumber));
        }
        tables
            .identity_index
            .insert(applicant.identity_number.clone(), applicant.id);
        tables.applicants.insert(applicant.id, applicant.clone());
        Ok(applicant)
    }

    fn update_applicant(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut tables = self.tables()?;
        let previous = tables
            .applicants
            .get(&applicant.id)
            .ok_or(RepositoryError::NotFound)?;
        if previous.identity_number != applicant.identity_number {
            if tables.identity_index.contains_key(&applicant.identity_number) {
                return Err(RepositoryError::Conflict(UniqueConstraint::IdentityNumber));
            }
            let stale = previous.identity_number.clone();
            tables.identity_index.remove(&stale);
            tables
                .identity_index
                .insert(applicant.identity_number.clone(), applicant.id);
        }
        tables.applicants.insert(applicant.id, applicant.clone());
        Ok(applicant)
    }

    fn count_applicants(&self) -> Result<usize, RepositoryError> {
        Ok(self.tables()?.applicants.len())
    }
}

impl DeviceRepository for InMemoryStore {
    fn find_device(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError> {
        Ok(self.tables()?.devices.get(&id).cloned())
    }

    fn list_devices(&self) -> Result<Vec<Device>, RepositoryError> {
        let mut devices: Vec<Device> = self.tables()?.devices.values().cloned().collect();
        devices.sort_by(|a, b| {
            a.cash_price
                .cmp(&b.cash_price)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(devices)
    }

    fn insert_device(&self, device: Device) -> Result<Device, RepositoryError> {
        self.tables()?.devices.insert(device.id, device.clone());
        Ok(device)
    }

    fn count_devices(&self) -> Result<usize, RepositoryError> {
        Ok(self.tables()?.devices.len())
    }
}

impl RiskGroupRepository for InMemoryStore {
    fn find_risk_group(&self, id: RiskGroupId) -> Result<Option<RiskGroup>, RepositoryError> {
        Ok(self.tables()?.risk_groups.get(&id).cloned())
    }

    fn find_risk_group_by_ordinal(
        &self,
        ordinal: u8,
    ) -> Result<Option<RiskGroup>, RepositoryError> {
        Ok(self
            .tables()?
            .risk_groups
            .values()
            .find(|group| group.ordinal == ordinal)
            .cloned())
    }

    fn list_risk_groups(&self) -> Result<Vec<RiskGroup>, RepositoryError> {
        let mut groups: Vec<RiskGroup> = self.tables()?.risk_groups.values().cloned().collect();
        groups.sort_by_key(|group| group.ordinal);
        Ok(groups)
    }

    fn insert_risk_group(&self, group: RiskGroup) -> Result<RiskGroup, RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .risk_groups
            .values()
            .any(|existing| existing.ordinal == group.ordinal)
        {
            return Err(RepositoryError::Conflict(UniqueConstraint::RiskGroupOrdinal));
        }
        tables.risk_groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn count_risk_groups(&self) -> Result<usize, RepositoryError> {
        Ok(self.tables()?.risk_groups.len())
    }
}

impl LoanRepository for InMemoryStore {
    fn find_loan(&self, id: LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(self.tables()?.loans.get(&id).cloned())
    }

    fn find_loan_for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(self
            .tables()?
            .loans
            .values()
            .find(|loan| loan.applicant_id == applicant_id)
            .cloned())
    }

    fn insert_for_applicant(
        &self,
        loan: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut tables = self.tables()?;
        let Tables {
            applicants, loans, ..
        } = &mut *tables;

        let applicant = applicants
            .get_mut(&loan.applicant_id)
            .ok_or(RepositoryError::NotFound)?;
        if applicant.loan_id.is_some()
            || loans.values().any(|held| held.applicant_id == loan.applicant_id)
        {
            return Err(RepositoryError::Conflict(UniqueConstraint::ApplicantLoan));
        }

        applicant.loan_id = Some(loan.id);
        applicant.updated_at = loan.created_at;
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn update_loan(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut tables = self.tables()?;
        match tables.loans.get_mut(&loan.id) {
            Some(slot) => {
                *slot = loan.clone();
                Ok(loan)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn count_loans(&self) -> Result<usize, RepositoryError> {
        Ok(self.tables()?.loans.len())
    }
}
