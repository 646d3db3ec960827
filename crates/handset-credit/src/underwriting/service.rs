use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::age::{age_on, is_eligible_age, risk_group_ordinal};
use super::checkout::CheckoutStatus;
use super::domain::{
    Applicant, ApplicantId, ApplicantRegistration, ApplicantUpdate, Device, DeviceId,
    DevicePricing, IntakeOutcome, LoanApplication, LoanDetails, LoanId, LoanRequest, RiskGroup,
    RiskGroupId,
};
use super::identity::{masked, normalize_identity_number, parse_identity_number};
use super::pricing::{affordable, PricingOverflow};
use super::repository::{RepositoryError, UnderwritingStore, UniqueConstraint};

const MINIMUM_NAME_LENGTH: usize = 2;
const MINIMUM_PLAUSIBLE_INCOME: i64 = 1000;

pub(crate) const AGE_RANGE_MESSAGE: &str = "Age must be between 18 and 65 (inclusive)";
pub(crate) const BIRTHDAY_MISMATCH_MESSAGE: &str = "Birthday does not match ID number";
pub(crate) const DUPLICATE_IDENTITY_MESSAGE: &str = "A user with this ID number already exists";
pub(crate) const INCOME_NOT_POSITIVE_MESSAGE: &str = "Monthly income must be greater than 0";
pub(crate) const INCOME_TOO_LOW_MESSAGE: &str = "Monthly income seems too low. Please verify.";
pub(crate) const UNAFFORDABLE_MESSAGE: &str =
    "Monthly income must be at least 10x the monthly payment amount";
pub(crate) const EXISTING_LOAN_MESSAGE: &str = "Applicant already has a loan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Applicant,
    Device,
    RiskGroup,
    Loan,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Applicant => "Applicant",
            EntityKind::Device => "Device",
            EntityKind::RiskGroup => "Risk group",
            EntityKind::Loan => "Loan",
        }
    }
}

/// Error raised by the underwriting service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnderwritingError {
    #[error("{} not found", .entity.label())]
    NotFound { entity: EntityKind, id: String },
    #[error("risk group {ordinal} is not configured")]
    Configuration { ordinal: u8 },
    #[error(transparent)]
    Pricing(#[from] PricingOverflow),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl UnderwritingError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Service composing identity checks, risk assignment, pricing and checkout over a store.
pub struct UnderwritingService<S> {
    store: Arc<S>,
}

impl<S> UnderwritingService<S>
where
    S: UnderwritingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and upsert an applicant keyed by identity number.
    ///
    /// Every failing rule is reported at once. A registration for an identity number that is
    /// already on file updates that applicant instead of creating another one.
    pub fn register_applicant(
        &self,
        registration: ApplicantRegistration,
        today: NaiveDate,
    ) -> Result<IntakeOutcome<Applicant>, UnderwritingError> {
        let mut errors = Vec::new();
        validate_name("First name", &registration.first_name, &mut errors);
        validate_name("Last name", &registration.last_name, &mut errors);

        let identity_number = normalize_identity_number(&registration.identity_number);
        let mut ordinal = None;
        match parse_identity_number(&identity_number) {
            Ok(details) => {
                let age = age_on(details.date_of_birth, today);
                if is_eligible_age(age) {
                    ordinal = risk_group_ordinal(age);
                } else {
                    errors.push(AGE_RANGE_MESSAGE.to_string());
                }
                if details.date_of_birth != registration.birth_date {
                    errors.push(BIRTHDAY_MISMATCH_MESSAGE.to_string());
                }
            }
            Err(err) => {
                let kind = if err.is_format_error() {
                    "format"
                } else {
                    "checksum"
                };
                debug!(identity = %masked(&identity_number), kind, "identity number rejected");
                errors.push(err.to_string());
            }
        }

        if let Some(income) = registration.monthly_income {
            validate_income(income, &mut errors);
        }

        if !errors.is_empty() {
            warn!(
                identity = %masked(&identity_number),
                failures = errors.len(),
                "applicant registration rejected"
            );
            return Ok(IntakeOutcome::Rejected(errors));
        }
        let Some(ordinal) = ordinal else {
            return Ok(IntakeOutcome::Rejected(vec![AGE_RANGE_MESSAGE.to_string()]));
        };

        let risk_group = self
            .store
            .find_risk_group_by_ordinal(ordinal)?
            .ok_or(UnderwritingError::Configuration { ordinal })?;

        self.upsert_applicant(&registration, &identity_number, risk_group.id)
    }

    fn upsert_applicant(
        &self,
        registration: &ApplicantRegistration,
        identity_number: &str,
        risk_group_id: RiskGroupId,
    ) -> Result<IntakeOutcome<Applicant>, UnderwritingError> {
        if let Some(existing) = self.store.find_applicant_by_identity(identity_number)? {
            return self
                .refresh_applicant(existing, registration, risk_group_id)
                .map(IntakeOutcome::Accepted);
        }

        let now = Utc::now();
        let applicant = Applicant {
            id: ApplicantId::new(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            identity_number: identity_number.to_string(),
            birth_date: registration.birth_date,
            monthly_income: registration.monthly_income,
            risk_group_id: Some(risk_group_id),
            selected_device_id: None,
            loan_id: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_applicant(applicant) {
            Ok(stored) => {
                info!(
                    applicant = %stored.id,
                    identity = %masked(identity_number),
                    "applicant registered"
                );
                Ok(IntakeOutcome::Accepted(stored))
            }
            // A concurrent registration won the unique index; converge on its row.
            Err(RepositoryError::Conflict(UniqueConstraint::IdentityNumber)) => {
                match self.store.find_applicant_by_identity(identity_number)? {
                    Some(winner) => self
                        .refresh_applicant(winner, registration, risk_group_id)
                        .map(IntakeOutcome::Accepted),
                    None => Ok(IntakeOutcome::Rejected(vec![
                        DUPLICATE_IDENTITY_MESSAGE.to_string()
                    ])),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn refresh_applicant(
        &self,
        mut applicant: Applicant,
        registration: &ApplicantRegistration,
        risk_group_id: RiskGroupId,
    ) -> Result<Applicant, UnderwritingError> {
        applicant.first_name = registration.first_name.trim().to_string();
        applicant.last_name = registration.last_name.trim().to_string();
        applicant.birth_date = registration.birth_date;
        applicant.risk_group_id = Some(risk_group_id);
        if let Some(income) = registration.monthly_income {
            applicant.monthly_income = Some(income);
        }
        applicant.updated_at = Utc::now();

        let stored = self.store.update_applicant(applicant)?;
        info!(applicant = %stored.id, "existing applicant refreshed from registration");
        Ok(stored)
    }

    pub fn get_applicant(&self, id: ApplicantId) -> Result<Applicant, UnderwritingError> {
        self.store
            .find_applicant(id)?
            .ok_or_else(|| UnderwritingError::not_found(EntityKind::Applicant, id))
    }

    pub fn list_applicants(&self) -> Result<Vec<Applicant>, UnderwritingError> {
        Ok(self.store.list_applicants()?)
    }

    /// Apply a partial update. Referenced devices and risk groups must exist.
    pub fn update_applicant(
        &self,
        id: ApplicantId,
        update: ApplicantUpdate,
    ) -> Result<IntakeOutcome<Applicant>, UnderwritingError> {
        let mut applicant = self.get_applicant(id)?;
        let mut errors = Vec::new();

        if let Some(first_name) = &update.first_name {
            validate_name("First name", first_name, &mut errors);
        }
        if let Some(last_name) = &update.last_name {
            validate_name("Last name", last_name, &mut errors);
        }
        if let Some(income) = update.monthly_income {
            validate_income(income, &mut errors);
        }
        if let Some(group_id) = update.risk_group_id {
            if self.store.find_risk_group(group_id)?.is_none() {
                errors.push(
                    UnderwritingError::not_found(EntityKind::RiskGroup, group_id).to_string(),
                );
            }
        }
        if let Some(device_id) = update.selected_device_id {
            if self.store.find_device(device_id)?.is_none() {
                errors.push(
                    UnderwritingError::not_found(EntityKind::Device, device_id).to_string(),
                );
            }
        }

        if !errors.is_empty() {
            warn!(applicant = %id, failures = errors.len(), "applicant update rejected");
            return Ok(IntakeOutcome::Rejected(errors));
        }

        if let Some(first_name) = update.first_name {
            applicant.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            applicant.last_name = last_name.trim().to_string();
        }
        if update.monthly_income.is_some() {
            applicant.monthly_income = update.monthly_income;
        }
        if update.risk_group_id.is_some() {
            applicant.risk_group_id = update.risk_group_id;
        }
        if update.selected_device_id.is_some() {
            applicant.selected_device_id = update.selected_device_id;
        }
        applicant.updated_at = Utc::now();

        let stored = self.store.update_applicant(applicant)?;
        info!(applicant = %stored.id, "applicant updated");
        Ok(IntakeOutcome::Accepted(stored))
    }

    pub fn get_device(&self, id: DeviceId) -> Result<Device, UnderwritingError> {
        self.store
            .find_device(id)?
            .ok_or_else(|| UnderwritingError::not_found(EntityKind::Device, id))
    }

    pub fn list_risk_groups(&self) -> Result<Vec<RiskGroup>, UnderwritingError> {
        Ok(self.store.list_risk_groups()?)
    }

    pub fn get_risk_group(&self, id: RiskGroupId) -> Result<RiskGroup, UnderwritingError> {
        self.store
            .find_risk_group(id)?
            .ok_or_else(|| UnderwritingError::not_found(EntityKind::RiskGroup, id))
    }

    /// Full pricing breakdown of a device for a risk group.
    pub fn price_device(
        &self,
        device_id: DeviceId,
        risk_group_id: RiskGroupId,
    ) -> Result<DevicePricing, UnderwritingError> {
        let device = self.get_device(device_id)?;
        let risk_group = self.get_risk_group(risk_group_id)?;
        debug!(device = %device.id, risk_group = risk_group.ordinal, "pricing device");
        Ok(DevicePricing::new(device, risk_group)?)
    }

    /// Devices by ascending cash price, narrowed to affordable ones when both an income and a
    /// risk group are given.
    pub fn list_affordable_devices(
        &self,
        monthly_income: Option<Decimal>,
        risk_group_id: Option<RiskGroupId>,
    ) -> Result<Vec<Device>, UnderwritingError> {
        let devices = self.store.list_devices()?;

        let (Some(income), Some(group_id)) = (monthly_income, risk_group_id) else {
            return Ok(devices);
        };
        let risk_group = self.get_risk_group(group_id)?;

        let mut within_budget = Vec::with_capacity(devices.len());
        for device in devices {
            let quote = risk_group.quote(device.cash_price)?;
            if affordable(income, quote.daily_payment) {
                within_budget.push(device);
            }
        }
        Ok(within_budget)
    }

    /// Price and persist a loan once every reference resolves and the affordability gate passes.
    ///
    /// Missing references are reported together; nothing is written unless all checks pass.
    pub fn create_loan(
        &self,
        request: LoanRequest,
    ) -> Result<IntakeOutcome<LoanDetails>, UnderwritingError> {
        let mut errors = Vec::new();

        let applicant = self.store.find_applicant(request.applicant_id)?;
        let device = self.store.find_device(request.device_id)?;
        let risk_group = self.store.find_risk_group(request.risk_group_id)?;

        if applicant.is_none() {
            errors.push(
                UnderwritingError::not_found(EntityKind::Applicant, request.applicant_id)
                    .to_string(),
            );
        }
        if device.is_none() {
            errors.push(
                UnderwritingError::not_found(EntityKind::Device, request.device_id).to_string(),
            );
        }
        if risk_group.is_none() {
            errors.push(
                UnderwritingError::not_found(EntityKind::RiskGroup, request.risk_group_id)
                    .to_string(),
            );
        }

        let (Some(applicant), Some(device), Some(risk_group)) = (applicant, device, risk_group)
        else {
            warn!(failures = errors.len(), "loan request references missing records");
            return Ok(IntakeOutcome::Rejected(errors));
        };

        let quote = risk_group.quote(device.cash_price)?;
        if applicant.loan_id.is_some() {
            errors.push(EXISTING_LOAN_MESSAGE.to_string());
        }
        if let Some(income) = applicant.monthly_income {
            if !quote.affordable_for(income) {
                errors.push(UNAFFORDABLE_MESSAGE.to_string());
            }
        }

        if !errors.is_empty() {
            warn!(applicant = %applicant.id, failures = errors.len(), "loan request rejected");
            return Ok(IntakeOutcome::Rejected(errors));
        }

        let now = Utc::now();
        let loan = LoanApplication {
            id: LoanId::new(),
            applicant_id: applicant.id,
            device_id: device.id,
            risk_group_id: risk_group.id,
            deposit_amount: quote.deposit_amount,
            loan_principal: quote.loan_principal,
            loan_amount: quote.loan_amount,
            daily_payment: quote.daily_payment,
            status: request.initial_status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let loan = match self.store.insert_for_applicant(loan) {
            Ok(loan) => loan,
            Err(RepositoryError::Conflict(UniqueConstraint::ApplicantLoan)) => {
                return Ok(IntakeOutcome::Rejected(vec![
                    EXISTING_LOAN_MESSAGE.to_string()
                ]));
            }
            Err(RepositoryError::NotFound) => {
                return Ok(IntakeOutcome::Rejected(vec![UnderwritingError::not_found(
                    EntityKind::Applicant,
                    applicant.id,
                )
                .to_string()]));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            loan = %loan.id,
            applicant = %applicant.id,
            device = %device.id,
            status = loan.status.label(),
            "loan created"
        );

        let applicant = self.get_applicant(applicant.id)?;
        Ok(IntakeOutcome::Accepted(LoanDetails {
            loan,
            applicant,
            device,
            risk_group,
        }))
    }

    pub fn get_loan(&self, id: LoanId) -> Result<LoanDetails, UnderwritingError> {
        let loan = self
            .store
            .find_loan(id)?
            .ok_or_else(|| UnderwritingError::not_found(EntityKind::Loan, id))?;
        self.hydrate(loan)
    }

    /// Loans held by an applicant; at most one.
    pub fn loans_for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<LoanDetails>, UnderwritingError> {
        self.store
            .find_loan_for_applicant(applicant_id)?
            .into_iter()
            .map(|loan| self.hydrate(loan))
            .collect()
    }

    /// Set the checkout status of a loan.
    ///
    /// Any status may follow any other. Moves outside `Pending -> Review -> Completed` (or into
    /// `Rejected` from an open state) are logged but still applied.
    pub fn advance_checkout(
        &self,
        loan_id: LoanId,
        status: CheckoutStatus,
    ) -> Result<LoanDetails, UnderwritingError> {
        let mut loan = self
            .store
            .find_loan(loan_id)?
            .ok_or_else(|| UnderwritingError::not_found(EntityKind::Loan, loan_id))?;

        let previous = loan.status;
        if !previous.follows_checkout_path(status) {
            warn!(
                loan = %loan_id,
                from = previous.label(),
                to = status.label(),
                "checkout status set outside the standard path"
            );
        }

        loan.status = status;
        loan.updated_at = Utc::now();
        let loan = self.store.update_loan(loan)?;
        info!(loan = %loan.id, from = previous.label(), to = status.label(), "checkout advanced");

        self.hydrate(loan)
    }

    fn hydrate(&self, loan: LoanApplication) -> Result<LoanDetails, UnderwritingError> {
        let applicant = self.get_applicant(loan.applicant_id)?;
        let device = self.get_device(loan.device_id)?;
        let risk_group = self.get_risk_group(loan.risk_group_id)?;
        Ok(LoanDetails {
            loan,
            applicant,
            device,
            risk_group,
        })
    }
}

fn validate_name(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().chars().count() < MINIMUM_NAME_LENGTH {
        errors.push(format!(
            "{field} must be at least {MINIMUM_NAME_LENGTH} characters"
        ));
    }
}

/// Non-positive and implausibly low incomes are both plain validation failures.
fn validate_income(income: Decimal, errors: &mut Vec<String>) {
    if income <= Decimal::ZERO {
        errors.push(INCOME_NOT_POSITIVE_MESSAGE.to_string());
    }
    if income < Decimal::from(MINIMUM_PLAUSIBLE_INCOME) {
        errors.push(INCOME_TOO_LOW_MESSAGE.to_string());
    }
}
