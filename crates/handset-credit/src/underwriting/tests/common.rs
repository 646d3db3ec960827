use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::underwriting::catalog::{default_devices, seed_if_empty};
use crate::underwriting::domain::{
    Applicant, ApplicantId, ApplicantRegistration, Device, DeviceId, LoanApplication, LoanId,
    RiskGroup, RiskGroupId,
};
use crate::underwriting::repository::{
    ApplicantRepository, DeviceRepository, LoanRepository, RepositoryError, RiskGroupRepository,
};
use crate::underwriting::{InMemoryStore, UnderwritingService};

pub(super) const THIRTY_FOUR_YEAR_OLD: &str = "9001015800088";
pub(super) const TWENTY_NINE_YEAR_OLD: &str = "9503010123085";
pub(super) const SIXTY_THREE_YEAR_OLD: &str = "6007150101086";
pub(super) const SIXTY_SIX_YEAR_OLD: &str = "5806015001089";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    seed_if_empty(store.as_ref(), default_devices()).expect("seeding succeeds");
    store
}

pub(super) fn build_service() -> (UnderwritingService<InMemoryStore>, Arc<InMemoryStore>) {
    let store = seeded_store();
    (UnderwritingService::new(store.clone()), store)
}

pub(super) fn registration(
    identity_number: &str,
    birth_date: NaiveDate,
    monthly_income: Option<i64>,
) -> ApplicantRegistration {
    ApplicantRegistration {
        first_name: "Thandi".to_string(),
        last_name: "Mokoena".to_string(),
        identity_number: identity_number.to_string(),
        birth_date,
        monthly_income: monthly_income.map(Decimal::from),
    }
}

pub(super) fn register(
    service: &UnderwritingService<InMemoryStore>,
    identity_number: &str,
    birth_date: NaiveDate,
    monthly_income: Option<i64>,
) -> Applicant {
    service
        .register_applicant(
            registration(identity_number, birth_date, monthly_income),
            today(),
        )
        .expect("registration runs")
        .accepted()
        .expect("registration accepted")
}

pub(super) fn risk_group(store: &InMemoryStore, ordinal: u8) -> RiskGroup {
    store
        .find_risk_group_by_ordinal(ordinal)
        .expect("lookup succeeds")
        .expect("risk group seeded")
}

pub(super) fn device_named(store: &InMemoryStore, name: &str) -> Device {
    store
        .list_devices()
        .expect("listing succeeds")
        .into_iter()
        .find(|device| device.name == name)
        .expect("device seeded")
}

/// Store whose every call fails as if the backing database were down.
pub(super) struct UnavailableStore;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ApplicantRepository for UnavailableStore {
    fn find_applicant(&self, _id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        unavailable()
    }

    fn find_applicant_by_identity(
        &self,
        _identity_number: &str,
    ) -> Result<Option<Applicant>, RepositoryError> {
        unavailable()
    }

    fn list_applicants(&self) -> Result<Vec<Applicant>, RepositoryError> {
        unavailable()
    }

    fn insert_applicant(&self, _applicant: Applicant) -> Result<Applicant, RepositoryError> {
        unavailable()
    }

    fn update_applicant(&self, _applicant: Applicant) -> Result<Applicant, RepositoryError> {
        unavailable()
    }

    fn count_applicants(&self) -> Result<usize, RepositoryError> {
        unavailable()
    }
}

impl DeviceRepository for UnavailableStore {
    fn find_device(&self, _id: DeviceId) -> Result<Option<Device>, RepositoryError> {
        unavailable()
    }

    fn list_devices(&self) -> Result<Vec<Device>, RepositoryError> {
        unavailable()
    }

    fn insert_device(&self, _device: Device) -> Result<Device, RepositoryError> {
        unavailable()
    }

    fn count_devices(&self) -> Result<usize, RepositoryError> {
        unavailable()
    }
}

impl RiskGroupRepository for UnavailableStore {
    fn find_risk_group(&self, _id: RiskGroupId) -> Result<Option<RiskGroup>, RepositoryError> {
        unavailable()
    }

    fn find_risk_group_by_ordinal(
        &self,
        _ordinal: u8,
    ) -> Result<Option<RiskGroup>, RepositoryError> {
        unavailable()
    }

    fn list_risk_groups(&self) -> Result<Vec<RiskGroup>, RepositoryError> {
        unavailable()
    }

    fn insert_risk_group(&self, _group: RiskGroup) -> Result<RiskGroup, RepositoryError> {
        unavailable()
    }

    fn count_risk_groups(&self) -> Result<usize, RepositoryError> {
        unavailable()
    }
}

impl LoanRepository for UnavailableStore {
    fn find_loan(&self, _id: LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        unavailable()
    }

    fn find_loan_for_applicant(
        &self,
        _applicant_id: ApplicantId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        unavailable()
    }

    fn insert_for_applicant(
        &self,
        _loan: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        unavailable()
    }

    fn update_loan(&self, _loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        unavailable()
    }

    fn count_loans(&self) -> Result<usize, RepositoryError> {
        unavailable()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
