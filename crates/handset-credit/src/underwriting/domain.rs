use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkout::CheckoutStatus;
use super::pricing::{LoanQuote, PricingOverflow};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered applicant.
    ApplicantId
);
entity_id!(DeviceId);
entity_id!(RiskGroupId);
entity_id!(
    /// Identifier of a loan application.
    LoanId
);

/// A registered borrower. `identity_number` is the unique business key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub identity_number: String,
    pub birth_date: NaiveDate,
    pub monthly_income: Option<Decimal>,
    pub risk_group_id: Option<RiskGroupId>,
    pub selected_device_id: Option<DeviceId>,
    pub loan_id: Option<LoanId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A handset offered on credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub brand: String,
    pub cash_price: Decimal,
    pub image_url: Option<String>,
}

/// Deposit and interest terms shared by every applicant in an age band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskGroup {
    pub id: RiskGroupId,
    pub ordinal: u8,
    pub name: String,
    pub deposit_fraction: Decimal,
    pub interest_fraction: Decimal,
}

impl RiskGroup {
    pub fn quote(&self, cash_price: Decimal) -> Result<LoanQuote, PricingOverflow> {
        LoanQuote::calculate(cash_price, self.deposit_fraction, self.interest_fraction)
    }
}

/// Persisted loan terms. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanId,
    pub applicant_id: ApplicantId,
    pub device_id: DeviceId,
    pub risk_group_id: RiskGroupId,
    pub deposit_amount: Decimal,
    pub loan_principal: Decimal,
    pub loan_amount: Decimal,
    pub daily_payment: Decimal,
    pub status: CheckoutStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan joined with the entities it references, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: LoanApplication,
    pub applicant: Applicant,
    pub device: Device,
    pub risk_group: RiskGroup,
}

/// Pricing breakdown for a device under a risk group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePricing {
    pub device: Device,
    pub risk_group: RiskGroup,
    pub deposit_amount: Decimal,
    pub loan_principal: Decimal,
    pub loan_amount: Decimal,
    pub daily_payment: Decimal,
    pub monthly_payment: Decimal,
}

impl DevicePricing {
    pub fn new(device: Device, risk_group: RiskGroup) -> Result<Self, PricingOverflow> {
        let quote = risk_group.quote(device.cash_price)?;
        Ok(Self {
            deposit_amount: quote.deposit_amount,
            loan_principal: quote.loan_principal,
            loan_amount: quote.loan_amount,
            daily_payment: quote.daily_payment,
            monthly_payment: quote.monthly_payment(),
            device,
            risk_group,
        })
    }
}

/// Inbound registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRegistration {
    pub first_name: String,
    pub last_name: String,
    pub identity_number: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
}

/// Partial update of an existing applicant; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
    #[serde(default)]
    pub risk_group_id: Option<RiskGroupId>,
    #[serde(default)]
    pub selected_device_id: Option<DeviceId>,
}

/// Inbound loan creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub applicant_id: ApplicantId,
    pub device_id: DeviceId,
    pub risk_group_id: RiskGroupId,
    #[serde(default)]
    pub initial_status: Option<CheckoutStatus>,
}

/// Result of a use case that validates a batch of independent rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome<T> {
    Accepted(T),
    Rejected(Vec<String>),
}

impl<T> IntakeOutcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IntakeOutcome::Accepted(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            IntakeOutcome::Accepted(value) => Some(value),
            IntakeOutcome::Rejected(_) => None,
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            IntakeOutcome::Accepted(_) => &[],
            IntakeOutcome::Rejected(errors) => errors,
        }
    }
}
