//! Handset loan underwriting.
//!
//! Identity-number parsing, age banding, loan pricing and the checkout lifecycle are pure
//! functions; [`UnderwritingService`] composes them over an injected [`UnderwritingStore`]
//! and [`underwriting_router`] exposes the use cases over HTTP.

pub mod age;
pub mod catalog;
pub mod checkout;
pub mod domain;
pub mod identity;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use catalog::{seed_if_empty, verify_risk_groups, CatalogError, SeedReport};
pub use checkout::CheckoutStatus;
pub use domain::{
    Applicant, ApplicantId, ApplicantRegistration, ApplicantUpdate, Device, DeviceId,
    DevicePricing, IntakeOutcome, LoanApplication, LoanDetails, LoanId, LoanRequest, RiskGroup,
    RiskGroupId,
};
pub use identity::{parse_identity_number, IdentityDetails, IdentityError};
pub use pricing::{LoanQuote, PricingOverflow};
pub use repository::{RepositoryError, UnderwritingStore, UniqueConstraint};
pub use router::underwriting_router;
pub use service::{EntityKind, UnderwritingError, UnderwritingService};
pub use store::InMemoryStore;
