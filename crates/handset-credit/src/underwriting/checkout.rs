use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a loan application.
///
/// The transport form is the upper-case key (`"REVIEW"`); [`CheckoutStatus::label`] is the
/// lower-case storage form. Both directions go through this one enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    #[default]
    Pending,
    Review,
    Completed,
    Rejected,
}

impl CheckoutStatus {
    pub const ALL: [CheckoutStatus; 4] = [
        CheckoutStatus::Pending,
        CheckoutStatus::Review,
        CheckoutStatus::Completed,
        CheckoutStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CheckoutStatus::Pending => "pending",
            CheckoutStatus::Review => "review",
            CheckoutStatus::Completed => "completed",
            CheckoutStatus::Rejected => "rejected",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            CheckoutStatus::Pending => "PENDING",
            CheckoutStatus::Review => "REVIEW",
            CheckoutStatus::Completed => "COMPLETED",
            CheckoutStatus::Rejected => "REJECTED",
        }
    }

    /// The forward path of the checkout flow: `Pending -> Review -> Completed`, with
    /// `Rejected` reachable from either open state.
    pub fn follows_checkout_path(self, next: CheckoutStatus) -> bool {
        matches!(
            (self, next),
            (CheckoutStatus::Pending, CheckoutStatus::Review)
                | (CheckoutStatus::Review, CheckoutStatus::Completed)
                | (CheckoutStatus::Pending, CheckoutStatus::Rejected)
                | (CheckoutStatus::Review, CheckoutStatus::Rejected)
        )
    }
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checkout status '{0}'")]
pub struct UnknownCheckoutStatus(pub String);

/// Accepts either the transport key or the storage label, case-insensitively.
impl FromStr for CheckoutStatus {
    type Err = UnknownCheckoutStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        CheckoutStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownCheckoutStatus(value.to_string()))
    }
}
