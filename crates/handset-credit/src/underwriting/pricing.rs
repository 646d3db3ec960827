use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Loans are amortised over a 360-day year.
pub const LOAN_TERM_DAYS: u32 = 360;
pub const DAYS_PER_MONTH: u32 = 30;
/// Monthly income must exceed this multiple of the monthly repayment.
pub const AFFORDABILITY_MULTIPLE: u32 = 10;
/// Highest cash price a device may carry.
pub const MAX_CASH_PRICE: u32 = 1_000_000;
const CURRENCY_SCALE: u32 = 2;

/// Raised when a price is too large to be financed without overflowing decimal arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cash price {cash_price} cannot be priced")]
pub struct PricingOverflow {
    pub cash_price: Decimal,
}

/// Rounded loan terms for one device under one risk group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub deposit_amount: Decimal,
    pub loan_principal: Decimal,
    pub loan_amount: Decimal,
    pub daily_payment: Decimal,
}

impl LoanQuote {
    /// Each figure is rounded from its own unrounded formula rather than chained from an
    /// already rounded predecessor.
    pub fn calculate(
        cash_price: Decimal,
        deposit_fraction: Decimal,
        interest_fraction: Decimal,
    ) -> Result<Self, PricingOverflow> {
        let overflow = || PricingOverflow { cash_price };

        let deposit = cash_price
            .checked_mul(deposit_fraction)
            .ok_or_else(overflow)?;
        let principal = Decimal::ONE
            .checked_sub(deposit_fraction)
            .and_then(|financed| cash_price.checked_mul(financed))
            .ok_or_else(overflow)?;
        let amount = Decimal::ONE
            .checked_add(interest_fraction)
            .and_then(|growth| principal.checked_mul(growth))
            .ok_or_else(overflow)?;
        let daily = amount
            .checked_div(Decimal::from(LOAN_TERM_DAYS))
            .ok_or_else(overflow)?;

        Ok(Self {
            deposit_amount: round2(deposit),
            loan_principal: round2(principal),
            loan_amount: round2(amount),
            daily_payment: round2(daily),
        })
    }

    /// Display figure only; deliberately not rounded again.
    pub fn monthly_payment(&self) -> Decimal {
        monthly_payment(self.daily_payment)
    }

    pub fn affordable_for(&self, monthly_income: Decimal) -> bool {
        affordable(monthly_income, self.daily_payment)
    }
}

pub fn monthly_payment(daily_payment: Decimal) -> Decimal {
    daily_payment.saturating_mul(Decimal::from(DAYS_PER_MONTH))
}

/// Shared affordability gate for device listing and loan creation.
pub fn affordable(monthly_income: Decimal, daily_payment: Decimal) -> bool {
    monthly_income
        > monthly_payment(daily_payment).saturating_mul(Decimal::from(AFFORDABILITY_MULTIPLE))
}

/// Positive, whole cents and no higher than [`MAX_CASH_PRICE`].
pub fn is_valid_cash_price(price: Decimal) -> bool {
    price > Decimal::ZERO
        && price.normalize().scale() <= CURRENCY_SCALE
        && price <= Decimal::from(MAX_CASH_PRICE)
}

/// Round half-up to cents.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
