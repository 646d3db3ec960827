use crate::infra::{build_store, parse_amount, parse_cash_price, parse_date};
use chrono::{Local, NaiveDate};
use clap::Args;
use handset_credit::config::CatalogConfig;
use handset_credit::error::AppError;
use handset_credit::underwriting::catalog::default_risk_groups;
use handset_credit::underwriting::identity::masked;
use handset_credit::underwriting::{
    parse_identity_number, ApplicantRegistration, CheckoutStatus, DevicePricing, IntakeOutcome,
    LoanQuote, LoanRequest, RiskGroup, UnderwritingError, UnderwritingService,
};
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Cash price of the device
    #[arg(long, value_parser = parse_cash_price)]
    pub(crate) cash_price: Decimal,
    /// Risk group ordinal (1-3). Quotes every default group when omitted.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub(crate) ordinal: Option<u8>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (defaults to today).
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Identity number of the demo applicant.
    #[arg(long, default_value = "9001015800088")]
    pub(crate) identity_number: String,
    /// Declared monthly income of the demo applicant.
    #[arg(long, default_value = "7000", value_parser = parse_amount)]
    pub(crate) monthly_income: Decimal,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        cash_price,
        ordinal,
    } = args;

    println!("Loan quote for a cash price of {}", cash_price);
    for group in default_risk_groups()
        .into_iter()
        .filter(|group| ordinal.map_or(true, |ordinal| group.ordinal == ordinal))
    {
        let quote = group
            .quote(cash_price)
            .map_err(UnderwritingError::from)?;
        render_quote(&group, &quote);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        identity_number,
        monthly_income,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Handset credit demo (evaluated on {})", today);
    let identity = match parse_identity_number(&identity_number) {
        Ok(identity) => identity,
        Err(err) => {
            println!("  Identity number rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Identity {} -> born {} ({:?}, {:?})",
        masked(&identity.number),
        identity.date_of_birth,
        identity.gender,
        identity.citizenship
    );

    let store = build_store(&CatalogConfig {
        device_catalog: None,
        seed_defaults: true,
    })?;
    let service = UnderwritingService::new(store);

    let registration = ApplicantRegistration {
        first_name: "Demo".to_string(),
        last_name: "Applicant".to_string(),
        identity_number: identity.number.clone(),
        birth_date: identity.date_of_birth,
        monthly_income: Some(monthly_income),
    };
    let applicant = match service.register_applicant(registration, today)? {
        IntakeOutcome::Accepted(applicant) => applicant,
        IntakeOutcome::Rejected(errors) => {
            render_rejection("Registration", &errors);
            return Ok(());
        }
    };
    let Some(risk_group_id) = applicant.risk_group_id else {
        println!("  Applicant has no risk group assigned");
        return Ok(());
    };
    let risk_group = service.get_risk_group(risk_group_id)?;
    println!(
        "- Registered applicant {} in '{}' (income {}/month)",
        applicant.id, risk_group.name, monthly_income
    );

    let catalog_size = service.list_affordable_devices(None, None)?.len();
    let affordable = service.list_affordable_devices(Some(monthly_income), Some(risk_group_id))?;
    println!(
        "- {} of {} devices are affordable",
        affordable.len(),
        catalog_size
    );
    for device in &affordable {
        println!("    - {} {} at {}", device.brand, device.name, device.cash_price);
    }
    let Some(device) = affordable.last() else {
        println!("  No device fits this income; stopping before loan creation");
        return Ok(());
    };

    let pricing = service.price_device(device.id, risk_group_id)?;
    render_pricing(&pricing);

    let request = LoanRequest {
        applicant_id: applicant.id,
        device_id: device.id,
        risk_group_id,
        initial_status: None,
    };
    let mut details = match service.create_loan(request)? {
        IntakeOutcome::Accepted(details) => details,
        IntakeOutcome::Rejected(errors) => {
            render_rejection("Loan request", &errors);
            return Ok(());
        }
    };
    println!(
        "- Loan {} created with status {}",
        details.loan.id, details.loan.status
    );

    for status in [CheckoutStatus::Review, CheckoutStatus::Completed] {
        details = service.advance_checkout(details.loan.id, status)?;
        println!("  Checkout -> {}", details.loan.status);
    }

    match serde_json::to_string_pretty(&details) {
        Ok(json) => println!("  Final loan payload:\n{}", json),
        Err(err) => println!("  Final loan payload unavailable: {}", err),
    }

    Ok(())
}

fn render_quote(group: &RiskGroup, quote: &LoanQuote) {
    println!(
        "- Group {} '{}' (deposit {}%, interest {}%)",
        group.ordinal,
        group.name,
        (group.deposit_fraction * Decimal::ONE_HUNDRED).normalize(),
        (group.interest_fraction * Decimal::ONE_HUNDRED).normalize()
    );
    println!(
        "    deposit {} | financed {} | repayable {} | daily {} | monthly {}",
        quote.deposit_amount,
        quote.loan_principal,
        quote.loan_amount,
        quote.daily_payment,
        quote.monthly_payment()
    );
}

fn render_pricing(pricing: &DevicePricing) {
    println!(
        "- Pricing {} {} for '{}'",
        pricing.device.brand, pricing.device.name, pricing.risk_group.name
    );
    println!(
        "    deposit {} | financed {} | repayable {} | daily {} | monthly {}",
        pricing.deposit_amount,
        pricing.loan_principal,
        pricing.loan_amount,
        pricing.daily_payment,
        pricing.monthly_payment
    );
}

fn render_rejection(stage: &str, errors: &[String]) {
    println!("  {} rejected:", stage);
    for error in errors {
        println!("    - {}", error);
    }
}
