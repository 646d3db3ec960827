use chrono::NaiveDate;
use handset_credit::config::CatalogConfig;
use handset_credit::error::AppError;
use handset_credit::underwriting::catalog::{default_devices, load_devices, seed_if_empty};
use handset_credit::underwriting::pricing::{is_valid_cash_price, MAX_CASH_PRICE};
use handset_credit::underwriting::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory store seeded for startup.
///
/// Risk groups are always seeded into an empty store. Devices come from the configured CSV
/// catalog when one is set, otherwise from the built-in list unless default seeding is off.
pub(crate) fn build_store(config: &CatalogConfig) -> Result<Arc<InMemoryStore>, AppError> {
    let devices = match &config.device_catalog {
        Some(path) => {
            let devices = load_devices(path)?;
            info!(path = %path.display(), devices = devices.len(), "device catalog loaded");
            devices
        }
        None if config.seed_defaults => default_devices(),
        None => Vec::new(),
    };

    let store = Arc::new(InMemoryStore::new());
    seed_if_empty(store.as_ref(), devices)?;
    Ok(store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let amount = Decimal::from_str(raw.trim())
        .map_err(|err| format!("failed to parse '{raw}' as an amount ({err})"))?;
    if amount <= Decimal::ZERO {
        return Err(format!("amount '{raw}' must be greater than zero"));
    }
    if amount.normalize().scale() > 2 {
        return Err(format!("amount '{raw}' has more than two decimal places"));
    }
    Ok(amount)
}

pub(crate) fn parse_cash_price(raw: &str) -> Result<Decimal, String> {
    let price = parse_amount(raw)?;
    if !is_valid_cash_price(price) {
        return Err(format!("cash price '{raw}' must not exceed {MAX_CASH_PRICE}"));
    }
    Ok(price)
}
