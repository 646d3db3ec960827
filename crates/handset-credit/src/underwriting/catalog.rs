use std::fs::File;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use super::domain::{Device, DeviceId, RiskGroup, RiskGroupId};
use super::pricing::{is_valid_cash_price, MAX_CASH_PRICE};
use super::repository::{RepositoryError, UnderwritingStore};
use super::service::UnderwritingError;

/// Risk-group ordinals that must be configured for registration to work.
pub const REQUIRED_ORDINALS: [u8; 3] = [1, 2, 3];

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidPrice { line: usize, name: String },
    Repository(RepositoryError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "failed to read device catalog: {}", err),
            CatalogError::Csv(err) => write!(f, "invalid device catalog CSV: {}", err),
            CatalogError::InvalidPrice { line, name } => write!(
                f,
                "device '{}' on line {} needs a positive cash price in whole cents up to {}",
                name, line, MAX_CASH_PRICE
            ),
            CatalogError::Repository(err) => write!(f, "could not store catalog: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Csv(err) => Some(err),
            CatalogError::InvalidPrice { .. } => None,
            CatalogError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// What a seeding pass actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub risk_groups_inserted: usize,
    pub devices_inserted: usize,
}

pub fn default_risk_groups() -> Vec<RiskGroup> {
    [
        (1, "High Risk (18-30)", 15, 18),
        (2, "Medium Risk (31-50)", 10, 15),
        (3, "Low Risk (51-65)", 5, 12),
    ]
    .into_iter()
    .map(|(ordinal, name, deposit, interest)| RiskGroup {
        id: RiskGroupId::new(),
        ordinal,
        name: name.to_string(),
        deposit_fraction: Decimal::new(deposit, 2),
        interest_fraction: Decimal::new(interest, 2),
    })
    .collect()
}

pub fn default_devices() -> Vec<Device> {
    [
        ("iPhone 15 Pro", "Apple", 2500, "photo-1592750475338-74b7b21085ab"),
        ("Samsung Galaxy S24", "Samsung", 2200, "photo-1511707171634-5f897ff02aa9"),
        ("Google Pixel 8", "Google", 1800, "photo-1592899677977-9c10ca588bbd"),
        ("OnePlus 12", "OnePlus", 1500, "photo-1601784551446-20c9e07cdbdb"),
        ("Xiaomi 14", "Xiaomi", 1200, "photo-1601972602237-8c79241f183a"),
    ]
    .into_iter()
    .map(|(name, brand, price, image)| Device {
        id: DeviceId::new(),
        name: name.to_string(),
        brand: brand.to_string(),
        cash_price: Decimal::from(price),
        image_url: Some(format!(
            "https://images.unsplash.com/{image}?w=400&h=400&fit=crop"
        )),
    })
    .collect()
}

/// Parse a `name,brand,cash_price,image_url` device catalog.
pub fn parse_devices<R: Read>(reader: R) -> Result<Vec<Device>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut devices = Vec::new();

    for (index, record) in csv_reader.deserialize::<DeviceRow>().enumerate() {
        let row = record?;
        if !is_valid_cash_price(row.cash_price) {
            return Err(CatalogError::InvalidPrice {
                line: index + 2,
                name: row.name,
            });
        }

        devices.push(Device {
            id: DeviceId::new(),
            name: row.name,
            brand: row.brand,
            cash_price: row.cash_price,
            image_url: row.image_url,
        });
    }

    Ok(devices)
}

pub fn load_devices<P: AsRef<Path>>(path: P) -> Result<Vec<Device>, CatalogError> {
    let file = File::open(path)?;
    parse_devices(file)
}

#[derive(Debug, Deserialize)]
struct DeviceRow {
    name: String,
    brand: String,
    #[serde(deserialize_with = "decimal_from_text")]
    cash_price: Decimal,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    image_url: Option<String>,
}

fn decimal_from_text<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse::<Decimal>().map_err(serde::de::Error::custom)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Seed default risk groups and devices into whichever tables are still empty.
pub fn seed_if_empty<S: UnderwritingStore>(
    store: &S,
    devices: Vec<Device>,
) -> Result<SeedReport, CatalogError> {
    let mut report = SeedReport::default();

    if store.count_risk_groups()? == 0 {
        for group in default_risk_groups() {
            store.insert_risk_group(group)?;
            report.risk_groups_inserted += 1;
        }
    }

    if store.count_devices()? == 0 {
        for device in devices {
            store.insert_device(device)?;
            report.devices_inserted += 1;
        }
    }

    info!(
        risk_groups = report.risk_groups_inserted,
        devices = report.devices_inserted,
        "catalog seeding finished"
    );
    Ok(report)
}

/// Confirm a risk group exists for every age band.
pub fn verify_risk_groups<S: UnderwritingStore>(store: &S) -> Result<(), UnderwritingError> {
    for ordinal in REQUIRED_ORDINALS {
        if store.find_risk_group_by_ordinal(ordinal)?.is_none() {
            return Err(UnderwritingError::Configuration { ordinal });
        }
    }
    Ok(())
}
