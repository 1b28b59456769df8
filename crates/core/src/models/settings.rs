use serde::{Deserialize, Serialize};

use super::metal::Metal;
use crate::errors::CoreError;

/// How often the storage fee is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFrequency {
    #[default]
    Monthly,
    Yearly,
}

impl StorageFrequency {
    /// Fraction of the annual fee charged per period.
    pub fn period_rate(&self, annual_fee_percent: f64) -> f64 {
        match self {
            StorageFrequency::Monthly => annual_fee_percent / 12.0 / 100.0,
            StorageFrequency::Yearly => annual_fee_percent / 100.0,
        }
    }
}

/// Which asset pays for storage.
///
/// Serialized as a flat name: `"cash"`, `"gold"`, ..., `"all_metals"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CoverageMethod {
    /// Paid from outside the tracked holdings; quantities untouched
    #[default]
    Cash,
    /// Paid by selling the named metal bought on the same date
    Metal(Metal),
    /// Paid pro-rata by every row of the date
    AllMetals,
}

impl CoverageMethod {
    /// Parse the method names used by settings forms
    /// (`cash`, `gold`, `silver`, `platinum`, `palladium`, `all_metals`).
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_lowercase().as_str() {
            "cash" => Ok(CoverageMethod::Cash),
            "all_metals" => Ok(CoverageMethod::AllMetals),
            other => Metal::parse(other).map(CoverageMethod::Metal),
        }
    }
}

impl TryFrom<String> for CoverageMethod {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CoverageMethod::parse(&value)
    }
}

impl From<CoverageMethod> for String {
    fn from(method: CoverageMethod) -> Self {
        method.to_string()
    }
}

impl std::fmt::Display for CoverageMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageMethod::Cash => write!(f, "cash"),
            CoverageMethod::Metal(metal) => write!(f, "{}", metal.key()),
            CoverageMethod::AllMetals => write!(f, "all_metals"),
        }
    }
}

/// Storage (custody) fee configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Annual fee in percent of the stored amount
    pub fee_rate_percent: f64,
    pub frequency: StorageFrequency,
    /// VAT added on top of the net fee, in percent
    pub vat_rate_percent: f64,
    pub coverage: CoverageMethod,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            fee_rate_percent: 0.5,
            frequency: StorageFrequency::Monthly,
            vat_rate_percent: 19.0,
            coverage: CoverageMethod::Cash,
        }
    }
}

/// Everything a simulation run needs besides its inputs.
///
/// Passed by value into the simulator; the core holds no global config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Label of the currency the price series and schedule are expressed in.
    pub currency: String,

    /// Dealer markup on purchases, in percent
    pub purchase_margin_percent: f64,

    /// Dealer markdown on sales, in percent
    pub sale_margin_percent: f64,

    pub storage: StorageSettings,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            purchase_margin_percent: 2.0,
            sale_margin_percent: 1.5,
            storage: StorageSettings::default(),
        }
    }
}

impl SimulationSettings {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
