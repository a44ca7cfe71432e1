//! Regulatory constants for the SENAE courier regime.
//!
//! Every figure the calculators use lives here. [`RegulatoryRates::default`]
//! reproduces the constants; deployments can override them from a rates file.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::Category;

// Category B: simplified regime.
pub const CATEGORY_B_MAX_VALUE: Decimal = dec!(400);
pub const CATEGORY_B_MAX_WEIGHT_KG: Decimal = dec!(4);
pub const CATEGORY_B_FLAT_DUTY: Decimal = dec!(42.00);
pub const CATEGORY_B_RECIPIENT_IMPORT_THRESHOLD: u32 = 5;
pub const CATEGORY_B_RECIPIENT_ANNUAL_LIMIT: Decimal = dec!(1200);
pub const CATEGORY_B_MIGRANT_ANNUAL_LIMIT: Decimal = dec!(2400);
pub const CATEGORY_B_MAX_ANNUAL_IMPORTS: u32 = 12;

// Category C: general regime.
pub const CATEGORY_C_MAX_VALUE: Decimal = dec!(2000);
pub const CATEGORY_C_MAX_WEIGHT_KG: Decimal = dec!(50);
pub const CATEGORY_C_DUTY_RATE: Decimal = dec!(0.10);

// Category D: apparel, textiles and footwear.
pub const CATEGORY_D_MAX_VALUE: Decimal = dec!(2000);
pub const CATEGORY_D_MAX_WEIGHT_KG: Decimal = dec!(20);
pub const CATEGORY_D_ADV_RATE: Decimal = dec!(0.10);
pub const CATEGORY_D_TEXTILE_DUTY_PER_KG: Decimal = dec!(5.5);
pub const CATEGORY_D_FOOTWEAR_DUTY_PER_PAIR: Decimal = dec!(6.0);
pub const CATEGORY_D_INEN_THRESHOLD: Decimal = dec!(500);

// Shared levies.
pub const VAT_RATE: Decimal = dec!(0.12);
pub const FODINFA_RATE: Decimal = dec!(0.005);

// Bounds a loaded table must respect. Keeping every factor under these keeps
// the calculators far from the `Decimal` range.
pub const MAX_RATE: Decimal = Decimal::ONE;
pub const MAX_AMOUNT: Decimal = dec!(1000000000);

/// Value and weight ceilings of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryLimits {
    pub max_value: Decimal,
    pub max_weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifiedRegime {
    pub max_value: Decimal,
    pub max_weight: Decimal,
    pub flat_duty: Decimal,
    /// Imports per year up to which the recipient annual limit applies.
    pub recipient_import_threshold: u32,
    pub recipient_annual_limit: Decimal,
    pub migrant_annual_limit: Decimal,
    pub max_annual_imports: u32,
}

impl Default for SimplifiedRegime {
    fn default() -> Self {
        Self {
            max_value: CATEGORY_B_MAX_VALUE,
            max_weight: CATEGORY_B_MAX_WEIGHT_KG,
            flat_duty: CATEGORY_B_FLAT_DUTY,
            recipient_import_threshold: CATEGORY_B_RECIPIENT_IMPORT_THRESHOLD,
            recipient_annual_limit: CATEGORY_B_RECIPIENT_ANNUAL_LIMIT,
            migrant_annual_limit: CATEGORY_B_MIGRANT_ANNUAL_LIMIT,
            max_annual_imports: CATEGORY_B_MAX_ANNUAL_IMPORTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralRegime {
    pub max_value: Decimal,
    pub max_weight: Decimal,
    pub duty_rate: Decimal,
}

impl Default for GeneralRegime {
    fn default() -> Self {
        Self {
            max_value: CATEGORY_C_MAX_VALUE,
            max_weight: CATEGORY_C_MAX_WEIGHT_KG,
            duty_rate: CATEGORY_C_DUTY_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextileRegime {
    pub max_value: Decimal,
    pub max_weight: Decimal,
    pub adv_rate: Decimal,
    pub textile_duty_per_kg: Decimal,
    pub footwear_duty_per_pair: Decimal,
    /// Declared value above which INEN certification is required.
    pub inen_threshold: Decimal,
}

impl Default for TextileRegime {
    fn default() -> Self {
        Self {
            max_value: CATEGORY_D_MAX_VALUE,
            max_weight: CATEGORY_D_MAX_WEIGHT_KG,
            adv_rate: CATEGORY_D_ADV_RATE,
            textile_duty_per_kg: CATEGORY_D_TEXTILE_DUTY_PER_KG,
            footwear_duty_per_pair: CATEGORY_D_FOOTWEAR_DUTY_PER_PAIR,
            inen_threshold: CATEGORY_D_INEN_THRESHOLD,
        }
    }
}

/// Full rate table consumed by [`crate::TariffEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatoryRates {
    pub category_b: SimplifiedRegime,
    pub category_c: GeneralRegime,
    pub category_d: TextileRegime,
    pub vat_rate: Decimal,
    pub fodinfa_rate: Decimal,
}

impl Default for RegulatoryRates {
    fn default() -> Self {
        Self {
            category_b: SimplifiedRegime::default(),
            category_c: GeneralRegime::default(),
            category_d: TextileRegime::default(),
            vat_rate: VAT_RATE,
            fodinfa_rate: FODINFA_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatesError {
    #[error("rate table field `{field}` must not be negative (got {value})")]
    Negative { field: &'static str, value: Decimal },
    #[error(
        "category_b.recipient_import_threshold ({threshold}) exceeds category_b.max_annual_imports ({max})"
    )]
    ThresholdAboveCap { threshold: u32, max: u32 },
    #[error("rate table field `{field}` must not exceed {max} (got {value})")]
    TooLarge {
        field: &'static str,
        value: Decimal,
        max: Decimal,
    },
}

impl RegulatoryRates {
    pub fn limits(&self, category: Category) -> CategoryLimits {
        match category {
            Category::B => CategoryLimits {
                max_value: self.category_b.max_value,
                max_weight: self.category_b.max_weight,
            },
            Category::C => CategoryLimits {
                max_value: self.category_c.max_value,
                max_weight: self.category_c.max_weight,
            },
            Category::D => CategoryLimits {
                max_value: self.category_d.max_value,
                max_weight: self.category_d.max_weight,
            },
        }
    }

    /// Sanity-check a table loaded from outside the binary.
    pub fn validate(&self) -> Result<(), RatesError> {
        let b = &self.category_b;
        let c = &self.category_c;
        let d = &self.category_d;
        let amounts = [
            ("category_b.max_value", b.max_value),
            ("category_b.max_weight", b.max_weight),
            ("category_b.flat_duty", b.flat_duty),
            ("category_b.recipient_annual_limit", b.recipient_annual_limit),
            ("category_b.migrant_annual_limit", b.migrant_annual_limit),
            ("category_c.max_value", c.max_value),
            ("category_c.max_weight", c.max_weight),
            ("category_d.max_value", d.max_value),
            ("category_d.max_weight", d.max_weight),
            ("category_d.textile_duty_per_kg", d.textile_duty_per_kg),
            ("category_d.footwear_duty_per_pair", d.footwear_duty_per_pair),
            ("category_d.inen_threshold", d.inen_threshold),
        ];
        let rates = [
            ("category_c.duty_rate", c.duty_rate),
            ("category_d.adv_rate", d.adv_rate),
            ("vat_rate", self.vat_rate),
            ("fodinfa_rate", self.fodinfa_rate),
        ];
        let bounded = amounts
            .into_iter()
            .map(|(field, value)| (field, value, MAX_AMOUNT))
            .chain(rates.into_iter().map(|(field, value)| (field, value, MAX_RATE)));
        for (field, value, max) in bounded {
            if value < Decimal::ZERO {
                return Err(RatesError::Negative { field, value });
            }
            if value > max {
                return Err(RatesError::TooLarge { field, value, max });
            }
        }
        if b.recipient_import_threshold > b.max_annual_imports {
            return Err(RatesError::ThresholdAboveCap {
                threshold: b.recipient_import_threshold,
                max: b.max_annual_imports,
            });
        }
        Ok(())
    }
}
