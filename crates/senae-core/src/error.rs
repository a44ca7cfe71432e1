use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::input::Category;

/// Input field named by an [`TariffError::InvalidField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    Value,
    Weight,
    Category,
    ProductType,
    ImportCount,
    Quantity,
}

impl InputField {
    pub fn as_str(self) -> &'static str {
        match self {
            InputField::Value => "value",
            InputField::Weight => "weight",
            InputField::Category => "category",
            InputField::ProductType => "product_type",
            InputField::ImportCount => "import_count",
            InputField::Quantity => "quantity",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two quantities a category caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedField {
    Value,
    Weight,
}

impl fmt::Display for LimitedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitedField::Value => "value",
            LimitedField::Weight => "weight",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TariffError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: InputField, reason: String },
    #[error(
        "category {category} {field} {value} exceeds the limit of {limit} by {}",
        over(.value, .limit)
    )]
    CategoryLimitExceeded {
        category: Category,
        field: LimitedField,
        value: Decimal,
        limit: Decimal,
    },
    #[error("import count {import_count} exceeds the category B annual maximum of {max}")]
    AnnualImportLimitExceeded { import_count: u32, max: u32 },
}

impl TariffError {
    /// Stable machine-readable code for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            TariffError::InvalidField { .. } => "invalid_field",
            TariffError::CategoryLimitExceeded { .. } => "category_limit_exceeded",
            TariffError::AnnualImportLimitExceeded { .. } => "annual_import_limit_exceeded",
        }
    }

    /// Amount by which a category ceiling was overshot.
    pub fn excess(&self) -> Option<Decimal> {
        match self {
            TariffError::CategoryLimitExceeded { value, limit, .. } => Some(over(value, limit)),
            _ => None,
        }
    }
}

fn over(value: &Decimal, limit: &Decimal) -> Decimal {
    *value - *limit
}
