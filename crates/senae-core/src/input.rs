use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InputField, TariffError};

/// SENAE courier category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    B,
    C,
    D,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::B, Category::C, Category::D];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TariffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B" => Ok(Category::B),
            "C" => Ok(Category::C),
            "D" => Ok(Category::D),
            other => Err(TariffError::InvalidField {
                field: InputField::Category,
                reason: format!("unknown category `{other}` (expected B, C or D)"),
            }),
        }
    }
}

/// Product subtype; only category D prices it differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[default]
    General,
    Textiles,
    #[serde(alias = "calzado")]
    Footwear,
    Electronics,
    #[serde(alias = "ropa")]
    Clothing,
    #[serde(alias = "hogar")]
    Home,
}

impl ProductType {
    pub const ALL: [ProductType; 6] = [
        ProductType::General,
        ProductType::Textiles,
        ProductType::Footwear,
        ProductType::Electronics,
        ProductType::Clothing,
        ProductType::Home,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::General => "general",
            ProductType::Textiles => "textiles",
            ProductType::Footwear => "footwear",
            ProductType::Electronics => "electronics",
            ProductType::Clothing => "clothing",
            ProductType::Home => "home",
        }
    }

    /// Textiles, clothing and footwear: the goods category D exists for.
    pub fn is_apparel(self) -> bool {
        matches!(
            self,
            ProductType::Textiles | ProductType::Clothing | ProductType::Footwear
        )
    }

    /// Best-effort mapping from a free-text catalog category.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
        if has(&["calzado", "zapato", "shoe", "footwear", "sneaker", "boot"]) {
            Some(ProductType::Footwear)
        } else if has(&["ropa", "vestir", "clothing", "apparel", "prenda"]) {
            Some(ProductType::Clothing)
        } else if has(&["textil", "textile", "fabric", "tela"]) {
            Some(ProductType::Textiles)
        } else if has(&["electronic", "electrónic"]) {
            Some(ProductType::Electronics)
        } else if has(&["home", "hogar", "kitchen", "cocina"]) {
            Some(ProductType::Home)
        } else {
            None
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = TariffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(ProductType::General),
            "textiles" => Ok(ProductType::Textiles),
            "footwear" | "calzado" => Ok(ProductType::Footwear),
            "electronics" => Ok(ProductType::Electronics),
            "clothing" | "ropa" => Ok(ProductType::Clothing),
            "home" | "hogar" => Ok(ProductType::Home),
            other => Err(TariffError::InvalidField {
                field: InputField::ProductType,
                reason: format!("unknown product type `{other}`"),
            }),
        }
    }
}

/// Validated-shape input to one tariff calculation.
///
/// Range checks happen in [`crate::TariffEngine::calculate`]; this type only
/// guarantees every field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffInput {
    /// Customs value in USD.
    pub value: Decimal,
    /// Gross weight in kilograms.
    pub weight: Decimal,
    pub category: Category,
    pub product_type: ProductType,
    /// Imports by the same recipient this year, this one included. Must be at
    /// least 1 in every category; only category B caps it.
    pub import_count: u32,
}

impl TariffInput {
    pub fn new(value: Decimal, weight: Decimal, category: Category) -> Self {
        Self {
            value,
            weight,
            category,
            product_type: ProductType::General,
            import_count: 1,
        }
    }

    pub fn with_product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn with_import_count(mut self, import_count: u32) -> Self {
        self.import_count = import_count;
        self
    }
}

/// Loose wire shape accepted from HTTP and CLI callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffRequest {
    #[serde(default, alias = "base_value")]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default, alias = "senae_category")]
    pub category: Option<Category>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default, alias = "importations_count")]
    pub import_count: Option<u32>,
}

impl TariffRequest {
    pub fn into_input(self) -> Result<TariffInput, TariffError> {
        let value = self.value.ok_or_else(|| missing(InputField::Value))?;
        let weight = self.weight.ok_or_else(|| missing(InputField::Weight))?;
        let category = self.category.ok_or_else(|| missing(InputField::Category))?;
        let product_type = match (category, self.product_type) {
            (_, Some(product_type)) => product_type,
            (Category::D, None) => {
                return Err(TariffError::InvalidField {
                    field: InputField::ProductType,
                    reason: "required for category D".to_string(),
                })
            }
            (_, None) => ProductType::General,
        };
        Ok(TariffInput {
            value,
            weight,
            category,
            product_type,
            import_count: self.import_count.unwrap_or(1),
        })
    }
}

impl TryFrom<TariffRequest> for TariffInput {
    type Error = TariffError;

    fn try_from(request: TariffRequest) -> Result<Self, Self::Error> {
        request.into_input()
    }
}

fn missing(field: InputField) -> TariffError {
    TariffError::InvalidField {
        field,
        reason: "is required".to_string(),
    }
}
