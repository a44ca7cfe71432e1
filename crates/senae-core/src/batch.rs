//! Order-level aggregation over independent line-item calculations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{TariffEngine, TariffResult};
use crate::error::{InputField, TariffError};
use crate::input::{Category, ProductType, TariffInput, TariffRequest};

/// Unit weight assumed when a catalog entry has none.
pub const DEFAULT_UNIT_WEIGHT_KG: Decimal = dec!(1.0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, alias = "product_title")]
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default, alias = "weight")]
    pub unit_weight: Option<Decimal>,
    #[serde(alias = "senae_category")]
    pub category: Category,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub import_count: Option<u32>,
}

impl LineItem {
    pub fn line_value(&self) -> Result<Decimal, TariffError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| out_of_range(InputField::Value))
    }

    pub fn line_weight(&self) -> Result<Decimal, TariffError> {
        self.unit_weight
            .unwrap_or(DEFAULT_UNIT_WEIGHT_KG)
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| out_of_range(InputField::Weight))
    }

    pub fn to_input(&self) -> Result<TariffInput, TariffError> {
        if self.quantity == 0 {
            return Err(TariffError::InvalidField {
                field: InputField::Quantity,
                reason: "must be at least 1".to_string(),
            });
        }
        TariffRequest {
            value: Some(self.line_value()?),
            weight: Some(self.line_weight()?),
            category: Some(self.category),
            product_type: self.product_type,
            import_count: self.import_count,
        }
        .into_input()
    }
}

fn out_of_range(field: InputField) -> TariffError {
    TariffError::InvalidField {
        field,
        reason: "unit amount times quantity is out of range".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemResult {
    pub index: usize,
    pub description: Option<String>,
    pub quantity: u32,
    pub tariff: TariffResult,
}

/// Sums over every line item of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub item_count: usize,
    pub total_value: Decimal,
    pub total_weight: Decimal,
    /// Tariff, ADV and specific duty together.
    pub total_duty: Decimal,
    pub total_vat: Decimal,
    pub total_fodinfa: Decimal,
    pub total_taxes: Decimal,
    pub total_cost: Decimal,
}

impl BatchSummary {
    pub fn add(&mut self, result: &TariffResult) {
        self.item_count += 1;
        self.total_value += result.base_value();
        self.total_weight += result.weight();
        self.total_duty += result.duty();
        self.total_vat += result.vat();
        self.total_fodinfa += result.fodinfa();
        self.total_taxes += result.total_taxes();
        self.total_cost += result.total_cost();
    }
}

impl<'a> FromIterator<&'a TariffResult> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = &'a TariffResult>>(iter: I) -> Self {
        let mut summary = BatchSummary::default();
        for result in iter {
            summary.add(result);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub items: Vec<LineItemResult>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// `index` is zero-based, in request order.
    #[error("line item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: TariffError,
    },
}

impl BatchError {
    pub fn index(&self) -> usize {
        match self {
            BatchError::Item { index, .. } => *index,
        }
    }

    pub fn tariff_error(&self) -> &TariffError {
        match self {
            BatchError::Item { source, .. } => source,
        }
    }
}

impl TariffEngine {
    /// Price every line independently; the first invalid line fails the batch.
    pub fn calculate_batch(&self, items: &[LineItem]) -> Result<BatchResult, BatchError> {
        let results = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.to_input()
                    .and_then(|input| self.calculate(&input))
                    .map(|tariff| LineItemResult {
                        index,
                        description: item.description.clone(),
                        quantity: item.quantity,
                        tariff,
                    })
                    .map_err(|source| BatchError::Item { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let summary = results.iter().map(|r| &r.tariff).collect();
        Ok(BatchResult {
            items: results,
            summary,
        })
    }
}
