use rust_decimal::Decimal;

use crate::engine::TariffEngine;
use crate::input::{Category, ProductType};

impl TariffEngine {
    /// Pick the category a shipment most likely belongs to.
    ///
    /// Apparel goes to D when it fits, then anything within the B ceilings
    /// goes to B, and everything else falls back to C. A C suggestion for an
    /// oversize shipment still fails later in [`TariffEngine::calculate`].
    pub fn suggest_category(
        &self,
        value: Decimal,
        weight: Decimal,
        product_type: Option<ProductType>,
    ) -> Category {
        let fits = |category| {
            let limits = self.rates().limits(category);
            value <= limits.max_value && weight <= limits.max_weight
        };
        if product_type.is_some_and(ProductType::is_apparel) && fits(Category::D) {
            Category::D
        } else if fits(Category::B) {
            Category::B
        } else {
            Category::C
        }
    }
}
