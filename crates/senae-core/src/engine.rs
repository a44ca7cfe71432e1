use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::{InputField, LimitedField, TariffError};
use crate::input::{Category, ProductType, TariffInput};
use crate::rates::{GeneralRegime, RegulatoryRates, SimplifiedRegime, TextileRegime};

/// Per-category charge breakdown, tagged by category on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category")]
pub enum Charges {
    B {
        duty: Decimal,
        import_count: u32,
        annual_limit: Decimal,
        /// VAT and FODINFA the same value would have paid outside category B.
        savings: Decimal,
    },
    C {
        duty: Decimal,
        duty_rate: Decimal,
        vat: Decimal,
        vat_rate: Decimal,
        fodinfa: Decimal,
        fodinfa_rate: Decimal,
        tax_breakdown: TaxShares,
    },
    D {
        product_type: ProductType,
        adv: Decimal,
        adv_rate: Decimal,
        specific_duty: Decimal,
        total_duty: Decimal,
        vat: Decimal,
        vat_rate: Decimal,
        fodinfa: Decimal,
        fodinfa_rate: Decimal,
        inen_threshold: Decimal,
    },
}

/// Share of total taxes carried by each category C charge, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaxShares {
    pub duty_percentage: Decimal,
    pub vat_percentage: Decimal,
    pub fodinfa_percentage: Decimal,
}

impl TaxShares {
    /// All zero when the charges sum to zero (possible with a zeroed rate table).
    fn of(duty: Decimal, vat: Decimal, fodinfa: Decimal) -> Self {
        let total = duty + vat + fodinfa;
        let share = |part: Decimal| {
            part.checked_div(total)
                .map(|ratio| ratio * Decimal::ONE_HUNDRED)
                .unwrap_or(Decimal::ZERO)
        };
        Self {
            duty_percentage: share(duty),
            vat_percentage: share(vat),
            fodinfa_percentage: share(fodinfa),
        }
    }
}

impl Charges {
    fn total(&self) -> Decimal {
        match self {
            Charges::B { duty, .. } => *duty,
            Charges::C { duty, vat, fodinfa, .. } => *duty + *vat + *fodinfa,
            Charges::D { total_duty, vat, fodinfa, .. } => *total_duty + *vat + *fodinfa,
        }
    }
}

/// Outcome of one calculation. Amounts are exact; round only when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffResult {
    base_value: Decimal,
    weight: Decimal,
    #[serde(flatten)]
    charges: Charges,
    total_taxes: Decimal,
    total_cost: Decimal,
    free_of_tributes: bool,
    requires_inen: bool,
    requires_control_document: bool,
}

#[derive(Default)]
struct Compliance {
    free_of_tributes: bool,
    requires_inen: bool,
    requires_control_document: bool,
}

impl TariffResult {
    fn assemble(input: &TariffInput, charges: Charges, compliance: Compliance) -> Self {
        let total_taxes = charges.total();
        Self {
            base_value: input.value,
            weight: input.weight,
            charges,
            total_taxes,
            total_cost: input.value + total_taxes,
            free_of_tributes: compliance.free_of_tributes,
            requires_inen: compliance.requires_inen,
            requires_control_document: compliance.requires_control_document,
        }
    }

    pub fn category(&self) -> Category {
        match self.charges {
            Charges::B { .. } => Category::B,
            Charges::C { .. } => Category::C,
            Charges::D { .. } => Category::D,
        }
    }

    pub fn charges(&self) -> &Charges {
        &self.charges
    }

    pub fn base_value(&self) -> Decimal {
        self.base_value
    }

    pub fn weight(&self) -> Decimal {
        self.weight
    }

    /// Tariff for B and C; ADV plus specific duty for D.
    pub fn duty(&self) -> Decimal {
        match self.charges {
            Charges::B { duty, .. } | Charges::C { duty, .. } => duty,
            Charges::D { total_duty, .. } => total_duty,
        }
    }

    pub fn adv(&self) -> Decimal {
        match self.charges {
            Charges::D { adv, .. } => adv,
            _ => Decimal::ZERO,
        }
    }

    pub fn specific_duty(&self) -> Decimal {
        match self.charges {
            Charges::D { specific_duty, .. } => specific_duty,
            _ => Decimal::ZERO,
        }
    }

    pub fn vat(&self) -> Decimal {
        match self.charges {
            Charges::B { .. } => Decimal::ZERO,
            Charges::C { vat, .. } | Charges::D { vat, .. } => vat,
        }
    }

    pub fn fodinfa(&self) -> Decimal {
        match self.charges {
            Charges::B { .. } => Decimal::ZERO,
            Charges::C { fodinfa, .. } | Charges::D { fodinfa, .. } => fodinfa,
        }
    }

    pub fn annual_limit(&self) -> Option<Decimal> {
        match self.charges {
            Charges::B { annual_limit, .. } => Some(annual_limit),
            _ => None,
        }
    }

    pub fn savings(&self) -> Option<Decimal> {
        match self.charges {
            Charges::B { savings, .. } => Some(savings),
            _ => None,
        }
    }

    pub fn tax_shares(&self) -> Option<TaxShares> {
        match self.charges {
            Charges::C { tax_breakdown, .. } => Some(tax_breakdown),
            _ => None,
        }
    }

    pub fn import_count(&self) -> Option<u32> {
        match self.charges {
            Charges::B { import_count, .. } => Some(import_count),
            _ => None,
        }
    }

    pub fn total_taxes(&self) -> Decimal {
        self.total_taxes
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn free_of_tributes(&self) -> bool {
        self.free_of_tributes
    }

    pub fn requires_inen(&self) -> bool {
        self.requires_inen
    }

    pub fn requires_control_document(&self) -> bool {
        self.requires_control_document
    }
}

/// Stateless calculator bound to one rate table. Cheap to clone and share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TariffEngine {
    rates: RegulatoryRates,
}

impl TariffEngine {
    pub fn new(rates: RegulatoryRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RegulatoryRates {
        &self.rates
    }

    pub fn calculate(&self, input: &TariffInput) -> Result<TariffResult, TariffError> {
        self.validate(input)?;
        Ok(match input.category {
            Category::B => simplified(&self.rates.category_b, &self.rates, input),
            Category::C => general(&self.rates.category_c, &self.rates, input),
            Category::D => textile(&self.rates.category_d, &self.rates, input),
        })
    }

    fn validate(&self, input: &TariffInput) -> Result<(), TariffError> {
        if input.value <= Decimal::ZERO {
            return Err(TariffError::InvalidField {
                field: InputField::Value,
                reason: format!("must be greater than zero (got {})", input.value),
            });
        }
        if input.weight <= Decimal::ZERO {
            return Err(TariffError::InvalidField {
                field: InputField::Weight,
                reason: format!("must be greater than zero (got {})", input.weight),
            });
        }
        if input.import_count == 0 {
            return Err(TariffError::InvalidField {
                field: InputField::ImportCount,
                reason: "must be at least 1".to_string(),
            });
        }

        let limits = self.rates.limits(input.category);
        if input.value > limits.max_value {
            return Err(TariffError::CategoryLimitExceeded {
                category: input.category,
                field: LimitedField::Value,
                value: input.value,
                limit: limits.max_value,
            });
        }
        if input.weight > limits.max_weight {
            return Err(TariffError::CategoryLimitExceeded {
                category: input.category,
                field: LimitedField::Weight,
                value: input.weight,
                limit: limits.max_weight,
            });
        }

        let max = self.rates.category_b.max_annual_imports;
        if input.category == Category::B && input.import_count > max {
            return Err(TariffError::AnnualImportLimitExceeded {
                import_count: input.import_count,
                max,
            });
        }
        Ok(())
    }
}

/// Calculate with the built-in rate table.
pub fn calculate(input: &TariffInput) -> Result<TariffResult, TariffError> {
    TariffEngine::default().calculate(input)
}

/// Round an amount to cents for presentation (half away from zero).
pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn simplified(regime: &SimplifiedRegime, rates: &RegulatoryRates, input: &TariffInput) -> TariffResult {
    let annual_limit = if input.import_count <= regime.recipient_import_threshold {
        regime.recipient_annual_limit
    } else {
        regime.migrant_annual_limit
    };
    let charges = Charges::B {
        duty: regime.flat_duty,
        import_count: input.import_count,
        annual_limit,
        savings: input.value * (rates.vat_rate + rates.fodinfa_rate),
    };
    TariffResult::assemble(
        input,
        charges,
        Compliance {
            free_of_tributes: true,
            ..Default::default()
        },
    )
}

fn general(regime: &GeneralRegime, rates: &RegulatoryRates, input: &TariffInput) -> TariffResult {
    let duty = input.value * regime.duty_rate;
    // VAT base is value plus duty; FODINFA stays out of it.
    let vat = (input.value + duty) * rates.vat_rate;
    let fodinfa = input.value * rates.fodinfa_rate;
    let charges = Charges::C {
        duty,
        duty_rate: regime.duty_rate,
        vat,
        vat_rate: rates.vat_rate,
        fodinfa,
        fodinfa_rate: rates.fodinfa_rate,
        tax_breakdown: TaxShares::of(duty, vat, fodinfa),
    };
    TariffResult::assemble(
        input,
        charges,
        Compliance {
            requires_control_document: true,
            ..Default::default()
        },
    )
}

fn textile(regime: &TextileRegime, rates: &RegulatoryRates, input: &TariffInput) -> TariffResult {
    let adv = input.value * regime.adv_rate;
    let specific_duty = match input.product_type {
        ProductType::Footwear => regime.footwear_duty_per_pair * estimated_pairs(input.weight),
        _ => regime.textile_duty_per_kg * input.weight,
    };
    let total_duty = adv + specific_duty;
    let vat = (input.value + total_duty) * rates.vat_rate;
    let fodinfa = input.value * rates.fodinfa_rate;
    let charges = Charges::D {
        product_type: input.product_type,
        adv,
        adv_rate: regime.adv_rate,
        specific_duty,
        total_duty,
        vat,
        vat_rate: rates.vat_rate,
        fodinfa,
        fodinfa_rate: rates.fodinfa_rate,
        inen_threshold: regime.inen_threshold,
    };
    TariffResult::assemble(
        input,
        charges,
        Compliance {
            requires_inen: input.value > regime.inen_threshold,
            ..Default::default()
        },
    )
}

// One pair per whole kilogram, at least one. Kept for compatibility with
// existing quotes; there is no published pairs-per-kg ratio behind it.
fn estimated_pairs(weight: Decimal) -> Decimal {
    weight.floor().max(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(value: Decimal, weight: Decimal, product_type: ProductType) -> TariffInput {
        TariffInput::new(value, weight, Category::D).with_product_type(product_type)
    }

    #[test]
    fn category_b_is_flat_regardless_of_value() {
        for (value, weight) in [(dec!(1), dec!(0.01)), (dec!(199.99), dec!(2)), (dec!(400), dec!(4))] {
            let result = calculate(&TariffInput::new(value, weight, Category::B)).unwrap();
            assert_eq!(result.total_taxes(), dec!(42));
            assert_eq!(result.total_cost(), value + dec!(42));
            assert_eq!(result.vat(), Decimal::ZERO);
            assert_eq!(result.fodinfa(), Decimal::ZERO);
            assert!(result.free_of_tributes());
            assert!(!result.requires_control_document());
        }
    }

    #[test]
    fn category_b_annual_limit_switches_after_fifth_import() {
        let base = TariffInput::new(dec!(50), dec!(1), Category::B);
        let fifth = calculate(&base.with_import_count(5)).unwrap();
        let sixth = calculate(&base.with_import_count(6)).unwrap();
        let twelfth = calculate(&base.with_import_count(12)).unwrap();
        assert_eq!(fifth.annual_limit(), Some(dec!(1200)));
        assert_eq!(sixth.annual_limit(), Some(dec!(2400)));
        assert_eq!(twelfth.annual_limit(), Some(dec!(2400)));
        assert_eq!(twelfth.import_count(), Some(12));
    }

    #[test]
    fn category_c_vat_base_includes_duty_but_not_fodinfa() {
        let result = calculate(&TariffInput::new(dec!(1000), dec!(10), Category::C)).unwrap();
        assert_eq!(result.duty(), dec!(100));
        assert_eq!(result.vat(), dec!(132));
        assert_eq!(result.fodinfa(), dec!(5));
        assert_eq!(result.total_taxes(), dec!(237));
        assert!(result.requires_control_document());
        assert!(!result.free_of_tributes());
        assert_eq!(result.annual_limit(), None);
    }

    #[test]
    fn category_d_footwear_counts_whole_kilograms_as_pairs() {
        let light = calculate(&d(dec!(100), dec!(0.4), ProductType::Footwear)).unwrap();
        assert_eq!(light.specific_duty(), dec!(6));
        let heavy = calculate(&d(dec!(100), dec!(3.9), ProductType::Footwear)).unwrap();
        assert_eq!(heavy.specific_duty(), dec!(18));
    }

    #[test]
    fn category_d_other_products_pay_per_kilogram() {
        for product_type in ProductType::ALL.into_iter().filter(|p| *p != ProductType::Footwear) {
            let result = calculate(&d(dec!(100), dec!(2.5), product_type)).unwrap();
            assert_eq!(result.specific_duty(), dec!(13.75), "{product_type}");
            assert_eq!(result.adv(), dec!(10));
            assert_eq!(result.duty(), dec!(23.75));
        }
    }

    #[test]
    fn category_d_inen_above_threshold_only() {
        assert!(!calculate(&d(dec!(500), dec!(1), ProductType::Clothing)).unwrap().requires_inen());
        assert!(calculate(&d(dec!(500.01), dec!(1), ProductType::Clothing)).unwrap().requires_inen());
    }

    #[test]
    fn zero_or_negative_amounts_are_rejected() {
        let err = calculate(&TariffInput::new(Decimal::ZERO, dec!(1), Category::C)).unwrap_err();
        assert!(matches!(err, TariffError::InvalidField { field: InputField::Value, .. }));
        let err = calculate(&TariffInput::new(dec!(10), dec!(-1), Category::C)).unwrap_err();
        assert!(matches!(err, TariffError::InvalidField { field: InputField::Weight, .. }));
    }

    #[test]
    fn zero_import_count_is_rejected_in_every_category() {
        for category in Category::ALL {
            let input = TariffInput::new(dec!(10), dec!(1), category)
                .with_product_type(ProductType::Clothing)
                .with_import_count(0);
            let err = calculate(&input).unwrap_err();
            assert!(
                matches!(err, TariffError::InvalidField { field: InputField::ImportCount, .. }),
                "{category}"
            );
        }
    }

    #[test]
    fn category_b_reports_vat_and_fodinfa_saved() {
        let result = calculate(&TariffInput::new(dec!(300), dec!(0.2), Category::B)).unwrap();
        assert_eq!(result.savings(), Some(dec!(37.5)));
        assert_eq!(result.tax_shares(), None);
    }

    #[test]
    fn category_c_tax_shares_sum_to_one_hundred() {
        let result = calculate(&TariffInput::new(dec!(1000), dec!(10), Category::C)).unwrap();
        let shares = result.tax_shares().unwrap();
        // 100 + 132 + 5 = 237
        assert_eq!(round_for_display(shares.duty_percentage), dec!(42.19));
        assert_eq!(round_for_display(shares.vat_percentage), dec!(55.70));
        assert_eq!(round_for_display(shares.fodinfa_percentage), dec!(2.11));
        let sum = shares.duty_percentage + shares.vat_percentage + shares.fodinfa_percentage;
        assert_eq!(round_for_display(sum), dec!(100));
        assert_eq!(result.savings(), None);
    }

    #[test]
    fn category_c_tax_shares_are_zero_when_nothing_is_owed() {
        let mut rates = RegulatoryRates::default();
        rates.category_c.duty_rate = Decimal::ZERO;
        rates.vat_rate = Decimal::ZERO;
        rates.fodinfa_rate = Decimal::ZERO;
        let engine = TariffEngine::new(rates);
        let result = engine.calculate(&TariffInput::new(dec!(100), dec!(1), Category::C)).unwrap();
        assert_eq!(result.total_taxes(), Decimal::ZERO);
        assert_eq!(result.tax_shares(), Some(TaxShares::default()));
    }

    #[test]
    fn weight_ceiling_reports_weight_field() {
        let err = calculate(&d(dec!(100), dec!(20.5), ProductType::Textiles)).unwrap_err();
        assert_eq!(
            err,
            TariffError::CategoryLimitExceeded {
                category: Category::D,
                field: LimitedField::Weight,
                value: dec!(20.5),
                limit: dec!(20),
            }
        );
        assert_eq!(err.excess(), Some(dec!(0.5)));
    }

    #[test]
    fn import_cap_applies_to_category_b_only() {
        let c = TariffInput::new(dec!(100), dec!(1), Category::C).with_import_count(40);
        assert!(calculate(&c).is_ok());
    }

    #[test]
    fn custom_rates_flow_through() {
        let mut rates = RegulatoryRates::default();
        rates.vat_rate = dec!(0.15);
        rates.category_b.flat_duty = dec!(20);
        let engine = TariffEngine::new(rates);
        let c = engine.calculate(&TariffInput::new(dec!(100), dec!(1), Category::C)).unwrap();
        assert_eq!(c.vat(), dec!(16.5));
        let b = engine.calculate(&TariffInput::new(dec!(100), dec!(1), Category::B)).unwrap();
        assert_eq!(b.total_cost(), dec!(120));
    }

    #[test]
    fn display_rounding_is_half_away_from_zero() {
        assert_eq!(round_for_display(dec!(16.365)), dec!(16.37));
        assert_eq!(round_for_display(dec!(33.368)), dec!(33.37));
        assert_eq!(round_for_display(dec!(0.004)), dec!(0.00));
    }

    #[test]
    fn serialized_result_is_tagged_by_category() {
        let result = calculate(&d(dec!(120), dec!(0.8), ProductType::Textiles)).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "D");
        assert_eq!(json["product_type"], "textiles");
        assert_eq!(json["requires_inen"], false);
        assert!(json.get("annual_limit").is_none());
        assert!(json.get("tax_breakdown").is_none());

        let c = calculate(&TariffInput::new(dec!(1000), dec!(10), Category::C)).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert!(json["tax_breakdown"]["vat_percentage"].is_string());
    }
}
