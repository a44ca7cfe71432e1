use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use senae_core::{
    calculate, Category, LimitedField, ProductType, TariffEngine, TariffError, TariffInput,
};

#[test]
fn small_parcel_under_category_b() {
    let input = TariffInput::new(dec!(300), dec!(0.2), Category::B).with_import_count(1);
    let result = calculate(&input).unwrap();
    assert_eq!(result.total_taxes(), dec!(42));
    assert_eq!(result.total_cost(), dec!(342));
    assert!(result.free_of_tributes());
    assert_eq!(result.annual_limit(), Some(dec!(1200)));
}

#[test]
fn general_regime_breakdown() {
    let result = calculate(&TariffInput::new(dec!(800), dec!(2), Category::C)).unwrap();
    assert_eq!(result.duty(), dec!(80));
    assert_eq!(result.fodinfa(), dec!(4));
    assert_eq!(result.vat(), dec!(105.6));
    assert_eq!(result.total_taxes(), dec!(189.6));
    assert_eq!(result.total_cost(), dec!(989.6));
}

#[test]
fn textiles_under_category_d() {
    let input = TariffInput::new(dec!(120), dec!(0.8), Category::D)
        .with_product_type(ProductType::Textiles);
    let result = calculate(&input).unwrap();
    assert_eq!(result.adv(), dec!(12));
    assert_eq!(result.specific_duty(), dec!(4.4));
    assert_eq!(result.duty(), dec!(16.4));
    assert_eq!(result.vat(), dec!(16.368));
    assert_eq!(result.fodinfa(), dec!(0.6));
    assert_eq!(result.total_taxes(), dec!(33.368));
    assert_eq!(result.total_cost(), dec!(153.368));
    assert!(!result.requires_inen());
}

#[test]
fn category_c_rejects_value_over_ceiling() {
    let err = calculate(&TariffInput::new(dec!(2500), dec!(1), Category::C)).unwrap_err();
    assert_eq!(
        err,
        TariffError::CategoryLimitExceeded {
            category: Category::C,
            field: LimitedField::Value,
            value: dec!(2500),
            limit: dec!(2000),
        }
    );
}

#[test]
fn category_b_rejects_thirteenth_import() {
    let input = TariffInput::new(dec!(100), dec!(1), Category::B).with_import_count(13);
    assert_eq!(
        calculate(&input).unwrap_err(),
        TariffError::AnnualImportLimitExceeded { import_count: 13, max: 12 }
    );
}

fn shipment(value: Decimal, weight: Decimal, category: Category) -> TariffInput {
    TariffInput::new(value, weight, category).with_product_type(ProductType::Textiles)
}

/// Accept exactly at both ceilings, reject one cent or ten grams over either.
fn assert_ceilings_are_inclusive(category: Category, max_value: Decimal, max_weight: Decimal) {
    let at_limit = calculate(&shipment(max_value, max_weight, category)).unwrap();
    assert_eq!(at_limit.category(), category);

    let err = calculate(&shipment(max_value + dec!(0.01), max_weight, category)).unwrap_err();
    assert_eq!(
        err,
        TariffError::CategoryLimitExceeded {
            category,
            field: LimitedField::Value,
            value: max_value + dec!(0.01),
            limit: max_value,
        }
    );
    assert_eq!(err.excess(), Some(dec!(0.01)));

    let err = calculate(&shipment(max_value, max_weight + dec!(0.01), category)).unwrap_err();
    assert_eq!(
        err,
        TariffError::CategoryLimitExceeded {
            category,
            field: LimitedField::Weight,
            value: max_weight + dec!(0.01),
            limit: max_weight,
        }
    );
    assert_eq!(err.excess(), Some(dec!(0.01)));
}

#[test]
fn category_b_ceiling_is_inclusive() {
    assert_ceilings_are_inclusive(Category::B, dec!(400), dec!(4));
}

#[test]
fn category_c_ceiling_is_inclusive() {
    assert_ceilings_are_inclusive(Category::C, dec!(2000), dec!(50));
}

#[test]
fn category_d_ceiling_is_inclusive() {
    assert_ceilings_are_inclusive(Category::D, dec!(2000), dec!(20));
}

#[test]
fn total_cost_is_value_plus_taxes_everywhere() {
    let engine = TariffEngine::default();
    let values = ["0.01", "1", "99.99", "250.5", "399.99", "400"];
    let weights = ["0.001", "0.5", "1", "3.999", "4"];
    for category in Category::ALL {
        for product_type in ProductType::ALL {
            for value in values {
                for weight in weights {
                    let input = TariffInput::new(
                        Decimal::from_str(value).unwrap(),
                        Decimal::from_str(weight).unwrap(),
                        category,
                    )
                    .with_product_type(product_type);
                    let result = engine.calculate(&input).unwrap();
                    assert_eq!(result.total_cost(), result.base_value() + result.total_taxes());
                    assert_eq!(
                        result.total_taxes(),
                        result.duty() + result.vat() + result.fodinfa(),
                        "{category} {product_type} {value} {weight}"
                    );
                }
            }
        }
    }
}

#[test]
fn repeated_calls_are_identical() {
    let input = TariffInput::new(dec!(733.33), dec!(7.77), Category::D)
        .with_product_type(ProductType::Footwear);
    let first = calculate(&input).unwrap();
    let second = calculate(&input).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn concurrent_callers_share_one_engine() {
    let engine = TariffEngine::default();
    let input = TariffInput::new(dec!(800), dec!(2), Category::C);
    let expected = engine.calculate(&input).unwrap();
    std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| engine.calculate(&input).unwrap()))
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
