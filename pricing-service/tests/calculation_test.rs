//! Totals calculation integration tests for pricing-service.

mod common;

use common::{
    austin_context, catering_cart, engine_with, manual_config, overflowing_item, MockTaxProvider,
    PerMileDelivery,
};
use pricing_service::error::PricingError;
use pricing_service::models::{
    AdjustmentMode, CustomAdjustment, LineItem, PriceType, PricingConfiguration, PricingContext,
    ServiceFeeType, TaxCalculationMethod, VendorDelivery,
};
use pricing_service::services::{PricingEngine, UnconfiguredTaxProvider};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

fn engine_with_per_mile() -> PricingEngine {
    PricingEngine::new(
        Arc::new(UnconfiguredTaxProvider),
        Arc::new(PerMileDelivery {
            default_rate: dec!(2),
        }),
    )
}

#[tokio::test]
async fn catering_order_with_manual_tax() {
    let snapshot = PricingEngine::default()
        .calculate_totals(
            &catering_cart(),
            &[],
            &manual_config(),
            &PricingContext::default(),
        )
        .await
        .expect("Failed to calculate totals");

    assert_eq!(snapshot.subtotal, dec!(7000));
    assert_eq!(snapshot.service_fee, dec!(350));
    assert_eq!(snapshot.taxable_base, dec!(7350));
    assert_eq!(snapshot.tax, dec!(588));
    assert_eq!(snapshot.total, dec!(7938));
    assert_eq!(snapshot.total.to_string(), "7938.00");
    assert_eq!(snapshot.tax_rate, Some(dec!(8)));
    assert_eq!(snapshot.tax_description.as_deref(), Some("Sales tax (8%)"));
    assert_eq!(snapshot.lines.len(), 2);
    assert!(snapshot.is_balanced());
}

#[tokio::test]
async fn total_is_sum_of_components() {
    let items = vec![
        LineItem::new("a", dec!(19.99), 3, PriceType::PerItem),
        LineItem::new("b", dec!(0.333), 7, PriceType::PerItem),
        LineItem::new("c", dec!(12.345), 1, PriceType::PerHour).non_taxable(),
    ];
    let adjustments = vec![
        CustomAdjustment::percentage("promo", "Promo", dec!(7.5), AdjustmentMode::Discount),
        CustomAdjustment::fixed("rush", "Rush", dec!(4.255), AdjustmentMode::Surcharge),
    ];
    let config = PricingConfiguration {
        service_fee_type: ServiceFeeType::Hybrid,
        service_fee_fixed: dec!(2.5),
        service_fee_percentage: dec!(3.3),
        ..PricingConfiguration::default().with_manual_tax(dec!(8.25))
    };
    let context = PricingContext {
        deliveries: vec![VendorDelivery::with_fee("vendor-a", dec!(15.005))],
        ..Default::default()
    };

    let snapshot = PricingEngine::default()
        .calculate_totals(&items, &adjustments, &config, &context)
        .await
        .expect("Failed to calculate totals");

    assert_eq!(
        snapshot.total,
        snapshot.subtotal
            + snapshot.service_fee
            + snapshot.delivery_fee
            + snapshot.adjustments_total
            + snapshot.tax
    );
    for amount in [
        snapshot.subtotal,
        snapshot.service_fee,
        snapshot.delivery_fee,
        snapshot.adjustments_total,
        snapshot.tax,
        snapshot.total,
    ] {
        assert_eq!(amount.scale(), 2);
    }
    assert_eq!(snapshot.delivery_fee, dec!(15.01));
}

#[tokio::test]
async fn waived_fee_and_exempt_tax() {
    let context = PricingContext {
        is_tax_exempt: true,
        is_service_fee_waived: true,
        ..Default::default()
    };
    let snapshot = PricingEngine::default()
        .calculate_totals(&catering_cart(), &[], &manual_config(), &context)
        .await
        .expect("Failed to calculate totals");

    assert_eq!(snapshot.service_fee, dec!(0));
    assert_eq!(snapshot.tax, dec!(0));
    assert_eq!(snapshot.tax_description.as_deref(), Some("Tax exempt"));
    assert_eq!(snapshot.total, dec!(7000));
}

#[tokio::test]
async fn full_discount_goes_negative_with_fee() {
    let items = vec![LineItem::new("a", dec!(100), 2, PriceType::PerItem)];
    let adjustments = vec![CustomAdjustment::percentage(
        "comp",
        "Comped",
        dec!(100),
        AdjustmentMode::Discount,
    )];
    let config = PricingConfiguration {
        service_fee_percentage: dec!(0),
        ..manual_config()
    };

    let snapshot = PricingEngine::default()
        .calculate_totals(&items, &adjustments, &config, &PricingContext::default())
        .await
        .expect("Failed to calculate totals");

    assert_eq!(snapshot.adjustments_total, dec!(-200));
    assert_eq!(snapshot.taxable_base, dec!(0));
    assert_eq!(snapshot.tax, dec!(0));
    assert_eq!(snapshot.total, dec!(0));

    let oversized = vec![CustomAdjustment::fixed(
        "refund",
        "Refund",
        dec!(400),
        AdjustmentMode::Discount,
    )];
    let snapshot = PricingEngine::default()
        .calculate_totals(&items, &oversized, &config, &PricingContext::default())
        .await
        .expect("Failed to calculate totals");
    assert_eq!(snapshot.total, dec!(-200));
}

#[tokio::test]
async fn automatic_tax_uses_provider_quote() {
    let provider = Arc::new(MockTaxProvider::with_rate(dec!(8.25)));
    let config = PricingConfiguration {
        service_fee_taxable: false,
        ..Default::default()
    };
    assert_eq!(config.tax_calculation_method, TaxCalculationMethod::Automatic);

    let snapshot = engine_with(provider.clone())
        .calculate_totals(&catering_cart(), &[], &config, &austin_context())
        .await
        .expect("Failed to calculate totals");

    assert_eq!(provider.calls(), 1);
    assert_eq!(snapshot.taxable_base, dec!(7000));
    assert_eq!(snapshot.tax, dec!(577.50));
    assert_eq!(snapshot.tax_rate, Some(dec!(8.25)));
    assert_eq!(snapshot.tax_description.as_deref(), Some("US sales tax"));
    assert_eq!(snapshot.total, dec!(7927.50));
}

#[tokio::test]
async fn automatic_tax_requires_location() {
    let provider = Arc::new(MockTaxProvider::with_rate(dec!(8)));
    let result = engine_with(provider.clone())
        .calculate_totals(
            &catering_cart(),
            &[],
            &PricingConfiguration::default(),
            &PricingContext::default(),
        )
        .await;

    assert!(matches!(result, Err(PricingError::InvalidInput(_))));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_failure_propagates_from_calculate() {
    let provider = Arc::new(MockTaxProvider::failing());
    let result = engine_with(provider)
        .calculate_totals(
            &catering_cart(),
            &[],
            &PricingConfiguration::default(),
            &austin_context(),
        )
        .await;

    assert!(matches!(result, Err(PricingError::TaxProvider(_))));
}

#[tokio::test]
async fn empty_cart_skips_provider() {
    let provider = Arc::new(MockTaxProvider::with_rate(dec!(8)));
    let config = PricingConfiguration {
        service_fee_percentage: dec!(0),
        ..Default::default()
    };
    let snapshot = engine_with(provider.clone())
        .calculate_totals(&[], &[], &config, &PricingContext::default())
        .await
        .expect("Failed to calculate totals");

    assert_eq!(provider.calls(), 0);
    assert_eq!(snapshot.total, dec!(0));
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let items = vec![LineItem::new("a", dec!(-1), 1, PriceType::PerItem)];
    let result = PricingEngine::default()
        .calculate_totals(&items, &[], &manual_config(), &PricingContext::default())
        .await;

    assert!(matches!(result, Err(PricingError::InvalidInput(_))));
}

#[tokio::test]
async fn manual_method_without_rate_is_configuration_error() {
    let config = PricingConfiguration {
        tax_calculation_method: TaxCalculationMethod::Manual,
        manual_tax_rate: None,
        ..Default::default()
    };
    let result = PricingEngine::default()
        .calculate_totals(&catering_cart(), &[], &config, &PricingContext::default())
        .await;

    assert!(matches!(result, Err(PricingError::Configuration(_))));
}

#[tokio::test]
async fn identical_inputs_give_identical_snapshots() {
    let engine = PricingEngine::default();
    let first = engine
        .calculate_totals(&catering_cart(), &[], &manual_config(), &PricingContext::default())
        .await
        .expect("Failed to calculate totals");
    let second = engine
        .calculate_totals(&catering_cart(), &[], &manual_config(), &PricingContext::default())
        .await
        .expect("Failed to calculate totals");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn empty_cart_total_is_fixed_fee_only() {
    let fixed = PricingConfiguration {
        service_fee_type: ServiceFeeType::Fixed,
        service_fee_fixed: dec!(25),
        service_fee_taxable: false,
        ..manual_config()
    };
    let snapshot = PricingEngine::default()
        .calculate_totals(&[], &[], &fixed, &PricingContext::default())
        .await
        .expect("Failed to calculate totals");
    assert_eq!(snapshot.subtotal, dec!(0));
    assert_eq!(snapshot.total, dec!(25));

    let snapshot = PricingEngine::default()
        .calculate_totals(&[], &[], &manual_config(), &PricingContext::default())
        .await
        .expect("Failed to calculate totals");
    assert_eq!(snapshot.service_fee, dec!(0));
    assert_eq!(snapshot.total, dec!(0));
}

#[tokio::test]
async fn hybrid_fee_on_thousand() {
    let config = PricingConfiguration {
        service_fee_type: ServiceFeeType::Hybrid,
        service_fee_fixed: dec!(10),
        service_fee_percentage: dec!(5),
        ..manual_config()
    };
    let items = vec![LineItem::new("venue", dec!(1000), 1, PriceType::FlatRate)];
    let snapshot = PricingEngine::default()
        .calculate_totals(&items, &[], &config, &PricingContext::default())
        .await
        .expect("Failed to calculate totals");

    assert_eq!(snapshot.service_fee, dec!(60));
}

#[tokio::test]
async fn delivery_fees_sum_across_vendors() {
    let mut by_rule = VendorDelivery::with_distance("vendor-c", dec!(4));
    by_rule.rules = Some(json!({ "perMile": "3.125" }));
    let context = PricingContext {
        deliveries: vec![
            VendorDelivery::with_fee("vendor-a", dec!(40)),
            VendorDelivery::with_distance("vendor-b", dec!(12.5)),
            by_rule,
        ],
        ..Default::default()
    };

    let snapshot = engine_with_per_mile()
        .calculate_totals(&catering_cart(), &[], &manual_config(), &context)
        .await
        .expect("Failed to calculate totals");

    let fees: Vec<_> = snapshot
        .delivery_fees
        .iter()
        .map(|d| (d.vendor_id.as_str(), d.fee))
        .collect();
    assert_eq!(
        fees,
        vec![
            ("vendor-a", dec!(40)),
            ("vendor-b", dec!(25)),
            ("vendor-c", dec!(12.50)),
        ]
    );
    assert_eq!(snapshot.delivery_fee, dec!(77.50));
    assert_eq!(snapshot.total, dec!(7938) + dec!(77.50));
    assert!(snapshot.is_balanced());
}

#[tokio::test]
async fn distance_delivery_is_taxed_when_configured() {
    let config = PricingConfiguration {
        delivery_fee_taxable: true,
        ..manual_config()
    };
    let context = PricingContext {
        deliveries: vec![VendorDelivery::with_distance("vendor-a", dec!(25))],
        ..Default::default()
    };

    let snapshot = engine_with_per_mile()
        .calculate_totals(&catering_cart(), &[], &config, &context)
        .await
        .expect("Failed to calculate totals");

    assert_eq!(snapshot.delivery_fee, dec!(50));
    assert_eq!(snapshot.taxable_base, dec!(7400));
    assert_eq!(snapshot.tax, dec!(592));
}

#[tokio::test]
async fn unreadable_delivery_rules_are_invalid_input() {
    let mut delivery = VendorDelivery::with_distance("vendor-a", dec!(10));
    delivery.rules = Some(json!({ "perMile": 3 }));
    let context = PricingContext {
        deliveries: vec![delivery],
        ..Default::default()
    };

    let result = engine_with_per_mile()
        .calculate_totals(&catering_cart(), &[], &manual_config(), &context)
        .await;

    assert!(matches!(result, Err(PricingError::InvalidInput(_))));
}

#[tokio::test]
async fn overflowing_line_is_invalid_input() {
    let items = vec![overflowing_item()];
    let result = PricingEngine::default()
        .calculate_totals(&items, &[], &manual_config(), &PricingContext::default())
        .await;

    match result {
        Err(PricingError::InvalidInput(msg)) => assert!(msg.contains("overflow")),
        other => panic!("Expected overflow to be invalid input, got {:?}", other),
    }
}

#[tokio::test]
async fn overflowing_line_previews_as_zero_with_error() {
    let mut items = catering_cart();
    items.push(overflowing_item());

    let preview = PricingEngine::default()
        .preview_totals(&items, &[], &manual_config(), &PricingContext::default())
        .await;

    assert!(preview.has_error());
    assert!(!preview.tax_pending);
    assert_eq!(preview.snapshot.total, dec!(0));
    assert!(preview.snapshot.lines.is_empty());
}
