mod common;

use std::sync::{
    atomic::Ordering::SeqCst,
    Arc,
};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{product, MemoryCatalog, MemoryProcessedPayments, RecordingMailer, StubGateway};
use storefront_api::config::ShippingConfig;
use storefront_api::entities::product::PackDetails;
use storefront_api::services::orders::{BuyerMeta, Cart, CartItem, OrderService, Variant};
use storefront_api::services::payments::{
    AdditionalInfo, EchoedItem, PaymentDetail, PaymentStatus,
};
use storefront_api::services::reconciliation::{
    ReconcileOutcome, ReconciliationService, WebhookNotice,
};
use storefront_api::services::shipping::ShippingTable;

struct Harness {
    catalog: Arc<MemoryCatalog>,
    gateway: Arc<StubGateway>,
    mailer: Arc<RecordingMailer>,
    service: ReconciliationService,
}

fn harness(products: Vec<storefront_api::entities::product::Model>) -> Harness {
    let catalog = Arc::new(MemoryCatalog::new(products));
    let gateway = Arc::new(StubGateway::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = ReconciliationService::new(
        catalog.clone(),
        Arc::new(MemoryProcessedPayments::default()),
        gateway.clone(),
        mailer.clone(),
    );
    Harness {
        catalog,
        gateway,
        mailer,
        service,
    }
}

fn payment(status: PaymentStatus, items: Vec<EchoedItem>, amount: Decimal) -> PaymentDetail {
    PaymentDetail {
        status,
        metadata: BuyerMeta {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            ..BuyerMeta::default()
        },
        additional_info: AdditionalInfo { items },
        transaction_amount: amount,
    }
}

fn echoed(tag: &str, quantity: i32, unit_price: Decimal) -> EchoedItem {
    EchoedItem {
        id: tag.to_string(),
        title: format!("item {tag}"),
        quantity,
        unit_price,
    }
}

fn notice(topic: &str, payment_id: &str) -> WebhookNotice {
    WebhookNotice {
        topic: Some(topic.to_string()),
        payment_id: Some(payment_id.to_string()),
    }
}

#[tokio::test]
async fn duplicate_delivery_decrements_and_mails_once() {
    let h = harness(vec![product(
        7,
        "Torrontés",
        dec!(7400),
        60,
        Some(PackDetails {
            name: "Torrontés x6".to_string(),
            price: dec!(39900),
            stock: 3,
        }),
    )]);
    h.gateway.insert(
        "PAY1",
        payment(
            PaymentStatus::Approved,
            vec![echoed("PACK|7", 1, dec!(39900))],
            dec!(39900),
        ),
    );

    let first = h.service.handle_notification(&notice("payment", "PAY1")).await;
    let second = h.service.handle_notification(&notice("payment", "PAY1")).await;

    assert_eq!(first, ReconcileOutcome::Processed);
    assert_eq!(second, ReconcileOutcome::Duplicate);
    // Pack pool went 3 -> 2 exactly once, not 3 -> 1.
    assert_eq!(h.catalog.pack_stock(7), 2);
    assert_eq!(h.catalog.decrement_batches.load(SeqCst), 1);
    assert_eq!(h.mailer.confirmations.load(SeqCst), 1);
    assert_eq!(h.mailer.admin_alerts.load(SeqCst), 1);
}

#[tokio::test]
async fn non_payment_topic_is_ignored_without_a_provider_call() {
    let h = harness(vec![]);

    let outcome = h
        .service
        .handle_notification(&notice("merchant_order", "PAY1"))
        .await;
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(h.gateway.lookups.load(SeqCst), 0);

    let outcome = h
        .service
        .handle_notification(&WebhookNotice {
            topic: Some("payment".to_string()),
            payment_id: None,
        })
        .await;
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(h.gateway.lookups.load(SeqCst), 0);
}

#[tokio::test]
async fn non_approved_payment_has_no_side_effects_until_approved() {
    let h = harness(vec![product(1, "Malbec", dec!(1000), 5, None)]);
    h.gateway.insert(
        "PAY2",
        payment(
            PaymentStatus::Pending,
            vec![echoed("IND|1", 2, dec!(1000))],
            dec!(2000),
        ),
    );

    let outcome = h.service.handle_notification(&notice("payment", "PAY2")).await;
    assert_eq!(outcome, ReconcileOutcome::NotApproved);
    assert_eq!(h.catalog.simple_stock(1), 5);
    assert_eq!(h.mailer.confirmations.load(SeqCst), 0);

    // The same id reconciles normally once the provider reports approval.
    h.gateway.insert(
        "PAY2",
        payment(
            PaymentStatus::Approved,
            vec![echoed("IND|1", 2, dec!(1000))],
            dec!(2000),
        ),
    );
    let outcome = h.service.handle_notification(&notice("payment", "PAY2")).await;
    assert_eq!(outcome, ReconcileOutcome::Processed);
    assert_eq!(h.catalog.simple_stock(1), 3);
}

#[tokio::test]
async fn provider_failure_defers_instead_of_recording() {
    let h = harness(vec![product(1, "Malbec", dec!(1000), 5, None)]);
    h.gateway.insert(
        "PAY3",
        payment(
            PaymentStatus::Approved,
            vec![echoed("IND|1", 1, dec!(1000))],
            dec!(1000),
        ),
    );
    h.gateway.fail_lookup.store(true, SeqCst);

    let outcome = h.service.handle_notification(&notice("payment", "PAY3")).await;
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(h.catalog.simple_stock(1), 5);

    // The redelivery succeeds because nothing was recorded.
    h.gateway.fail_lookup.store(false, SeqCst);
    let outcome = h.service.handle_notification(&notice("payment", "PAY3")).await;
    assert_eq!(outcome, ReconcileOutcome::Processed);
    assert_eq!(h.catalog.simple_stock(1), 4);
}

#[tokio::test]
async fn shipping_and_unparseable_tags_are_skipped() {
    let h = harness(vec![product(1, "Malbec", dec!(1000), 5, None)]);
    h.gateway.insert(
        "PAY4",
        payment(
            PaymentStatus::Approved,
            vec![
                echoed("SHIP|0", 1, dec!(3500)),
                echoed("mystery item", 4, dec!(1)),
                echoed("IND|1", 2, dec!(1000)),
            ],
            dec!(5500),
        ),
    );

    let outcome = h.service.handle_notification(&notice("payment", "PAY4")).await;
    assert_eq!(outcome, ReconcileOutcome::Processed);
    assert_eq!(h.catalog.simple_stock(1), 3);
    // Skipped lines never reach the catalog.
    assert_eq!(h.catalog.lookups.load(SeqCst), 0);
}

#[tokio::test]
async fn buyer_mail_failure_does_not_block_the_admin_alert() {
    let h = harness(vec![product(1, "Malbec", dec!(1000), 5, None)]);
    h.gateway.insert(
        "PAY5",
        payment(
            PaymentStatus::Approved,
            vec![echoed("IND|1", 1, dec!(1000))],
            dec!(1000),
        ),
    );
    h.mailer.fail_buyer_mail.store(true, SeqCst);

    let outcome = h.service.handle_notification(&notice("payment", "PAY5")).await;
    assert_eq!(outcome, ReconcileOutcome::Processed);
    assert_eq!(h.mailer.confirmations.load(SeqCst), 0);
    assert_eq!(h.mailer.admin_alerts.load(SeqCst), 1);
    // Stock still committed.
    assert_eq!(h.catalog.simple_stock(1), 4);
}

#[tokio::test]
async fn stock_decrements_clamp_at_zero() {
    let h = harness(vec![product(1, "Malbec", dec!(1000), 1, None)]);
    h.gateway.insert(
        "PAY6",
        payment(
            PaymentStatus::Approved,
            vec![echoed("IND|1", 5, dec!(1000))],
            dec!(5000),
        ),
    );

    h.service.handle_notification(&notice("payment", "PAY6")).await;
    assert_eq!(h.catalog.simple_stock(1), 0);
}

#[tokio::test]
async fn checkout_order_reconciles_end_to_end() {
    // Build the priced order exactly as checkout would, then replay its
    // lines through an approved-payment notification.
    let catalog = Arc::new(MemoryCatalog::new(vec![product(
        1,
        "Malbec",
        dec!(1000),
        5,
        None,
    )]));
    let orders = OrderService::new(
        catalog.clone(),
        ShippingTable::new(&ShippingConfig::default()),
        "ARS".to_string(),
    );
    let order = orders
        .build_order(&Cart {
            items: vec![CartItem {
                id: 1,
                quantity: 2,
                variant: Variant::Individual,
            }],
            buyer: None,
            postal_code: Some("1100".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(catalog.simple_stock(1), 5);

    let echoed_lines: Vec<EchoedItem> = order
        .lines
        .iter()
        .map(|line| EchoedItem {
            id: line.tag.encode(),
            title: line.title.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect();
    assert!(echoed_lines.iter().any(|item| item.id == "IND|1"));
    assert!(echoed_lines.iter().any(|item| item.id == "SHIP|0"));

    let gateway = Arc::new(StubGateway::with_payment(
        "PAY7",
        PaymentDetail {
            status: PaymentStatus::Approved,
            metadata: BuyerMeta::default(),
            additional_info: AdditionalInfo {
                items: echoed_lines,
            },
            transaction_amount: order.total(),
        },
    ));
    let mailer = Arc::new(RecordingMailer::default());
    let service = ReconciliationService::new(
        catalog.clone(),
        Arc::new(MemoryProcessedPayments::default()),
        gateway,
        mailer,
    );

    let outcome = service.handle_notification(&notice("payment", "PAY7")).await;
    assert_eq!(outcome, ReconcileOutcome::Processed);
    assert_eq!(catalog.simple_stock(1), 3);
}
