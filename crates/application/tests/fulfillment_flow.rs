//! End-to-end flows through the wired services over in-memory backends.

use chrono::{Duration, Utc};
use common::AggregateId;
use domain::inventory::ReservationId;
use domain::order::{OrderItem, PaymentMethod as OrderPaymentMethod};
use domain::payment::{PaymentMethod, PaymentStatus, RefundReasonCategory, RefundStatus};
use domain::returns::{
    ProductCondition, ReceivedItem, RefundMethod, ReturnItem, ReturnReason, ReturnStatus,
    UserRole,
};
use domain::{
    CustomerId, CustomerInfo, DeliveryAddress, DomainError, ErrorKind, Money, OrderStatus,
    PaymentError, ProductId, ReturnError, ShippingAddress, UserId,
};
use rust_decimal_macros::dec;
use store::{Entity, EventLog, Version};

use application::commands::{PlaceOrder, ProcessPayment, RefundPayment, RequestReturn};
use application::{ApplicationError, Config, Fulfillment, InMemoryBackends};

fn ron(amount: rust_decimal::Decimal) -> Money {
    Money::ron(amount).unwrap()
}

fn setup() -> (Fulfillment, InMemoryBackends) {
    Fulfillment::in_memory(&Config::default())
}

fn place_order_command(lamp: ProductId) -> PlaceOrder {
    PlaceOrder::new(
        CustomerId::new(),
        CustomerInfo::new("Ana Pop", "ana@example.ro", "0712345678").unwrap(),
        vec![
            OrderItem::new(lamp, "Desk lamp", 2, ron(dec!(45))).unwrap(),
            OrderItem::new(ProductId::new(), "Bulb", 4, ron(dec!(7.50))).unwrap(),
        ],
        ShippingAddress::new("Str. Lunga 1", "Cluj-Napoca", "Cluj", "400001").unwrap(),
        OrderPaymentMethod::Card,
    )
}

/// Places, validates and confirms an order, returning its id.
async fn confirmed_order(app: &Fulfillment, lamp: ProductId) -> AggregateId {
    let order_id = app
        .orders
        .place_order(place_order_command(lamp))
        .await
        .unwrap()
        .aggregate
        .id();
    app.orders.validate_order(order_id).await.unwrap();
    app.orders
        .confirm_order(order_id, UserId::new(), Utc::now() + Duration::days(3))
        .await
        .unwrap();
    order_id
}

fn bank_transfer(order_id: AggregateId, amount: Money) -> ProcessPayment {
    ProcessPayment::new(order_id, amount, PaymentMethod::BankTransfer, "ana@example.ro")
}

fn delivery_address() -> DeliveryAddress {
    DeliveryAddress::new("Ana Pop", "Str. Lunga 1", "Cluj-Napoca", "400001", "Romania").unwrap()
}

/// Takes a confirmed order through payment, shipping and delivery.
async fn delivered_order(app: &Fulfillment) -> AggregateId {
    let order_id = confirmed_order(app, ProductId::new()).await;
    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    app.orders
        .mark_paid(order_id, payment.id(), ron(dec!(120)))
        .await
        .unwrap();
    app.orders
        .mark_shipped(order_id, "SD-100200".to_string())
        .await
        .unwrap();
    app.orders.mark_delivered(order_id).await.unwrap();
    order_id
}

fn lamp_return(order_id: AggregateId) -> RequestReturn {
    RequestReturn::new(
        order_id,
        vec![ReturnItem::new(ProductId::new(), "Desk lamp", 1, ron(dec!(45))).unwrap()],
        ReturnReason::ChangedMind,
        "",
        "general",
    )
}

fn return_error(err: ApplicationError) -> ReturnError {
    match err {
        ApplicationError::Domain(DomainError::Return(e)) => e,
        other => panic!("expected return error, got {other:?}"),
    }
}

fn payment_error(err: ApplicationError) -> PaymentError {
    match err {
        ApplicationError::Domain(DomainError::Payment(e)) => e,
        other => panic!("expected payment error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_order_travels_from_placement_to_completed_return() {
    let (app, backends) = setup();
    let lamp = ProductId::new();

    // Stock is held for the order and committed once it ships
    let item_id = app
        .inventory
        .register_item("LAMP-01".to_string(), 10, 1, 2)
        .await
        .unwrap()
        .aggregate
        .id();
    let reservation = ReservationId::new();
    app.inventory
        .reserve_stock(item_id, reservation, 2, "order".to_string())
        .await
        .unwrap();

    let order_id = confirmed_order(&app, lamp).await;
    let total = app.orders.get_order(order_id).await.unwrap().unwrap().total_amount();
    assert_eq!(total, ron(dec!(120)));

    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, total))
        .await
        .unwrap();
    assert_eq!(payment.status(), PaymentStatus::Completed);
    assert!(app.payments.verify_payment(payment.id()).await.unwrap());
    app.orders.mark_paid(order_id, payment.id(), total).await.unwrap();

    let shipment_id = app
        .shipping
        .create_shipment(order_id, delivery_address())
        .await
        .unwrap()
        .aggregate
        .id();
    app.shipping
        .prepare_shipment(shipment_id, "fragile".to_string())
        .await
        .unwrap();
    app.shipping
        .ship(shipment_id, "Sameday".to_string(), "SD-998877".to_string(), None)
        .await
        .unwrap();
    app.inventory
        .commit_reservation(item_id, reservation, "shipped".to_string())
        .await
        .unwrap();
    app.orders
        .mark_shipped(order_id, "SD-998877".to_string())
        .await
        .unwrap();
    app.shipping
        .deliver(
            shipment_id,
            "Ana Pop".to_string(),
            "Courier 3".to_string(),
            String::new(),
        )
        .await
        .unwrap();
    let delivered = app.orders.mark_delivered(order_id).await.unwrap();
    assert_eq!(delivered.aggregate.status(), OrderStatus::Delivered);

    let item = app.inventory.get_item(item_id).await.unwrap().unwrap();
    assert_eq!(item.total_on_hand(), 8);
    assert_eq!(item.reserved_quantity(), 0);

    // One lamp comes back after a change of mind
    let eligibility = app
        .returns
        .check_eligibility(order_id, "general", false)
        .await
        .unwrap();
    assert!(eligibility.is_eligible);

    let return_id = app
        .returns
        .request_return(RequestReturn::new(
            order_id,
            vec![ReturnItem::new(lamp, "Desk lamp", 1, ron(dec!(45))).unwrap()],
            ReturnReason::ChangedMind,
            "Does not fit the desk",
            "general",
        ))
        .await
        .unwrap()
        .aggregate
        .id();
    app.returns
        .approve_return(
            return_id,
            UserId::new(),
            "Maria".to_string(),
            UserRole::CustomerService,
            String::new(),
            false,
        )
        .await
        .unwrap();
    app.returns
        .receive_products(
            return_id,
            UserId::new(),
            "Depozit".to_string(),
            vec![ReceivedItem {
                product_id: lamp,
                quantity: 1,
                condition: ProductCondition::Intact,
                notes: "sealed".to_string(),
                acceptable_for_resale: true,
            }],
            "AWB-RET-1".to_string(),
            "Cluj WH".to_string(),
            String::new(),
        )
        .await
        .unwrap();

    let calculation = app
        .returns
        .calculate_refund(return_id, ron(dec!(15)), "bank_transfer")
        .await
        .unwrap();
    assert_eq!(calculation.restocking_fee, ron(dec!(0)));
    assert_eq!(calculation.deductions, ron(dec!(15)));
    assert_eq!(calculation.final_refund_amount, ron(dec!(30)));
    assert_eq!(calculation.refund_method, RefundMethod::BankTransfer);

    let refund = app
        .payments
        .refund_payment(RefundPayment::new(
            payment.id(),
            calculation.final_refund_amount,
            "Return accepted",
            RefundReasonCategory::CustomerRequest,
            "returns-desk",
        ))
        .await
        .unwrap();
    assert_eq!(refund.status(), RefundStatus::Completed);

    app.returns
        .accept_return(
            return_id,
            UserId::new(),
            "Maria".to_string(),
            calculation.refund_method,
            String::new(),
            String::new(),
            true,
        )
        .await
        .unwrap();
    let completed = app
        .returns
        .complete_return(return_id, "RFD-REF-1".to_string())
        .await
        .unwrap();
    assert_eq!(completed.aggregate.status(), ReturnStatus::Completed);

    assert_eq!(app.returns.returns_for_order(order_id).await.unwrap().len(), 1);
    assert_eq!(
        app.payments
            .refunds_for_payment(payment.id())
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(backends.gateway.calls(), 2);

    let types = backends.events.event_types().await;
    for expected in [
        "StockReserved",
        "OrderPlaced",
        "PaymentCompleted",
        "OrderShipped",
        "OrderDelivered",
        "ReturnRequested",
        "RefundCompleted",
        "ReturnCompleted",
    ] {
        assert!(types.iter().any(|t| t == expected), "missing {expected}");
    }
}

#[tokio::test]
async fn test_envelopes_carry_the_version_of_the_save() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;

    let envelopes = backends.events.events_for_aggregate(order_id).await.unwrap();
    let stamped: Vec<_> = envelopes
        .iter()
        .map(|e| (e.event_type.as_str(), e.version, e.aggregate_type.as_str()))
        .collect();
    assert_eq!(
        stamped,
        [
            ("OrderPlaced", Version::new(1), "Order"),
            ("OrderValidated", Version::new(2), "Order"),
            ("OrderConfirmed", Version::new(3), "Order"),
        ]
    );
    assert_eq!(envelopes[2].metadata["command"], "confirm_order");

    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    let envelopes = backends
        .events
        .events_for_aggregate(payment.id())
        .await
        .unwrap();
    let stamped: Vec<_> = envelopes
        .iter()
        .map(|e| (e.event_type.as_str(), e.version.as_i64(), e.sequence))
        .collect();
    assert_eq!(
        stamped,
        [
            ("PaymentCreated", 1, 0),
            ("PaymentProcessingStarted", 1, 1),
            ("PaymentCompleted", 2, 0),
        ]
    );
}

#[tokio::test]
async fn test_gateway_outage_is_retried_until_exhausted() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;
    for _ in 0..4 {
        backends.gateway.fail_next("gateway timeout");
    }

    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    assert_eq!(payment.status(), PaymentStatus::Pending);
    assert_eq!(payment.retry_count(), 1);

    let mut payment = payment;
    for _ in 0..2 {
        payment = app.payments.retry_payment(payment.id()).await.unwrap();
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }

    let payment = app.payments.retry_payment(payment.id()).await.unwrap();
    assert_eq!(payment.status(), PaymentStatus::Failed);
    assert!(
        payment
            .failure_reason()
            .unwrap()
            .starts_with("Max retries exceeded")
    );
    assert!(!app.payments.verify_payment(payment.id()).await.unwrap());

    // A failed payment cannot be sent again
    let err = app.payments.retry_payment(payment.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(backends.gateway.calls(), 4);
}

#[tokio::test]
async fn test_declined_payment_can_succeed_on_retry() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;
    backends.gateway.decline_next("Insufficient funds");

    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    assert_eq!(payment.status(), PaymentStatus::Pending);

    let payment = app.payments.retry_payment(payment.id()).await.unwrap();
    assert_eq!(payment.status(), PaymentStatus::Completed);
    assert!(payment.transaction_info().is_some());
}

#[tokio::test]
async fn test_fraud_block_saves_a_cancelled_payment() {
    let (app, backends) = setup();
    let order_id = AggregateId::new();

    let err = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(60000))))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(matches!(payment_error(err), PaymentError::FraudBlocked { .. }));

    let saved = app.payments.payments_for_order(order_id).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status(), PaymentStatus::Cancelled);
    assert!(
        saved[0]
            .failure_reason()
            .unwrap()
            .starts_with("Blocked due to fraud detection")
    );
    let cancelled = backends
        .events
        .events_by_type("PaymentCancelled")
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(backends.gateway.calls(), 0);
}

#[tokio::test]
async fn test_completed_order_cannot_be_charged_twice() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;

    app.payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    let err = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap_err();

    assert!(matches!(
        payment_error(err),
        PaymentError::AlreadyPaid { order_id: id } if id == order_id
    ));
    assert_eq!(backends.gateway.calls(), 1);
}

#[tokio::test]
async fn test_refunds_cannot_exceed_what_was_paid() {
    let (app, _) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;
    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();

    let refund = |amount| {
        RefundPayment::new(
            payment.id(),
            ron(amount),
            "Partial refund",
            RefundReasonCategory::CustomerRequest,
            "support",
        )
    };
    app.payments.refund_payment(refund(dec!(100))).await.unwrap();
    let err = app
        .payments
        .refund_payment(refund(dec!(20.01)))
        .await
        .unwrap_err();

    match payment_error(err) {
        PaymentError::NotRefundable { remaining, .. } => assert_eq!(remaining, ron(dec!(20))),
        other => panic!("expected NotRefundable, got {other:?}"),
    }
    app.payments.refund_payment(refund(dec!(20))).await.unwrap();
}

#[tokio::test]
async fn test_refund_retry_is_refused_once_the_balance_is_used_up() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;
    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();
    let full_refund = || {
        RefundPayment::new(
            payment.id(),
            ron(dec!(120)),
            "Full refund",
            RefundReasonCategory::CustomerRequest,
            "support",
        )
    };

    backends.gateway.decline_next("Bank offline");
    let declined = app.payments.refund_payment(full_refund()).await.unwrap();
    assert_eq!(declined.status(), RefundStatus::Initiated);

    let second = app.payments.refund_payment(full_refund()).await.unwrap();
    assert_eq!(second.status(), RefundStatus::Completed);

    let calls = backends.gateway.calls();
    let err = app.payments.retry_refund(declined.id()).await.unwrap_err();
    match payment_error(err) {
        PaymentError::NotRefundable { remaining, .. } => assert_eq!(remaining, ron(dec!(0))),
        other => panic!("expected NotRefundable, got {other:?}"),
    }
    assert_eq!(backends.gateway.calls(), calls);

    let stored = app.payments.get_refund(declined.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), RefundStatus::Initiated);
}

#[tokio::test]
async fn test_declined_refund_succeeds_on_retry() {
    let (app, backends) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;
    let payment = app
        .payments
        .process_payment(bank_transfer(order_id, ron(dec!(120))))
        .await
        .unwrap();

    backends.gateway.decline_next("Bank offline");
    let refund = app
        .payments
        .refund_payment(RefundPayment::new(
            payment.id(),
            ron(dec!(50)),
            "Damaged box",
            RefundReasonCategory::CustomerRequest,
            "support",
        ))
        .await
        .unwrap();
    assert_eq!(refund.status(), RefundStatus::Initiated);

    let refund = app.payments.retry_refund(refund.id()).await.unwrap();
    assert_eq!(refund.status(), RefundStatus::Completed);
}

#[tokio::test]
async fn test_return_requires_a_delivered_order() {
    let (app, _) = setup();
    let order_id = confirmed_order(&app, ProductId::new()).await;

    let err = app.returns.request_return(lamp_return(order_id)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::OrderNotDelivered { .. }));

    let unknown = AggregateId::new();
    let err = app.returns.request_return(lamp_return(unknown)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::OrderNotFound(id) if id == unknown));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_order_has_at_most_one_open_return() {
    let (app, _) = setup();
    let order_id = delivered_order(&app).await;

    let first = app
        .returns
        .request_return(lamp_return(order_id))
        .await
        .unwrap()
        .aggregate
        .id();
    let err = app
        .returns
        .request_return(lamp_return(order_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(matches!(
        return_error(err),
        ReturnError::ActiveReturnExists { order_id: id } if id == order_id
    ));
    assert_eq!(app.returns.returns_for_order(order_id).await.unwrap().len(), 1);

    app.returns
        .cancel_return(first, "Customer kept the lamp".to_string())
        .await
        .unwrap();
    app.returns
        .request_return(lamp_return(order_id))
        .await
        .unwrap();
    assert_eq!(app.returns.returns_for_order(order_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_custom_products_cannot_be_returned() {
    let (app, backends) = setup();
    let order_id = delivered_order(&app).await;

    let err = app
        .returns
        .request_return(lamp_return(order_id).custom_product())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    match return_error(err) {
        ReturnError::NotEligible { reason } => {
            assert_eq!(reason, "Custom-made products are not eligible for return")
        }
        other => panic!("expected NotEligible, got {other:?}"),
    }
    assert!(app.returns.returns_for_order(order_id).await.unwrap().is_empty());
    let requested = backends
        .events
        .events_by_type("ReturnRequested")
        .await
        .unwrap();
    assert!(requested.is_empty());
}

#[tokio::test]
async fn test_vip_request_uses_the_vip_window() {
    let (app, _) = setup();
    let order_id = delivered_order(&app).await;

    let ret = app
        .returns
        .request_return(lamp_return(order_id).vip())
        .await
        .unwrap()
        .aggregate;

    assert_eq!(ret.policy().return_period_days(), 60);
}

#[tokio::test]
async fn test_second_shipment_for_an_order_is_refused() {
    let (app, _) = setup();
    let order_id = AggregateId::new();

    app.shipping
        .create_shipment(order_id, delivery_address())
        .await
        .unwrap();
    let err = app
        .shipping
        .create_shipment(order_id, delivery_address())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(app.shipping.shipment_for_order(order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_reservations_expire_through_the_sweeper() {
    let config = Config {
        reservation_ttl_hours: 2,
        ..Config::default()
    };
    let (app, backends) = Fulfillment::in_memory(&config);
    let item_id = app
        .inventory
        .register_item("BULB-E27".to_string(), 30, 0, 0)
        .await
        .unwrap()
        .aggregate
        .id();
    app.inventory
        .reserve_stock(item_id, ReservationId::new(), 12, "cart".to_string())
        .await
        .unwrap();

    let early = app.sweeper.sweep().await.unwrap();
    assert_eq!(early.reservations_expired, 0);

    let report = app
        .sweeper
        .sweep_at(Utc::now() + Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(report.items_swept, 1);
    assert_eq!(report.reservations_expired, 1);

    let item = app.inventory.get_item(item_id).await.unwrap().unwrap();
    assert_eq!(item.available_quantity(), 30);
    assert_eq!(
        backends.events.events_by_type("StockReleased").await.unwrap().len(),
        1
    );
}
