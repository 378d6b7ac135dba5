//! Returns, payments and refunds across their domain services.

use chrono::{Duration, Utc};
use common::AggregateId;
use domain::payment::{
    FailureOutcome, PaymentMethod, PaymentStatus, RefundLedger, RefundReason,
    RefundReasonCategory, RetryPolicy, TransactionInfo,
};
use domain::returns::{
    EligibilityService, InspectedLine, PolicyService, ProductCondition, ReceivedItem,
    RefundMethod, ReturnItem, ReturnPolicy, ReturnReason, ReturnRequest, ReturnStatus, UserRole,
    can_approve_return, refund_calculation,
};
use domain::{
    Aggregate, CustomerId, Money, Payment, PaymentError, ProductId, Refund, Return, ReturnError,
    UserId,
};
use rust_decimal_macros::dec;
use store::Entity;

fn request(price: Money, policy: ReturnPolicy, delivered_days_ago: i64) -> ReturnRequest {
    ReturnRequest {
        order_id: AggregateId::new(),
        customer_id: CustomerId::new(),
        customer_name: "Ion Ionescu".to_string(),
        customer_email: "ion@example.ro".to_string(),
        delivery_date: Utc::now() - Duration::days(delivered_days_ago),
        items: vec![ReturnItem::new(ProductId::new(), "P1", 1, price).unwrap()],
        reason: ReturnReason::ChangedMind,
        description: String::new(),
        policy,
    }
}

mod returns {
    use super::*;

    #[test]
    fn refund_without_fee_matches_item_price() {
        let price = Money::ron(dec!(299.99)).unwrap();
        let mut ret = Return::request(request(price, ReturnPolicy::standard(), 5)).unwrap();
        let product_id = ret.items()[0].product_id();

        ret.approve(UserId::new(), "Maria", "", false).unwrap();
        ret.receive_products(
            UserId::new(),
            "Depozit",
            vec![ReceivedItem {
                product_id,
                quantity: 1,
                condition: ProductCondition::Intact,
                notes: "sealed".to_string(),
                acceptable_for_resale: true,
            }],
            "AWB-RET-1",
            "Cluj WH",
            "",
        )
        .unwrap();
        ret.accept_and_process_refund(
            UserId::new(),
            "Maria",
            RefundMethod::OriginalPaymentMethod,
            "",
            "",
            true,
        )
        .unwrap();

        assert_eq!(ret.status(), ReturnStatus::Accepted);
        assert_eq!(ret.refund_amount(), price);
    }

    #[test]
    fn delivery_twenty_days_ago_is_outside_fourteen_day_window() {
        let price = Money::ron(dec!(150)).unwrap();
        let err = Return::request(request(price, ReturnPolicy::standard(), 20)).unwrap_err();

        assert!(matches!(err, ReturnError::WindowExpired { .. }));
    }

    #[test]
    fn services_agree_on_an_electronics_return() {
        let policies = PolicyService::new();
        let eligibility = EligibilityService::new(policies.clone());
        let total = Money::ron(dec!(2400)).unwrap();

        let now = Utc::now();
        let check = eligibility.check_eligibility_at(
            now - Duration::days(10),
            "electronics",
            &total,
            false,
            now,
        );
        assert!(check.is_eligible);
        assert_eq!(check.days_remaining, 20);

        let calc = refund_calculation::calculate(
            &total,
            &check.policy,
            &[InspectedLine {
                condition: ProductCondition::Opened,
                quantity: 1,
                unit_price: total,
            }],
            ReturnReason::ChangedMind,
            &Money::ron(dec!(30)).unwrap(),
            "credit_card",
        )
        .unwrap();
        assert_eq!(calc.restocking_fee, Money::ron(dec!(240)).unwrap());
        assert_eq!(calc.final_refund_amount, Money::ron(dec!(2130)).unwrap());
        assert!(refund_calculation::validate_refund_amount(
            &calc.final_refund_amount,
            &total
        ));

        let auth = can_approve_return(
            UserRole::CustomerService,
            &calc.final_refund_amount,
            ReturnReason::ChangedMind,
        );
        assert!(auth.requires_escalation);
        assert_eq!(auth.escalation_level, Some(UserRole::Manager));
    }
}

mod payments {
    use super::*;

    fn completed_payment(amount: Money) -> Payment {
        let mut payment =
            Payment::create(AggregateId::new(), amount, PaymentMethod::BankTransfer, None).unwrap();
        payment.start_processing().unwrap();
        payment
            .complete(TransactionInfo::new("TXN-1", "AUTH-1", Utc::now(), "approved").unwrap())
            .unwrap();
        payment
    }

    #[test]
    fn fourth_failure_is_terminal() {
        let policy = RetryPolicy::default();
        let mut payment = Payment::create(
            AggregateId::new(),
            Money::ron(dec!(500)).unwrap(),
            PaymentMethod::BankTransfer,
            None,
        )
        .unwrap();

        for attempt in 1..=3 {
            payment.start_processing().unwrap();
            let outcome = payment.fail("gateway timeout", &policy).unwrap();
            assert!(matches!(outcome, FailureOutcome::Retrying { attempt: a, .. } if a == attempt));
            assert_eq!(payment.status(), PaymentStatus::Pending);
        }

        payment.start_processing().unwrap();
        assert!(payment.fail("gateway timeout", &policy).unwrap().is_exhausted());
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert!(
            payment
                .failure_reason()
                .unwrap()
                .starts_with("Max retries exceeded")
        );
    }

    #[test]
    fn ledger_caps_refunds_at_the_paid_amount() {
        let payment = completed_payment(Money::ron(dec!(300)).unwrap());
        let reason = || {
            RefundReason::new(
                "Damaged",
                RefundReasonCategory::CustomerRequest,
                "support",
                Utc::now(),
            )
            .unwrap()
        };

        let mut first = Refund::initiate(
            payment.id(),
            payment.order_id(),
            Money::ron(dec!(200)).unwrap(),
            payment.amount(),
            reason(),
        )
        .unwrap();
        first.start_processing().unwrap();

        let refunds = vec![first];
        let ledger = RefundLedger::new(&payment, &refunds);
        assert_eq!(ledger.remaining().unwrap(), Money::ron(dec!(100)).unwrap());
        assert!(ledger.can_refund(&Money::ron(dec!(100)).unwrap()).unwrap());
        assert!(!ledger.can_refund(&Money::ron(dec!(100.01)).unwrap()).unwrap());
    }

    #[test]
    fn refund_cannot_exceed_original_payment() {
        let payment = completed_payment(Money::ron(dec!(50)).unwrap());
        let reason =
            RefundReason::new("Oops", RefundReasonCategory::Error, "support", Utc::now()).unwrap();

        let err = Refund::initiate(
            payment.id(),
            payment.order_id(),
            Money::ron(dec!(60)).unwrap(),
            payment.amount(),
            reason,
        )
        .unwrap_err();
        assert!(matches!(err, PaymentError::RefundExceedsPayment { .. }));
        assert!(payment.pending_events().len() >= 3);
    }
}
