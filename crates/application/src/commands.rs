//! Inputs for the service operations that take more than a couple of fields.

use common::AggregateId;
use domain::order::{OrderItem, PaymentMethod as OrderPaymentMethod};
use domain::payment::{PaymentDetails, PaymentMethod, RefundReasonCategory};
use domain::returns::{ReturnItem, ReturnReason};
use domain::{CustomerId, CustomerInfo, Money, ShippingAddress};

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub customer_info: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: OrderPaymentMethod,
}

impl PlaceOrder {
    pub fn new(
        customer_id: CustomerId,
        customer_info: CustomerInfo,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: OrderPaymentMethod,
    ) -> Self {
        Self {
            customer_id,
            customer_info,
            items,
            shipping_address,
            payment_method,
        }
    }
}

/// Command to charge a customer for an order.
#[derive(Debug, Clone)]
pub struct ProcessPayment {
    pub order_id: AggregateId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<PaymentDetails>,

    /// Used for fraud screening only.
    pub customer_email: String,
}

impl ProcessPayment {
    pub fn new(
        order_id: AggregateId,
        amount: Money,
        payment_method: PaymentMethod,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            amount,
            payment_method,
            payment_details: None,
            customer_email: customer_email.into(),
        }
    }

    pub fn with_details(mut self, details: PaymentDetails) -> Self {
        self.payment_details = Some(details);
        self
    }
}

/// Command to send part or all of a completed payment back.
#[derive(Debug, Clone)]
pub struct RefundPayment {
    pub payment_id: AggregateId,
    pub amount: Money,
    pub reason: String,
    pub category: RefundReasonCategory,
    pub requested_by: String,
}

impl RefundPayment {
    pub fn new(
        payment_id: AggregateId,
        amount: Money,
        reason: impl Into<String>,
        category: RefundReasonCategory,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            payment_id,
            amount,
            reason: reason.into(),
            category,
            requested_by: requested_by.into(),
        }
    }
}

/// Command to open a return for a delivered order.
///
/// Customer details and the delivery date are looked up from the order.
#[derive(Debug, Clone)]
pub struct RequestReturn {
    pub order_id: AggregateId,
    pub items: Vec<ReturnItem>,
    pub reason: ReturnReason,
    pub description: String,

    /// Product category used to pick the return policy.
    pub category: String,
    pub is_vip: bool,
    pub is_custom_product: bool,
}

impl RequestReturn {
    pub fn new(
        order_id: AggregateId,
        items: Vec<ReturnItem>,
        reason: ReturnReason,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            items,
            reason,
            description: description.into(),
            category: category.into(),
            is_vip: false,
            is_custom_product: false,
        }
    }

    pub fn vip(mut self) -> Self {
        self.is_vip = true;
        self
    }

    /// Marks the goods as made to order, which are never returnable.
    pub fn custom_product(mut self) -> Self {
        self.is_custom_product = true;
        self
    }
}
