//! Value objects for the order context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contact::ShippingAddress;
use crate::ids::{ProductId, UserId};
use crate::money::Money;

use super::OrderError;

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    OnlinePayment,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::OnlinePayment => "OnlinePayment",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item in an order.
///
/// `line_total` is derived from price and quantity and never set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    unit_price: Money,
    line_total: Money,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(OrderError::EmptyProductName);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        if !unit_price.is_positive() {
            return Err(OrderError::InvalidPrice {
                price: unit_price.amount(),
            });
        }
        Ok(Self {
            product_id,
            product_name,
            quantity,
            unit_price,
            line_total: unit_price.times(quantity),
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }
}

/// Why, by whom and when an order was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReason {
    reason: String,
    requested_by: UserId,
    requested_at: DateTime<Utc>,
}

impl CancellationReason {
    pub fn new(reason: impl Into<String>, requested_by: UserId) -> Result<Self, OrderError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(OrderError::ReasonRequired { action: "cancel" });
        }
        Ok(Self {
            reason,
            requested_by,
            requested_at: Utc::now(),
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}

/// The replacement values for a modification. Fields left as `None` keep
/// their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderModification {
    pub items: Option<Vec<OrderItem>>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
}

impl OrderModification {
    pub fn items(mut self, items: Vec<OrderItem>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn shipping_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = Some(address);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_none() && self.shipping_address.is_none() && self.payment_method.is_none()
    }
}

/// One field changed by a modification, with its old and new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field")]
pub enum OrderChange {
    Items {
        old: Vec<OrderItem>,
        new: Vec<OrderItem>,
    },
    ShippingAddress {
        old: ShippingAddress,
        new: ShippingAddress,
    },
    PaymentMethod {
        old: PaymentMethod,
        new: PaymentMethod,
    },
}

impl OrderChange {
    pub fn field(&self) -> &'static str {
        match self {
            OrderChange::Items { .. } => "Items",
            OrderChange::ShippingAddress { .. } => "ShippingAddress",
            OrderChange::PaymentMethod { .. } => "PaymentMethod",
        }
    }
}

/// Free-form change requests recorded before a modification is applied.
pub type RequestedChanges = BTreeMap<String, String>;
