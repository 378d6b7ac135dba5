//! Order lookups for contexts that only need a summary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{CustomerId, Money, Order, OrderStatus, Shipment};
use store::{Entity, Repository};

use crate::error::Result;
use crate::repository::OrderScopedRepository;

/// The parts of an order the returns context relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    /// Set once the order has been delivered.
    pub delivery_date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OrderDirectory: Send + Sync {
    /// Returns `None` if the order does not exist.
    async fn get_order(&self, order_id: AggregateId) -> Result<Option<OrderSummary>>;
}

/// Builds summaries from the order and shipment repositories.
///
/// The delivery date comes from the order's delivered shipment, falling back
/// to the order's last modification for orders delivered without one.
pub struct RepositoryOrderDirectory {
    orders: Arc<dyn Repository<Order>>,
    shipments: Arc<dyn Repository<Shipment>>,
}

impl RepositoryOrderDirectory {
    pub fn new(orders: Arc<dyn Repository<Order>>, shipments: Arc<dyn Repository<Shipment>>) -> Self {
        Self { orders, shipments }
    }
}

#[async_trait]
impl OrderDirectory for RepositoryOrderDirectory {
    async fn get_order(&self, order_id: AggregateId) -> Result<Option<OrderSummary>> {
        let Some(order) = self.orders.get_by_id(order_id).await? else {
            return Ok(None);
        };

        let delivery_date = if order.status() == OrderStatus::Delivered {
            let shipped = self.shipments.find_by_order_id(order_id).await?;
            shipped
                .iter()
                .filter_map(Shipment::delivered_at)
                .max()
                .or(order.modified_at())
        } else {
            None
        };

        Ok(Some(OrderSummary {
            order_id: order.id(),
            customer_id: order.customer_id(),
            customer_name: order.customer_info().name().to_string(),
            customer_email: order.customer_info().email().to_string(),
            status: order.status(),
            total_amount: order.total_amount(),
            delivery_date,
        }))
    }
}
