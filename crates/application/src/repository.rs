//! Secondary lookups over the aggregate repositories.

use async_trait::async_trait;
use common::AggregateId;
use domain::{Payment, Refund, Return, Shipment};
use store::{Entity, Repository};

/// An aggregate that belongs to exactly one order.
pub trait OrderScoped: Entity {
    fn order_id(&self) -> AggregateId;
}

impl OrderScoped for Payment {
    fn order_id(&self) -> AggregateId {
        Payment::order_id(self)
    }
}

impl OrderScoped for Refund {
    fn order_id(&self) -> AggregateId {
        Refund::order_id(self)
    }
}

impl OrderScoped for Return {
    fn order_id(&self) -> AggregateId {
        Return::order_id(self)
    }
}

impl OrderScoped for Shipment {
    fn order_id(&self) -> AggregateId {
        Shipment::order_id(self)
    }
}

/// `find_by_order_id` for any repository of order-scoped aggregates.
#[async_trait]
pub trait OrderScopedRepository<E: OrderScoped> {
    async fn find_by_order_id(&self, order_id: AggregateId) -> store::Result<Vec<E>>;
}

#[async_trait]
impl<E, R> OrderScopedRepository<E> for R
where
    E: OrderScoped,
    R: Repository<E> + ?Sized,
{
    async fn find_by_order_id(&self, order_id: AggregateId) -> store::Result<Vec<E>> {
        self.find(&move |entity: &E| entity.order_id() == order_id)
            .await
    }
}

/// Every refund issued against `payment_id`.
pub async fn find_refunds_by_payment_id(
    refunds: &dyn Repository<Refund>,
    payment_id: AggregateId,
) -> store::Result<Vec<Refund>> {
    refunds
        .find(&move |refund: &Refund| refund.payment_id() == payment_id)
        .await
}
