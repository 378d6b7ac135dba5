//! Wiring of services over shared repositories and one event log.

use std::sync::Arc;

use domain::returns::PolicyService;
use domain::{InventoryItem, Order, Payment, Refund, Return, Shipment};
use store::{EventLog, InMemoryEventLog, InMemoryRepository, Repository};

use crate::collaborators::{
    FraudDetection, InMemoryFraudDetection, InMemoryPaymentGateway, PaymentGateway,
    RepositoryOrderDirectory,
};
use crate::config::Config;
use crate::handler::CommandHandler;
use crate::services::{
    InventoryService, OrderService, PaymentService, ReturnService, ShippingService,
};
use crate::sweeper::ReservationSweeper;

/// Every service of the fulfillment system.
pub struct Fulfillment {
    pub inventory: InventoryService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub returns: ReturnService,
    pub shipping: ShippingService,
    pub sweeper: ReservationSweeper,
}

/// Handles on the in-memory collaborators, for inspection and scripting.
pub struct InMemoryBackends {
    pub events: Arc<InMemoryEventLog>,
    pub gateway: InMemoryPaymentGateway,
    pub fraud: InMemoryFraudDetection,
}

impl Fulfillment {
    /// Builds the services over in-memory storage and collaborators.
    pub fn in_memory(config: &Config) -> (Self, InMemoryBackends) {
        let events = Arc::new(InMemoryEventLog::new());
        let gateway = InMemoryPaymentGateway::new();
        let fraud = InMemoryFraudDetection::new();

        let fulfillment = Self::with_backends(
            config,
            events.clone(),
            Arc::new(gateway.clone()),
            Arc::new(fraud.clone()),
        );
        (
            fulfillment,
            InMemoryBackends {
                events,
                gateway,
                fraud,
            },
        )
    }

    /// Builds the services over in-memory storage with the given event log
    /// and external collaborators.
    pub fn with_backends(
        config: &Config,
        events: Arc<dyn EventLog>,
        gateway: Arc<dyn PaymentGateway>,
        fraud: Arc<dyn FraudDetection>,
    ) -> Self {
        let inventory_repo: Arc<dyn Repository<InventoryItem>> =
            Arc::new(InMemoryRepository::<InventoryItem>::new());
        let order_repo: Arc<dyn Repository<Order>> = Arc::new(InMemoryRepository::<Order>::new());
        let payment_repo: Arc<dyn Repository<Payment>> =
            Arc::new(InMemoryRepository::<Payment>::new());
        let refund_repo: Arc<dyn Repository<Refund>> =
            Arc::new(InMemoryRepository::<Refund>::new());
        let return_repo: Arc<dyn Repository<Return>> =
            Arc::new(InMemoryRepository::<Return>::new());
        let shipment_repo: Arc<dyn Repository<Shipment>> =
            Arc::new(InMemoryRepository::<Shipment>::new());

        let inventory_handler = CommandHandler::new(inventory_repo, events.clone());
        let directory = Arc::new(RepositoryOrderDirectory::new(
            order_repo.clone(),
            shipment_repo.clone(),
        ));

        Self {
            inventory: InventoryService::new(inventory_handler.clone(), config.reservation_ttl()),
            orders: OrderService::new(CommandHandler::new(order_repo, events.clone())),
            payments: PaymentService::new(
                CommandHandler::new(payment_repo, events.clone()),
                CommandHandler::new(refund_repo, events.clone()),
                gateway,
                fraud,
                config.retry_policy(),
            ),
            returns: ReturnService::new(
                CommandHandler::new(return_repo, events.clone()),
                directory,
                PolicyService::new(),
            ),
            shipping: ShippingService::new(CommandHandler::new(shipment_repo, events)),
            sweeper: ReservationSweeper::new(inventory_handler),
        }
    }
}
