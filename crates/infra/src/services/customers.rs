use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use storefront_customers::{Customer, CustomerId, NewCustomer};
use storefront_sales::Order;

use super::{ServiceError, ServiceResult};
use crate::notification::{EventPublisher, StorefrontEvent};
use crate::store::{PurgeReport, Store};

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
}

impl CustomerService {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Register a customer. Emails are unique (case-insensitive).
    pub async fn register(&self, input: NewCustomer) -> ServiceResult<Customer> {
        let customer = Customer::register(CustomerId::generate(), input, Utc::now())?;
        self.store.insert_customer(&customer).await?;
        info!(customer_id = %customer.id, "customer registered");

        self.publisher.publish(
            customer.id.0,
            "customers.customer",
            1,
            StorefrontEvent::Customer(customer.registered_event()),
        );
        Ok(customer)
    }

    /// Account settings: replace name, email and phone. The same
    /// normalisation and email uniqueness as registration apply.
    pub async fn update(&self, id: CustomerId, input: NewCustomer) -> ServiceResult<Customer> {
        let mut customer = self.get(id).await?;
        customer.update(input)?;
        self.store.update_customer(&customer).await?;
        info!(customer_id = %id, "customer updated");
        Ok(customer)
    }

    pub async fn get(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("customer {id}")))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }

    /// Order history, newest first.
    pub async fn orders(&self, id: CustomerId) -> ServiceResult<Vec<Order>> {
        self.get(id).await?;
        Ok(self.store.list_orders(Some(id)).await?)
    }

    /// Delete the customer with their cart lines and orders.
    pub async fn purge(&self, id: CustomerId) -> ServiceResult<PurgeReport> {
        let report = self.store.purge_customer(id).await?;
        info!(
            customer_id = %id,
            orders = report.orders,
            cart_lines = report.cart_lines,
            "customer purged"
        );
        Ok(report)
    }
}
