//! Service-level tests over the in-memory store.
//!
//! Exercises the full path: service → store commit → event bus → notification worker.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use rust_decimal::Decimal;
    use uuid::Uuid;

    use storefront_catalog::{ProductDetails, ProductId, Season, StockStatus};
    use storefront_core::AggregateRoot;
    use storefront_customers::{CustomerId, NewCustomer};
    use storefront_sales::{Order, OrderStatus};

    use crate::config::AppConfig;
    use crate::notification::{
        EventPublisher, InMemoryNotificationSink, Notification, NotificationWorker, StorefrontBus,
    };
    use crate::services::catalog::NewProduct;
    use crate::services::checkout::{CheckoutItem, CheckoutRequest};
    use crate::services::{ServiceError, Storefront};
    use crate::store::InMemoryStore;

    fn setup() -> (Storefront, Arc<StorefrontBus>) {
        let bus = Arc::new(StorefrontBus::new());
        let store = Arc::new(InMemoryStore::new());
        let storefront = Storefront::new(store, EventPublisher::new(bus.clone()), &AppConfig::default());
        (storefront, bus)
    }

    fn details(name: &str, price: i64) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            local_name: None,
            category: "Vegetables".to_string(),
            price: Decimal::from(price),
            discount: Decimal::ZERO,
            season: Season::All,
        }
    }

    async fn product(sf: &Storefront, name: &str, price: i64, stock: i64) -> ProductId {
        let (product, _) = sf
            .catalog
            .create_product(NewProduct {
                details: details(name, price),
                initial_stock: stock,
            })
            .await
            .unwrap();
        product.id
    }

    async fn customer(sf: &Storefront, email: &str) -> CustomerId {
        sf.customers
            .register(NewCustomer {
                name: "Asha".to_string(),
                email: email.to_string(),
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn stock(sf: &Storefront, id: ProductId) -> i64 {
        sf.catalog.get_stock(id).await.unwrap().inventory.stock_available()
    }

    fn from_cart(customer_id: CustomerId) -> CheckoutRequest {
        CheckoutRequest {
            customer_id,
            items: None,
            payment_method: None,
        }
    }

    fn direct(customer_id: CustomerId, items: &[(ProductId, i64)]) -> CheckoutRequest {
        CheckoutRequest {
            customer_id,
            items: Some(
                items
                    .iter()
                    .map(|&(product_id, quantity)| CheckoutItem { product_id, quantity })
                    .collect(),
            ),
            payment_method: Some("Card".to_string()),
        }
    }

    async fn placed_order(sf: &Storefront) -> Order {
        let c = customer(sf, &format!("{}@example.com", Uuid::now_v7())).await;
        let p = product(sf, "Onion", 10, 100).await;
        sf.checkout.place(direct(c, &[(p, 1)])).await.unwrap()
    }

    #[tokio::test]
    async fn cart_checkout_snapshots_prices_and_consumes_lines() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let a = product(&sf, "Tomato", 120, 10).await;
        let b = product(&sf, "Potato", 80, 10).await;

        sf.carts.add(c, a, 2).await.unwrap();
        sf.carts.add(c, b, 1).await.unwrap();

        let order = sf.checkout.place(from_cart(c)).await.unwrap();

        assert_eq!(order.total_amount(), Decimal::from(320));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_method(), "Cash on Delivery");
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.items()[0].product_name, "Tomato");
        assert_eq!(order.version(), 1);

        assert_eq!(stock(&sf, a).await, 8);
        assert_eq!(stock(&sf, b).await, 9);
        assert!(sf.carts.lines(c).await.unwrap().is_empty());

        let history = sf.customers.orders(c).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id(), order.id());
    }

    #[tokio::test]
    async fn insufficient_stock_has_no_side_effects() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let a = product(&sf, "Tomato", 100, 2).await;
        let b = product(&sf, "Potato", 40, 10).await;

        sf.carts.add(c, b, 1).await.unwrap();
        sf.carts.add(c, a, 3).await.unwrap();

        let err = sf.checkout.place(from_cart(c)).await.unwrap_err();
        match err {
            ServiceError::OutOfStock(e) => {
                assert_eq!(e.product_id, a);
                assert_eq!(e.requested, 3);
                assert_eq!(e.available, 2);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }

        assert_eq!(stock(&sf, a).await, 2);
        assert_eq!(stock(&sf, b).await, 10);
        assert_eq!(sf.carts.lines(c).await.unwrap().len(), 2);
        assert!(sf.orders.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adding_the_same_product_merges_lines() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let a = product(&sf, "Tomato", 100, 10).await;

        let (first, created) = sf.carts.add(c, a, 2).await.unwrap();
        assert!(created);
        let (second, created) = sf.carts.add(c, a, 3).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity.get(), 5);

        let summary = sf.carts.summary(c).await.unwrap();
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.total_quantity, 5);
        assert_eq!(summary.estimated_total, Decimal::from(500));
    }

    #[tokio::test]
    async fn cart_rejects_bad_quantity_and_unknown_references() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let a = product(&sf, "Tomato", 100, 10).await;

        assert!(matches!(
            sf.carts.add(c, a, 0).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            sf.carts.add(c, ProductId::generate(), 1).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            sf.carts.add(CustomerId::generate(), a, 1).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn status_machine_is_enforced() {
        let (sf, _bus) = setup();
        let order = placed_order(&sf).await;
        let id = *order.id();

        let err = sf.orders.deliver(id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));

        sf.orders.confirm(id).await.unwrap();
        sf.orders.ship(id).await.unwrap();
        let delivered = sf.orders.deliver(id).await.unwrap();
        assert_eq!(delivered.status(), OrderStatus::Delivered);
        assert_eq!(delivered.version(), 4);

        let err = sf.orders.cancel(id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
        assert_eq!(sf.orders.get(id).await.unwrap().status(), OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (sf, _bus) = setup();
        let err = sf
            .orders
            .confirm(storefront_sales::OrderId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkouts_never_oversell() {
        let (sf, _bus) = setup();
        let p = product(&sf, "Tomato", 100, 5).await;
        let c1 = customer(&sf, "one@example.com").await;
        let c2 = customer(&sf, "two@example.com").await;

        let sf1 = sf.clone();
        let sf2 = sf.clone();
        let t1 = tokio::spawn(async move { sf1.checkout.place(direct(c1, &[(p, 3)])).await });
        let t2 = tokio::spawn(async move { sf2.checkout.place(direct(c2, &[(p, 3)])).await });
        let results = [t1.await.unwrap(), t2.await.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::OutOfStock(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(stock(&sf, p).await, 2);
        assert_eq!(sf.orders.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_price_change_does_not_touch_placed_orders() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let p = product(&sf, "Tomato", 100, 10).await;
        let order = sf.checkout.place(direct(c, &[(p, 2)])).await.unwrap();

        sf.catalog.update_product(p, details("Tomato", 250)).await.unwrap();

        let reloaded = sf.orders.get(*order.id()).await.unwrap();
        assert_eq!(reloaded.total_amount(), Decimal::from(200));
        assert_eq!(reloaded.items()[0].unit_price, Decimal::from(100));
    }

    #[tokio::test]
    async fn direct_checkout_coalesces_and_rejects_inactive_products() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let p = product(&sf, "Tomato", 100, 10).await;

        let order = sf.checkout.place(direct(c, &[(p, 1), (p, 2)])).await.unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].quantity.get(), 3);
        assert_eq!(order.payment_method(), "Card");

        let outcome = sf.admin.run("deactivate_products", &[*p.as_uuid()]).await.unwrap();
        assert_eq!(outcome.updated, 1);
        let err = sf.checkout.place(direct(c, &[(p, 1)])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(stock(&sf, p).await, 7);
    }

    #[tokio::test]
    async fn empty_cart_and_unknown_customer_are_refused() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;

        let err = sf.checkout.place(from_cart(c)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = sf.checkout.place(from_cart(CustomerId::generate())).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let (sf, _bus) = setup();
        customer(&sf, "asha@example.com").await;
        let err = sf
            .customers
            .register(NewCustomer {
                name: "Other".to_string(),
                email: "ASHA@Example.com".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn customer_update_normalises_and_keeps_emails_unique() {
        let (sf, _bus) = setup();
        customer(&sf, "asha@example.com").await;
        let ravi = customer(&sf, "ravi@example.com").await;

        let updated = sf
            .customers
            .update(
                ravi,
                NewCustomer {
                    name: " Ravi K ".to_string(),
                    email: " Ravi.K@Example.com ".to_string(),
                    phone: Some("080-1234".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ravi K");
        assert_eq!(updated.email, "ravi.k@example.com");
        assert_eq!(sf.customers.get(ravi).await.unwrap(), updated);

        let taken = NewCustomer {
            name: "Ravi".to_string(),
            email: "ASHA@example.com".to_string(),
            phone: None,
        };
        let err = sf.customers.update(ravi, taken.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(sf.customers.get(ravi).await.unwrap().email, "ravi.k@example.com");

        let err = sf.customers.update(CustomerId::generate(), taken).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleted_products_leave_listings_but_keep_order_history() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let p = product(&sf, "Tomato", 120, 10).await;
        let order = sf.checkout.place(direct(c, &[(p, 1)])).await.unwrap();

        let deleted = sf.catalog.delete_product(p).await.unwrap();
        assert!(!deleted.is_active);
        assert!(!sf.catalog.delete_product(p).await.unwrap().is_active);

        let listed = sf.catalog.list_products(&Default::default()).await.unwrap();
        assert!(listed.is_empty());
        let err = sf.checkout.place(direct(c, &[(p, 1)])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let kept = sf.orders.get(*order.id()).await.unwrap();
        assert_eq!(kept.items()[0].product_name, "Tomato");

        let err = sf.catalog.delete_product(ProductId::generate()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn prices_outside_the_stored_range_are_refused() {
        let (sf, _bus) = setup();
        let mut too_big = details("Saffron", 0);
        too_big.price = "50000000000000000000000000000".parse().unwrap();
        let err = sf
            .catalog
            .create_product(NewProduct {
                details: too_big,
                initial_stock: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let p = product(&sf, "Saffron", 9_999_999_999, 10).await;
        let c = customer(&sf, "asha@example.com").await;
        sf.carts.add(c, p, 3).await.unwrap();
        let summary = sf.carts.summary(c).await.unwrap();
        assert_eq!(summary.estimated_total, Decimal::from(29_999_999_997i64));
    }

    #[tokio::test]
    async fn stock_adjustments_are_classified_and_bounded() {
        let (sf, _bus) = setup();
        let p = product(&sf, "Tomato", 100, 60).await;

        assert_eq!(sf.catalog.get_stock(p).await.unwrap().status, StockStatus::InStock);
        let report = sf.catalog.adjust_stock(p, -20).await.unwrap();
        assert_eq!(report.inventory.stock_available(), 40);
        assert_eq!(report.status, StockStatus::LowStock);

        let err = sf.catalog.adjust_stock(p, -41).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
        assert_eq!(stock(&sf, p).await, 40);

        let report = sf.catalog.set_stock(p, 0).await.unwrap();
        assert_eq!(report.status, StockStatus::OutOfStock);
        assert_eq!(sf.catalog.low_stock().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bulk_actions_report_per_id_failures() {
        let (sf, _bus) = setup();
        let order = placed_order(&sf).await;
        let missing = Uuid::now_v7();

        let outcome = sf
            .admin
            .run("mark_confirmed", &[*order.id().as_uuid(), missing])
            .await
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, missing);

        let p = product(&sf, "Tomato", 100, 5).await;
        sf.admin.run("restock_items", &[*p.as_uuid()]).await.unwrap();
        assert_eq!(stock(&sf, p).await, 55);
        sf.admin.run("clear_stock", &[*p.as_uuid()]).await.unwrap();
        assert_eq!(stock(&sf, p).await, 0);

        let c = customer(&sf, "asha@example.com").await;
        let (line, _) = sf.carts.add(c, p, 1).await.unwrap();
        sf.admin.run("increase_quantity", &[*line.id.as_uuid()]).await.unwrap();
        assert_eq!(sf.carts.get_line(line.id).await.unwrap().quantity.get(), 2);

        let err = sf.admin.run("drop_everything", &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn purge_and_reset_report_what_they_removed() {
        let (sf, _bus) = setup();
        let c = customer(&sf, "asha@example.com").await;
        let a = product(&sf, "Tomato", 100, 10).await;
        let b = product(&sf, "Potato", 40, 10).await;
        sf.checkout.place(direct(c, &[(a, 1), (b, 1)])).await.unwrap();
        sf.carts.add(c, a, 1).await.unwrap();

        let purge = sf.customers.purge(c).await.unwrap();
        assert_eq!(purge.customers, 1);
        assert_eq!(purge.orders, 1);
        assert_eq!(purge.order_items, 2);
        assert_eq!(purge.cart_lines, 1);
        assert!(matches!(sf.customers.get(c).await.unwrap_err(), ServiceError::NotFound(_)));

        let err = sf.maintenance.reset_catalog(false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let reset = sf.maintenance.reset_catalog(true).await.unwrap();
        assert_eq!(reset.products, 2);
        assert_eq!(reset.inventory, 2);
        assert!(sf.catalog.categories().await.unwrap().is_empty());
    }

    fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[tokio::test]
    async fn notifications_follow_commits() {
        let (sf, bus) = setup();
        let sink = Arc::new(InMemoryNotificationSink::new());
        let worker = NotificationWorker::spawn(&bus, sink.clone()).unwrap();

        let order = placed_order(&sf).await;
        sf.orders.confirm(*order.id()).await.unwrap();

        assert!(wait_for(|| sink.sent().len() >= 3));
        let sent = sink.sent();
        assert!(matches!(sent[0], Notification::CustomerRegistered { .. }));
        assert_eq!(
            sent[1],
            Notification::OrderCreated {
                order_id: *order.id(),
                total_amount: Decimal::from(10),
            }
        );
        assert_eq!(
            sent[2],
            Notification::StatusChanged {
                order_id: *order.id(),
                from: OrderStatus::Pending,
                to: OrderStatus::Confirmed,
            }
        );
        worker.shutdown();
    }

    #[tokio::test]
    async fn welcome_notification_carries_the_phone_number() {
        let (sf, bus) = setup();
        let sink = Arc::new(InMemoryNotificationSink::new());
        let worker = NotificationWorker::spawn(&bus, sink.clone()).unwrap();

        let registered = sf
            .customers
            .register(NewCustomer {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                phone: Some("080-1234".to_string()),
            })
            .await
            .unwrap();

        assert!(wait_for(|| !sink.sent().is_empty()));
        assert_eq!(
            sink.sent()[0],
            Notification::CustomerRegistered {
                customer_id: registered.id,
                email: "ravi@example.com".to_string(),
                phone: Some("080-1234".to_string()),
            }
        );
        worker.shutdown();
    }

    #[tokio::test]
    async fn failing_sink_does_not_revert_the_order() {
        let (sf, bus) = setup();
        let worker = NotificationWorker::spawn(&bus, Arc::new(InMemoryNotificationSink::failing())).unwrap();

        let order = placed_order(&sf).await;
        let stored = sf.orders.get(*order.id()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Pending);
        worker.shutdown();
    }
}
