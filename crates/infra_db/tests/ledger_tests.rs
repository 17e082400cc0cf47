//! PostgreSQL ledger store tests
//!
//! Tests run against PostgreSQL containers (one per test, plus one shared
//! instance), so they need Docker and are ignored by default. Run with `cargo test -p infra_db -- --ignored`.

use std::collections::BTreeSet;

use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::TestRunner;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{CounterpartyId, DocumentId, NomenclatureId, PortError};
use domain_inventory::{
    inventory_on_date, sales_between, Direction, LedgerStore, LedgerTransaction, PostingConfig, PostingError,
    PostingKey, PostingService, DEFAULT_STOCK_ACCOUNT,
};
use infra_db::PostgresLedgerStore;
use test_utils::{
    assert_balance, assert_insufficient_stock, assert_line_cost, assert_money_zero,
    assert_no_negative_balances, create_isolated_test_database, get_shared_test_database,
    movement_sequence_strategy, DateFixtures, IdFixtures, ItemFixtures, LedgerSeeder,
    PriceFixtures, StockMovement, TestDatabase, TestDocumentBuilder,
};

async fn setup() -> (TestDatabase, PostingService<PostgresLedgerStore>) {
    let db = create_isolated_test_database()
        .await
        .expect("test database should start");
    let service = PostingService::new(db.ledger_store(), &PostingConfig::default()).unwrap();
    (db, service)
}

mod store_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_document_round_trips_with_item_names() {
        let (db, _) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;

        let document = seeder
            .document(
                TestDocumentBuilder::purchase()
                    .line(cable, dec!(10), PriceFixtures::gross_12())
                    .line(cable, dec!(1.5), PriceFixtures::gross_16_80())
                    .build(),
            )
            .await;

        let stored = store.get_document(document.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 2);
        assert_eq!(stored.lines[0].line_no, 1);
        assert_eq!(stored.lines[0].item_name.as_deref(), Some("Cable"));
        assert_eq!(stored.lines[1].quantity, dec!(1.5));
        assert_eq!(stored.total_amount.amount(), dec!(121));
        assert!(!stored.is_posted);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_document_with_unknown_item_is_rejected() {
        let (db, _) = setup().await;
        let store = db.ledger_store();

        let document = TestDocumentBuilder::purchase()
            .line(NomenclatureId::new(), dec!(1), PriceFixtures::gross_12())
            .build();
        let result = store.insert_document(&document).await;

        assert!(matches!(result, Err(PortError::Constraint { .. }) | Err(PortError::NotFound { .. })));
        assert!(store.get_document(document.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_upsert_renames_item() {
        let (db, _) = setup().await;
        let store = db.ledger_store();
        let mut cable = ItemFixtures::cable();
        store.upsert_item(&cable).await.unwrap();

        cable.name = "Copper cable".to_string();
        store.upsert_item(&cable).await.unwrap();

        let stored = store.get_item(cable.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Copper cable");
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_outbound_quantity_before_uses_posting_order() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;

        for document in [
            TestDocumentBuilder::purchase().on(DateFixtures::day(1)).line(cable, dec!(20), PriceFixtures::gross_12()),
            TestDocumentBuilder::sale()
                .on(DateFixtures::day(2))
                .with_id(IdFixtures::ordered_document_id(1))
                .line(cable, dec!(3), PriceFixtures::sale_price()),
            TestDocumentBuilder::sale()
                .on(DateFixtures::day(2))
                .with_id(IdFixtures::ordered_document_id(2))
                .line(cable, dec!(4), PriceFixtures::sale_price()),
        ] {
            let document = seeder.document(document.build()).await;
            service.post_document(document.id).await.unwrap();
        }

        let outbound = service.classifier().outbound_types();
        let mut tx = store.begin().await.unwrap();
        let before_second = tx
            .outbound_quantity_before(
                cable,
                PostingKey::new(DateFixtures::day(2), IdFixtures::ordered_document_id(2)),
                &outbound,
            )
            .await
            .unwrap();
        let before_later_day = tx
            .outbound_quantity_before(cable, PostingKey::new(DateFixtures::day(3), DocumentId::new()), &outbound)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(before_second, dec!(3));
        assert_eq!(before_later_day, dec!(7));
    }
}

mod posting_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_fifo_sale_across_two_batches() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;

        let first = seeder
            .document(TestDocumentBuilder::purchase().on(DateFixtures::day(1)).line(cable, dec!(10), PriceFixtures::gross_12()).build())
            .await;
        let second = seeder
            .document(TestDocumentBuilder::purchase().on(DateFixtures::day(2)).line(cable, dec!(5), PriceFixtures::gross_16_80()).build())
            .await;
        let sale = seeder
            .document(TestDocumentBuilder::sale().on(DateFixtures::day(3)).line(cable, dec!(12), PriceFixtures::sale_price()).build())
            .await;

        service.post_document(first.id).await.unwrap();
        service.post_document(second.id).await.unwrap();
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(15), dec!(170)).await;

        let receipt = service.post_document(sale.id).await.unwrap();
        assert_eq!(receipt.direction, Direction::Outbound);
        assert_line_cost(&receipt, 0, dec!(128));
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(3), dec!(42)).await;

        let stored = store.get_document(sale.id).await.unwrap().unwrap();
        assert!(stored.is_posted);
        assert!(stored.last_updated.is_some());
        assert_eq!(stored.lines[0].total_cost.map(|c| c.amount()), Some(dec!(128)));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_insufficient_stock_rolls_back_everything() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;
        let plug = seeder.item(ItemFixtures::plug()).await;

        for item in [cable, plug] {
            let purchase = seeder
                .document(TestDocumentBuilder::purchase().line(item, dec!(15), PriceFixtures::gross_12()).build())
                .await;
            service.post_document(purchase.id).await.unwrap();
        }

        // The plug line is fine, the cable line is not; neither may stick.
        let sale = seeder
            .document(
                TestDocumentBuilder::sale()
                    .on(DateFixtures::day(2))
                    .line(plug, dec!(5), PriceFixtures::sale_price())
                    .line(cable, dec!(50), PriceFixtures::sale_price())
                    .build(),
            )
            .await;

        let result = service.post_document(sale.id).await;
        assert_insufficient_stock(&result, dec!(15), dec!(50));

        assert_balance(&store, plug, DEFAULT_STOCK_ACCOUNT, dec!(15), dec!(150)).await;
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(15), dec!(150)).await;
        let stored = store.get_document(sale.id).await.unwrap().unwrap();
        assert!(!stored.is_posted);
        assert!(stored.lines.iter().all(|l| l.total_cost.is_none()));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_selling_everything_leaves_zero_value() {
        let db = get_shared_test_database().await;
        db.clear_data().await.unwrap();
        let store = db.ledger_store();
        let service = PostingService::new(store.clone(), &PostingConfig::default()).unwrap();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;

        for document in [
            TestDocumentBuilder::purchase().on(DateFixtures::day(1)).line(cable, dec!(3), PriceFixtures::gross_12()),
            TestDocumentBuilder::purchase().on(DateFixtures::day(2)).line(cable, dec!(0.5), PriceFixtures::gross_16_80()),
            TestDocumentBuilder::sale().on(DateFixtures::day(3)).line(cable, dec!(3.5), PriceFixtures::sale_price()),
        ] {
            let document = seeder.document(document.build()).await;
            service.post_document(document.id).await.unwrap();
        }

        let balance = store.get_balance(cable, DEFAULT_STOCK_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(balance.quantity, Decimal::ZERO);
        assert_money_zero(&balance.total_amount);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_second_posting_is_rejected() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;
        let purchase = seeder
            .document(TestDocumentBuilder::purchase().line(cable, dec!(2), PriceFixtures::gross_12()).build())
            .await;

        service.post_document(purchase.id).await.unwrap();
        let again = service.post_document(purchase.id).await;

        assert!(matches!(again, Err(PostingError::AlreadyPosted(id)) if id == purchase.id));
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(2), dec!(20)).await;
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_missing_document() {
        let (_db, service) = setup().await;
        let missing = DocumentId::new();

        let result = service.post_document(missing).await;
        assert!(matches!(result, Err(PostingError::DocumentNotFound(id)) if id == missing));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_generated_sequence_never_goes_negative() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let item = seeder.item(ItemFixtures::random()).await;

        let mut runner = TestRunner::deterministic();
        let movements = movement_sequence_strategy(20)
            .new_tree(&mut runner)
            .expect("strategy should generate a value")
            .current();

        let mut expected = Decimal::ZERO;
        for (n, movement) in movements.iter().enumerate() {
            let builder = match movement {
                StockMovement::Purchase { quantity, gross_price } => {
                    TestDocumentBuilder::purchase().line(item, *quantity, *gross_price)
                }
                StockMovement::Sale { quantity } => {
                    TestDocumentBuilder::sale().line(item, *quantity, PriceFixtures::sale_price())
                }
            };
            let document = seeder
                .document(builder.on(DateFixtures::day(1) + chrono::Duration::minutes(n as i64)).build())
                .await;

            let quantity = movement.quantity();
            match (movement, service.post_document(document.id).await) {
                (StockMovement::Purchase { .. }, Ok(_)) => expected += quantity,
                (StockMovement::Sale { .. }, Ok(_)) => expected -= quantity,
                (StockMovement::Sale { .. }, Err(PostingError::InsufficientStock { .. })) => {}
                (_, Err(other)) => panic!("unexpected posting failure: {}", other),
            }
        }

        let balances = store.list_balances().await.unwrap();
        assert_no_negative_balances(&balances);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].quantity, expected);
    }
}

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Docker"]
    async fn test_concurrent_sales_never_oversell() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;

        let purchase = seeder
            .document(TestDocumentBuilder::purchase().line(cable, dec!(10), PriceFixtures::gross_12()).build())
            .await;
        service.post_document(purchase.id).await.unwrap();

        let mut sales = Vec::new();
        for n in 0..4 {
            let sale = seeder
                .document(
                    TestDocumentBuilder::sale()
                        .on(DateFixtures::day(2))
                        .with_id(IdFixtures::ordered_document_id(100 + n))
                        .line(cable, dec!(4), PriceFixtures::sale_price())
                        .build(),
                )
                .await;
            sales.push(sale.id);
        }

        let handles: Vec<_> = sales
            .into_iter()
            .map(|id| {
                let service = service.clone();
                tokio::spawn(async move { service.post_document(id).await })
            })
            .collect();

        let mut posted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => posted += 1,
                Err(PostingError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected posting failure: {}", other),
            }
        }

        assert_eq!(posted, 2);
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(2), dec!(20)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Docker"]
    async fn test_same_document_posted_concurrently_applies_once() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;
        let purchase = seeder
            .document(TestDocumentBuilder::purchase().line(cable, dec!(7), PriceFixtures::gross_12()).build())
            .await;

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                let id = purchase.id;
                tokio::spawn(async move { service.post_document(id).await })
            })
            .collect();

        let mut outcomes = BTreeSet::new();
        for handle in handles {
            outcomes.insert(match handle.await.unwrap() {
                Ok(_) => "posted",
                Err(PostingError::AlreadyPosted(_)) => "already_posted",
                Err(other) => panic!("unexpected posting failure: {}", other),
            });
        }

        assert!(outcomes.contains("posted"));
        assert_balance(&store, cable, DEFAULT_STOCK_ACCOUNT, dec!(7), dec!(70)).await;
    }
}

mod report_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_report_matches_balances() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;
        let plug = seeder.item(ItemFixtures::plug()).await;

        for document in [
            TestDocumentBuilder::purchase().on(DateFixtures::day(1)).line(cable, dec!(10), PriceFixtures::gross_12()),
            TestDocumentBuilder::purchase().on(DateFixtures::day(2)).line(plug, dec!(5), PriceFixtures::gross_16_80()),
            TestDocumentBuilder::sale().on(DateFixtures::day(4)).line(cable, dec!(4), PriceFixtures::sale_price()),
        ] {
            let document = seeder.document(document.build()).await;
            service.post_document(document.id).await.unwrap();
        }

        let positions = inventory_on_date(&store, service.classifier(), DateFixtures::report_date(4))
            .await
            .unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].item_name, "Cable");
        assert_eq!(positions[0].quantity, dec!(6));
        assert_eq!(positions[0].value.amount(), dec!(60));
        assert_eq!(positions[1].item_name, "Plug");
        assert_eq!(positions[1].value.amount(), dec!(70));

        let early = inventory_on_date(&store, service.classifier(), DateFixtures::report_date(1))
            .await
            .unwrap();
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].quantity, dec!(10));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_sales_report_reads_posted_sales_in_period() {
        let (db, service) = setup().await;
        let store = db.ledger_store();
        let seeder = LedgerSeeder::new(&store);
        let cable = seeder.item(ItemFixtures::cable()).await;
        let customer = CounterpartyId::new();

        let purchase = seeder
            .document(TestDocumentBuilder::purchase().line(cable, dec!(10), PriceFixtures::gross_12()).build())
            .await;
        let sale = seeder
            .document(
                TestDocumentBuilder::sale()
                    .on(DateFixtures::day(3))
                    .counterparty(customer)
                    .line(cable, dec!(4), PriceFixtures::sale_price())
                    .build(),
            )
            .await;
        let later_sale = seeder
            .document(TestDocumentBuilder::sale().on(DateFixtures::day(9)).line(cable, dec!(1), PriceFixtures::sale_price()).build())
            .await;
        for id in [purchase.id, sale.id, later_sale.id] {
            service.post_document(id).await.unwrap();
        }

        let report = sales_between(
            &store,
            service.classifier(),
            DateFixtures::report_date(1),
            DateFixtures::report_date(5),
        )
        .await
        .unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].document_id, sale.id);
        assert_eq!(report[0].counterparty_id, Some(customer));
        assert_eq!(report[0].item_name, "Cable");
        assert_eq!(report[0].quantity, dec!(4));
        assert_eq!(report[0].revenue.amount(), dec!(100));
    }
}
