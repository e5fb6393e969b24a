//! Reference and collection caches over loaded data.

use pretty_assertions::assert_eq;
use tether_tests::prelude::*;

fn load(c: &mut EntityContainer, records: Vec<EntityRecord>) -> Vec<EntityId> {
    c.load(records, LoadBehavior::default()).unwrap()
}

#[test]
fn test_reference_reads_none_after_clear_and_resolves_after_reload() {
    // GIVEN
    let mut c = EntityContainer::new(sales_registry());
    let ids = load(
        &mut c,
        vec![
            record("Customer", attrs! { "ID" => 5i64 }),
            record("Order", attrs! { "ID" => 1i64, "CustomerID" => 5i64 }),
        ],
    );
    let (customer, order) = (ids[0], ids[1]);
    assert_eq!(c.reference(order, "Customer").unwrap(), Some(customer));

    // WHEN
    c.get_set("Customer").unwrap().clear().unwrap();

    // THEN
    assert_eq!(c.reference(order, "Customer").unwrap(), None);

    // WHEN
    let reloaded = load(&mut c, vec![record("Customer", attrs! { "ID" => 5i64 })]);

    // THEN
    assert_ne!(reloaded[0], customer);
    assert_eq!(c.reference(order, "Customer").unwrap(), Some(reloaded[0]));
}

#[test]
fn test_order_details_follow_key_but_keep_explicit_members() {
    // GIVEN - Order 1 with one loaded detail
    let mut c = EntityContainer::new(sales_registry());
    let ids = load(
        &mut c,
        vec![
            record("Order", attrs! { "ID" => 1i64 }),
            record("Detail", attrs! { "ID" => 10i64, "OrderID" => 1i64 }),
        ],
    );
    let (order, loaded) = (ids[0], ids[1]);
    assert_eq!(c.collection(order, "Details").unwrap(), vec![loaded]);

    let first = c.create("Detail", attrs! { "ID" => 20i64 }).unwrap();
    let second = c.create("Detail", attrs! { "ID" => 21i64 }).unwrap();
    c.add_to_collection(order, "Details", first).unwrap();
    c.add_to_collection(order, "Details", second).unwrap();
    assert_eq!(c.collection(order, "Details").unwrap(), vec![loaded, first, second]);

    // WHEN
    c.set_value(order, "ID", 2i64).unwrap();

    // THEN
    assert_eq!(c.collection(order, "Details").unwrap(), vec![first, second]);
    assert_eq!(c.entity(first).unwrap().state(), EntityState::New);
    assert_eq!(c.entity(loaded).unwrap().state(), EntityState::Unmodified);
}

#[test]
fn test_collection_changes_are_reported_to_observers() {
    // GIVEN
    let mut c = EntityContainer::new(sales_registry());
    let ids = load(&mut c, vec![record("Customer", attrs! { "ID" => 5i64 })]);
    let customer = ids[0];
    let log = EventLog::new();
    c.observe(
        ObserverScope::Association {
            entity: customer,
            name: "Orders".into(),
        },
        log.listener(),
    )
    .unwrap();

    // WHEN
    let orders = load(
        &mut c,
        vec![
            record("Order", attrs! { "ID" => 1i64, "CustomerID" => 5i64 }),
            record("Order", attrs! { "ID" => 2i64, "CustomerID" => 5i64 }),
            record("Order", attrs! { "ID" => 3i64, "CustomerID" => 6i64 }),
        ],
    );
    c.get_set("Order").unwrap().remove(orders[0]).unwrap();

    // THEN
    assert_eq!(
        log.collection_changes(),
        vec![
            (CollectionAction::Add, vec![orders[0], orders[1]]),
            (CollectionAction::Remove, vec![orders[0]]),
        ]
    );
    assert_eq!(c.collection(customer, "Orders").unwrap(), vec![orders[1]]);
}

#[test]
fn test_composite_key_reference_notifies_once_per_change() {
    // GIVEN
    let mut c = EntityContainer::new(composite_registry());
    let ids = load(
        &mut c,
        vec![
            record("Parent", attrs! { "ID1" => 1i64, "ID2" => 2i64 }),
            record("Child", attrs! { "ID" => 7i64, "ParentID1" => 1i64, "ParentID2" => 2i64 }),
        ],
    );
    let (parent, child) = (ids[0], ids[1]);
    assert_eq!(c.reference(child, "Parent").unwrap(), Some(parent));
    let log = EventLog::new();
    c.observe(ObserverScope::Entity(child), log.listener()).unwrap();

    // WHEN - one key part no longer matches
    c.set_value(child, "ParentID2", 99i64).unwrap();

    // THEN
    assert_eq!(c.reference(child, "Parent").unwrap(), None);
    assert_eq!(log.property_changes(child, "Parent"), 1);

    // WHEN - both parts are valid again
    c.set_value(child, "ParentID1", 1i64).unwrap();
    c.set_value(child, "ParentID2", 2i64).unwrap();

    // THEN
    assert_eq!(c.reference(child, "Parent").unwrap(), Some(parent));
    assert_eq!(log.property_changes(child, "Parent"), 2);
}

#[test]
fn test_detached_source_keeps_stale_cache() {
    // GIVEN
    let mut c = EntityContainer::new(sales_registry());
    let ids = load(
        &mut c,
        vec![
            record("Customer", attrs! { "ID" => 5i64 }),
            record("Order", attrs! { "ID" => 1i64, "CustomerID" => 5i64 }),
        ],
    );
    let (customer, order) = (ids[0], ids[1]);
    assert_eq!(c.reference(order, "Customer").unwrap(), Some(customer));
    let subscribed = c.subscription_count();

    // WHEN
    c.get_set("Order").unwrap().detach(order).unwrap();
    c.get_set("Customer").unwrap().clear().unwrap();

    // THEN
    assert!(c.subscription_count() < subscribed);
    assert_eq!(c.reference(order, "Customer").unwrap(), Some(customer));
}

#[test]
fn test_adding_child_to_composite_collection_writes_foreign_key() {
    let mut c = EntityContainer::new(composite_registry());
    let ids = load(
        &mut c,
        vec![record("Parent", attrs! { "ID1" => 3i64, "ID2" => 4i64 })],
    );
    let child = c.create("Child", attrs! { "ID" => 8i64 }).unwrap();

    c.add_to_collection(ids[0], "Children", child).unwrap();

    assert_eq!(c.entity(child).unwrap().state(), EntityState::New);
    assert_eq!(c.value(child, "ParentID1"), Some(&Value::Int(3)));
    assert_eq!(c.value(child, "ParentID2"), Some(&Value::Int(4)));
    assert_eq!(c.reference(child, "Parent").unwrap(), Some(ids[0]));
}
