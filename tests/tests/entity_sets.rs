//! Entity sets, identity and change tracking.

use pretty_assertions::assert_eq;
use tether_tests::prelude::*;

fn container() -> EntityContainer {
    EntityContainer::new(sales_registry())
}

#[test]
fn test_adding_same_key_twice_fails_with_duplicate_key() {
    // GIVEN
    let mut c = container();
    let first = c.create("Customer", attrs! { "ID" => 1i64 }).unwrap();
    let second = c.create("Customer", attrs! { "ID" => 1i64 }).unwrap();
    c.get_set("Customer").unwrap().add(first).unwrap();

    // WHEN
    let again = c.get_set("Customer").unwrap().add(first);
    let same_key = c.get_set("Customer").unwrap().add(second);

    // THEN
    assert!(matches!(again, Err(GraphError::DuplicateKey { .. })));
    assert!(matches!(same_key, Err(GraphError::DuplicateKey { .. })));
    assert_eq!(c.set("Customer").unwrap().len(), 1);
    assert_eq!(c.entity(second).unwrap().state(), EntityState::Detached);
}

#[test]
fn test_removing_absent_entities_is_a_noop() {
    let mut c = container();
    let never_added = c.create("Customer", attrs! { "ID" => 1i64 }).unwrap();

    c.get_set("Customer").unwrap().remove(never_added).unwrap();
    c.get_set("Customer").unwrap().detach(never_added).unwrap();

    assert_eq!(c.entity(never_added).unwrap().state(), EntityState::Detached);
    assert!(!c.has_changes());
}

#[test]
fn test_lookup_by_key_follows_key_changes() {
    // GIVEN
    let mut c = container();
    let ids = c
        .load(
            vec![record("Customer", attrs! { "ID" => 1i64, "Name" => "Ada" })],
            LoadBehavior::default(),
        )
        .unwrap();

    // WHEN
    c.set_value(ids[0], "ID", 2i64).unwrap();

    // THEN
    assert_eq!(c.find("Customer", &EntityKey::new(vec![Value::Int(1)])), None);
    assert_eq!(c.find("Customer", &EntityKey::new(vec![Value::Int(2)])), Some(ids[0]));
    assert_eq!(c.entity(ids[0]).unwrap().modified_members(), vec!["ID"]);
}

#[test]
fn test_merge_into_current_keeps_local_edits() {
    // GIVEN
    let mut c = container();
    let ids = c
        .load(
            vec![record("Order", attrs! { "ID" => 1i64, "Name" => "draft", "Stamp" => 1i64 })],
            LoadBehavior::default(),
        )
        .unwrap();
    c.set_value(ids[0], "Name", "mine").unwrap();

    // WHEN
    c.load(
        vec![record("Order", attrs! { "ID" => 1i64, "Name" => "theirs", "Stamp" => 2i64 })],
        LoadBehavior::MergeIntoCurrent,
    )
    .unwrap();

    // THEN
    let order = c.entity(ids[0]).unwrap();
    assert_eq!(order.get("Name"), Some(&Value::from("mine")));
    assert_eq!(order.get("Stamp"), Some(&Value::Int(2)));
    assert_eq!(order.state(), EntityState::Modified);
    assert_eq!(order.original_value("Name"), Some(&Value::from("theirs")));
}

#[test]
fn test_refresh_current_discards_local_edits() {
    let mut c = container();
    let ids = c
        .load(
            vec![record("Order", attrs! { "ID" => 1i64, "Name" => "draft" })],
            LoadBehavior::default(),
        )
        .unwrap();
    c.set_value(ids[0], "Name", "mine").unwrap();

    c.load(
        vec![record("Order", attrs! { "ID" => 1i64, "Name" => "theirs" })],
        LoadBehavior::RefreshCurrent,
    )
    .unwrap();

    let order = c.entity(ids[0]).unwrap();
    assert_eq!(order.get("Name"), Some(&Value::from("theirs")));
    assert_eq!(order.state(), EntityState::Unmodified);
}

#[test]
fn test_load_never_resurrects_deleted_entities() {
    let mut c = container();
    let ids = c
        .load(vec![record("Customer", attrs! { "ID" => 1i64 })], LoadBehavior::default())
        .unwrap();
    c.get_set("Customer").unwrap().remove(ids[0]).unwrap();

    let reloaded = c
        .load(
            vec![record("Customer", attrs! { "ID" => 1i64 })],
            LoadBehavior::RefreshCurrent,
        )
        .unwrap();

    assert!(reloaded.is_empty());
    assert_eq!(c.entity(ids[0]).unwrap().state(), EntityState::Deleted);
}

#[test]
fn test_reject_changes_restores_every_entity() {
    // GIVEN
    let mut c = container();
    let ids = c
        .load(
            vec![
                record("Customer", attrs! { "ID" => 1i64, "Name" => "Ada" }),
                record("Customer", attrs! { "ID" => 2i64, "Name" => "Grace" }),
            ],
            LoadBehavior::default(),
        )
        .unwrap();
    c.set_value(ids[0], "Name", "Lovelace").unwrap();
    c.get_set("Customer").unwrap().remove(ids[1]).unwrap();
    let added = c.create("Customer", attrs! { "ID" => 3i64 }).unwrap();
    c.get_set("Customer").unwrap().add(added).unwrap();
    assert_eq!(c.get_changes().len(), 3);

    // WHEN
    c.reject_changes().unwrap();

    // THEN
    assert!(!c.has_changes());
    assert_eq!(c.value(ids[0], "Name"), Some(&Value::from("Ada")));
    assert_eq!(c.entity(ids[1]).unwrap().state(), EntityState::Unmodified);
    assert_eq!(c.entity(added).unwrap().state(), EntityState::Detached);
    assert_eq!(c.set("Customer").unwrap().len(), 2);
}

#[test]
fn test_set_notifications_batch_per_load() {
    // GIVEN
    let mut c = container();
    let type_id = c.get_set("Customer").unwrap().type_id();
    let log = EventLog::new();
    c.observe(ObserverScope::Set(type_id), log.listener()).unwrap();

    // WHEN
    let ids = c
        .load(
            vec![
                record("Customer", attrs! { "ID" => 1i64 }),
                record("Customer", attrs! { "ID" => 2i64 }),
            ],
            LoadBehavior::default(),
        )
        .unwrap();

    // THEN
    assert_eq!(log.collection_changes(), vec![(CollectionAction::Add, ids)]);
}
