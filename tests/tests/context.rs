//! Load, edit and submit through a domain context.

use pretty_assertions::assert_eq;
use std::thread;
use tether_tests::prelude::*;

fn key(id: i64) -> EntityKey {
    EntityKey::new(vec![Value::Int(id)])
}

/// Load Order 1 for customer 5 with one detail, and return the order.
fn load_order(ctx: &mut DomainContext<MockClient>) -> EntityId {
    let op = ctx
        .load(EntityQuery::new("GetOrders", "Order"), None, CallOptions::new())
        .unwrap();
    ctx.client().reply_query(Ok(QueryResponse::new(vec![record(
        "Order",
        attrs! { "ID" => 1i64, "CustomerID" => 5i64, "Name" => "first" },
    )])
    .with_included(vec![
        record("Customer", attrs! { "ID" => 5i64, "Name" => "Ada" }),
        record("Detail", attrs! { "ID" => 10i64, "OrderID" => 1i64, "Quantity" => 1i64 }),
    ])
    .with_total_count(1)));
    assert!(ctx.process_completions().is_empty());
    assert_eq!(op.status(), OperationStatus::Succeeded);
    op.value().unwrap().entities[0]
}

#[test]
fn test_load_reports_roots_included_and_count() {
    init_tracing();
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let op = ctx
        .load(
            EntityQuery::new("GetOrders", "Order").with_total_count(),
            None,
            CallOptions::new(),
        )
        .unwrap();

    ctx.client().reply_query(Ok(QueryResponse::new(vec![record(
        "Order",
        attrs! { "ID" => 1i64, "CustomerID" => 5i64 },
    )])
    .with_included(vec![record("Customer", attrs! { "ID" => 5i64 })])
    .with_total_count(40)));
    ctx.process_completions();

    let result = op.value().unwrap();
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.all_entities.len(), 2);
    assert_eq!(result.total_count, 40);
    let order = result.entities[0];
    let customer = ctx.container().find("Customer", &key(5));
    assert_eq!(ctx.container_mut().reference(order, "Customer").unwrap(), customer);
    assert!(matches!(
        &ctx.client().requests()[0],
        Request::Query(q) if q.include_total_count
    ));
}

#[test]
fn test_submit_round_trip_merges_server_values() {
    // GIVEN - an edited order and a new detail
    init_tracing();
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let order = load_order(&mut ctx);
    let c = ctx.container_mut();
    c.set_value(order, "Name", "second").unwrap();
    let detail = c
        .create("Detail", attrs! { "ID" => 11i64, "Quantity" => 2i64 })
        .unwrap();
    c.add_to_collection(order, "Details", detail).unwrap();
    c.set_value(detail, "OrderID", 1i64).unwrap();

    // WHEN
    let op = ctx.submit_changes(CallOptions::new()).unwrap();
    let sent = ctx.client().last_submit().unwrap();
    let ops: Vec<_> = sent.entries().iter().map(|e| (e.entity, e.operation)).collect();
    assert_eq!(
        ops,
        vec![(detail, EntityOperation::Insert), (order, EntityOperation::Update)]
    );
    let order_entry = sent.entry_for(order).unwrap();
    assert_eq!(order_entry.associations.get("Details").map(Vec::len), Some(1));

    ctx.client().reply_submit(Ok(SubmitResponse {
        results: vec![EntryResult::new(order_entry.id).with_current(attrs! { "Stamp" => 77i64 })],
    }));
    let errors = ctx.process_completions();

    // THEN
    assert!(errors.is_empty());
    assert_eq!(op.status(), OperationStatus::Succeeded);
    assert_eq!(op.value().unwrap(), sent);
    let c = ctx.container();
    assert_eq!(c.value(order, "Stamp"), Some(&Value::Int(77)));
    assert_eq!(c.entity(order).unwrap().state(), EntityState::Unmodified);
    assert_eq!(c.entity(detail).unwrap().state(), EntityState::Unmodified);
    assert!(!ctx.has_changes());
}

#[test]
fn test_conflict_keeps_changes_until_resolved() {
    // GIVEN
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let order = load_order(&mut ctx);
    ctx.container_mut().set_value(order, "Name", "mine").unwrap();
    let op = ctx.submit_changes(CallOptions::new()).unwrap();
    let entry = ctx.client().last_submit().unwrap().entries()[0].id;

    // WHEN
    ctx.client().reply_submit(Ok(SubmitResponse {
        results: vec![EntryResult::new(entry).with_conflict(ConflictInfo {
            members: ["Name".to_string()].into_iter().collect(),
            store: Some(attrs! { "ID" => 1i64, "CustomerID" => 5i64, "Name" => "theirs" }),
            is_deleted: false,
        })],
    }));
    let errors = ctx.process_completions();

    // THEN
    assert_eq!(errors.len(), 1);
    let unhandled = errors[0].as_unhandled().unwrap();
    assert_eq!(unhandled.kind, OperationKind::Submit);
    assert!(matches!(unhandled.fault, Fault::ConflictDetected(ref r) if r[0].applies_to("Name")));
    assert_eq!(op.status(), OperationStatus::Faulted);
    let entity = ctx.container().entity(order).unwrap();
    assert_eq!(entity.state(), EntityState::Modified);
    assert_eq!(entity.conflict().unwrap().members.len(), 1);

    // WHEN - rebase and retry
    ctx.container_mut().resolve_conflict(order).unwrap();
    op.mark_error_handled().unwrap();
    let retry = ctx.submit_changes(CallOptions::new()).unwrap();
    let resent = ctx.client().last_submit().unwrap();
    ctx.client().reply_submit(Ok(SubmitResponse::default()));
    let errors = ctx.process_completions();

    // THEN
    let original = resent.entries()[0].original.as_ref().unwrap();
    assert_eq!(original.get("Name"), Some(&Value::from("theirs")));
    assert!(errors.is_empty());
    assert_eq!(retry.status(), OperationStatus::Succeeded);
    assert_eq!(ctx.container().value(order, "Name"), Some(&Value::from("mine")));
    assert!(ctx.container().entity(order).unwrap().conflict().is_none());
}

#[test]
fn test_validation_errors_land_on_entities() {
    // GIVEN - the callback inspects and handles the fault
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let order = load_order(&mut ctx);
    ctx.container_mut().set_value(order, "Name", "").unwrap();
    let options = CallOptions::new().callback(|op: &SubmitOperation| {
        op.mark_error_handled()
            .map_err(|e| CallbackError::new(e.to_string()))
    });
    let op = ctx.submit_changes(options).unwrap();

    // WHEN
    let required = ValidationResult::new("Name is required").with_member("Name");
    let entity_level = ValidationResult::new("Order cannot be saved").with_code(3);
    ctx.client().reply_submit(Ok(SubmitResponse {
        results: vec![EntryResult::new(0)
            .with_error(required.clone())
            .with_error(entity_level.clone())],
    }));
    let errors = ctx.process_completions();

    // THEN
    assert!(errors.is_empty());
    assert_eq!(
        op.fault(),
        Some(Fault::ValidationFailed(vec![required.clone(), entity_level.clone()]))
    );
    let entity = ctx.container().entity(order).unwrap();
    assert_eq!(entity.member_errors("Name").cloned().collect::<Vec<_>>(), vec![required]);
    assert_eq!(entity.entity_errors().cloned().collect::<Vec<_>>(), vec![entity_level]);
    assert_eq!(entity.state(), EntityState::Modified);
}

#[test]
fn test_reply_from_another_thread_completes_on_owner() {
    // GIVEN
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let op = ctx
        .load(EntityQuery::new("GetCustomers", "Customer"), None, CallOptions::new())
        .unwrap();
    let sender = ctx.client().take_query().unwrap();

    // WHEN
    thread::spawn(move || {
        let response = QueryResponse::new(vec![record("Customer", attrs! { "ID" => 9i64 })]);
        sender.send(Ok(response)).unwrap();
    })
    .join()
    .unwrap();

    // THEN - nothing happens until the owner drains completions
    assert_eq!(op.status(), OperationStatus::Pending);
    assert!(ctx.container().find("Customer", &key(9)).is_none());
    assert!(ctx.process_completions().is_empty());
    assert_eq!(op.status(), OperationStatus::Succeeded);
    assert!(ctx.container().find("Customer", &key(9)).is_some());
}

#[test]
fn test_canceled_load_ignores_late_reply() {
    let mut ctx = context(MockClient::cancellable(), ContextConfig::default());
    let op = ctx
        .load(EntityQuery::new("GetCustomers", "Customer"), None, CallOptions::new())
        .unwrap();

    op.cancel().unwrap();
    assert!(ctx.client().query_canceled());
    assert_eq!(op.status(), OperationStatus::Canceling);
    ctx.client()
        .reply_query(Ok(QueryResponse::new(vec![record("Customer", attrs! { "ID" => 9i64 })])));
    let errors = ctx.process_completions();

    assert!(errors.is_empty());
    assert!(op.is_canceled());
    assert!(ctx.container().find("Customer", &key(9)).is_none());
    assert!(!ctx.is_loading());
}

#[test]
fn test_dropped_transport_faults_pending_operations() {
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let load = ctx
        .load(EntityQuery::new("GetCustomers", "Customer"), None, CallOptions::new())
        .unwrap();
    let invoke = ctx
        .invoke(Invocation::new("Recalculate").with_side_effects(), CallOptions::new())
        .unwrap();

    ctx.client().drop_all();
    let errors = ctx.process_completions();

    assert_eq!(errors.len(), 2);
    for fault in [load.fault().unwrap(), invoke.fault().unwrap()] {
        assert_eq!(fault.as_remote().map(|f| f.status), Some(0));
    }
    assert!(!ctx.has_pending());
}

#[test]
fn test_submit_rules() {
    let config = ContextConfig::from_json(r#"{ "require_error_review": true }"#).unwrap();
    let mut ctx = context(MockClient::new(), config);

    let empty = ctx.submit_changes(CallOptions::new()).unwrap();
    assert_eq!(empty.status(), OperationStatus::Succeeded);
    assert!(ctx.client().requests().is_empty());

    let order = load_order(&mut ctx);
    ctx.container_mut().set_value(order, "Name", "x").unwrap();
    let first = ctx.submit_changes(CallOptions::new()).unwrap();
    assert!(matches!(
        ctx.submit_changes(CallOptions::new()),
        Err(ContextError::SubmitInProgress)
    ));

    ctx.client().reply_submit(Err(RemoteFault::new(500, 0, "boom")));
    assert_eq!(ctx.process_completions().len(), 1);
    assert!(matches!(
        ctx.submit_changes(CallOptions::new()),
        Err(ContextError::UnreviewedSubmitError)
    ));

    first.mark_error_handled().unwrap();
    ctx.reject_changes().unwrap();
    assert!(!ctx.has_changes());
    assert_eq!(ctx.container().value(order, "Name"), Some(&Value::from("first")));
}

#[test]
fn test_edit_during_submit_stays_pending() {
    // GIVEN - a submit in flight
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let order = load_order(&mut ctx);
    ctx.container_mut().set_value(order, "Name", "second").unwrap();
    let op = ctx.submit_changes(CallOptions::new()).unwrap();

    // WHEN - the order is edited again before the reply
    ctx.container_mut().set_value(order, "Name", "third").unwrap();
    ctx.client().reply_submit(Ok(SubmitResponse::default()));
    assert!(ctx.process_completions().is_empty());

    // THEN
    assert_eq!(op.status(), OperationStatus::Succeeded);
    assert!(ctx.has_changes());
    let entity = ctx.container().entity(order).unwrap();
    assert_eq!(entity.state(), EntityState::Modified);
    assert_eq!(entity.original_value("Name"), Some(&Value::from("second")));

    // WHEN - the later edit is submitted
    ctx.submit_changes(CallOptions::new()).unwrap();
    let resent = ctx.client().last_submit().unwrap();

    // THEN
    let entry = &resent.entries()[0];
    assert_eq!(entry.operation, EntityOperation::Update);
    assert_eq!(entry.current.get("Name"), Some(&Value::from("third")));
}

#[test]
fn test_removal_during_submit_is_sent_as_delete() {
    // GIVEN
    let mut ctx = context(MockClient::new(), ContextConfig::default());
    let order = load_order(&mut ctx);
    ctx.container_mut().set_value(order, "Name", "second").unwrap();
    ctx.submit_changes(CallOptions::new()).unwrap();
    let sent = ctx.client().last_submit().unwrap();
    assert_eq!(sent.entries()[0].operation, EntityOperation::Update);

    // WHEN - the order is removed before the reply
    ctx.container_mut().get_set("Order").unwrap().remove(order).unwrap();
    ctx.client().reply_submit(Ok(SubmitResponse::default()));
    assert!(ctx.process_completions().is_empty());

    // THEN - the delete is still pending and goes out next
    assert_eq!(ctx.container().entity(order).unwrap().state(), EntityState::Deleted);
    assert!(ctx.has_changes());
    ctx.submit_changes(CallOptions::new()).unwrap();
    let resent = ctx.client().last_submit().unwrap();
    assert_eq!(
        resent.entry_for(order).map(|e| e.operation),
        Some(EntityOperation::Delete)
    );
}
