//! Operation state machine rules shared by load, submit and invoke.

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tether_tests::prelude::*;

fn load_operation() -> Operation<Vec<EntityId>> {
    Operation::builder(OperationKind::Load, "GetOrders").build()
}

#[test]
fn test_second_complete_fails_with_invalid_state() {
    let op = load_operation();

    op.complete(Vec::new()).unwrap();
    let second = op.complete(Vec::new());

    assert!(matches!(second, Err(OperationError::InvalidState(_))));
    assert_eq!(op.status(), OperationStatus::Succeeded);
}

#[test]
fn test_cancel_after_completion_reports_already_completed() {
    let op: Operation<Vec<EntityId>> = Operation::builder(OperationKind::Load, "GetOrders")
        .canceller(|| {})
        .build();
    op.complete(Vec::new()).unwrap();

    let err = op.cancel().unwrap_err();

    assert_eq!(err, OperationError::already_completed());
    assert!(err.to_string().contains("already completed"));
}

#[test]
fn test_mark_error_handled_is_idempotent() {
    // GIVEN
    let op = load_operation();
    assert!(matches!(
        op.mark_error_handled(),
        Err(OperationError::InvalidState(_))
    ));
    let _ = op.fail(RemoteFault::new(500, 1, "boom"));

    // WHEN
    let first = op.mark_error_handled();
    let second = op.mark_error_handled();

    // THEN
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(op.is_error_handled());
    assert_eq!(op.status(), OperationStatus::Faulted);
}

#[test]
fn test_unhandled_load_fault_raises_from_complete() {
    // GIVEN - no callback
    let op = load_operation();
    let fault = RemoteFault::new(404, 17, "Not found").with_stack("at GetOrders()");

    // WHEN
    let err = op.fail(fault.clone()).unwrap_err();

    // THEN
    let unhandled = err.as_unhandled().unwrap();
    assert_eq!(unhandled.fault, Fault::Remote(fault));
    assert_eq!(unhandled.status(), Some(404));
    assert_eq!(unhandled.code(), Some(17));
    assert_eq!(unhandled.remote_stack(), Some("at GetOrders()"));
    assert_eq!(
        err.to_string(),
        "Load operation failed for query 'GetOrders'. Not found"
    );
}

#[test]
fn test_callback_runs_once_and_can_handle_the_fault() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let op: Operation<Vec<EntityId>> = Operation::builder(OperationKind::Invoke, "Ping")
        .callback(move |op| {
            seen.fetch_add(1, Ordering::SeqCst);
            op.mark_error_handled()
                .map_err(|e| CallbackError::new(e.to_string()))
        })
        .build();

    let result = op.fail(RemoteFault::new(500, 0, "boom"));
    let again = op.fail(RemoteFault::new(500, 0, "boom"));

    assert!(result.is_ok());
    assert!(again.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_callback_propagates_out_of_complete() {
    let op: Operation<Vec<EntityId>> = Operation::builder(OperationKind::Load, "GetOrders")
        .callback(|_| Err(CallbackError::new("listener exploded")))
        .build();

    let err = op.complete(Vec::new()).unwrap_err();

    assert_eq!(err, OperationError::Callback(CallbackError::new("listener exploded")));
    assert_eq!(op.status(), OperationStatus::Succeeded);
}

#[test]
fn test_result_arriving_after_cancel_resolves_to_canceled() {
    // GIVEN
    let requested = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&requested);
    let op: Operation<Vec<EntityId>> = Operation::builder(OperationKind::Load, "GetOrders")
        .canceller(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    // WHEN
    op.cancel().unwrap();
    let late = op.complete(vec![EntityId::new(1)]);

    // THEN
    assert!(late.is_ok());
    assert_eq!(requested.load(Ordering::SeqCst), 1);
    assert_eq!(op.status(), OperationStatus::Canceled);
    assert!(op.value().is_none());
    assert!(!op.has_error());
}

#[test]
fn test_claimed_operation_can_no_longer_be_canceled() {
    let op: Operation<Vec<EntityId>> = Operation::builder(OperationKind::Submit, "SubmitChanges")
        .canceller(|| {})
        .build();

    assert!(op.begin_complete());
    assert!(op.cancel().is_err());
    op.complete(Vec::new()).unwrap();

    assert_eq!(op.status(), OperationStatus::Succeeded);
}
