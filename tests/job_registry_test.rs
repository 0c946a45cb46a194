//! Job registry tests: cancellation handles and admission control.

use mergeforged::jobs::JobRegistry;
use mergeforged_common::{Error, JobId};
use std::time::Duration;

#[test]
fn register_and_drop_unregisters() {
    let registry = JobRegistry::new(2);
    let guard = registry.register().unwrap();
    let id = guard.id();

    assert!(registry.is_running(&id));
    assert_eq!(registry.running(), 1);
    assert!(registry.started_at(&id).is_some());

    drop(guard);
    assert!(!registry.is_running(&id));
    assert_eq!(registry.running(), 0);
}

#[test]
fn cancel_fires_the_job_token() {
    let registry = JobRegistry::new(1);
    let guard = registry.register().unwrap();
    let token = guard.token();

    assert!(!registry.is_cancelled(&guard.id()));
    registry.cancel(&guard.id()).unwrap();
    assert!(token.is_cancelled());
    assert!(registry.is_cancelled(&guard.id()));
}

#[test]
fn cancel_unknown_job_is_not_found() {
    let registry = JobRegistry::new(1);
    let err = registry.cancel(&JobId::new()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!registry.is_cancelled(&JobId::new()));
}

#[test]
fn limit_is_enforced_until_a_job_finishes() {
    let registry = JobRegistry::new(2);
    let first = registry.register().unwrap();
    let _second = registry.register().unwrap();

    let err = registry.register().unwrap_err();
    assert!(matches!(err, Error::JobLimitReached { limit: 2 }));

    drop(first);
    assert!(registry.register().is_ok());
}

#[test]
fn cancel_all_reaches_every_job() {
    let registry = JobRegistry::new(3);
    let a = registry.register().unwrap();
    let b = registry.register().unwrap();

    registry.cancel_all();
    assert!(a.token().is_cancelled());
    assert!(b.token().is_cancelled());
}

#[tokio::test]
async fn register_wait_blocks_until_slot_frees() {
    let registry = JobRegistry::new(1);
    let first = registry.register().unwrap();

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.register_wait().await.map(|g| g.id()) })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    drop(first);
    let id = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    // The waiter's guard was dropped with its task.
    assert!(!registry.is_running(&id));
}
