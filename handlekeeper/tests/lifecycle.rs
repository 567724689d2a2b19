//! End-to-end lifecycle scenarios for a single context.

use std::sync::Arc;

use handlekeeper::prelude::*;
use handlekeeper::testing::{assert_disposed, assert_live, assert_uninitialized, MockFactory};
use pretty_assertions::assert_eq;

fn config(kind: &str) -> ResourceConfig {
    ResourceConfig::new(kind)
}

#[tokio::test]
async fn acquire_current_release_current() {
    let registry = ResourceRegistry::new(MockFactory::new());

    let h1 = registry.acquire(&config("chromium")).await.unwrap();
    let current = registry.current().unwrap();
    assert!(Arc::ptr_eq(&h1, &current));
    assert_live(&h1);

    registry.release();
    assert_disposed(&h1);

    let err = registry.current().unwrap_err();
    assert!(matches!(err, RegistryError::NotInitialized(_)));
}

#[tokio::test]
async fn unsupported_kind_is_a_configuration_error() {
    let registry = ResourceRegistry::new(MockFactory::new());

    let err = registry.acquire(&config("unsupported")).await.unwrap_err();

    match err {
        RegistryError::Configuration(ref cfg) => assert_eq!(cfg.value.as_deref(), Some("unsupported")),
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_uninitialized(&registry, ContextId::current());
}

#[tokio::test]
async fn unsupported_kind_is_rejected_after_a_successful_acquire() {
    let registry = ResourceRegistry::new(MockFactory::new());
    let held = registry.acquire(&config("chromium")).await.unwrap();

    let err = registry.acquire(&config("unsupported")).await.unwrap_err();

    assert!(matches!(err, RegistryError::Configuration(_)));
    assert_live(&held);
    assert!(Arc::ptr_eq(&registry.current().unwrap(), &held));
    assert_eq!(registry.factory().create_count(), 1);
}

#[tokio::test]
async fn creation_failure_propagates_and_stores_nothing() {
    let registry = ResourceRegistry::new(MockFactory::new().always_failing());

    let err = registry.acquire(&config("firefox")).await.unwrap_err();

    match err {
        RegistryError::ResourceCreation(ref creation) => {
            assert_eq!(creation.kind, "firefox");
            assert!(std::error::Error::source(creation).is_some());
        }
        other => panic!("expected creation error, got {other:?}"),
    }
    assert!(matches!(registry.current(), Err(RegistryError::NotInitialized(_))));
    assert_eq!(registry.live_count(), 0);
}

#[tokio::test]
async fn reacquire_after_release_builds_a_fresh_handle() {
    let registry = ResourceRegistry::new(MockFactory::new());

    let first = registry.acquire(&config("webkit")).await.unwrap();
    registry.release();
    let second = registry.acquire(&config("webkit")).await.unwrap();

    assert_eq!(registry.factory().create_count(), 2);
    assert_ne!(first.id(), second.id());
    assert_disposed(&first);
    assert_live(&second);
    assert_eq!(second.resource().map(handlekeeper::testing::MockResource::serial), Some(2));
}

#[test]
fn release_without_acquire_changes_nothing() {
    let registry = ResourceRegistry::new(MockFactory::new());

    registry.release();

    assert_eq!(registry.live_count(), 0);
    assert_eq!(registry.factory().close_count(), 0);
    assert_eq!(registry.state(), HandleState::Uninitialized);
}

#[tokio::test]
async fn release_twice_is_the_same_as_once() {
    let registry = ResourceRegistry::new(MockFactory::new());
    let handle = registry.acquire(&config("chromium")).await.unwrap();

    registry.release();
    registry.release();

    assert_disposed(&handle);
    assert_eq!(registry.factory().close_count(), 1);
    assert_uninitialized(&registry, ContextId::current());
}

#[tokio::test]
async fn remote_kind_receives_endpoint() {
    let registry = ResourceRegistry::new(MockFactory::new());
    let remote = ResourceConfig::for_kind(ResourceKind::Remote).with_endpoint("ws://grid:4444");

    let handle = registry.acquire(&remote).await.unwrap();

    assert_eq!(handle.kind(), ResourceKind::Remote);
    assert_eq!(handle.resource().and_then(|r| r.endpoint()), Some("ws://grid:4444"));
    assert_eq!(registry.factory().requested_kinds(), vec![ResourceKind::Remote]);
}

#[tokio::test]
async fn crashed_resource_is_still_released_cleanly() {
    let sink = Arc::new(CollectingEventSink::new());
    let registry = ResourceRegistry::new(MockFactory::new()).with_event_sink(sink.clone());
    let handle = registry.acquire(&config("chromium")).await.unwrap();

    if let Some(resource) = handle.resource() {
        resource.kill();
    }
    registry.release();

    assert_disposed(&handle);
    assert_eq!(registry.live_count(), 0);
    assert_eq!(sink.count("resource.disposal_failed"), 1);
    assert_eq!(sink.count("resource.released"), 1);
}

#[tokio::test]
async fn hooks_release_even_when_the_body_fails() {
    let hooks = RegistryHooks::new(Arc::new(ResourceRegistry::new(MockFactory::new())));

    hooks.before_test(&config("firefox")).await.unwrap();
    let body: Result<(), RegistryError> = hooks
        .registry()
        .current()
        .and_then(|_| Err(RegistryError::Timeout { after_ms: 0 }));
    hooks.after_test();

    assert!(body.is_err());
    assert_eq!(hooks.registry().live_count(), 0);
}
