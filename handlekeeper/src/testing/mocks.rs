//! Scriptable factory and resource for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ResourceConfig, ResourceKind};
use crate::errors::{DisposalError, ResourceCreationError};
use crate::resource::{NativeResource, ResourceFactory};

/// A fake native resource that counts how often it is closed.
#[derive(Debug)]
pub struct MockResource {
    serial: usize,
    kind: ResourceKind,
    endpoint: Option<String>,
    alive: AtomicBool,
    fail_close: bool,
    closes: Arc<AtomicUsize>,
}

impl MockResource {
    /// Sequence number assigned by the factory, starting at 1.
    #[must_use]
    pub const fn serial(&self) -> usize {
        self.serial
    }

    /// The kind it was created as.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The endpoint from the configuration.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Simulates the native side going away (crashed browser, exited process).
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl NativeResource for MockResource {
    fn close(&self) -> Result<(), DisposalError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if !self.alive.swap(false, Ordering::SeqCst) {
            return Err(DisposalError::new(format!("resource #{} already gone", self.serial)));
        }
        if self.fail_close {
            return Err(DisposalError::new(format!("resource #{} refused to close", self.serial)));
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// A factory whose behaviour tests can script.
#[derive(Debug, Default)]
pub struct MockFactory {
    creates: AtomicUsize,
    closes: Arc<AtomicUsize>,
    failures_remaining: AtomicUsize,
    always_fail: bool,
    fail_close: bool,
    delay: Option<Duration>,
    kinds: Mutex<Vec<ResourceKind>>,
}

impl MockFactory {
    /// Creates a factory that always succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `create` call fail.
    #[must_use]
    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Makes the next `n` `create` calls fail.
    #[must_use]
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Makes every created resource fail to close.
    #[must_use]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Makes `create` sleep before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `create` calls, including failed ones.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `close` calls across all resources this factory built.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Kinds requested, in call order.
    #[must_use]
    pub fn requested_kinds(&self) -> Vec<ResourceKind> {
        self.kinds.lock().clone()
    }

    fn should_fail(&self) -> bool {
        self.always_fail
            || self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl ResourceFactory for MockFactory {
    type Resource = MockResource;

    async fn create(
        &self,
        kind: ResourceKind,
        config: &ResourceConfig,
    ) -> Result<MockResource, ResourceCreationError> {
        let serial = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        self.kinds.lock().push(kind);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail() {
            let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(ResourceCreationError::new(kind.as_str(), format!("mock create #{serial} failed"))
                .with_source(cause));
        }

        Ok(MockResource {
            serial,
            kind,
            endpoint: config.endpoint.clone(),
            alive: AtomicBool::new(true),
            fail_close: self.fail_close,
            closes: Arc::clone(&self.closes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_factory_counts_creates() {
        let factory = MockFactory::new();
        let config = ResourceConfig::for_kind(ResourceKind::Chromium);

        let first = factory.create(ResourceKind::Chromium, &config).await.unwrap();
        let second = factory.create(ResourceKind::Chromium, &config).await.unwrap();

        assert_eq!(first.serial(), 1);
        assert_eq!(second.serial(), 2);
        assert_eq!(factory.create_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_first() {
        let factory = MockFactory::new().failing_first(1);
        let config = ResourceConfig::for_kind(ResourceKind::Firefox);

        assert!(factory.create(ResourceKind::Firefox, &config).await.is_err());
        assert!(factory.create(ResourceKind::Firefox, &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_killed_resource_reports_close_error() {
        let factory = MockFactory::new();
        let config = ResourceConfig::for_kind(ResourceKind::Webkit);
        let resource = factory.create(ResourceKind::Webkit, &config).await.unwrap();

        resource.kill();

        assert!(!resource.is_alive());
        assert!(resource.close().is_err());
        assert_eq!(factory.close_count(), 1);
    }
}
