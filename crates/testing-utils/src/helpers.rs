//! Test helper utilities and common testing patterns

use std::time::Duration;

use tokio::time::sleep;

use crate::mocks::{
    MockAuthorityConnector, MockDispositioningAuthority, MockOperationAuthority,
    MockResourceCatalog,
};

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }

        false
    }
}

/// The three in-memory authorities plus a connector over them
pub struct MockAuthorities {
    pub operations: MockOperationAuthority,
    pub dispositioning: MockDispositioningAuthority,
    pub catalog: MockResourceCatalog,
    pub connector: MockAuthorityConnector,
}

impl MockAuthorities {
    pub fn new(
        operations: MockOperationAuthority,
        dispositioning: MockDispositioningAuthority,
        catalog: MockResourceCatalog,
    ) -> Self {
        let connector = MockAuthorityConnector::new(
            operations.clone(),
            dispositioning.clone(),
            catalog.clone(),
        );
        Self {
            operations,
            dispositioning,
            catalog,
            connector,
        }
    }

    pub fn empty() -> Self {
        Self::new(
            MockOperationAuthority::new(),
            MockDispositioningAuthority::new(),
            MockResourceCatalog::new(),
        )
    }
}

/// Integration test setup helpers
pub struct IntegrationTestSetup;

impl IntegrationTestSetup {
    /// Initialize test logging once, ignoring repeated calls
    pub fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }
}
