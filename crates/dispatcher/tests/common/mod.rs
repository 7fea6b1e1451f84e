#![allow(dead_code)]

use std::sync::Arc;

use alarm_core::PollerConfig;
use alarm_dispatcher::DispatchEngine;
use alarm_infrastructure::DispatchMetrics;
use alarm_testing_utils::{
    CatalogResourceBuilder, MockAuthorities, MockDispositioningAuthority, MockOperationAuthority,
    MockResourceCatalog, OperationBuilder,
};

/// Catalog with active resources A and B, inactive resource X
pub fn default_catalog() -> MockResourceCatalog {
    MockResourceCatalog::with_resources(vec![
        CatalogResourceBuilder::new("A").build(),
        CatalogResourceBuilder::new("B").build(),
        CatalogResourceBuilder::new("X").inactive().build(),
    ])
}

/// Operation 7 without alarmed resources, nothing dispatched
pub fn authorities() -> MockAuthorities {
    MockAuthorities::new(
        MockOperationAuthority::with_operations(vec![OperationBuilder::new(7).minutes_ago(5).build()]),
        MockDispositioningAuthority::new(),
        default_catalog(),
    )
}

pub fn fast_config() -> PollerConfig {
    PollerConfig {
        interval_ms: 20,
        ..PollerConfig::default()
    }
}

pub async fn engine(authorities: &MockAuthorities) -> DispatchEngine {
    engine_with(authorities, PollerConfig::default()).await
}

pub async fn engine_with(authorities: &MockAuthorities, config: PollerConfig) -> DispatchEngine {
    DispatchEngine::new(
        Arc::new(authorities.connector.clone()),
        config,
        Arc::new(DispatchMetrics::new()),
    )
    .await
}
