//! Description synchronizer tests
//!
//! Verifies that provider description failures are isolated per service and
//! that previously synced policies survive a failed refresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use policy_gateway::domain::{
    MethodPolicy, ProviderProcessRequest, ProviderProcessResponse, ServicePolicy,
};
use policy_gateway::processor::PolicyStore;
use policy_gateway::provider::{ClientRegistry, ProviderClient};
use policy_gateway::store::Store;
use policy_gateway::sync::sync_once;
use policy_gateway::{Error, Result};

struct ScriptedClient {
    policy: ServicePolicy,
    failing: AtomicBool,
}

impl ScriptedClient {
    fn healthy(policy: ServicePolicy) -> Self {
        Self {
            policy,
            failing: AtomicBool::new(false),
        }
    }

    fn broken() -> Self {
        Self {
            policy: ServicePolicy::default(),
            failing: AtomicBool::new(true),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderClient for ScriptedClient {
    async fn description(&self) -> Result<ServicePolicy> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Provider("connection refused".to_string()));
        }
        Ok(self.policy.clone())
    }

    async fn process(&self, _request: &ProviderProcessRequest) -> Result<ProviderProcessResponse> {
        Ok(ProviderProcessResponse::default())
    }
}

fn policy_with_method(name: &str) -> ServicePolicy {
    ServicePolicy {
        methods: HashMap::from([(
            name.to_string(),
            MethodPolicy {
                method: name.to_string(),
                ..MethodPolicy::default()
            },
        )]),
        ..ServicePolicy::default()
    }
}

fn registry(entries: Vec<(&str, Arc<ScriptedClient>)>) -> ClientRegistry {
    Store::new(
        entries
            .into_iter()
            .map(|(name, client)| (name.to_string(), client as Arc<dyn ProviderClient>))
            .collect(),
    )
}

#[tokio::test]
async fn all_descriptions_sync_when_providers_are_healthy() {
    let clients = registry(vec![
        (
            "greet",
            Arc::new(ScriptedClient::healthy(policy_with_method("hello"))),
        ),
        (
            "billing",
            Arc::new(ScriptedClient::healthy(policy_with_method("charge"))),
        ),
    ]);
    let descriptions = PolicyStore::new(HashMap::new());

    sync_once(&clients, &descriptions).await.unwrap();

    assert_eq!(descriptions.len(), 2);
    assert!(descriptions
        .get(&"greet".to_string())
        .unwrap()
        .methods
        .contains_key("hello"));
}

#[tokio::test]
async fn one_failing_provider_does_not_block_the_others() {
    let clients = registry(vec![
        (
            "greet",
            Arc::new(ScriptedClient::healthy(policy_with_method("hello"))),
        ),
        ("billing", Arc::new(ScriptedClient::broken())),
    ]);
    let descriptions = PolicyStore::new(HashMap::new());

    let err = sync_once(&clients, &descriptions).await.unwrap_err();

    assert!(err.to_string().contains("billing"));
    assert!(descriptions.get(&"greet".to_string()).is_some());
    assert!(descriptions.get(&"billing".to_string()).is_none());
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_policy() {
    let billing = Arc::new(ScriptedClient::healthy(policy_with_method("charge")));
    let clients = registry(vec![("billing", Arc::clone(&billing))]);
    let descriptions = PolicyStore::new(HashMap::new());

    sync_once(&clients, &descriptions).await.unwrap();
    let before = descriptions.get(&"billing".to_string()).unwrap();

    billing.set_failing(true);
    sync_once(&clients, &descriptions).await.unwrap_err();

    let after = descriptions.get(&"billing".to_string()).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn refresh_replaces_the_stored_policy_wholesale() {
    let billing = Arc::new(ScriptedClient::healthy(policy_with_method("charge")));
    let clients = registry(vec![("billing", Arc::clone(&billing))]);
    let descriptions = PolicyStore::new(HashMap::new());

    sync_once(&clients, &descriptions).await.unwrap();
    let first = descriptions.get(&"billing".to_string()).unwrap();

    sync_once(&clients, &descriptions).await.unwrap();
    let second = descriptions.get(&"billing".to_string()).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}
