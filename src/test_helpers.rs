//! In-memory API adapters for orchestrator and dialog tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::api::types::{FirewallRule, RuleAction, RuleProtocol};
use crate::api::{
    ApiError, CreateFirewallPayload, ExistingResourceSource, Firewall, FirewallRules, FirewallTemplate,
    ResourceCreator, TemplateSource,
};

#[must_use]
pub fn template(slug: &str) -> FirewallTemplate {
    FirewallTemplate {
        slug: slug.into(),
        rules: FirewallRules {
            inbound: vec![FirewallRule {
                action: RuleAction::Accept,
                protocol: RuleProtocol::Tcp,
                ports: Some("22".into()),
                addresses: None,
                label: Some(format!("{slug}-ssh")),
                description: None,
            }],
            ..FirewallRules::default()
        },
    }
}

#[must_use]
pub fn firewall(id: u64, label: &str) -> Firewall {
    Firewall { id, label: label.into(), status: Some("enabled".into()), rules: None }
}

/// Mock implementing all three adapters. Every call is counted and logged
/// so tests can assert on fan-out and retries.
pub struct MockApi {
    templates: Mutex<Result<Vec<FirewallTemplate>, ApiError>>,
    existing: Mutex<Result<Vec<Firewall>, ApiError>>,
    create_failure: Mutex<Option<ApiError>>,
    template_gate: Option<Arc<Notify>>,
    existing_gate: Option<Arc<Notify>>,
    create_gate: Option<Arc<Notify>>,
    next_id: AtomicU64,
    pub template_calls: AtomicUsize,
    pub template_lookups: AtomicUsize,
    pub existing_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub created: Mutex<Vec<CreateFirewallPayload>>,
    pub events: Mutex<Vec<&'static str>>,
}

impl MockApi {
    #[must_use]
    pub fn new(templates: Vec<FirewallTemplate>, existing: Vec<Firewall>) -> Self {
        Self {
            templates: Mutex::new(Ok(templates)),
            existing: Mutex::new(Ok(existing)),
            create_failure: Mutex::new(None),
            template_gate: None,
            existing_gate: None,
            create_gate: None,
            next_id: AtomicU64::new(100),
            template_calls: AtomicUsize::new(0),
            template_lookups: AtomicUsize::new(0),
            existing_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Hold `fetch_templates` and `fetch_template` until the returned handle is notified.
    pub fn gate_templates(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.template_gate = Some(gate.clone());
        gate
    }

    /// Hold `fetch_existing` until the returned handle is notified.
    pub fn gate_existing(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.existing_gate = Some(gate.clone());
        gate
    }

    /// Hold `create` until the returned handle is notified.
    pub fn gate_create(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.create_gate = Some(gate.clone());
        gate
    }

    pub fn set_templates(&self, result: Result<Vec<FirewallTemplate>, ApiError>) {
        *self.templates.lock().unwrap() = result;
    }

    pub fn set_existing(&self, result: Result<Vec<Firewall>, ApiError>) {
        *self.existing.lock().unwrap() = result;
    }

    pub fn set_create_failure(&self, failure: Option<ApiError>) {
        *self.create_failure.lock().unwrap() = failure;
    }

    #[must_use]
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait::async_trait]
impl TemplateSource for MockApi {
    async fn fetch_templates(&self) -> Result<Vec<FirewallTemplate>, ApiError> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        self.record("templates:start");
        if let Some(gate) = &self.template_gate {
            gate.notified().await;
        }
        self.record("templates:done");
        self.templates.lock().unwrap().clone()
    }

    async fn fetch_template(&self, slug: &str) -> Result<Option<FirewallTemplate>, ApiError> {
        self.template_lookups.fetch_add(1, Ordering::SeqCst);
        self.record("template:start");
        if let Some(gate) = &self.template_gate {
            gate.notified().await;
        }
        self.record("template:done");
        let templates = self.templates.lock().unwrap().clone()?;
        Ok(templates.into_iter().find(|t| t.slug == slug))
    }
}

#[async_trait::async_trait]
impl ExistingResourceSource for MockApi {
    async fn fetch_existing(&self) -> Result<Vec<Firewall>, ApiError> {
        self.existing_calls.fetch_add(1, Ordering::SeqCst);
        self.record("existing:start");
        if let Some(gate) = &self.existing_gate {
            gate.notified().await;
        }
        self.record("existing:done");
        self.existing.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResourceCreator for MockApi {
    async fn create(&self, payload: &CreateFirewallPayload) -> Result<Firewall, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.record("create:start");
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        self.record("create:done");
        if let Some(err) = self.create_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.created.lock().unwrap().push(payload.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Firewall { id, label: payload.label.clone(), status: Some("enabled".into()), rules: Some(payload.rules.clone()) })
    }
}

/// Poll `cond` until it holds, failing the test after one second.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached within 1s");
}
