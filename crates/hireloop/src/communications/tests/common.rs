use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::communications::domain::{
    ActivityRecord, EntityId, Recipient, RecipientId, Template, TemplateId, TenantId,
};
use crate::communications::repository::{
    ActivityRepository, DeliveryFault, Mailer, RecipientRepository, RepositoryError,
    TemplateRepository,
};
use crate::communications::{CommunicationService, DispatchConfig};

pub(super) fn acme() -> TenantId {
    TenantId("acme".to_string())
}

pub(super) fn globex() -> TenantId {
    TenantId("globex".to_string())
}

pub(super) fn recipient(id: &str, tenant: &TenantId, name: Option<&str>) -> Recipient {
    Recipient {
        id: RecipientId(id.to_string()),
        tenant_id: tenant.clone(),
        address: format!("{id}@candidates.example"),
        candidate_name: name.map(str::to_string),
        job_title: Some("Backend Engineer".to_string()),
        company_name: Some(format!("{} Corp", tenant.0)),
        status: Some("Interviewing".to_string()),
        applied_on: NaiveDate::from_ymd_opt(2025, 3, 4),
    }
}

pub(super) fn ids(raw: &[&str]) -> Vec<RecipientId> {
    raw.iter().map(|id| RecipientId(id.to_string())).collect()
}

pub(super) fn address_of(id: &str) -> String {
    format!("{id}@candidates.example")
}

pub(super) type TestService =
    CommunicationService<MemoryTemplates, MemoryRecipients, MemoryActivity, ScriptedMailer>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) recipients: Arc<MemoryRecipients>,
    pub(super) activity: Arc<MemoryActivity>,
    pub(super) mailer: Arc<ScriptedMailer>,
}

pub(super) fn harness(roster: Vec<Recipient>, mailer: ScriptedMailer, workers: usize) -> Harness {
    let recipients = Arc::new(MemoryRecipients::with_roster(roster));
    let activity = Arc::new(MemoryActivity::default());
    let mailer = Arc::new(mailer);
    let service = CommunicationService::new(
        Arc::new(MemoryTemplates::default()),
        recipients.clone(),
        activity.clone(),
        mailer.clone(),
        DispatchConfig {
            max_concurrency: workers,
            preview_chars: 32,
        },
    );

    Harness {
        service,
        recipients,
        activity,
        mailer,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryTemplates {
    records: Arc<Mutex<Vec<Template>>>,
}

impl TemplateRepository for MemoryTemplates {
    fn insert(&self, template: Template) -> Result<Template, RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        if guard.iter().any(|existing| existing.id == template.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(template.clone());
        Ok(template)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Template>, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        // newest first, so ordering has to come from the store
        Ok(guard
            .iter()
            .rev()
            .filter(|template| &template.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<Option<Template>, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        Ok(guard
            .iter()
            .find(|template| &template.id == id && &template.tenant_id == tenant)
            .cloned())
    }
}

/// Ignores the tenant on fetch, so the store's own scoping is exercised.
#[derive(Default, Clone)]
pub(super) struct LeakyTemplates {
    inner: MemoryTemplates,
}

impl TemplateRepository for LeakyTemplates {
    fn insert(&self, template: Template) -> Result<Template, RepositoryError> {
        self.inner.insert(template)
    }

    fn list(&self, _tenant: &TenantId) -> Result<Vec<Template>, RepositoryError> {
        Ok(self
            .inner
            .records
            .lock()
            .expect("template mutex poisoned")
            .clone())
    }

    fn fetch(
        &self,
        _tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<Option<Template>, RepositoryError> {
        let guard = self.inner.records.lock().expect("template mutex poisoned");
        Ok(guard.iter().find(|template| &template.id == id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryRecipients {
    roster: Vec<Recipient>,
    loads: AtomicUsize,
}

impl MemoryRecipients {
    pub(super) fn with_roster(roster: Vec<Recipient>) -> Self {
        Self {
            roster,
            loads: AtomicUsize::new(0),
        }
    }

    pub(super) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl RecipientRepository for MemoryRecipients {
    fn load_many(
        &self,
        tenant: &TenantId,
        ids: &[RecipientId],
    ) -> Result<Vec<Recipient>, RepositoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let wanted: HashSet<&RecipientId> = ids.iter().collect();
        Ok(self
            .roster
            .iter()
            .filter(|recipient| &recipient.tenant_id == tenant && wanted.contains(&recipient.id))
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRecipients;

impl RecipientRepository for UnavailableRecipients {
    fn load_many(
        &self,
        _tenant: &TenantId,
        _ids: &[RecipientId],
    ) -> Result<Vec<Recipient>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryActivity {
    records: Mutex<Vec<ActivityRecord>>,
    reject_entities: HashSet<String>,
}

impl MemoryActivity {
    pub(super) fn rejecting(entities: &[&str]) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject_entities: entities.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub(super) fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().expect("activity mutex poisoned").clone()
    }
}

impl ActivityRepository for MemoryActivity {
    fn append(&self, record: ActivityRecord) -> Result<(), RepositoryError> {
        if self.reject_entities.contains(&record.entity_id.0) {
            return Err(RepositoryError::Unavailable("audit log offline".to_string()));
        }
        self.records
            .lock()
            .expect("activity mutex poisoned")
            .push(record);
        Ok(())
    }

    fn for_entity(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        Ok(self
            .records()
            .into_iter()
            .filter(|record| &record.tenant_id == tenant && &record.entity_id == entity)
            .collect())
    }
}

/// Mailer double that decides per address, so outcomes do not depend on call order.
#[derive(Default)]
pub(super) struct ScriptedMailer {
    declined: HashSet<String>,
    faulted: HashSet<String>,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedMailer {
    pub(super) fn accepting() -> Self {
        Self::default()
    }

    pub(super) fn declining(addresses: &[String]) -> Self {
        Self {
            declined: addresses.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub(super) fn faulting(addresses: &[String]) -> Self {
        Self {
            faulted: addresses.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn addresses(&self) -> HashSet<String> {
        self.calls().into_iter().map(|(to, _, _)| to).collect()
    }
}

impl Mailer for ScriptedMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, DeliveryFault> {
        self.sent.lock().expect("mailer mutex poisoned").push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
        ));

        if self.faulted.contains(to) {
            return Err(DeliveryFault::Transport("smtp connection reset".to_string()));
        }
        Ok(!self.declined.contains(to))
    }
}

/// Mailer double whose transport blows up for one address.
pub(super) struct PanickyMailer {
    panics_for: String,
    attempted: Mutex<Vec<String>>,
}

impl PanickyMailer {
    pub(super) fn panicking_for(address: String) -> Self {
        Self {
            panics_for: address,
            attempted: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn attempted(&self) -> Vec<String> {
        self.attempted.lock().expect("mailer mutex poisoned").clone()
    }
}

impl Mailer for PanickyMailer {
    fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<bool, DeliveryFault> {
        self.attempted
            .lock()
            .expect("mailer mutex poisoned")
            .push(to.to_string());

        if to == self.panics_for {
            panic!("transport crashed while sending to {to}");
        }
        Ok(true)
    }
}

pub(super) fn unique_entities(records: &[ActivityRecord]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.entity_id.0.clone()).or_insert(0) += 1;
    }
    counts
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
