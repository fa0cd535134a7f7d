use chrono::NaiveDate;
use hireloop::communications::{
    ActivityRecord, ActivityRepository, DeliveryFault, EntityId, Mailer, Recipient, RecipientId,
    RecipientRepository, RepositoryError, Template, TemplateId, TemplateRepository, TenantId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub(crate) const DEMO_TENANT: &str = "acme-talent";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTemplateRepository {
    templates: Arc<Mutex<HashMap<TemplateId, Template>>>,
}

impl TemplateRepository for InMemoryTemplateRepository {
    fn insert(&self, template: Template) -> Result<Template, RepositoryError> {
        let mut guard = lock(&self.templates)?;
        if guard.contains_key(&template.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(template.id.clone(), template.clone());
        Ok(template)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Template>, RepositoryError> {
        let guard = lock(&self.templates)?;
        Ok(guard
            .values()
            .filter(|template| &template.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<Option<Template>, RepositoryError> {
        let guard = lock(&self.templates)?;
        Ok(guard
            .get(id)
            .filter(|template| &template.tenant_id == tenant)
            .cloned())
    }
}

/// Read-only recipient store seeded at startup, keyed by tenant then recipient id.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecipientRepository {
    recipients: Arc<HashMap<TenantId, HashMap<RecipientId, Recipient>>>,
}

impl InMemoryRecipientRepository {
    pub(crate) fn seeded(roster: Vec<Recipient>) -> Self {
        let mut recipients: HashMap<TenantId, HashMap<RecipientId, Recipient>> = HashMap::new();
        for recipient in roster {
            recipients
                .entry(recipient.tenant_id.clone())
                .or_default()
                .insert(recipient.id.clone(), recipient);
        }
        Self {
            recipients: Arc::new(recipients),
        }
    }

    pub(crate) fn ids_for(&self, tenant: &TenantId) -> Vec<RecipientId> {
        let mut ids: Vec<RecipientId> = self
            .recipients
            .get(tenant)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }
}

impl RecipientRepository for InMemoryRecipientRepository {
    fn load_many(
        &self,
        tenant: &TenantId,
        ids: &[RecipientId],
    ) -> Result<Vec<Recipient>, RepositoryError> {
        let Some(entries) = self.recipients.get(tenant) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| entries.get(id)).cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryActivityRepository {
    records: Arc<Mutex<Vec<ActivityRecord>>>,
}

impl ActivityRepository for InMemoryActivityRepository {
    fn append(&self, record: ActivityRecord) -> Result<(), RepositoryError> {
        lock(&self.records)?.push(record);
        Ok(())
    }

    fn for_entity(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .filter(|record| &record.tenant_id == tenant && &record.entity_id == entity)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundMessage {
    pub(crate) to: String,
    pub(crate) subject: String,
}

/// Mailer that logs instead of relaying. Addresses listed in `failing` are refused
/// so demos can show partial delivery.
#[derive(Default, Clone)]
pub(crate) struct LoggingMailer {
    failing: Arc<HashSet<String>>,
    outbox: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl LoggingMailer {
    pub(crate) fn failing<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            failing: Arc::new(
                addresses
                    .into_iter()
                    .map(|address| address.trim().to_ascii_lowercase())
                    .collect(),
            ),
            outbox: Arc::default(),
        }
    }

    pub(crate) fn outbox(&self) -> Vec<OutboundMessage> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Mailer for LoggingMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, DeliveryFault> {
        if !to.contains('@') {
            return Err(DeliveryFault::InvalidAddress(to.to_string()));
        }
        if self.failing.contains(&to.to_ascii_lowercase()) {
            return Err(DeliveryFault::Transport(format!("relay refused {to}")));
        }

        info!(%to, %subject, body_length = body.chars().count(), "message relayed");
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| DeliveryFault::Transport("outbox poisoned".to_string()))?;
        guard.push(OutboundMessage {
            to: to.to_string(),
            subject: subject.to_string(),
        });
        Ok(true)
    }
}

pub(crate) fn demo_roster() -> Vec<Recipient> {
    let tenant = TenantId(DEMO_TENANT.to_string());
    let candidate = |id: &str, name: &str, job: &str, status: &str, applied: (i32, u32, u32)| {
        Recipient {
            id: RecipientId(id.to_string()),
            tenant_id: tenant.clone(),
            address: format!("{}@candidates.example", name.to_ascii_lowercase()),
            candidate_name: Some(name.to_string()),
            job_title: Some(job.to_string()),
            company_name: Some("Acme Talent".to_string()),
            status: Some(status.to_string()),
            applied_on: NaiveDate::from_ymd_opt(applied.0, applied.1, applied.2),
        }
    };

    vec![
        candidate("app-000101", "Ada", "Backend Engineer", "Screening", (2025, 3, 4)),
        candidate("app-000102", "Grace", "Backend Engineer", "Interviewing", (2025, 3, 6)),
        candidate("app-000103", "Linus", "Platform Engineer", "Screening", (2025, 3, 9)),
        candidate("app-000104", "Barbara", "Engineering Manager", "Offer", (2025, 2, 21)),
        Recipient {
            id: RecipientId("app-000201".to_string()),
            tenant_id: TenantId("globex-hiring".to_string()),
            address: "hank@candidates.example".to_string(),
            candidate_name: Some("Hank".to_string()),
            job_title: Some("Data Engineer".to_string()),
            company_name: Some("Globex".to_string()),
            status: Some("Screening".to_string()),
            applied_on: NaiveDate::from_ymd_opt(2025, 3, 1),
        },
    ]
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
