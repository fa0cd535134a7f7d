use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Isolation boundary for every template, recipient, and activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub String);

/// Identifier of a dispatch target (an application and its candidate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(pub String);

/// Entity an activity entry documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl From<&RecipientId> for EntityId {
    fn from(value: &RecipientId) -> Self {
        Self(value.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub String);

/// Automated event a template is wired to. Manual templates carry no trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateTrigger {
    ApplicationReceived,
    StatusChanged,
    InterviewScheduled,
    OfferExtended,
    Rejected,
}

impl TemplateTrigger {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ApplicationReceived => "Application Received",
            Self::StatusChanged => "Status Changed",
            Self::InterviewScheduled => "Interview Scheduled",
            Self::OfferExtended => "Offer Extended",
            Self::Rejected => "Rejected",
        }
    }
}

/// Stored message template, owned by exactly one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub trigger: Option<TemplateTrigger>,
    pub created_at: DateTime<Utc>,
}

/// Administrator input for a new template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub trigger: Option<TemplateTrigger>,
}

/// Per-recipient values available to merge-field resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeContext {
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub candidate_email: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub application_date: Option<NaiveDate>,
}

/// Tenant-scoped dispatch target as returned by the recipient repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub tenant_id: TenantId,
    pub address: String,
    pub candidate_name: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub status: Option<String>,
    pub applied_on: Option<NaiveDate>,
}

impl Recipient {
    pub fn merge_context(&self) -> MergeContext {
        MergeContext {
            candidate_name: self.candidate_name.clone(),
            candidate_email: Some(self.address.clone()),
            job_title: self.job_title.clone(),
            company_name: self.company_name.clone(),
            status: self.status.clone(),
            application_date: self.applied_on,
        }
    }
}

/// A single bulk-send instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub recipient_ids: Vec<RecipientId>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
}

/// Subject and body after merge-field resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// What happened to one in-scope recipient during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient_id: RecipientId,
    pub delivered: bool,
    pub audited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Aggregate result of a dispatch. `sent <= total` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub sent: usize,
    pub total: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

impl DispatchResult {
    pub fn failed(&self) -> usize {
        self.total - self.sent
    }

    pub fn undelivered(&self) -> impl Iterator<Item = &RecipientId> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.delivered)
            .map(|outcome| &outcome.recipient_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Communication,
}

impl ActivityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Communication => "communication",
        }
    }
}

/// Audit details for one communication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPayload {
    pub subject: String,
    pub body_preview: String,
    pub body_length: usize,
    pub template_id: Option<TemplateId>,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Append-only audit entry. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub kind: ActivityKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: CommunicationPayload,
}
