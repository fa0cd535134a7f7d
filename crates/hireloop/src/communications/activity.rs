use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    ActivityId, ActivityKind, ActivityRecord, CommunicationPayload, EntityId, TemplateId,
    TenantId,
};
use super::error::{AuditWriteFault, CommunicationError};
use super::repository::ActivityRepository;

pub const DEFAULT_PREVIEW_CHARS: usize = 140;

static ACTIVITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_activity_id() -> ActivityId {
    let id = ACTIVITY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ActivityId(format!("act-{id:08}"))
}

/// One communication attempt as handed to the recorder.
#[derive(Debug, Clone)]
pub struct CommunicationAttempt<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub template_id: Option<&'a TemplateId>,
    pub delivered: bool,
    pub failure: Option<String>,
}

/// Writes immutable audit entries describing communication attempts.
pub struct ActivityRecorder<A> {
    repository: Arc<A>,
    preview_chars: usize,
}

impl<A> ActivityRecorder<A>
where
    A: ActivityRepository + 'static,
{
    pub fn new(repository: Arc<A>, preview_chars: usize) -> Self {
        Self {
            repository,
            preview_chars,
        }
    }

    pub fn record(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
        attempt: CommunicationAttempt<'_>,
    ) -> Result<ActivityRecord, AuditWriteFault> {
        let record = ActivityRecord {
            id: next_activity_id(),
            tenant_id: tenant.clone(),
            entity_id: entity.clone(),
            kind: ActivityKind::Communication,
            occurred_at: Utc::now(),
            payload: CommunicationPayload {
                subject: attempt.subject.to_string(),
                body_preview: preview(attempt.body, self.preview_chars),
                body_length: attempt.body.chars().count(),
                template_id: attempt.template_id.cloned(),
                delivered: attempt.delivered,
                failure: attempt.failure,
            },
        };

        self.repository
            .append(record.clone())
            .map_err(|source| AuditWriteFault {
                entity: entity.0.clone(),
                source,
            })?;
        Ok(record)
    }

    /// Activity for `entity` within `tenant`, oldest first.
    pub fn history(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
    ) -> Result<Vec<ActivityRecord>, CommunicationError> {
        let mut records: Vec<ActivityRecord> = self
            .repository
            .for_entity(tenant, entity)?
            .into_iter()
            .filter(|record| &record.tenant_id == tenant)
            .collect();
        records.sort_by(|left, right| left.occurred_at.cmp(&right.occurred_at));
        Ok(records)
    }
}

/// Truncate `body` to at most `limit` characters, marking the cut with an ellipsis.
pub(crate) fn preview(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", body[..cut].trim_end()),
        None => body.to_string(),
    }
}
