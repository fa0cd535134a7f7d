//! Bulk dispatch of templated messages to tenant-scoped recipients.
//!
//! Every in-scope recipient is attempted exactly once. Transport failures and audit write
//! failures are absorbed per recipient; only validation, unknown templates, and an
//! unreachable recipient store fail the whole call.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::activity::{ActivityRecorder, CommunicationAttempt, DEFAULT_PREVIEW_CHARS};
use super::domain::{
    DispatchRequest, DispatchResult, EntityId, Recipient, RecipientId, RecipientOutcome,
    TemplateId, TenantId,
};
use super::error::{require_text, CommunicationError, ValidationError};
use super::merge;
use super::repository::{
    ActivityRepository, DeliveryFault, Mailer, RecipientRepository, TemplateRepository,
};
use super::templates::TemplateStore;

/// Tuning for the dispatch worker pool and audit payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on deliveries in flight. `1` dispatches sequentially.
    pub max_concurrency: usize,
    /// Characters of the resolved body kept in each activity entry.
    pub preview_chars: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

pub struct DispatchOrchestrator<T, R, A, M> {
    templates: Arc<TemplateStore<T>>,
    recipients: Arc<R>,
    activity: Arc<ActivityRecorder<A>>,
    mailer: Arc<M>,
    permits: Arc<Semaphore>,
}

impl<T, R, A, M> DispatchOrchestrator<T, R, A, M>
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        templates: Arc<TemplateStore<T>>,
        recipients: Arc<R>,
        activity: Arc<ActivityRecorder<A>>,
        mailer: Arc<M>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            templates,
            recipients,
            activity,
            mailer,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        }
    }

    /// Send one resolved message per in-scope recipient and report the aggregate.
    pub async fn dispatch(
        &self,
        tenant: &TenantId,
        request: DispatchRequest,
    ) -> Result<DispatchResult, CommunicationError> {
        let request = validate(request)?;

        if let Some(template_id) = &request.template_id {
            self.templates.get(tenant, template_id)?;
        }

        let requested: HashSet<&RecipientId> = request.recipient_ids.iter().collect();
        let recipients: Vec<Recipient> = self
            .recipients
            .load_many(tenant, &request.recipient_ids)?
            .into_iter()
            .filter(|recipient| &recipient.tenant_id == tenant && requested.contains(&recipient.id))
            .collect();

        info!(
            tenant = %tenant.0,
            requested = request.recipient_ids.len(),
            in_scope = recipients.len(),
            template = ?request.template_id.as_ref().map(|id| id.0.as_str()),
            "dispatch started"
        );

        let total = recipients.len();
        let outcomes = self.deliver_all(tenant, request, recipients).await;
        let result = DispatchResult {
            sent: outcomes.iter().filter(|outcome| outcome.delivered).count(),
            total,
            outcomes,
        };

        info!(
            tenant = %tenant.0,
            sent = result.sent,
            total = result.total,
            "dispatch finished"
        );
        Ok(result)
    }

    /// Fan each recipient out to the blocking pool, at most `max_concurrency` at a time,
    /// and collect outcomes back into request order.
    async fn deliver_all(
        &self,
        tenant: &TenantId,
        request: DispatchRequest,
        recipients: Vec<Recipient>,
    ) -> Vec<RecipientOutcome> {
        let batch = Arc::new(Batch {
            tenant: tenant.clone(),
            subject: request.subject,
            body: request.body,
            template_id: request.template_id,
            activity: self.activity.clone(),
            mailer: self.mailer.clone(),
        });
        let ids: Vec<RecipientId> = recipients.iter().map(|recipient| recipient.id.clone()).collect();
        let mut slots: Vec<Option<RecipientOutcome>> = vec![None; ids.len()];
        let mut tasks = JoinSet::new();

        for (index, recipient) in recipients.into_iter().enumerate() {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let batch = batch.clone();
            tasks.spawn_blocking(move || {
                let outcome = batch.attempt(&recipient);
                drop(permit);
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(join_error) => {
                    error!(tenant = %tenant.0, error = %join_error, "delivery task aborted");
                }
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, recipient_id)| {
                slot.unwrap_or_else(|| RecipientOutcome {
                    recipient_id,
                    delivered: false,
                    audited: false,
                    failure: Some("delivery attempt aborted".to_string()),
                })
            })
            .collect()
    }
}

/// Everything a single delivery needs, shared by the tasks of one dispatch.
struct Batch<A, M> {
    tenant: TenantId,
    subject: String,
    body: String,
    template_id: Option<TemplateId>,
    activity: Arc<ActivityRecorder<A>>,
    mailer: Arc<M>,
}

impl<A, M> Batch<A, M>
where
    A: ActivityRepository + 'static,
    M: Mailer,
{
    fn attempt(&self, recipient: &Recipient) -> RecipientOutcome {
        let message = merge::render(&self.subject, &self.body, &recipient.merge_context());

        // A panicking transport counts as a failed delivery for this recipient only.
        let delivery = panic::catch_unwind(AssertUnwindSafe(|| {
            self.mailer
                .send(&recipient.address, &message.subject, &message.body)
        }))
        .unwrap_or_else(|_| Err(DeliveryFault::Transport("mailer panicked".to_string())));

        let failure = match delivery {
            Ok(true) => None,
            Ok(false) => Some("transport declined the message".to_string()),
            Err(fault) => Some(fault.to_string()),
        };
        let delivered = failure.is_none();

        if !delivered {
            warn!(
                tenant = %self.tenant.0,
                recipient = %recipient.id.0,
                reason = failure.as_deref().unwrap_or_default(),
                "message not delivered"
            );
        }

        let entity = EntityId::from(&recipient.id);
        let audited = match self.activity.record(
            &self.tenant,
            &entity,
            CommunicationAttempt {
                subject: &message.subject,
                body: &message.body,
                template_id: self.template_id.as_ref(),
                delivered,
                failure: failure.clone(),
            },
        ) {
            Ok(_) => true,
            Err(fault) => {
                warn!(tenant = %self.tenant.0, error = %fault, "activity entry not recorded");
                false
            }
        };

        RecipientOutcome {
            recipient_id: recipient.id.clone(),
            delivered,
            audited,
            failure,
        }
    }
}

/// Reject malformed requests and collapse duplicate recipient ids, keeping first occurrence.
pub(crate) fn validate(request: DispatchRequest) -> Result<DispatchRequest, ValidationError> {
    if request.recipient_ids.is_empty() {
        return Err(ValidationError::EmptyRecipients);
    }
    require_text(&request.subject, ValidationError::MissingSubject)?;
    require_text(&request.body, ValidationError::MissingBody)?;

    let mut seen = HashSet::new();
    let recipient_ids = request
        .recipient_ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    Ok(DispatchRequest {
        recipient_ids,
        ..request
    })
}
