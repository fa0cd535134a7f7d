use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{MergeContext, NewTemplate, RenderedMessage, Template, TemplateId, TenantId};
use super::error::{require_text, CommunicationError, ValidationError};
use super::merge;
use super::repository::TemplateRepository;

static TEMPLATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
const TEMPLATE_ID_PREFIX: &str = "tpl-";

fn next_template_id() -> TemplateId {
    let id = TEMPLATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TemplateId(format!("{TEMPLATE_ID_PREFIX}{id:06}"))
}

/// Numeric part of a generated id. The zero padding stops at six digits, so ids
/// must not be compared as text.
fn sequence_of(id: &TemplateId) -> Option<u64> {
    id.0.strip_prefix(TEMPLATE_ID_PREFIX)?.parse().ok()
}

/// Tenant-scoped facade over a [`TemplateRepository`].
pub struct TemplateStore<T> {
    repository: Arc<T>,
}

impl<T> TemplateStore<T>
where
    T: TemplateRepository + 'static,
{
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }

    /// Validate and persist a new template. Repeated calls create distinct templates.
    pub fn create(
        &self,
        tenant: &TenantId,
        input: NewTemplate,
    ) -> Result<Template, CommunicationError> {
        require_text(&input.name, ValidationError::MissingName)?;
        require_text(&input.subject, ValidationError::MissingSubject)?;
        require_text(&input.body, ValidationError::MissingBody)?;

        let template = Template {
            id: next_template_id(),
            tenant_id: tenant.clone(),
            name: input.name,
            subject: input.subject,
            body: input.body,
            trigger: input.trigger,
            created_at: Utc::now(),
        };

        let stored = self.repository.insert(template)?;
        info!(
            tenant = %stored.tenant_id.0,
            template = %stored.id.0,
            trigger = ?stored.trigger,
            "template created"
        );
        Ok(stored)
    }

    /// Templates owned by `tenant`, oldest first.
    pub fn list_by_tenant(&self, tenant: &TenantId) -> Result<Vec<Template>, CommunicationError> {
        let mut templates: Vec<Template> = self
            .repository
            .list(tenant)?
            .into_iter()
            .filter(|template| &template.tenant_id == tenant)
            .collect();
        templates.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| sequence_of(&left.id).cmp(&sequence_of(&right.id)))
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(templates)
    }

    /// Fetch a template. Another tenant's template reports as not found.
    pub fn get(
        &self,
        tenant: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template, CommunicationError> {
        self.repository
            .fetch(tenant, template_id)?
            .filter(|template| &template.tenant_id == tenant)
            .ok_or_else(|| CommunicationError::not_found("template", template_id.0.clone()))
    }

    /// Resolve a stored template against `ctx` without sending anything.
    pub fn preview(
        &self,
        tenant: &TenantId,
        template_id: &TemplateId,
        ctx: &MergeContext,
    ) -> Result<RenderedMessage, CommunicationError> {
        let template = self.get(tenant, template_id)?;
        Ok(merge::render(&template.subject, &template.body, ctx))
    }
}
