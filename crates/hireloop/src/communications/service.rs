use std::sync::Arc;

use super::activity::ActivityRecorder;
use super::dispatch::{DispatchConfig, DispatchOrchestrator};
use super::domain::{
    ActivityRecord, DispatchRequest, DispatchResult, EntityId, MergeContext, NewTemplate,
    RenderedMessage, Template, TemplateId, TenantId,
};
use super::error::CommunicationError;
use super::repository::{
    ActivityRepository, Mailer, RecipientRepository, TemplateRepository,
};
use super::templates::TemplateStore;

/// Service composing the template store, activity recorder, and dispatch orchestrator.
pub struct CommunicationService<T, R, A, M> {
    templates: Arc<TemplateStore<T>>,
    activity: Arc<ActivityRecorder<A>>,
    orchestrator: DispatchOrchestrator<T, R, A, M>,
}

impl<T, R, A, M> CommunicationService<T, R, A, M>
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        templates: Arc<T>,
        recipients: Arc<R>,
        activity: Arc<A>,
        mailer: Arc<M>,
        config: DispatchConfig,
    ) -> Self {
        let templates = Arc::new(TemplateStore::new(templates));
        let activity = Arc::new(ActivityRecorder::new(activity, config.preview_chars));
        let orchestrator = DispatchOrchestrator::new(
            templates.clone(),
            recipients,
            activity.clone(),
            mailer,
            config,
        );

        Self {
            templates,
            activity,
            orchestrator,
        }
    }

    pub fn create_template(
        &self,
        tenant: &TenantId,
        input: NewTemplate,
    ) -> Result<Template, CommunicationError> {
        self.templates.create(tenant, input)
    }

    pub fn list_templates(&self, tenant: &TenantId) -> Result<Vec<Template>, CommunicationError> {
        self.templates.list_by_tenant(tenant)
    }

    pub fn get_template(
        &self,
        tenant: &TenantId,
        template_id: &TemplateId,
    ) -> Result<Template, CommunicationError> {
        self.templates.get(tenant, template_id)
    }

    pub fn preview_template(
        &self,
        tenant: &TenantId,
        template_id: &TemplateId,
        ctx: &MergeContext,
    ) -> Result<RenderedMessage, CommunicationError> {
        self.templates.preview(tenant, template_id, ctx)
    }

    pub async fn dispatch(
        &self,
        tenant: &TenantId,
        request: DispatchRequest,
    ) -> Result<DispatchResult, CommunicationError> {
        self.orchestrator.dispatch(tenant, request).await
    }

    pub fn activity_for(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
    ) -> Result<Vec<ActivityRecord>, CommunicationError> {
        self.activity.history(tenant, entity)
    }
}
