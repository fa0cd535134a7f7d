//! Candidate communication engine: tenant-scoped templates, merge-field resolution,
//! bulk dispatch, and the activity trail it leaves behind.

pub mod activity;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod merge;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod templates;

#[cfg(test)]
mod tests;

pub use activity::{ActivityRecorder, CommunicationAttempt};
pub use dispatch::{DispatchConfig, DispatchOrchestrator};
pub use domain::{
    ActivityId, ActivityKind, ActivityRecord, CommunicationPayload, DispatchRequest,
    DispatchResult, EntityId, MergeContext, NewTemplate, Recipient, RecipientId,
    RecipientOutcome, RenderedMessage, Template, TemplateId, TemplateTrigger, TenantId,
};
pub use error::{AuditWriteFault, CommunicationError, ValidationError};
pub use merge::{resolve, MergeField};
pub use repository::{
    ActivityRepository, DeliveryFault, Mailer, RecipientRepository, RepositoryError,
    TemplateRepository,
};
pub use roster::{RosterImportError, RosterImporter};
pub use router::communication_router;
pub use service::CommunicationService;
pub use templates::TemplateStore;
