use super::domain::{
    ActivityRecord, EntityId, Recipient, RecipientId, Template, TemplateId, TenantId,
};

/// Template storage. Every read is scoped by tenant.
pub trait TemplateRepository: Send + Sync {
    fn insert(&self, template: Template) -> Result<Template, RepositoryError>;
    /// Templates owned by `tenant`, in no particular order.
    fn list(&self, tenant: &TenantId) -> Result<Vec<Template>, RepositoryError>;
    fn fetch(&self, tenant: &TenantId, id: &TemplateId)
        -> Result<Option<Template>, RepositoryError>;
}

/// Recipient lookup. Ids not owned by `tenant` are simply absent from the result.
pub trait RecipientRepository: Send + Sync {
    fn load_many(
        &self,
        tenant: &TenantId,
        ids: &[RecipientId],
    ) -> Result<Vec<Recipient>, RepositoryError>;
}

/// Append-only activity log storage. Implementations serialize concurrent appends.
pub trait ActivityRepository: Send + Sync {
    fn append(&self, record: ActivityRecord) -> Result<(), RepositoryError>;
    fn for_entity(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
    ) -> Result<Vec<ActivityRecord>, RepositoryError>;
}

/// Message transport. `Ok(false)` means the transport declined the message.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, DeliveryFault>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure delivering a single message.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryFault {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("recipient address rejected: {0}")]
    InvalidAddress(String),
}
