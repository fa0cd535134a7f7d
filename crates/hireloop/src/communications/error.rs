use super::repository::RepositoryError;

/// Malformed or incomplete input, reported before any side effect.
///
/// Text fields are checked for blankness: whitespace-only counts as missing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one recipient is required")]
    EmptyRecipients,
    #[error("subject must not be blank")]
    MissingSubject,
    #[error("body must not be blank")]
    MissingBody,
    #[error("template name must not be blank")]
    MissingName,
}

/// Failure writing an activity entry. Logged by the orchestrator, never escalated.
#[derive(Debug, thiserror::Error)]
#[error("failed to record activity for {entity}: {source}")]
pub struct AuditWriteFault {
    pub entity: String,
    #[source]
    pub source: RepositoryError,
}

/// Call-level error for template and dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum CommunicationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("backing store unavailable: {0}")]
    Infrastructure(#[source] RepositoryError),
}

impl CommunicationError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<RepositoryError> for CommunicationError {
    fn from(value: RepositoryError) -> Self {
        Self::Infrastructure(value)
    }
}

/// Reject empty or whitespace-only text.
pub(crate) fn require_text(value: &str, error: ValidationError) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error)
    } else {
        Ok(())
    }
}
