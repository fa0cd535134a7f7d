//! Merge-field substitution over a fixed, ordered token vocabulary.
//!
//! Resolution is a literal, global substring replacement per token in registry order.
//! Unknown `{{...}}` placeholders are left untouched. There is no shared mutable state,
//! so [`resolve`] may be called from any number of threads.

use serde::Serialize;

use super::domain::{MergeContext, RenderedMessage};

/// Format used for `{{application_date}}`.
pub const APPLICATION_DATE_FORMAT: &str = "%B %-d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    CandidateName,
    CandidateEmail,
    JobTitle,
    CompanyName,
    Status,
    ApplicationDate,
}

impl MergeField {
    /// Registry order. Substitution follows this order exactly.
    pub const fn ordered() -> [Self; 6] {
        [
            Self::CandidateName,
            Self::CandidateEmail,
            Self::JobTitle,
            Self::CompanyName,
            Self::Status,
            Self::ApplicationDate,
        ]
    }

    pub const fn token(self) -> &'static str {
        match self {
            Self::CandidateName => "{{candidate_name}}",
            Self::CandidateEmail => "{{candidate_email}}",
            Self::JobTitle => "{{job_title}}",
            Self::CompanyName => "{{company_name}}",
            Self::Status => "{{status}}",
            Self::ApplicationDate => "{{application_date}}",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CandidateName => "Candidate name",
            Self::CandidateEmail => "Candidate email",
            Self::JobTitle => "Job title",
            Self::CompanyName => "Company name",
            Self::Status => "Application status",
            Self::ApplicationDate => "Application date",
        }
    }

    pub const fn fallback(self) -> &'static str {
        match self {
            Self::CandidateName => "Candidate",
            Self::JobTitle => "the position",
            Self::CompanyName => "Our Company",
            Self::CandidateEmail | Self::Status | Self::ApplicationDate => "",
        }
    }

    /// Value substituted for this field under `ctx`.
    pub fn value(self, ctx: &MergeContext) -> String {
        let present = match self {
            Self::CandidateName => non_empty(&ctx.candidate_name),
            Self::CandidateEmail => non_empty(&ctx.candidate_email),
            Self::JobTitle => non_empty(&ctx.job_title),
            Self::CompanyName => non_empty(&ctx.company_name),
            Self::Status => non_empty(&ctx.status),
            Self::ApplicationDate => {
                return ctx
                    .application_date
                    .map(|date| date.format(APPLICATION_DATE_FORMAT).to_string())
                    .unwrap_or_else(|| self.fallback().to_string());
            }
        };

        present.unwrap_or_else(|| self.fallback()).to_string()
    }

    pub fn descriptor(self) -> MergeFieldDescriptor {
        MergeFieldDescriptor {
            field: self,
            token: self.token(),
            label: self.label(),
            fallback: self.fallback(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

/// Serializable description of a merge field for template authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeFieldDescriptor {
    pub field: MergeField,
    pub token: &'static str,
    pub label: &'static str,
    pub fallback: &'static str,
}

pub fn vocabulary() -> Vec<MergeFieldDescriptor> {
    MergeField::ordered()
        .into_iter()
        .map(MergeField::descriptor)
        .collect()
}

/// Substitute every registered token in `text` with its value under `ctx`.
pub fn resolve(text: &str, ctx: &MergeContext) -> String {
    MergeField::ordered()
        .into_iter()
        .fold(text.to_string(), |resolved, field| {
            if resolved.contains(field.token()) {
                resolved.replace(field.token(), &field.value(ctx))
            } else {
                resolved
            }
        })
}

pub fn render(subject: &str, body: &str, ctx: &MergeContext) -> RenderedMessage {
    RenderedMessage {
        subject: resolve(subject, ctx),
        body: resolve(body, ctx),
    }
}
