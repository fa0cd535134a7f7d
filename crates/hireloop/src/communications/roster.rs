//! CSV roster import used to seed recipient repositories.
//!
//! Expected headers: `Recipient ID, Tenant ID, Email, Candidate Name, Job Title, Company,
//! Status, Applied On`. Only the first three are required; blank optional cells are
//! treated as absent.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

use super::domain::{Recipient, RecipientId, TenantId};

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster row {row} has an empty {column}")]
    MissingValue { row: usize, column: &'static str },
    #[error("roster row {row} has an unreadable application date '{value}'")]
    InvalidDate { row: usize, value: String },
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Recipient>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Recipient>, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut recipients = Vec::new();

        for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
            // header is line 1
            let row = index + 2;
            recipients.push(record?.into_recipient(row)?);
        }

        Ok(recipients)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Recipient ID")]
    id: String,
    #[serde(rename = "Tenant ID")]
    tenant: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(
        rename = "Candidate Name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    candidate_name: Option<String>,
    #[serde(rename = "Job Title", default, deserialize_with = "empty_string_as_none")]
    job_title: Option<String>,
    #[serde(rename = "Company", default, deserialize_with = "empty_string_as_none")]
    company: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(rename = "Applied On", default, deserialize_with = "empty_string_as_none")]
    applied_on: Option<String>,
}

impl RosterRow {
    fn into_recipient(self, row: usize) -> Result<Recipient, RosterImportError> {
        for (column, value) in [
            ("Recipient ID", &self.id),
            ("Tenant ID", &self.tenant),
            ("Email", &self.email),
        ] {
            if value.is_empty() {
                return Err(RosterImportError::MissingValue { row, column });
            }
        }

        let applied_on = match self.applied_on {
            Some(raw) => Some(
                parse_date(&raw).ok_or(RosterImportError::InvalidDate { row, value: raw })?,
            ),
            None => None,
        };

        Ok(Recipient {
            id: RecipientId(self.id),
            tenant_id: TenantId(self.tenant),
            address: self.email,
            candidate_name: self.candidate_name,
            job_title: self.job_title,
            company_name: self.company,
            status: self.status,
            applied_on,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}
