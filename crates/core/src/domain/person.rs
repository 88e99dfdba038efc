use serde::Serialize;

use super::{ContactEntry, RecordSummary};

pub type PersonId = i64;
pub type PersonSummary = RecordSummary;

/// Body for `POST /persons`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ContactEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<ContactEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), emails: Vec::new(), phones: Vec::new(), org_id: None }
    }

    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails = ContactEntry::list(emails);
        self
    }

    pub fn with_phones<I, S>(mut self, phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = ContactEntry::list(phones);
        self
    }

    pub fn with_org_id(mut self, org_id: Option<i64>) -> Self {
        self.org_id = org_id;
        self
    }
}
