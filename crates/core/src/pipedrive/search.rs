//! Exact-match lookups against the Pipedrive search endpoints.
//!
//! Matching is verbatim: `"Acme "` and `"acme"` do not find `"Acme"`.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{CrmTransport, RemoteRequest, ORGANIZATIONS_SEARCH_PATH, PERSONS_SEARCH_PATH};
use crate::domain::organization::OrganizationSummary;
use crate::domain::person::PersonSummary;
use crate::domain::RecordSummary;
use crate::errors::TransportFailure;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    Found(T),
    NotFound,
    TransportError(TransportFailure),
}

impl<T> SearchOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::TransportError(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Which field a search term is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Email,
    CustomFields,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CustomFields => "custom_fields",
        }
    }
}

/// Builds an exact-match, single-result search request.
pub fn search_request(path: &str, term: &str, field: SearchField) -> RemoteRequest {
    RemoteRequest::get(path)
        .with_query("term", term)
        .with_query("fields", field.as_str())
        .with_query("exact_match", "true")
        .with_query("limit", "1")
}

/// Looks a person up by email when one is given, otherwise by name.
pub async fn search_person<T>(
    transport: &T,
    name: Option<&str>,
    email: Option<&str>,
) -> SearchOutcome<PersonSummary>
where
    T: CrmTransport + ?Sized,
{
    let (term, field) = match (non_blank(email), non_blank(name)) {
        (Some(email), _) => (email, SearchField::Email),
        (None, Some(name)) => (name, SearchField::Name),
        (None, None) => return SearchOutcome::NotFound,
    };

    run_search(transport, PERSONS_SEARCH_PATH, term, field).await
}

/// Looks an organization up by tax id when both a tax id and its custom field
/// key are known, otherwise by name.
pub async fn search_organization<T>(
    transport: &T,
    name: Option<&str>,
    tax_id: Option<&str>,
    tax_id_field: Option<&str>,
) -> SearchOutcome<OrganizationSummary>
where
    T: CrmTransport + ?Sized,
{
    let by_tax_id = non_blank(tax_id).filter(|_| tax_id_field.is_some());
    let (term, field) = match (by_tax_id, non_blank(name)) {
        (Some(tax_id), _) => (tax_id, SearchField::CustomFields),
        (None, Some(name)) => (name, SearchField::Name),
        (None, None) => return SearchOutcome::NotFound,
    };

    run_search(transport, ORGANIZATIONS_SEARCH_PATH, term, field).await
}

async fn run_search<T>(
    transport: &T,
    path: &str,
    term: &str,
    field: SearchField,
) -> SearchOutcome<RecordSummary>
where
    T: CrmTransport + ?Sized,
{
    let response = match transport.request(search_request(path, term, field)).await {
        Ok(response) => response,
        Err(failure) => return SearchOutcome::TransportError(failure),
    };

    match first_item(&response.body) {
        Some(summary) => {
            debug!(path, field = field.as_str(), id = summary.id, "search matched a record");
            SearchOutcome::Found(summary)
        }
        None => {
            debug!(path, field = field.as_str(), "search matched nothing");
            SearchOutcome::NotFound
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    item: RecordSummary,
}

fn first_item(body: &Value) -> Option<RecordSummary> {
    let data = body.get("data")?;
    let data = SearchData::deserialize(data).ok()?;
    data.items.into_iter().next().map(|hit| hit.item)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
