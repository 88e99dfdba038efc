//! Deal creation with organization and person resolution.
//!
//! One call walks `ORG_RESOLVE -> PERSON_RESOLVE -> DEAL_CREATE`, skipping a
//! resolve step when its inputs are absent or its id was given directly. A failed resolution ends the call
//! before the deal is posted. Records already created remotely stay in place;
//! a retry finds them through search.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::deal::{coerce_deal_value, deal_url, NewDeal};
use crate::errors::{ResolveError, TransportFailure};
use crate::pipedrive::records::create_deal;
use crate::pipedrive::CrmTransport;
use crate::reconcile::{OrganizationLookup, PersonLookup, Reconciler, Resolution};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DealRequest {
    pub title: String,
    pub value: Value,
    /// Known organization id; linked as is, without a lookup.
    pub org_id: Option<i64>,
    /// Known person id; linked as is, without a lookup.
    pub person_id: Option<i64>,
    pub person: PersonLookup,
    pub organization: OrganizationLookup,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DealOutcome {
    /// The remote envelope, enriched with `deal_url` and the names of the
    /// records that were resolved.
    Created(Value),
    ResolutionFailed { error: String },
    CreateFailed(TransportFailure),
}

impl DealOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Created(value) => value,
            Self::ResolutionFailed { error } => json!({ "error": error, "success": false }),
            Self::CreateFailed(failure) => failure.to_value(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DealOrchestrator<T> {
    reconciler: Reconciler<T>,
    domain: String,
}

impl<T> DealOrchestrator<T>
where
    T: CrmTransport,
{
    pub fn new(reconciler: Reconciler<T>, domain: impl Into<String>) -> Self {
        Self { reconciler, domain: domain.into() }
    }

    pub fn reconciler(&self) -> &Reconciler<T> {
        &self.reconciler
    }

    pub async fn create_deal(&self, request: DealRequest) -> DealOutcome {
        let value = coerce_deal_value(&request.value);

        let organization = if request.org_id.is_some() || request.organization.is_empty() {
            None
        } else {
            match self.reconciler.get_or_create_organization(&request.organization).await {
                Ok(resolution) => Some(resolution),
                Err(error) => return resolution_failed(request.organization.name.as_deref(), error),
            }
        };
        let org_id = request.org_id.or_else(|| organization.as_ref().map(Resolution::id));

        let person = if request.person_id.is_some() || request.person.is_empty() {
            None
        } else {
            match self.reconciler.get_or_create_person(&request.person, org_id).await {
                Ok(resolution) => Some(resolution),
                Err(error) => return resolution_failed(request.person.name.as_deref(), error),
            }
        };
        let person_id = request.person_id.or_else(|| person.as_ref().map(Resolution::id));

        let deal = NewDeal { title: request.title.clone(), value, org_id, person_id };
        let response = match create_deal(self.reconciler.transport(), &deal).await {
            Ok(response) => response,
            Err(failure) => {
                warn!(
                    event_name = "deal.create.failed",
                    error = %failure,
                    "deal creation request failed"
                );
                return DealOutcome::CreateFailed(failure);
            }
        };

        let deal_id = response.data_id();
        info!(
            event_name = "deal.create.completed",
            deal_id = deal_id,
            org_id = org_id,
            person_id = person_id,
            org_created = organization.as_ref().is_some_and(Resolution::was_created),
            person_created = person.as_ref().is_some_and(Resolution::was_created),
            "deal created"
        );

        let mut enriched = response.body;
        if let Value::Object(fields) = &mut enriched {
            if let Some(deal_id) = deal_id {
                fields.insert("deal_url".to_string(), json!(deal_url(&self.domain, deal_id)));
            }
            if let Some(name) = resolved_name(organization.as_ref()) {
                fields.insert("organization_name".to_string(), json!(name));
            }
            if let Some(name) = resolved_name(person.as_ref()) {
                fields.insert("person_name".to_string(), json!(name));
            }
        }
        DealOutcome::Created(enriched)
    }
}

fn resolved_name(resolution: Option<&Resolution>) -> Option<&str> {
    resolution.map(Resolution::name).filter(|name| !name.is_empty())
}

fn resolution_failed(name: Option<&str>, error: ResolveError) -> DealOutcome {
    let entity = error.entity();
    warn!(
        event_name = "deal.resolve.failed",
        entity = entity.as_str(),
        error = %error,
        "entity resolution failed; deal not created"
    );
    let label = name.map(|name| format!(" `{name}`")).unwrap_or_default();
    DealOutcome::ResolutionFailed { error: format!("could not resolve {entity}{label}: {error}") }
}
