//! Get-or-create resolution of people and organizations.
//!
//! Every resolution searches before it creates. There is no idempotency key
//! across calls, so two calls with near-identical but unequal keys (a typo, a
//! trailing space, different case) each create a record.

use tracing::{info, warn};

use crate::config::{AppConfig, SearchFailurePolicy};
use crate::domain::organization::{NewOrganization, OrganizationId};
use crate::domain::person::NewPerson;
use crate::domain::RecordSummary;
use crate::errors::{EntityKind, ResolveError, TransportFailure};
use crate::pipedrive::records::{create_organization, create_person};
use crate::pipedrive::search::{search_organization, search_person, SearchOutcome};
use crate::pipedrive::{CrmTransport, RemoteResponse};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub search_failure: SearchFailurePolicy,
    /// Store the tax id on organizations created by get-or-create.
    pub forward_tax_id: bool,
    pub tax_id_field: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { search_failure: SearchFailurePolicy::NotFound, forward_tax_id: true, tax_id_field: None }
    }
}

impl From<&AppConfig> for ReconcileOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            search_failure: config.reconcile.search_failure,
            forward_tax_id: config.reconcile.forward_tax_id,
            tax_id_field: config.pipedrive.tax_id_field.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersonLookup {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PersonLookup {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    fn key(&self) -> &str {
        self.email.as_deref().or(self.name.as_deref()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrganizationLookup {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
}

impl OrganizationLookup {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tax_id.is_none()
    }

    fn key(&self) -> &str {
        self.tax_id.as_deref().or(self.name.as_deref()).unwrap_or_default()
    }
}

/// The record a lookup resolved to, and whether it already existed.
///
/// `name` is the remote record's name, which can differ from the looked-up
/// name when the match was made by email or tax id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Existing(RecordSummary),
    Created(RecordSummary),
}

impl Resolution {
    pub fn id(&self) -> i64 {
        self.summary().id
    }

    pub fn name(&self) -> &str {
        &self.summary().name
    }

    pub fn summary(&self) -> &RecordSummary {
        match self {
            Self::Existing(summary) | Self::Created(summary) => summary,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

#[derive(Clone, Debug)]
pub struct Reconciler<T> {
    transport: T,
    options: ReconcileOptions,
}

impl<T> Reconciler<T>
where
    T: CrmTransport,
{
    pub fn new(transport: T, options: ReconcileOptions) -> Self {
        Self { transport, options }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Returns the id of the person matching `lookup`, creating one when the
    /// search finds nothing. A new person is linked to `org_id` when given.
    pub async fn get_or_create_person(
        &self,
        lookup: &PersonLookup,
        org_id: Option<OrganizationId>,
    ) -> Result<Resolution, ResolveError> {
        let outcome =
            search_person(&self.transport, lookup.name.as_deref(), lookup.email.as_deref()).await;
        if let Some(existing) = self.settle(EntityKind::Person, lookup.key(), outcome)? {
            return Ok(Resolution::Existing(existing));
        }

        let Some(name) = lookup.name.as_deref() else {
            return Err(ResolveError::MissingName {
                entity: EntityKind::Person,
                key: lookup.key().to_string(),
            });
        };

        let person = NewPerson::new(name)
            .with_emails(lookup.email.clone())
            .with_phones(lookup.phone.clone())
            .with_org_id(org_id);
        let created = create_person(&self.transport, &person).await;
        let id = created_id(EntityKind::Person, name, created)?;

        info!(
            event_name = "reconcile.person.created",
            person_id = id,
            org_id = org_id,
            "created person after search found no match"
        );
        Ok(Resolution::Created(RecordSummary { id, name: name.to_string() }))
    }

    /// Returns the id of the organization matching `lookup` by tax id or
    /// name, creating one when the search finds nothing.
    pub async fn get_or_create_organization(
        &self,
        lookup: &OrganizationLookup,
    ) -> Result<Resolution, ResolveError> {
        let tax_id_field = self.options.tax_id_field.as_deref();
        let outcome = search_organization(
            &self.transport,
            lookup.name.as_deref(),
            lookup.tax_id.as_deref(),
            tax_id_field,
        )
        .await;
        if let Some(existing) = self.settle(EntityKind::Organization, lookup.key(), outcome)? {
            return Ok(Resolution::Existing(existing));
        }

        let Some(name) = lookup.name.as_deref() else {
            return Err(ResolveError::MissingName {
                entity: EntityKind::Organization,
                key: lookup.key().to_string(),
            });
        };

        let mut organization = NewOrganization::new(name).with_address(lookup.address.clone());
        if self.options.forward_tax_id {
            if let (Some(key), Some(tax_id)) = (tax_id_field, lookup.tax_id.as_deref()) {
                organization = organization.with_custom_field(key, tax_id);
            }
        }
        let created = create_organization(&self.transport, &organization).await;
        let id = created_id(EntityKind::Organization, name, created)?;

        info!(
            event_name = "reconcile.organization.created",
            org_id = id,
            tax_id_stored = !organization.custom_fields.is_empty(),
            "created organization after search found no match"
        );
        Ok(Resolution::Created(RecordSummary { id, name: name.to_string() }))
    }

    fn settle(
        &self,
        entity: EntityKind,
        key: &str,
        outcome: SearchOutcome<RecordSummary>,
    ) -> Result<Option<RecordSummary>, ResolveError> {
        match outcome {
            SearchOutcome::Found(summary) => Ok(Some(summary)),
            SearchOutcome::NotFound => Ok(None),
            SearchOutcome::TransportError(source) => match self.options.search_failure {
                SearchFailurePolicy::NotFound => {
                    warn!(
                        event_name = "reconcile.search.degraded",
                        entity = entity.as_str(),
                        error = %source,
                        "search failed; continuing as if nothing matched"
                    );
                    Ok(None)
                }
                SearchFailurePolicy::Escalate => {
                    Err(ResolveError::Search { entity, key: key.to_string(), source })
                }
            },
        }
    }
}

fn created_id(
    entity: EntityKind,
    name: &str,
    created: Result<RemoteResponse, TransportFailure>,
) -> Result<i64, ResolveError> {
    let response = created.map_err(|source| ResolveError::Create {
        entity,
        name: name.to_string(),
        source,
    })?;

    if !response.envelope_success() {
        let reason = response.envelope_error().unwrap_or("response reported success=false");
        return Err(ResolveError::Rejected {
            entity,
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    response.data_id().ok_or_else(|| ResolveError::Rejected {
        entity,
        name: name.to_string(),
        reason: "response carried no record id".to_string(),
    })
}
