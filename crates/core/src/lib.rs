pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod orchestrator;
pub mod pipedrive;
pub mod reconcile;

pub use domain::organization::{NewOrganization, Visibility};
pub use domain::person::NewPerson;
pub use errors::{EntityKind, ResolveError, TransportFailure};
pub use orchestrator::{DealOrchestrator, DealOutcome, DealRequest};
pub use pipedrive::{CrmTransport, PipedriveClient, RemoteRequest, RemoteResponse};
pub use reconcile::{OrganizationLookup, PersonLookup, ReconcileOptions, Reconciler, Resolution};
