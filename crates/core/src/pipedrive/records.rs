//! Plain record creation calls.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{CrmTransport, RemoteRequest, RemoteResponse, DEALS_PATH, ORGANIZATIONS_PATH, PERSONS_PATH};
use crate::domain::deal::NewDeal;
use crate::domain::organization::NewOrganization;
use crate::domain::person::NewPerson;
use crate::errors::TransportFailure;

pub async fn create_person<T>(
    transport: &T,
    person: &NewPerson,
) -> Result<RemoteResponse, TransportFailure>
where
    T: CrmTransport + ?Sized,
{
    post_record(transport, PERSONS_PATH, person).await
}

pub async fn create_organization<T>(
    transport: &T,
    organization: &NewOrganization,
) -> Result<RemoteResponse, TransportFailure>
where
    T: CrmTransport + ?Sized,
{
    post_record(transport, ORGANIZATIONS_PATH, organization).await
}

pub async fn create_deal<T>(transport: &T, deal: &NewDeal) -> Result<RemoteResponse, TransportFailure>
where
    T: CrmTransport + ?Sized,
{
    post_record(transport, DEALS_PATH, deal).await
}

async fn post_record<T, P>(
    transport: &T,
    path: &str,
    payload: &P,
) -> Result<RemoteResponse, TransportFailure>
where
    T: CrmTransport + ?Sized,
    P: Serialize + Sync,
{
    let body = serde_json::to_value(payload)
        .map_err(|error| TransportFailure::network("POST", path, format!("encode payload: {error}")))?;

    let response = transport.request(RemoteRequest::post(path, body)).await?;
    info!(
        event_name = "pipedrive.record.created",
        path,
        id = response.data_id(),
        "pipedrive record created"
    );
    Ok(response)
}

/// Tool-facing form of a creation call: the raw envelope on success, the
/// structured failure otherwise.
pub fn into_tool_value(result: Result<RemoteResponse, TransportFailure>) -> Value {
    match result {
        Ok(response) => response.body,
        Err(failure) => failure.to_value(),
    }
}
