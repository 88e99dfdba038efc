//! Integration tests for the Pipedrive MCP server
//!
//! Drive the tool methods against the in-memory Pipedrive fake and check the
//! JSON objects agents receive.

use std::sync::Arc;

use pdops_core::config::SearchFailurePolicy;
use pdops_core::fixtures::InMemoryPipedrive;
use pdops_core::ReconcileOptions;
use pdops_mcp::{
    AddDealInput, AddOrganizationInput, AddPersonInput, PipedriveMcpServer, ALL_TOOL_NAMES,
};
use reqwest::Method;
use serde_json::{json, Value};

fn server_with(crm: &Arc<InMemoryPipedrive>, options: ReconcileOptions) -> PipedriveMcpServer {
    PipedriveMcpServer::new(crm.clone(), options, "acme.pipedrive.com")
}

fn server(crm: &Arc<InMemoryPipedrive>) -> PipedriveMcpServer {
    server_with(
        crm,
        ReconcileOptions { tax_id_field: Some("taxfield".to_string()), ..ReconcileOptions::default() },
    )
}

fn deal_input(value: Value) -> AddDealInput {
    serde_json::from_value(value).expect("deal input")
}

#[test]
fn test_tool_names_are_stable() {
    assert_eq!(
        ALL_TOOL_NAMES,
        &["add_pipedrive_deal", "add_pipedrive_person", "add_pipedrive_organization"]
    );
}

#[tokio::test]
async fn deal_with_new_org_and_person() {
    let crm = Arc::new(InMemoryPipedrive::new().with_tax_id_field("taxfield"));

    let value = server(&crm)
        .add_deal(deal_input(json!({
            "title": "Q1 Renewal",
            "value": "1500",
            "person_name": "Ada Lovelace",
            "person_email": "ada@acme.test",
            "person_phone": "+886912345678",
            "org_name": "Acme",
            "org_tax_id": "12345678",
            "org_address": "Main St 1",
        })))
        .await;

    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["value"].as_f64(), Some(1500.0));
    assert_eq!(value["organization_name"], "Acme");
    assert_eq!(value["person_name"], "Ada Lovelace");
    let deal_id = value["data"]["id"].as_i64().expect("deal id");
    assert_eq!(value["deal_url"], format!("https://acme.pipedrive.com/deal/{deal_id}"));

    let organization = crm.organizations()[0].clone();
    assert_eq!(organization["custom_fields"]["taxfield"], "12345678");
    assert_eq!(organization["address"]["value"], "Main St 1");
    let person = crm.persons()[0].clone();
    assert_eq!(person["org_id"], organization["id"]);
    assert_eq!(person["phones"][0]["value"], "+886912345678");
    assert_eq!(person["phones"][0]["primary"], true);
}

#[tokio::test]
async fn repeating_a_deal_reuses_org_and_person() {
    let crm = Arc::new(InMemoryPipedrive::new().with_tax_id_field("taxfield"));
    let server = server(&crm);
    let input = json!({
        "title": "Upsell",
        "value": 10,
        "person_email": "ada@acme.test",
        "person_name": "Ada",
        "org_name": "Acme",
        "org_tax_id": "12345678",
    });

    let first = server.add_deal(deal_input(input.clone())).await;
    let second = server.add_deal(deal_input(input)).await;

    assert_eq!(crm.organizations().len(), 1);
    assert_eq!(crm.persons().len(), 1);
    assert_eq!(crm.deals().len(), 2);
    assert_eq!(first["data"]["org_id"], second["data"]["org_id"]);
    assert_eq!(first["data"]["person_id"], second["data"]["person_id"]);
}

#[tokio::test]
async fn deal_echoes_names_of_matched_records() {
    let crm = Arc::new(InMemoryPipedrive::new().with_tax_id_field("taxfield"));
    let org_id = crm.seed_organization("Acme Holdings", Some("12345678"));
    crm.seed_person("Ada Lovelace", Some("ada@acme.test"));

    let value = server(&crm)
        .add_deal(deal_input(json!({
            "title": "Renewal",
            "value": 100,
            "org_name": "AnyName",
            "org_tax_id": "12345678",
            "person_name": "A. L.",
            "person_email": "ada@acme.test",
        })))
        .await;

    assert_eq!(value["data"]["org_id"], org_id);
    assert_eq!(value["organization_name"], "Acme Holdings");
    assert_eq!(value["person_name"], "Ada Lovelace");
    assert_eq!(crm.organizations().len(), 1);
}

#[tokio::test]
async fn deal_links_ids_returned_by_the_standalone_tools() {
    let crm = Arc::new(InMemoryPipedrive::new());
    let server = server(&crm);
    let organization = server
        .add_organization(AddOrganizationInput {
            name: "Initech".to_string(),
            owner_id: None,
            address: None,
            visible_to: None,
        })
        .await;
    let org_id = organization["data"]["id"].as_i64().expect("org id");

    let value = server
        .add_deal(deal_input(json!({
            "title": "Staplers",
            "value": 30,
            "org_id": org_id,
            "org_name": "Initech",
        })))
        .await;

    assert_eq!(value["data"]["org_id"], org_id);
    assert_eq!(crm.count_calls(Method::GET, "/organizations/search"), 0);
    assert_eq!(crm.organizations().len(), 1);
}

#[tokio::test]
async fn deal_with_unparseable_value_stores_zero() {
    let crm = Arc::new(InMemoryPipedrive::new());

    let value = server(&crm).add_deal(deal_input(json!({ "title": "Q1", "value": "oops" }))).await;

    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["value"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn escalated_search_failure_blocks_the_deal() {
    let crm = Arc::new(InMemoryPipedrive::new());
    crm.fail(Method::GET, "/organizations/search", 503);
    let options = ReconcileOptions {
        search_failure: SearchFailurePolicy::Escalate,
        ..ReconcileOptions::default()
    };

    let value = server_with(&crm, options)
        .add_deal(deal_input(json!({ "title": "Q1", "value": 1, "org_name": "Acme" })))
        .await;

    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().is_some_and(|error| error.contains("Acme")));
    assert_eq!(crm.count_calls(Method::POST, "/organizations"), 0);
    assert!(crm.deals().is_empty());
}

#[tokio::test]
async fn add_person_labels_contacts() {
    let crm = Arc::new(InMemoryPipedrive::new());

    let value = server(&crm)
        .add_person(AddPersonInput {
            name: "Grace".to_string(),
            emails: Some(vec!["grace@navy.test".to_string(), "grace@home.test".to_string()]),
            phones: None,
            org_id: Some(42),
        })
        .await;

    assert_eq!(value["success"], true);
    let sent = crm.calls()[0].body.clone().expect("person payload");
    assert_eq!(
        sent,
        json!({
            "name": "Grace",
            "emails": [
                { "value": "grace@navy.test", "label": "work", "primary": true },
                { "value": "grace@home.test", "label": "work", "primary": false },
            ],
            "org_id": 42,
        })
    );
}

#[tokio::test]
async fn add_person_never_searches() {
    let crm = Arc::new(InMemoryPipedrive::new());
    crm.seed_person("Grace", None);

    server(&crm)
        .add_person(AddPersonInput { name: "Grace".to_string(), emails: None, phones: None, org_id: None })
        .await;

    assert_eq!(crm.count_calls(Method::GET, "/persons/search"), 0);
    assert_eq!(crm.persons().len(), 2);
}

#[tokio::test]
async fn add_organization_forwards_optional_fields() {
    let crm = Arc::new(InMemoryPipedrive::new());

    let value = server(&crm)
        .add_organization(AddOrganizationInput {
            name: "Initech".to_string(),
            owner_id: Some(7),
            address: Some("1 Loop".to_string()),
            visible_to: Some(3),
        })
        .await;

    assert_eq!(value["success"], true);
    let sent = crm.calls()[0].body.clone().expect("organization payload");
    assert_eq!(
        sent,
        json!({ "name": "Initech", "owner_id": 7, "address": { "value": "1 Loop" }, "visible_to": 3 })
    );
}

#[tokio::test]
async fn add_organization_rejects_bad_visibility_without_calling_out() {
    let crm = Arc::new(InMemoryPipedrive::new());

    let value = server(&crm)
        .add_organization(AddOrganizationInput {
            name: "Initech".to_string(),
            owner_id: None,
            address: None,
            visible_to: Some(4),
        })
        .await;

    assert_eq!(value["success"], false);
    assert!(value["error"].is_string());
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn add_organization_surfaces_transport_failure() {
    let crm = Arc::new(InMemoryPipedrive::new());
    crm.fail(Method::POST, "/organizations", 401);

    let value = server(&crm)
        .add_organization(AddOrganizationInput {
            name: "Initech".to_string(),
            owner_id: None,
            address: None,
            visible_to: None,
        })
        .await;

    assert_eq!(value["success"], false);
    assert_eq!(value["status_code"], 401);
    assert!(value["response"].is_string());
}
