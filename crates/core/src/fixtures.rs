//! In-memory stand-in for the Pipedrive API.
//!
//! Mirrors the subset of v2 behaviour the tool server depends on: exact-match
//! search with `limit`, record creation with sequential ids, and the
//! `{success, data}` envelope. Every request is recorded, and failures can be
//! injected per method and path.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::errors::TransportFailure;
use crate::pipedrive::{
    CrmTransport, RemoteRequest, RemoteResponse, DEALS_PATH, ORGANIZATIONS_PATH,
    ORGANIZATIONS_SEARCH_PATH, PERSONS_PATH, PERSONS_SEARCH_PATH,
};

#[derive(Debug, Default)]
pub struct InMemoryPipedrive {
    tax_id_field: Option<String>,
    state: Mutex<FakeState>,
}

#[derive(Debug)]
struct FakeState {
    next_id: i64,
    persons: Vec<Value>,
    organizations: Vec<Value>,
    deals: Vec<Value>,
    calls: Vec<RemoteRequest>,
    failures: HashMap<(Method, String), u16>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            next_id: 1,
            persons: Vec::new(),
            organizations: Vec::new(),
            deals: Vec::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }
}

impl FakeState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl InMemoryPipedrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom field key under which organization tax ids are stored.
    pub fn with_tax_id_field(mut self, key: impl Into<String>) -> Self {
        self.tax_id_field = Some(key.into());
        self
    }

    pub fn seed_person(&self, name: &str, email: Option<&str>) -> i64 {
        let mut state = self.lock();
        let id = state.allocate_id();
        let emails: Vec<Value> = email
            .map(|email| json!({ "value": email, "primary": true, "label": "work" }))
            .into_iter()
            .collect();
        state.persons.push(json!({ "id": id, "name": name, "emails": emails }));
        id
    }

    pub fn seed_organization(&self, name: &str, tax_id: Option<&str>) -> i64 {
        let mut state = self.lock();
        let id = state.allocate_id();
        let mut custom_fields = Map::new();
        if let (Some(key), Some(tax_id)) = (&self.tax_id_field, tax_id) {
            custom_fields.insert(key.clone(), json!(tax_id));
        }
        state
            .organizations
            .push(json!({ "id": id, "name": name, "custom_fields": custom_fields }));
        id
    }

    /// Makes every `method path` request fail with `status`.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.lock().failures.insert((method, path.to_string()), status);
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, method: Method, path: &str) -> usize {
        self.lock().calls.iter().filter(|call| call.method == method && call.path == path).count()
    }

    pub fn persons(&self) -> Vec<Value> {
        self.lock().persons.clone()
    }

    pub fn organizations(&self) -> Vec<Value> {
        self.lock().organizations.clone()
    }

    pub fn deals(&self) -> Vec<Value> {
        self.lock().deals.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn search(&self, records: &[Value], request: &RemoteRequest) -> Value {
        let term = request.query_value("term").unwrap_or_default();
        let field = request.query_value("fields").unwrap_or("name");
        let limit = request
            .query_value("limit")
            .and_then(|limit| limit.parse::<usize>().ok())
            .unwrap_or(usize::MAX);

        let items: Vec<Value> = records
            .iter()
            .filter(|record| self.matches(record, field, term))
            .take(limit)
            .map(|record| json!({ "result_score": 1.0, "item": record }))
            .collect();

        json!({ "success": true, "data": { "items": items } })
    }

    fn matches(&self, record: &Value, field: &str, term: &str) -> bool {
        match field {
            "name" => record.get("name").and_then(Value::as_str) == Some(term),
            "email" => record
                .get("emails")
                .and_then(Value::as_array)
                .is_some_and(|emails| {
                    emails.iter().any(|email| email.get("value").and_then(Value::as_str) == Some(term))
                }),
            "custom_fields" => match &self.tax_id_field {
                Some(key) => {
                    record.pointer(&format!("/custom_fields/{key}")).and_then(Value::as_str)
                        == Some(term)
                }
                None => false,
            },
            _ => false,
        }
    }
}

#[async_trait]
impl CrmTransport for InMemoryPipedrive {
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportFailure> {
        let failure = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            state.failures.get(&(request.method.clone(), request.path.clone())).copied()
        };

        if let Some(status) = failure {
            return Err(TransportFailure::status(
                request.method.as_str(),
                &request.path,
                status,
                "Injected Failure",
                json!({ "success": false, "error": "injected failure" }).to_string(),
            ));
        }

        let body = match (request.method.as_str(), request.path.as_str()) {
            ("GET", PERSONS_SEARCH_PATH) => {
                let persons = self.persons();
                self.search(&persons, &request)
            }
            ("GET", ORGANIZATIONS_SEARCH_PATH) => {
                let organizations = self.organizations();
                self.search(&organizations, &request)
            }
            ("POST", PERSONS_PATH) => self.insert(request.body.clone(), |state| &mut state.persons),
            ("POST", ORGANIZATIONS_PATH) => {
                self.insert(request.body.clone(), |state| &mut state.organizations)
            }
            ("POST", DEALS_PATH) => self.insert(request.body.clone(), |state| &mut state.deals),
            (method, path) => {
                return Err(TransportFailure::status(
                    method,
                    path,
                    404,
                    "Not Found",
                    json!({ "success": false, "error": "unknown route" }).to_string(),
                ))
            }
        };

        Ok(RemoteResponse { status: 200, body })
    }
}

impl InMemoryPipedrive {
    fn insert(
        &self,
        body: Option<Value>,
        table: impl FnOnce(&mut FakeState) -> &mut Vec<Value>,
    ) -> Value {
        let mut state = self.lock();
        let id = state.allocate_id();
        let mut record = match body {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        record.insert("id".to_string(), json!(id));
        let record = Value::Object(record);
        table(&mut state).push(record.clone());

        json!({ "success": true, "data": record })
    }
}
