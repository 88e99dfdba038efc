//! Tool inputs exposed to agents.
//!
//! Tool and parameter names are a compatibility surface; agents already call
//! them by these exact names.

use pdops_core::{DealRequest, NewOrganization, NewPerson, OrganizationLookup, PersonLookup};
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ADD_DEAL_TOOL: &str = "add_pipedrive_deal";
pub const ADD_PERSON_TOOL: &str = "add_pipedrive_person";
pub const ADD_ORGANIZATION_TOOL: &str = "add_pipedrive_organization";

/// All tool names
pub const ALL_TOOL_NAMES: &[&str] = &[ADD_DEAL_TOOL, ADD_PERSON_TOOL, ADD_ORGANIZATION_TOOL];

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddDealInput {
    #[schemars(description = "Deal title")]
    pub title: String,

    #[schemars(description = "Deal value. Anything that is not a number is stored as 0")]
    #[serde(default)]
    pub value: Value,

    #[schemars(description = "Contact person name; found by exact match or created")]
    #[serde(default)]
    pub person_name: Option<String>,

    #[schemars(description = "Contact email; takes priority over the name when searching")]
    #[serde(default)]
    pub person_email: Option<String>,

    #[schemars(description = "Contact phone, stored on a newly created person")]
    #[serde(default)]
    pub person_phone: Option<String>,

    #[schemars(description = "Organization name; found by exact match or created")]
    #[serde(default)]
    pub org_name: Option<String>,

    #[schemars(description = "Organization tax id; takes priority over the name when searching")]
    #[serde(default)]
    pub org_tax_id: Option<String>,

    #[schemars(description = "Organization address, stored on a newly created organization")]
    #[serde(default)]
    pub org_address: Option<String>,

    #[schemars(description = "Id of an existing organization; linked directly, org_* fields are not searched")]
    #[serde(default)]
    pub org_id: Option<i64>,

    #[schemars(description = "Id of an existing person; linked directly, person_* fields are not searched")]
    #[serde(default)]
    pub person_id: Option<i64>,
}

impl From<AddDealInput> for DealRequest {
    fn from(input: AddDealInput) -> Self {
        Self {
            title: input.title,
            value: input.value,
            org_id: input.org_id,
            person_id: input.person_id,
            person: PersonLookup {
                name: present(input.person_name),
                email: present(input.person_email),
                phone: present(input.person_phone),
            },
            organization: OrganizationLookup {
                name: present(input.org_name),
                tax_id: present(input.org_tax_id),
                address: present(input.org_address),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddPersonInput {
    #[schemars(description = "Person name (required)")]
    pub name: String,

    #[schemars(description = "Email addresses, e.g. [\"user@example.com\"]; the first is primary")]
    #[serde(default)]
    pub emails: Option<Vec<String>>,

    #[schemars(description = "Phone numbers, e.g. [\"+886912345678\"]; the first is primary")]
    #[serde(default)]
    pub phones: Option<Vec<String>>,

    #[schemars(description = "Id of the organization this person belongs to")]
    #[serde(default)]
    pub org_id: Option<i64>,
}

impl From<AddPersonInput> for NewPerson {
    fn from(input: AddPersonInput) -> Self {
        NewPerson::new(input.name)
            .with_emails(input.emails.unwrap_or_default())
            .with_phones(input.phones.unwrap_or_default())
            .with_org_id(input.org_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddOrganizationInput {
    #[schemars(description = "Organization name (required)")]
    pub name: String,

    #[schemars(description = "User id of the owner")]
    #[serde(default)]
    pub owner_id: Option<i64>,

    #[schemars(description = "Organization address")]
    #[serde(default)]
    pub address: Option<String>,

    #[schemars(
        description = "Visibility: 1 owner and followers, 3 entire company, 5 owner/followers and their group, 7 entire company"
    )]
    #[serde(default)]
    pub visible_to: Option<i64>,
}

impl TryFrom<AddOrganizationInput> for NewOrganization {
    type Error = pdops_core::domain::organization::InvalidVisibility;

    fn try_from(input: AddOrganizationInput) -> Result<Self, Self::Error> {
        let visible_to = input.visible_to.map(pdops_core::Visibility::try_from).transpose()?;
        Ok(NewOrganization::new(input.name)
            .with_owner_id(input.owner_id)
            .with_address(input.address)
            .with_visibility(visible_to))
    }
}

/// Treats blank optional strings as absent. Non-blank values are kept verbatim
/// because searches match exactly.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
