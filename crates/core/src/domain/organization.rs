use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RecordSummary;

pub type OrganizationId = i64;
pub type OrganizationSummary = RecordSummary;

/// Pipedrive `visible_to` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Visibility {
    /// Owner and followers.
    Owner = 1,
    /// Entire company.
    Company = 3,
    /// Owner, followers and their visibility group.
    OwnerGroup = 5,
    /// Entire company, group-aware accounts.
    CompanyGroup = 7,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("visible_to must be one of 1, 3, 5, 7 (got {0})")]
pub struct InvalidVisibility(pub i64);

impl From<Visibility> for u8 {
    fn from(value: Visibility) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Visibility {
    type Error = InvalidVisibility;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Visibility {
    type Error = InvalidVisibility;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Owner),
            3 => Ok(Self::Company),
            5 => Ok(Self::OwnerGroup),
            7 => Ok(Self::CompanyGroup),
            other => Err(InvalidVisibility(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Address {
    pub value: String,
}

/// Body for `POST /organizations`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewOrganization {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<Visibility>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner_id: None,
            address: None,
            visible_to: None,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_owner_id(mut self, owner_id: Option<i64>) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_address(mut self, address: Option<impl Into<String>>) -> Self {
        self.address = address.map(|value| Address { value: value.into() });
        self
    }

    pub fn with_visibility(mut self, visible_to: Option<Visibility>) -> Self {
        self.visible_to = visible_to;
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }
}
