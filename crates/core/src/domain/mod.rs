//! Request payloads and response summaries for Pipedrive records.
//!
//! Payload structs only serialize the fields that were provided, so an
//! absent optional never reaches the remote API as `null`.

pub mod deal;
pub mod organization;
pub mod person;

use serde::{Deserialize, Serialize};

/// A labelled email or phone entry. The first entry of a list is primary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub value: String,
    pub primary: bool,
    pub label: String,
}

impl ContactEntry {
    pub const DEFAULT_LABEL: &'static str = "work";

    pub fn list<I, S>(values: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| Self {
                value: value.into(),
                primary: index == 0,
                label: Self::DEFAULT_LABEL.to_string(),
            })
            .collect()
    }
}

/// The `{id, name}` part of a search hit. Other fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RecordSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::ContactEntry;

    #[test]
    fn only_first_entry_is_primary() {
        let entries = ContactEntry::list(["a@example.com", "b@example.com", "c@example.com"]);

        assert_eq!(entries.len(), 3);
        assert!(entries[0].primary);
        assert!(entries[1..].iter().all(|entry| !entry.primary));
        assert!(entries.iter().all(|entry| entry.label == "work"));
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(ContactEntry::list(Vec::<String>::new()).is_empty());
    }
}
