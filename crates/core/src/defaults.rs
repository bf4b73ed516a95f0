//! Per-project and per-space creation defaults
//!
//! Creation commands collect the fields the user passed explicitly into a
//! [`FieldMap`]; [`resolve_defaults`] fills the gaps from the defaults
//! configured for the target project or space.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const ISSUE_TYPE: &str = "issue_type";
pub const PRIORITY: &str = "priority";
pub const PARENT_PAGE: &str = "parent_page";
pub const LABELS: &str = "labels";

/// Fields that may be filled from configured defaults.
pub const RECOGNIZED_FIELDS: [&str; 4] = [ISSUE_TYPE, PRIORITY, PARENT_PAGE, LABELS];

/// A single field value: most are strings, labels are lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Blank strings and lists holding only blank strings are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Vec<String> {
        match self {
            FieldValue::Text(text) => vec![text.clone()],
            FieldValue::List(items) => items.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Field name to value, ordered so output is stable.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Fill unset fields from `defaults_for_key`.
///
/// For each recognized field the explicit value wins when present and
/// non-empty, then the default, otherwise the field is left out so the
/// remote API applies its own default. Other explicit fields are passed
/// through when non-empty. An explicit non-empty value is never replaced.
pub fn resolve_defaults(explicit: &FieldMap, defaults_for_key: &FieldMap) -> FieldMap {
    let mut resolved: FieldMap = explicit
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    for field in RECOGNIZED_FIELDS {
        if resolved.contains_key(field) {
            continue;
        }
        if let Some(default) = defaults_for_key.get(field).filter(|value| !value.is_empty()) {
            resolved.insert(field.to_string(), default.clone());
        }
    }

    resolved
}
