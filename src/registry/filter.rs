//! Column filters applied to a fetched page of registry rows.

use super::BankRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Columns callers may filter on. Any other query parameter is ignored.
pub const VALID_COLUMNS: [&str; 18] = [
    "BANK_ID",
    "BANK_TYPE",
    "REGION_ID",
    "HEADER_ID",
    "UNION_ID",
    "TCC_ID",
    "CCC_ID",
    "BANK_NAME",
    "BANK_ADRES",
    "BANK_STATU",
    "DATE_OPEN",
    "DATE_CLOSE",
    "ACTIVE",
    "DATE_ACT",
    "DATE_DEACT",
    "DISTR",
    "KOL_OBM",
    "INN",
];

/// How a filter value is compared against a row field. Both are case-insensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Field equals the value.
    Exact,
    /// Field contains the value.
    Substring,
}

impl MatchPolicy {
    #[must_use]
    pub fn matches(self, field: &str, needle: &str) -> bool {
        let field = field.to_lowercase();
        let needle = needle.to_lowercase();
        match self {
            Self::Exact => field == needle,
            Self::Substring => field.contains(&needle),
        }
    }
}

/// Column → value predicates, keyed by allow-listed column names only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet(BTreeMap<&'static str, String>);

impl FilterSet {
    /// Build from request query parameters, keeping allow-listed columns with a
    /// non-blank value. Values are trimmed.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filters = BTreeMap::new();
        for (key, value) in params {
            let Some(column) = VALID_COLUMNS.iter().find(|column| **column == key) else {
                continue;
            };
            let value = value.trim();
            if !value.is_empty() {
                filters.insert(*column, value.to_string());
            }
        }
        Self(filters)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Whether `row` satisfies every predicate under `policy`.
    #[must_use]
    pub fn matches(&self, row: &BankRecord, policy: MatchPolicy) -> bool {
        self.0
            .iter()
            .all(|(column, value)| policy.matches(&field_text(row.get(*column)), value))
    }

    /// Keep the rows that satisfy every predicate, preserving order.
    #[must_use]
    pub fn apply(&self, rows: Vec<BankRecord>, policy: MatchPolicy) -> Vec<BankRecord> {
        if self.is_empty() {
            return rows;
        }
        rows.into_iter()
            .filter(|row| self.matches(row, policy))
            .collect()
    }
}

/// Text used to compare a row field. Missing and `null` fields compare as "".
///
/// `null` is never rendered as a word like "None": `BANK_NAME=none` does not
/// match a row whose name is absent.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
