//! Administrative reference data: unit codes, units, and code-to-name lookup tables.
//!
//! Province and ward codes arrive as numbers from some endpoints and as
//! strings from others. [`AdminCode`] keeps the value exactly as delivered;
//! only [`AdminCode::lookup_key`] collapses it to a string, and only for
//! table access.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An administrative-unit code in the type its source used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminCode {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

impl AdminCode {
    /// String form used to key [`LookupTable`]s.
    ///
    /// No padding or trimming is applied: `"01"` and `1` are different keys.
    /// Whole-valued floats drop their fraction, so `1.0` keys as `"1"`.
    #[must_use]
    pub fn lookup_key(&self) -> String {
        match self {
            AdminCode::Number(n) => number_key(n),
            AdminCode::Text(s) => s.clone(),
            AdminCode::Bool(b) => b.to_string(),
        }
    }

    /// A whitespace-only (or empty) text code carries no information.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, AdminCode::Text(s) if s.trim().is_empty())
    }
}

fn number_key(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            // f64's Display never prints a trailing `.0`.
            let key = f.to_string();
            return if key == "-0" { "0".to_string() } else { key };
        }
    }
    n.to_string()
}

impl fmt::Display for AdminCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lookup_key())
    }
}

impl From<&str> for AdminCode {
    fn from(value: &str) -> Self {
        AdminCode::Text(value.to_owned())
    }
}

impl From<String> for AdminCode {
    fn from(value: String) -> Self {
        AdminCode::Text(value)
    }
}

impl From<i64> for AdminCode {
    fn from(value: i64) -> Self {
        AdminCode::Number(value.into())
    }
}

impl From<bool> for AdminCode {
    fn from(value: bool) -> Self {
        AdminCode::Bool(value)
    }
}

/// A province or ward as listed by the geography service.
///
/// `name` is optional so that a nameless entry can still be read; it simply
/// never makes it into a [`LookupTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographicUnit {
    pub code: AdminCode,
    #[serde(default)]
    pub name: Option<String>,
    /// Parent province, present on ward listings only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<AdminCode>,
}

impl GeographicUnit {
    #[must_use]
    pub fn new(code: impl Into<AdminCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: Some(name.into()),
            province_code: None,
        }
    }

    #[must_use]
    pub fn in_province(mut self, province_code: impl Into<AdminCode>) -> Self {
        self.province_code = Some(province_code.into());
        self
    }

    /// Whether this unit's parent province has the same lookup key as
    /// `province_code`. Units without a parent never match.
    #[must_use]
    pub fn belongs_to(&self, province_code: &AdminCode) -> bool {
        self.province_code
            .as_ref()
            .is_some_and(|code| code.lookup_key() == province_code.lookup_key())
    }
}

/// Flat map from canonical code to display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    names: HashMap<String, String>,
}

impl LookupTable {
    /// Builds a table with one entry per named unit.
    ///
    /// Later units overwrite earlier ones with the same code. Units whose name
    /// is missing or blank are skipped without affecting the rest.
    pub fn build<'a, I>(units: I) -> Self
    where
        I: IntoIterator<Item = &'a GeographicUnit>,
    {
        let mut names = HashMap::new();
        for unit in units {
            let Some(name) = unit.name.as_deref().filter(|n| !n.trim().is_empty()) else {
                continue;
            };
            names.insert(unit.code.lookup_key(), name.to_owned());
        }
        Self { names }
    }

    #[must_use]
    pub fn get(&self, code: &AdminCode) -> Option<&str> {
        self.get_key(&code.lookup_key())
    }

    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The pair of tables the resolver reads names from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLookup {
    pub provinces: LookupTable,
    pub wards: LookupTable,
}

impl GeoLookup {
    #[must_use]
    pub fn build(provinces: &[GeographicUnit], wards: &[GeographicUnit]) -> Self {
        Self {
            provinces: LookupTable::build(provinces),
            wards: LookupTable::build(wards),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty() && self.wards.is_empty()
    }
}
