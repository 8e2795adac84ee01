//! Header-driven record mapping and normalization into [`NormalizedUser`].

use crate::fields::FieldList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const FIRST_NAME: &str = "name.firstName";
pub const LAST_NAME: &str = "name.lastName";
pub const AGE: &str = "age";
pub const ADDRESS_LINE1: &str = "address.line1";
pub const ADDRESS_LINE2: &str = "address.line2";
pub const ADDRESS_CITY: &str = "address.city";
pub const ADDRESS_STATE: &str = "address.state";

/// Columns consumed by the fixed schema; everything else goes to `additional_info`.
pub const CONSUMED_COLUMNS: [&str; 7] = [
    FIRST_NAME,
    LAST_NAME,
    AGE,
    ADDRESS_LINE1,
    ADDRESS_LINE2,
    ADDRESS_CITY,
    ADDRESS_STATE,
];

/// One data row keyed by header name, in header order.
///
/// Header names are unique; a repeated header keeps its first position and
/// its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    entries: Vec<(String, String)>,
}

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::default();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Pairs `row` with `headers` by position.
///
/// Missing trailing values become empty strings; values past the last header
/// are dropped.
pub fn map_row(headers: &FieldList, row: FieldList) -> RawRecord {
    let mut values = row.into_iter();
    headers
        .iter()
        .map(|header| (header.clone(), values.next().unwrap_or_default()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// A validated person ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUser {
    pub name: String,
    pub age: i32,
    pub address: Address,
    pub additional_info: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Both name parts are blank.
    MissingName,
    /// Age column is absent or its value is not a number.
    InvalidAge,
    /// The record passed validation but cannot be stored.
    Rejected(String),
}

impl SkipReason {
    /// Validation skips are silent; rejections are reported.
    pub fn is_validation(&self) -> bool {
        matches!(self, SkipReason::MissingName | SkipReason::InvalidAge)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingName => f.write_str("missing name"),
            SkipReason::InvalidAge => f.write_str("age is not a number"),
            SkipReason::Rejected(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Kept(NormalizedUser),
    Skipped(SkipReason),
}

/// Validates `record` and builds the persistable user from it.
pub fn normalize(record: &RawRecord) -> Normalized {
    let first = record.get(FIRST_NAME).unwrap_or_default().trim();
    let last = record.get(LAST_NAME).unwrap_or_default().trim();
    let age = record.get(AGE).and_then(parse_number);

    if first.is_empty() && last.is_empty() {
        return Normalized::Skipped(SkipReason::MissingName);
    }
    let Some(age) = age else {
        return Normalized::Skipped(SkipReason::InvalidAge);
    };
    let age = match whole_age(age) {
        Ok(age) => age,
        Err(reason) => return Normalized::Skipped(reason),
    };
    if let Some((column, _)) = record
        .iter()
        .find(|(key, value)| key.contains('\0') || value.contains('\0'))
    {
        return Normalized::Skipped(SkipReason::Rejected(format!(
            "column '{column}' contains a NUL character"
        )));
    }

    let name = format!("{first} {last}").trim().to_string();
    let address = Address {
        line1: record.get(ADDRESS_LINE1).map(str::to_string),
        line2: record.get(ADDRESS_LINE2).map(str::to_string),
        city: record.get(ADDRESS_CITY).map(str::to_string),
        state: record.get(ADDRESS_STATE).map(str::to_string),
    };

    Normalized::Kept(NormalizedUser {
        name,
        age,
        address,
        additional_info: additional_info(record),
    })
}

/// Every column outside the fixed schema, or `None` when there are none.
pub fn additional_info(record: &RawRecord) -> Option<BTreeMap<String, String>> {
    let extra: BTreeMap<String, String> = record
        .iter()
        .filter(|(key, _)| !CONSUMED_COLUMNS.contains(key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    (!extra.is_empty()).then_some(extra)
}

/// A present but blank value counts as zero; `0x`/`0o`/`0b` prefixes are accepted.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => return trimmed.parse::<f64>().ok().filter(|n| n.is_finite()),
    };
    let digits = &trimmed[2..];
    if digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, radix)
        .ok()
        .map(|n| n as f64)
}

fn whole_age(age: f64) -> Result<i32, SkipReason> {
    if age.fract() != 0.0 || age < f64::from(i32::MIN) || age > f64::from(i32::MAX) {
        return Err(SkipReason::Rejected(format!(
            "age {age} is not a whole number in range"
        )));
    }
    Ok(age as i32)
}
