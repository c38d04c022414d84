use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// A value stored inside a point's field set.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Float(value) => *value,
            FieldValue::Integer(value) => *value as f64,
        }
    }
}

/// Named field values of a single point, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet(BTreeMap<&'static str, FieldValue>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a float, rejecting NaN and infinities which the store cannot represent.
    pub fn insert_float(&mut self, key: &'static str, value: f64) -> Result<(), MapError> {
        if !value.is_finite() {
            return Err(MapError::NonFinite { field: key });
        }
        self.0.insert(key, FieldValue::Float(value));
        Ok(())
    }

    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).map(FieldValue::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which entries of a multi-entry response become points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntrySelection {
    #[default]
    First,
    All,
}

impl std::str::FromStr for EntrySelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(format!("unknown entry selection: {other}")),
        }
    }
}

/// Output of a mapper: the fields for one point and, when the payload
/// identifies its own device, the location to tag it with.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedReading {
    pub location: Option<String>,
    pub fields: FieldSet,
}

#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("{measurement} payload contains no entries")]
    EmptyPayload { measurement: &'static str },
    #[error("field {field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field {field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("location {value:?} contains control characters")]
    InvalidLocation { value: String },
}

/// A decoded payload from one of the data sources that knows how to turn
/// itself into point field sets.
pub trait SensorPayload: DeserializeOwned + Send + 'static {
    const MEASUREMENT: &'static str;

    fn readings(&self, selection: EntrySelection) -> Result<Vec<MappedReading>, MapError>;
}

/// Applies the selection to an ordered entry list; an empty list is an error
/// rather than an out-of-bounds access.
pub fn select_entries<'a, T>(
    entries: &'a [T],
    selection: EntrySelection,
    measurement: &'static str,
) -> Result<&'a [T], MapError> {
    if entries.is_empty() {
        return Err(MapError::EmptyPayload { measurement });
    }

    Ok(match selection {
        EntrySelection::First => &entries[..1],
        EntrySelection::All => entries,
    })
}

/// Normalizes a device-reported location for use as a tag value. Blank values
/// yield `None`; control characters cannot be carried by the store's wire format.
pub fn location_tag(raw: &str) -> Result<Option<String>, MapError> {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_control) {
        return Err(MapError::InvalidLocation {
            value: raw.to_string(),
        });
    }

    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
