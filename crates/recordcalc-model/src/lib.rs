#![forbid(unsafe_code)]

//! Boundary types shared between the record/property store and the formula
//! engine.
//!
//! The store owns records and their properties; the engine only ever sees the
//! pieces modeled here: opaque record/collection identifiers, the declared
//! property catalog used for static validation, and the acting user's
//! identity. The engine crate depends on this one, never the reverse.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a record inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque identifier of the collection (database) that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub String);

impl CollectionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Declared type of a record property, as configured in the collection schema.
///
/// This is the store's vocabulary, not the formula language's: the engine maps
/// each variant onto its own static type during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Number,
    Checkbox,
    Date,
    Select,
    MultiSelect,
    Url,
    Email,
    Phone,
    Formula,
    Relation,
    CreatedTime,
    UpdatedTime,
}

impl PropertyType {
    /// `true` for property types whose value is itself derived (and therefore
    /// a candidate source of dependency cycles).
    #[must_use]
    pub fn is_computed(self) -> bool {
        matches!(
            self,
            PropertyType::Formula | PropertyType::CreatedTime | PropertyType::UpdatedTime
        )
    }
}

/// One entry of a collection's property catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_type: PropertyType,
}

impl PropertyDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
        }
    }
}

/// The declared properties of a collection, queryable by name.
///
/// Property names are compared case-insensitively, matching how the store
/// resolves them in filters and sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCatalog {
    properties: Vec<PropertyDescriptor>,
}

impl PropertyCatalog {
    #[must_use]
    pub fn new(properties: Vec<PropertyDescriptor>) -> Self {
        Self { properties }
    }

    pub fn push(&mut self, descriptor: PropertyDescriptor) {
        self.properties.push(descriptor);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl FromIterator<PropertyDescriptor> for PropertyCatalog {
    fn from_iter<T: IntoIterator<Item = PropertyDescriptor>>(iter: T) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}

/// The acting user, as resolved by the (external) auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

impl UserIdentity {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn catalog_lookup_is_case_insensitive() {
        let catalog: PropertyCatalog = [
            PropertyDescriptor::new("Price", PropertyType::Number),
            PropertyDescriptor::new("Tax", PropertyType::Number),
        ]
        .into_iter()
        .collect();

        assert!(catalog.contains("price"));
        assert!(catalog.contains("PRICE"));
        assert_eq!(
            catalog.get("tax").map(|p| p.property_type),
            Some(PropertyType::Number)
        );
        assert!(!catalog.contains("Total"));
    }

    #[test]
    fn computed_property_types() {
        assert!(PropertyType::Formula.is_computed());
        assert!(PropertyType::CreatedTime.is_computed());
        assert!(!PropertyType::Number.is_computed());
    }

    #[test]
    fn property_type_serializes_snake_case() {
        let json = serde_json::to_string(&PropertyType::MultiSelect).unwrap();
        assert_eq!(json, "\"multi_select\"");
    }
}
