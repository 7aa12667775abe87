//! Entity schema data structures
//!
//! This module defines the structures describing entity collections, plus the
//! fixed set of example collections created by `setup-example-collections`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Integer,
    Decimal,
    Boolean,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "String",
            AttributeType::Integer => "Integer",
            AttributeType::Decimal => "Decimal",
            AttributeType::Boolean => "Boolean",
        };
        write!(f, "{}", name)
    }
}

/// Attribute of an entity collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    /// Attribute name
    pub name: String,
    /// Value type
    pub attribute_type: AttributeType,
    /// Whether values must be unique within the collection
    #[serde(default)]
    pub unique: bool,
    /// Whether the attribute can be used in filters
    #[serde(default)]
    pub filterable: bool,
    /// Whether the attribute can be used for ordering
    #[serde(default)]
    pub sortable: bool,
    /// Whether values differ per locale
    #[serde(default)]
    pub localized: bool,
}

impl AttributeSchema {
    /// Create a plain attribute
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            unique: false,
            filterable: false,
            sortable: false,
            localized: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }
}

impl fmt::Display for AttributeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.attribute_type)?;
        if self.unique {
            write!(f, " UNIQUE")?;
        }
        if self.filterable {
            write!(f, " FILTERABLE")?;
        }
        if self.sortable {
            write!(f, " SORTABLE")?;
        }
        if self.localized {
            write!(f, " LOCALIZED")?;
        }
        Ok(())
    }
}

/// How many referenced entities an entity may point to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

/// Reference from one entity collection to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSchema {
    /// Reference name
    pub name: String,
    /// Referenced entity collection
    pub entity_type: String,
    /// Allowed cardinality
    pub cardinality: Cardinality,
}

/// Schema of an entity collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Entity collection name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether entities form a tree
    #[serde(default)]
    pub hierarchical: bool,
    /// Attributes
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    /// References to other collections
    #[serde(default)]
    pub references: Vec<ReferenceSchema>,
}

impl EntitySchema {
    /// Create an empty schema for the given entity type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            hierarchical: false,
            attributes: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hierarchical(mut self) -> Self {
        self.hierarchical = true;
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_reference(
        mut self,
        name: impl Into<String>,
        entity_type: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.references.push(ReferenceSchema {
            name: name.into(),
            entity_type: entity_type.into(),
            cardinality,
        });
        self
    }
}

/// The fixed set of collections defined by `setup-example-collections`
///
/// Referenced collections come before the collections referencing them.
pub fn example_schemas() -> Vec<EntitySchema> {
    vec![
        EntitySchema::new("Brand")
            .with_description("Manufacturer of products")
            .with_attribute(AttributeSchema::new("code", AttributeType::String).unique())
            .with_attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .filterable()
                    .sortable(),
            ),
        EntitySchema::new("Category")
            .with_description("Product category tree")
            .hierarchical()
            .with_attribute(AttributeSchema::new("code", AttributeType::String).unique())
            .with_attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .localized()
                    .filterable(),
            ),
        EntitySchema::new("Product")
            .with_description("Sellable product")
            .with_attribute(AttributeSchema::new("code", AttributeType::String).unique())
            .with_attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .localized()
                    .filterable()
                    .sortable(),
            )
            .with_attribute(
                AttributeSchema::new("price", AttributeType::Decimal)
                    .filterable()
                    .sortable(),
            )
            .with_attribute(AttributeSchema::new("available", AttributeType::Boolean).filterable())
            .with_reference("brand", "Brand", Cardinality::ZeroOrOne)
            .with_reference("categories", "Category", Cardinality::ZeroOrMore),
    ]
}
