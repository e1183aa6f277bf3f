//! Index facts and the typed elements they are rendered from

use serde::Serialize;
use std::fmt;

/// Index term for fully-qualified type names
pub const TYPE_NAME: &str = "type_name";
/// Index term for field names (scoped by owning type)
pub const FIELD_NAME: &str = "field_name";
/// Index term for field types (scoped by owning type and field)
pub const FIELD_TYPE: &str = "field_type";
/// Index term for rule attribute names
pub const RULE_ATTRIBUTE: &str = "rule_attribute";
/// Index term for rule attribute values (scoped by attribute)
pub const RULE_ATTRIBUTE_VALUE: &str = "rule_attribute_value";
/// Index term for the package an asset belongs to
pub const PACKAGE_NAME: &str = "package_name";

/// A single normalized `(key, value)` index entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fact {
    pub key: String,
    pub value: String,
}

impl Fact {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// A rule attribute usage (e.g. `salience` with its default value)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleAttribute {
    pub name: String,
    pub value: String,
}

impl RuleAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn facts(&self) -> Vec<Fact> {
        vec![
            Fact::new(RULE_ATTRIBUTE, &self.name),
            Fact::new(
                format!("{}:{}:{}", RULE_ATTRIBUTE, self.name, RULE_ATTRIBUTE_VALUE),
                &self.value,
            ),
        ]
    }
}

/// A reference to a fully-qualified type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexedType {
    pub fully_qualified_name: String,
}

impl IndexedType {
    pub fn new(fully_qualified_name: impl Into<String>) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.into(),
        }
    }

    pub fn facts(&self) -> Vec<Fact> {
        vec![Fact::new(TYPE_NAME, &self.fully_qualified_name)]
    }
}

/// A reference to a field of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeField {
    pub field_name: String,
    pub field_type: String,
    /// Fully-qualified type declaring the field
    pub owner: String,
}

impl TypeField {
    pub fn new(
        field_name: impl Into<String>,
        field_type: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: field_type.into(),
            owner: owner.into(),
        }
    }

    pub fn facts(&self) -> Vec<Fact> {
        let field_key = format!("{}:{}:{}", TYPE_NAME, self.owner, FIELD_NAME);
        vec![
            Fact::new(
                format!("{}:{}:{}", field_key, self.field_name, FIELD_TYPE),
                &self.field_type,
            ),
            Fact::new(field_key, &self.field_name),
        ]
    }
}

/// Any element an index sink accumulates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IndexElement {
    RuleAttribute(RuleAttribute),
    Type(IndexedType),
    Field(TypeField),
}

impl IndexElement {
    pub fn facts(&self) -> Vec<Fact> {
        match self {
            IndexElement::RuleAttribute(attribute) => attribute.facts(),
            IndexElement::Type(ty) => ty.facts(),
            IndexElement::Field(field) => field.facts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_facts() {
        let facts = IndexedType::new("com.acme.Person").facts();
        assert_eq!(facts, vec![Fact::new("type_name", "com.acme.Person")]);
    }

    #[test]
    fn test_field_facts_scoped_by_owner() {
        let facts = TypeField::new("age", "int", "com.acme.Person").facts();

        assert!(facts.contains(&Fact::new("type_name:com.acme.Person:field_name", "age")));
        assert!(facts.contains(&Fact::new(
            "type_name:com.acme.Person:field_name:age:field_type",
            "int"
        )));
    }

    #[test]
    fn test_rule_attribute_facts() {
        let facts = RuleAttribute::new("salience", "10").facts();

        assert!(facts.contains(&Fact::new("rule_attribute", "salience")));
        assert!(facts.contains(&Fact::new(
            "rule_attribute:salience:rule_attribute_value",
            "10"
        )));
    }

    #[test]
    fn test_fact_display() {
        let fact = Fact::new("type_name", "com.acme.Order");
        assert_eq!(fact.to_string(), "type_name = com.acme.Order");
    }

    #[test]
    fn test_element_dispatch() {
        let element = IndexElement::Field(TypeField::new("total", "double", "com.acme.Order"));
        assert_eq!(element.facts().len(), 2);
    }
}
