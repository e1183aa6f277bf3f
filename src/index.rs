//! Index sink accumulating typed elements and rendering them to facts

use crate::types::{Fact, IndexElement, IndexedType, RuleAttribute, TypeField, PACKAGE_NAME};
use std::collections::{BTreeSet, HashSet};

/// Collector of index elements discovered while walking an asset.
///
/// One sink serves one indexing pass at a time. Nested indexers share it by
/// reborrowing, never across threads.
pub trait IndexBuilder {
    fn add_rule_attribute(&mut self, attribute: RuleAttribute);

    fn add_type(&mut self, ty: IndexedType);

    fn add_field(&mut self, field: TypeField);

    /// Render everything collected so far. Does not drain the sink.
    fn build(&self) -> HashSet<Fact>;
}

/// Default sink keeping a de-duplicated, ordered set of elements
#[derive(Debug, Default, Clone)]
pub struct DefaultIndexBuilder {
    package_name: Option<String>,
    elements: BTreeSet<IndexElement>,
}

impl DefaultIndexBuilder {
    /// Create a sink with no package scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that also records the asset's package at build time
    pub fn with_package(package_name: impl Into<String>) -> Self {
        let package_name = package_name.into();
        Self {
            package_name: (!package_name.is_empty()).then_some(package_name),
            elements: BTreeSet::new(),
        }
    }

    /// All collected elements, in order
    pub fn elements(&self) -> impl Iterator<Item = &IndexElement> {
        self.elements.iter()
    }

    pub fn type_count(&self) -> usize {
        self.count(|e| matches!(e, IndexElement::Type(_)))
    }

    pub fn field_count(&self) -> usize {
        self.count(|e| matches!(e, IndexElement::Field(_)))
    }

    pub fn attribute_count(&self) -> usize {
        self.count(|e| matches!(e, IndexElement::RuleAttribute(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn count(&self, predicate: impl Fn(&IndexElement) -> bool) -> usize {
        self.elements.iter().filter(|e| predicate(e)).count()
    }
}

impl IndexBuilder for DefaultIndexBuilder {
    fn add_rule_attribute(&mut self, attribute: RuleAttribute) {
        self.elements.insert(IndexElement::RuleAttribute(attribute));
    }

    fn add_type(&mut self, ty: IndexedType) {
        self.elements.insert(IndexElement::Type(ty));
    }

    fn add_field(&mut self, field: TypeField) {
        self.elements.insert(IndexElement::Field(field));
    }

    fn build(&self) -> HashSet<Fact> {
        let mut facts: HashSet<Fact> = self.elements.iter().flat_map(IndexElement::facts).collect();

        if let Some(package_name) = &self.package_name {
            facts.insert(Fact::new(PACKAGE_NAME, package_name));
        }

        facts
    }
}
