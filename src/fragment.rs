//! Free-form rule fragments and their indexer
//!
//! BRL columns embed a list of rule patterns or actions instead of a single
//! field. The table indexer wraps those items in a [`RuleFragment`] and hands
//! it to a [`FragmentIndexer`], which runs its own pass against the shared
//! sink.

use crate::error::IndexError;
use crate::index::IndexBuilder;
use crate::resolver::{TypeResolver, DEFAULT_BUILTIN_TYPES};
use crate::types::{Fact, IndexedType, TypeField};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Constraint on a single field, or a connective over nested constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldConstraint {
    Single(SingleFieldConstraint),
    Composite(CompositeFieldConstraint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleFieldConstraint {
    pub field_name: String,
    pub field_type: String,
    /// Type declaring the field, when it differs from the pattern's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SingleFieldConstraint {
    pub fn new(field_name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: field_type.into(),
            fact_type: None,
            operator: None,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFieldConstraint {
    /// `||` or `&&`
    pub connective: String,
    #[serde(default)]
    pub constraints: Vec<FieldConstraint>,
}

/// A pattern over one fact type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactPattern {
    pub fact_type: String,
    #[serde(default)]
    pub bound_name: String,
    #[serde(default)]
    pub constraints: Vec<FieldConstraint>,
}

impl FactPattern {
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            bound_name: String::new(),
            constraints: Vec::new(),
        }
    }

    pub fn bound_as(mut self, bound_name: impl Into<String>) -> Self {
        self.bound_name = bound_name.into();
        self
    }

    pub fn with_constraint(mut self, constraint: SingleFieldConstraint) -> Self {
        self.constraints.push(FieldConstraint::Single(constraint));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeOperator {
    Not,
    Exists,
    Or,
    And,
}

/// Conditional element grouping nested patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositePattern {
    pub operator: CompositeOperator,
    #[serde(default)]
    pub patterns: Vec<PatternItem>,
}

/// Raw rule-language text the indexer does not look into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeFormLine {
    pub text: String,
}

/// Left-hand side item of a rule fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PatternItem {
    Fact(FactPattern),
    Composite(CompositePattern),
    FreeForm(FreeFormLine),
}

/// A field assignment made by an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFieldValue {
    pub field: String,
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ActionFieldValue {
    pub fn new(field: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            field_type: field_type.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInsertFact {
    pub fact_type: String,
    #[serde(default)]
    pub bound_name: String,
    #[serde(default)]
    pub logical: bool,
    #[serde(default)]
    pub field_values: Vec<ActionFieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSetField {
    pub variable: String,
    /// Modify (notify the engine) rather than plain set
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub field_values: Vec<ActionFieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRetract {
    pub variable: String,
}

/// Right-hand side item of a rule fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionItem {
    InsertFact(ActionInsertFact),
    SetField(ActionSetField),
    Retract(ActionRetract),
    FreeForm(FreeFormLine),
}

/// Minimal rule synthesized from a BRL column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFragment {
    pub imports: Vec<String>,
    pub lhs: Vec<PatternItem>,
    pub rhs: Vec<ActionItem>,
}

impl RuleFragment {
    /// Fragment carrying only conditions
    pub fn with_conditions(imports: Vec<String>, lhs: Vec<PatternItem>) -> Self {
        Self {
            imports,
            lhs,
            rhs: Vec::new(),
        }
    }

    /// Fragment carrying only actions
    pub fn with_actions(imports: Vec<String>, rhs: Vec<ActionItem>) -> Self {
        Self {
            imports,
            lhs: Vec::new(),
            rhs,
        }
    }

    /// Fact type bound to `variable` anywhere in the fragment's LHS. An empty
    /// variable binds nothing.
    pub fn binding_type(&self, variable: &str) -> Option<&str> {
        if variable.is_empty() {
            return None;
        }
        find_binding(&self.lhs, variable)
    }
}

fn find_binding<'a>(items: &'a [PatternItem], variable: &str) -> Option<&'a str> {
    items.iter().find_map(|item| match item {
        PatternItem::Fact(pattern) if pattern.bound_name == variable => {
            Some(pattern.fact_type.as_str())
        }
        PatternItem::Fact(_) | PatternItem::FreeForm(_) => None,
        PatternItem::Composite(composite) => find_binding(&composite.patterns, variable),
    })
}

/// Indexes a rule fragment into a shared sink
pub trait FragmentIndexer {
    /// Run a full pass over `fragment`, returning the facts it yields
    fn index(
        &self,
        builder: &mut dyn IndexBuilder,
        fragment: &RuleFragment,
    ) -> Result<HashSet<Fact>, IndexError>;
}

/// Default fragment indexer over guided-rule items
#[derive(Debug, Clone)]
pub struct RuleFragmentIndexer {
    builtin_types: Vec<String>,
}

impl Default for RuleFragmentIndexer {
    fn default() -> Self {
        Self::new(DEFAULT_BUILTIN_TYPES.iter().map(|s| s.to_string()).collect())
    }
}

impl RuleFragmentIndexer {
    pub fn new(builtin_types: Vec<String>) -> Self {
        Self { builtin_types }
    }
}

impl FragmentIndexer for RuleFragmentIndexer {
    fn index(
        &self,
        builder: &mut dyn IndexBuilder,
        fragment: &RuleFragment,
    ) -> Result<HashSet<Fact>, IndexError> {
        // Fragments carry imports only; there is no package to fall back to.
        let resolver = TypeResolver::new(&fragment.imports, "", &self.builtin_types);
        let mut pass = FragmentPass {
            builder,
            resolver,
            fragment,
        };

        for item in &fragment.lhs {
            pass.visit_pattern_item(item);
        }
        for item in &fragment.rhs {
            pass.visit_action(item);
        }

        debug!(
            "Indexed rule fragment ({} conditions, {} actions)",
            fragment.lhs.len(),
            fragment.rhs.len()
        );

        Ok(pass.builder.build())
    }
}

struct FragmentPass<'a, 'b> {
    builder: &'b mut dyn IndexBuilder,
    resolver: TypeResolver<'a>,
    fragment: &'a RuleFragment,
}

impl FragmentPass<'_, '_> {
    fn visit_pattern_item(&mut self, item: &PatternItem) {
        match item {
            PatternItem::Fact(pattern) => self.visit_fact_pattern(pattern),
            PatternItem::Composite(composite) => {
                for nested in &composite.patterns {
                    self.visit_pattern_item(nested);
                }
            }
            PatternItem::FreeForm(_) => {}
        }
    }

    fn visit_fact_pattern(&mut self, pattern: &FactPattern) {
        let owner = self.resolver.resolve(&pattern.fact_type);
        self.builder.add_type(IndexedType::new(owner.clone()));
        for constraint in &pattern.constraints {
            self.visit_constraint(constraint, &owner);
        }
    }

    fn visit_constraint(&mut self, constraint: &FieldConstraint, pattern_type: &str) {
        match constraint {
            FieldConstraint::Single(single) => {
                let owner = match &single.fact_type {
                    Some(fact_type) => self.resolver.resolve(fact_type),
                    None => pattern_type.to_string(),
                };
                self.builder.add_field(TypeField::new(
                    &single.field_name,
                    self.resolver.resolve_field_type(&single.field_type),
                    owner,
                ));
            }
            FieldConstraint::Composite(composite) => {
                for nested in &composite.constraints {
                    self.visit_constraint(nested, pattern_type);
                }
            }
        }
    }

    fn visit_action(&mut self, action: &ActionItem) {
        match action {
            ActionItem::InsertFact(insert) => {
                let owner = self.resolver.resolve(&insert.fact_type);
                self.builder.add_type(IndexedType::new(owner.clone()));
                self.add_field_values(&insert.field_values, &owner);
            }
            ActionItem::SetField(set) => match self.fragment.binding_type(&set.variable) {
                Some(fact_type) => {
                    let owner = self.resolver.resolve(fact_type);
                    self.add_field_values(&set.field_values, &owner);
                }
                None => debug!(
                    "Skipping field assignment on '{}': not bound in this fragment",
                    set.variable
                ),
            },
            ActionItem::Retract(_) | ActionItem::FreeForm(_) => {}
        }
    }

    fn add_field_values(&mut self, values: &[ActionFieldValue], owner: &str) {
        for value in values {
            self.builder.add_field(TypeField::new(
                &value.field,
                self.resolver.resolve_field_type(&value.field_type),
                owner,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DefaultIndexBuilder;

    fn index(fragment: &RuleFragment) -> (DefaultIndexBuilder, HashSet<Fact>) {
        let mut builder = DefaultIndexBuilder::new();
        let facts = RuleFragmentIndexer::default()
            .index(&mut builder, fragment)
            .unwrap();
        (builder, facts)
    }

    #[test]
    fn test_fact_pattern_with_constraints() {
        let pattern = FactPattern::new("Applicant")
            .bound_as("$a")
            .with_constraint(SingleFieldConstraint::new("age", "int"));
        let fragment = RuleFragment::with_conditions(
            vec!["org.mortgages.Applicant".to_string()],
            vec![PatternItem::Fact(pattern)],
        );

        let (_, facts) = index(&fragment);

        let mut expected: HashSet<Fact> = IndexedType::new("org.mortgages.Applicant")
            .facts()
            .into_iter()
            .collect();
        expected.extend(TypeField::new("age", "int", "org.mortgages.Applicant").facts());
        assert_eq!(facts, expected);
    }

    #[test]
    fn test_unresolved_types_stay_unqualified() {
        let fragment = RuleFragment::with_conditions(
            Vec::new(),
            vec![PatternItem::Fact(FactPattern::new("Applicant"))],
        );

        let (_, facts) = index(&fragment);

        assert!(facts.contains(&Fact::new("type_name", "Applicant")));
    }

    #[test]
    fn test_nested_composites() {
        let inner = PatternItem::Fact(FactPattern {
            fact_type: "Bankruptcy".to_string(),
            bound_name: String::new(),
            constraints: vec![FieldConstraint::Composite(CompositeFieldConstraint {
                connective: "||".to_string(),
                constraints: vec![
                    FieldConstraint::Single(SingleFieldConstraint::new("year", "int")),
                    FieldConstraint::Single(SingleFieldConstraint {
                        fact_type: Some("Court".to_string()),
                        ..SingleFieldConstraint::new("name", "String")
                    }),
                ],
            })],
        });
        let not = PatternItem::Composite(CompositePattern {
            operator: CompositeOperator::Not,
            patterns: vec![PatternItem::Composite(CompositePattern {
                operator: CompositeOperator::Or,
                patterns: vec![inner],
            })],
        });
        let fragment = RuleFragment::with_conditions(
            vec!["org.law.Bankruptcy".to_string(), "org.law.Court".to_string()],
            vec![not],
        );

        let (builder, _) = index(&fragment);

        let elements: Vec<_> = builder.elements().cloned().collect();
        assert_eq!(builder.type_count(), 1);
        assert!(elements.contains(&crate::types::IndexElement::Field(TypeField::new(
            "year",
            "int",
            "org.law.Bankruptcy"
        ))));
        assert!(elements.contains(&crate::types::IndexElement::Field(TypeField::new(
            "name",
            "String",
            "org.law.Court"
        ))));
    }

    #[test]
    fn test_insert_fact_action() {
        let insert = ActionItem::InsertFact(ActionInsertFact {
            fact_type: "LoanApproval".to_string(),
            bound_name: String::new(),
            logical: false,
            field_values: vec![ActionFieldValue::new("approved", "Boolean")],
        });
        let fragment = RuleFragment::with_actions(vec!["org.loans.LoanApproval".to_string()], vec![insert]);

        let (builder, facts) = index(&fragment);

        assert_eq!(builder.type_count(), 1);
        assert_eq!(builder.field_count(), 1);
        assert!(facts.contains(&Fact::new(
            "type_name:org.loans.LoanApproval:field_name",
            "approved"
        )));
    }

    #[test]
    fn test_set_field_uses_fragment_binding() {
        let fragment = RuleFragment {
            imports: Vec::new(),
            lhs: vec![PatternItem::Fact(FactPattern::new("org.a.Account").bound_as("$acc"))],
            rhs: vec![ActionItem::SetField(ActionSetField {
                variable: "$acc".to_string(),
                update: true,
                field_values: vec![ActionFieldValue::new("balance", "BigDecimal")],
            })],
        };

        let (builder, _) = index(&fragment);

        assert_eq!(builder.field_count(), 1);
        assert!(builder.elements().any(|e| *e
            == crate::types::IndexElement::Field(TypeField::new(
                "balance",
                "BigDecimal",
                "org.a.Account"
            ))));
    }

    #[test]
    fn test_set_field_without_binding_is_skipped() {
        let fragment = RuleFragment::with_actions(
            Vec::new(),
            vec![ActionItem::SetField(ActionSetField {
                variable: "$outer".to_string(),
                update: false,
                field_values: vec![ActionFieldValue::new("flag", "boolean")],
            })],
        );

        let (builder, facts) = index(&fragment);

        assert!(builder.is_empty());
        assert!(facts.is_empty());
    }

    #[test]
    fn test_empty_variable_binds_nothing() {
        let fragment = RuleFragment {
            imports: Vec::new(),
            lhs: vec![PatternItem::Fact(FactPattern::new("org.a.Unbound"))],
            rhs: vec![ActionItem::SetField(ActionSetField {
                variable: String::new(),
                update: false,
                field_values: vec![ActionFieldValue::new("x", "int")],
            })],
        };

        let (builder, facts) = index(&fragment);

        assert_eq!(fragment.binding_type(""), None);
        assert_eq!(builder.field_count(), 0);
        assert!(!facts.contains(&Fact::new("type_name:org.a.Unbound:field_name", "x")));
    }

    #[test]
    fn test_free_form_and_retract_ignored() {
        let fragment = RuleFragment {
            imports: Vec::new(),
            lhs: vec![PatternItem::FreeForm(FreeFormLine {
                text: "eval(true)".to_string(),
            })],
            rhs: vec![ActionItem::Retract(ActionRetract {
                variable: "$a".to_string(),
            })],
        };

        let (builder, _) = index(&fragment);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_binding_found_inside_composite() {
        let fragment = RuleFragment::with_conditions(
            Vec::new(),
            vec![PatternItem::Composite(CompositePattern {
                operator: CompositeOperator::Exists,
                patterns: vec![PatternItem::Fact(FactPattern::new("Claim").bound_as("$c"))],
            })],
        );

        assert_eq!(fragment.binding_type("$c"), Some("Claim"));
        assert_eq!(fragment.binding_type("$x"), None);
    }

    #[test]
    fn test_items_deserialize_from_json() {
        let json = r#"[
            { "kind": "fact", "factType": "Person", "boundName": "$p",
              "constraints": [{ "kind": "single", "fieldName": "age", "fieldType": "int" }] },
            { "kind": "composite", "operator": "not", "patterns": [{ "kind": "fact", "factType": "Debt" }] },
            { "kind": "freeForm", "text": "eval(true)" }
        ]"#;

        let items: Vec<PatternItem> = serde_json::from_str(json).unwrap();

        assert_eq!(items.len(), 3);
        assert!(matches!(&items[1], PatternItem::Composite(c) if c.operator == CompositeOperator::Not));
    }
}
