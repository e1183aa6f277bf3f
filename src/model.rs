//! Decision table model
//!
//! Patterns and condition columns live in arenas owned by the table. The
//! column to owning-pattern relation is an explicit map kept by the table,
//! so the owner of a column is always looked up rather than cached.

use crate::error::ModelError;
use crate::fragment::{ActionItem, PatternItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Identity of a pattern within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatternId(usize);

/// Identity of a condition column within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnId(usize);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Rule attribute column (salience, agenda-group, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeColumn {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<CellValue>,
}

impl AttributeColumn {
    pub fn new(attribute: impl Into<String>, default_value: Option<CellValue>) -> Self {
        Self {
            attribute: attribute.into(),
            default_value,
        }
    }

    /// Default value rendered as text; empty when the column has none
    pub fn default_value_as_string(&self) -> String {
        self.default_value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// A declared fact pattern that condition columns constrain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub fact_type: String,
    pub bound_name: String,
    pub negated: bool,
    columns: Vec<ColumnId>,
}

impl Pattern {
    pub fn new(fact_type: impl Into<String>, bound_name: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            bound_name: bound_name.into(),
            negated: false,
            columns: Vec::new(),
        }
    }

    /// Child condition columns, in column order
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }
}

/// A condition on one field of the owning pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionColumn {
    #[serde(default)]
    pub header: String,
    pub fact_field: String,
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl ConditionColumn {
    pub fn new(fact_field: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            header: String::new(),
            fact_field: fact_field.into(),
            field_type: field_type.into(),
            operator: None,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Name used to identify the column in diagnostics
    pub fn label(&self) -> &str {
        if self.header.is_empty() {
            &self.fact_field
        } else {
            &self.header
        }
    }
}

/// Condition column holding an embedded list of rule patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrlConditionColumn {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub definition: Vec<PatternItem>,
}

/// Action column holding an embedded list of rule actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrlActionColumn {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub definition: Vec<ActionItem>,
}

/// Top-level entry of the table's condition section
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionEntry {
    Pattern(PatternId),
    Brl(BrlConditionColumn),
}

/// Action inserting a new fact and setting one of its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInsertFactColumn {
    #[serde(default)]
    pub header: String,
    pub fact_type: String,
    #[serde(default)]
    pub bound_name: String,
    pub fact_field: String,
    pub field_type: String,
    #[serde(default)]
    pub logical: bool,
}

/// Action setting a field on a fact bound by a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSetFieldColumn {
    #[serde(default)]
    pub header: String,
    pub bound_name: String,
    pub fact_field: String,
    pub field_type: String,
    #[serde(default)]
    pub update: bool,
}

impl ActionSetFieldColumn {
    /// Name used to identify the column in diagnostics
    pub fn label(&self) -> &str {
        if self.header.is_empty() {
            &self.fact_field
        } else {
            &self.header
        }
    }
}

/// Action retracting a bound fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRetractFactColumn {
    #[serde(default)]
    pub header: String,
    pub bound_name: String,
}

/// Every kind of action column a table may hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionColumn {
    InsertFact(ActionInsertFactColumn),
    SetField(ActionSetFieldColumn),
    Brl(BrlActionColumn),
    Retract(ActionRetractFactColumn),
}

/// A guided decision table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionTable {
    pub table_name: String,
    pub package_name: String,
    pub imports: Vec<String>,
    pub attribute_columns: Vec<AttributeColumn>,
    pub action_columns: Vec<ActionColumn>,
    conditions: Vec<ConditionEntry>,
    patterns: Vec<Pattern>,
    condition_columns: Vec<ConditionColumn>,
    owners: HashMap<ColumnId, PatternId>,
}

impl DecisionTable {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    pub fn add_import(&mut self, import: impl Into<String>) {
        self.imports.push(import.into());
    }

    pub fn add_attribute(&mut self, column: AttributeColumn) {
        self.attribute_columns.push(column);
    }

    pub fn add_action(&mut self, column: ActionColumn) {
        self.action_columns.push(column);
    }

    /// Add a pattern at the end of the condition section
    pub fn add_pattern(&mut self, pattern: Pattern) -> PatternId {
        let id = PatternId(self.patterns.len());
        self.patterns.push(Pattern {
            columns: Vec::new(),
            ..pattern
        });
        self.conditions.push(ConditionEntry::Pattern(id));
        id
    }

    /// Add a condition column owned by `pattern`
    pub fn add_condition(
        &mut self,
        pattern: PatternId,
        column: ConditionColumn,
    ) -> Result<ColumnId, ModelError> {
        let owner = self
            .patterns
            .get_mut(pattern.0)
            .ok_or(ModelError::UnknownPattern(pattern))?;

        let id = ColumnId(self.condition_columns.len());
        self.condition_columns.push(column);
        owner.columns.push(id);
        self.owners.insert(id, pattern);
        Ok(id)
    }

    /// Add a BRL condition column at the end of the condition section
    pub fn add_brl_condition(&mut self, column: BrlConditionColumn) {
        self.conditions.push(ConditionEntry::Brl(column));
    }

    /// Re-home a condition column onto another pattern
    pub fn move_condition(&mut self, column: ColumnId, to: PatternId) -> Result<(), ModelError> {
        if to.0 >= self.patterns.len() {
            return Err(ModelError::UnknownPattern(to));
        }
        let from = self
            .owners
            .get(&column)
            .copied()
            .ok_or(ModelError::UnknownColumn(column))?;

        self.patterns[from.0].columns.retain(|c| *c != column);
        self.patterns[to.0].columns.push(column);
        self.owners.insert(column, to);
        Ok(())
    }

    pub fn conditions(&self) -> &[ConditionEntry] {
        &self.conditions
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn condition(&self, id: ColumnId) -> Option<&ConditionColumn> {
        self.condition_columns.get(id.0)
    }

    /// Pattern currently owning a condition column
    pub fn pattern_of(&self, column: ColumnId) -> Option<&Pattern> {
        let owner = self.owners.get(&column)?;
        self.patterns.get(owner.0)
    }

    /// Pattern bound to `bound_name` in the condition section. An empty name
    /// binds nothing.
    pub fn condition_pattern(&self, bound_name: &str) -> Option<&Pattern> {
        if bound_name.is_empty() {
            return None;
        }
        self.patterns.iter().find(|p| p.bound_name == bound_name)
    }

    pub fn condition_column_count(&self) -> usize {
        self.condition_columns.len()
    }

    /// Parse a table from its JSON document form
    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        let document: TableDocument = serde_json::from_str(source)?;
        Ok(document.into())
    }

    /// Load a table from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let source = fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    #[cfg(test)]
    pub(crate) fn forget_owner(&mut self, column: ColumnId) {
        self.owners.remove(&column);
    }

    #[cfg(test)]
    pub(crate) fn push_pattern_entry(&mut self, index: usize) -> PatternId {
        let id = PatternId(index);
        self.conditions.push(ConditionEntry::Pattern(id));
        id
    }
}

/// Serialized table layout, with condition columns nested under patterns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableDocument {
    pub table_name: String,
    pub package_name: String,
    pub imports: Vec<String>,
    pub attribute_columns: Vec<AttributeColumn>,
    pub conditions: Vec<ConditionDocument>,
    pub action_columns: Vec<ActionColumn>,
}

/// Serialized condition section entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConditionDocument {
    Pattern(PatternDocument),
    Brl(BrlConditionColumn),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDocument {
    pub fact_type: String,
    #[serde(default)]
    pub bound_name: String,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub columns: Vec<ConditionColumn>,
}

impl From<TableDocument> for DecisionTable {
    fn from(document: TableDocument) -> Self {
        let mut table = DecisionTable {
            table_name: document.table_name,
            package_name: document.package_name,
            imports: document.imports,
            attribute_columns: document.attribute_columns,
            action_columns: document.action_columns,
            ..DecisionTable::default()
        };

        for entry in document.conditions {
            match entry {
                ConditionDocument::Pattern(p) => {
                    let mut pattern = Pattern::new(p.fact_type, p.bound_name);
                    pattern.negated = p.negated;
                    let id = table.add_pattern(pattern);
                    for column in p.columns {
                        let col_id = ColumnId(table.condition_columns.len());
                        table.condition_columns.push(column);
                        table.patterns[id.0].columns.push(col_id);
                        table.owners.insert(col_id, id);
                    }
                }
                ConditionDocument::Brl(column) => table.add_brl_condition(column),
            }
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> (DecisionTable, PatternId, PatternId) {
        let mut table = DecisionTable::new("com.acme");
        let person = table.add_pattern(Pattern::new("Person", "$p"));
        let order = table.add_pattern(Pattern::new("Order", "$o"));
        (table, person, order)
    }

    #[test]
    fn test_add_condition_records_owner() {
        let (mut table, person, _) = sample_table();
        let age = table
            .add_condition(person, ConditionColumn::new("age", "int"))
            .unwrap();

        assert_eq!(table.pattern_of(age).unwrap().fact_type, "Person");
        assert_eq!(table.pattern(person).unwrap().columns(), &[age]);
    }

    #[test]
    fn test_add_condition_to_unknown_pattern() {
        let (mut table, _, _) = sample_table();
        let result = table.add_condition(PatternId(9), ConditionColumn::new("age", "int"));

        assert!(matches!(result, Err(ModelError::UnknownPattern(_))));
        assert_eq!(table.condition_column_count(), 0);
    }

    #[test]
    fn test_move_condition_updates_owner() {
        let (mut table, person, order) = sample_table();
        let col = table
            .add_condition(person, ConditionColumn::new("total", "double"))
            .unwrap();

        table.move_condition(col, order).unwrap();

        assert_eq!(table.pattern_of(col).unwrap().fact_type, "Order");
        assert!(table.pattern(person).unwrap().columns().is_empty());
        assert_eq!(table.pattern(order).unwrap().columns(), &[col]);
    }

    #[test]
    fn test_condition_pattern_by_bound_name() {
        let (table, _, _) = sample_table();

        assert_eq!(table.condition_pattern("$o").unwrap().fact_type, "Order");
        assert!(table.condition_pattern("$missing").is_none());
    }

    #[test]
    fn test_empty_bound_name_binds_nothing() {
        let mut table = DecisionTable::new("com.acme");
        table.add_pattern(Pattern::new("Person", ""));

        assert!(table.condition_pattern("").is_none());
    }

    #[test]
    fn test_default_value_as_string() {
        let text = AttributeColumn::new("agenda-group", Some(CellValue::Text("main".into())));
        let number = AttributeColumn::new("salience", Some(CellValue::Number(serde_json::Number::from(10i64))));
        let flag = AttributeColumn::new("no-loop", Some(CellValue::Boolean(true)));
        let empty = AttributeColumn::new("enabled", None);

        assert_eq!(text.default_value_as_string(), "main");
        assert_eq!(number.default_value_as_string(), "10");
        assert_eq!(flag.default_value_as_string(), "true");
        assert_eq!(empty.default_value_as_string(), "");
    }

    #[test]
    fn test_from_json_nested_patterns() {
        let source = r#"{
            "tableName": "Discounts",
            "packageName": "com.acme",
            "imports": ["org.model.Customer"],
            "attributeColumns": [{ "attribute": "salience", "defaultValue": 10 }],
            "conditions": [
                {
                    "kind": "pattern",
                    "factType": "Customer",
                    "boundName": "$c",
                    "columns": [
                        { "header": "Age", "factField": "age", "fieldType": "int", "operator": ">" }
                    ]
                },
                { "kind": "brl", "header": "Free form", "definition": [] }
            ],
            "actionColumns": [
                { "kind": "setField", "boundName": "$c", "factField": "discount", "fieldType": "double" }
            ]
        }"#;

        let table = DecisionTable::from_json(source).unwrap();

        assert_eq!(table.table_name, "Discounts");
        assert_eq!(table.conditions().len(), 2);
        let customer = table.condition_pattern("$c").unwrap();
        let column = customer.columns()[0];
        assert_eq!(table.condition(column).unwrap().label(), "Age");
        assert_eq!(table.pattern_of(column).unwrap().fact_type, "Customer");
        assert_eq!(table.action_columns.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_unknown_action_kind() {
        let source = r#"{ "actionColumns": [{ "kind": "workItem" }] }"#;
        assert!(matches!(
            DecisionTable::from_json(source),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn test_condition_label_falls_back_to_field() {
        let column = ConditionColumn::new("age", "int");
        assert_eq!(column.label(), "age");
        assert_eq!(column.with_header("Age").label(), "Age");
    }
}
