//! Extract index facts from a decision table
//!
//! The table is walked once, in column order: attribute columns, then the
//! condition section (patterns with their condition columns, and BRL
//! condition columns), then action columns. Every discovered element goes to
//! the sink; BRL columns are delegated to a [`FragmentIndexer`] sharing that
//! sink. The returned set is the union of the fragment results and the sink's
//! final `build()`.

use crate::config::{Config, ErrorPolicy};
use crate::error::IndexError;
use crate::fragment::{FragmentIndexer, RuleFragment, RuleFragmentIndexer};
use crate::index::IndexBuilder;
use crate::model::{
    ActionColumn, ActionInsertFactColumn, ActionSetFieldColumn, BrlActionColumn,
    BrlConditionColumn, ColumnId, ConditionEntry, DecisionTable, PatternId,
};
use crate::resolver::{TypeResolver, DEFAULT_BUILTIN_TYPES};
use crate::types::{Fact, IndexedType, RuleAttribute, TypeField};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Facts produced for one table, plus the columns skipped on the way
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub facts: HashSet<Fact>,
    #[serde(serialize_with = "serialize_errors")]
    pub skipped: Vec<IndexError>,
}

fn serialize_errors<S: serde::Serializer>(
    errors: &[IndexError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

/// Indexer bound to one decision table
#[derive(Debug, Clone)]
pub struct DecisionTableIndexer<'a, F = RuleFragmentIndexer> {
    table: &'a DecisionTable,
    fragments: F,
    builtin_types: Vec<String>,
    on_error: ErrorPolicy,
}

impl<'a> DecisionTableIndexer<'a> {
    pub fn new(table: &'a DecisionTable) -> Self {
        let builtin_types: Vec<String> =
            DEFAULT_BUILTIN_TYPES.iter().map(|s| s.to_string()).collect();
        Self {
            table,
            fragments: RuleFragmentIndexer::new(builtin_types.clone()),
            builtin_types,
            on_error: ErrorPolicy::default(),
        }
    }

    /// Indexer using the resolver and column settings of `config`
    pub fn from_config(table: &'a DecisionTable, config: &Config) -> Self {
        Self {
            table,
            fragments: RuleFragmentIndexer::new(config.resolver.builtin_types.clone()),
            builtin_types: config.resolver.builtin_types.clone(),
            on_error: config.columns.on_error,
        }
    }
}

impl<'a, F: FragmentIndexer> DecisionTableIndexer<'a, F> {
    /// Replace the indexer used for BRL columns
    pub fn with_fragment_indexer<G: FragmentIndexer>(self, fragments: G) -> DecisionTableIndexer<'a, G> {
        DecisionTableIndexer {
            table: self.table,
            fragments,
            builtin_types: self.builtin_types,
            on_error: self.on_error,
        }
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    /// Index the table into `builder` and return every fact found.
    ///
    /// Under [`ErrorPolicy::Skip`] the skipped columns are only logged here;
    /// use [`index_report`](Self::index_report) to get them back.
    pub fn index(&self, builder: &mut dyn IndexBuilder) -> Result<HashSet<Fact>, IndexError> {
        let report = self.index_report(builder)?;
        if !report.skipped.is_empty() {
            warn!(
                "Skipped {} column(s) in '{}'",
                report.skipped.len(),
                self.table.table_name
            );
        }
        Ok(report.facts)
    }

    /// Like [`index`](Self::index), also reporting columns skipped under
    /// [`ErrorPolicy::Skip`]
    pub fn index_report(&self, builder: &mut dyn IndexBuilder) -> Result<IndexReport, IndexError> {
        let table = self.table;
        debug!(
            "Indexing decision table '{}' ({} attribute, {} condition, {} action columns)",
            table.table_name,
            table.attribute_columns.len(),
            table.condition_column_count(),
            table.action_columns.len()
        );

        let mut pass = TablePass {
            table,
            fragments: &self.fragments,
            resolver: TypeResolver::new(&table.imports, &table.package_name, &self.builtin_types),
            on_error: self.on_error,
            builder,
            report: IndexReport::default(),
        };

        pass.visit_table()?;

        let TablePass {
            builder,
            mut report,
            ..
        } = pass;
        report.facts.extend(builder.build());
        Ok(report)
    }
}

struct TablePass<'a, 'b, F> {
    table: &'a DecisionTable,
    fragments: &'a F,
    resolver: TypeResolver<'a>,
    on_error: ErrorPolicy,
    builder: &'b mut dyn IndexBuilder,
    report: IndexReport,
}

impl<F: FragmentIndexer> TablePass<'_, '_, F> {
    fn visit_table(&mut self) -> Result<(), IndexError> {
        let table = self.table;

        for column in &table.attribute_columns {
            self.builder.add_rule_attribute(RuleAttribute::new(
                &column.attribute,
                column.default_value_as_string(),
            ));
        }

        for entry in table.conditions() {
            match entry {
                ConditionEntry::Pattern(id) => {
                    let result = self.visit_pattern(*id);
                    self.guard(result)?;
                }
                ConditionEntry::Brl(column) => {
                    let result = self.visit_brl_condition(column);
                    self.guard(result)?;
                }
            }
        }

        for column in &table.action_columns {
            let result = match column {
                ActionColumn::InsertFact(insert) => {
                    self.visit_insert_fact(insert);
                    Ok(())
                }
                ActionColumn::SetField(set) => self.visit_set_field(set),
                ActionColumn::Brl(brl) => self.visit_brl_action(brl),
                ActionColumn::Retract(_) => Ok(()),
            };
            self.guard(result)?;
        }

        Ok(())
    }

    /// Apply the column error policy to one column's outcome
    fn guard(&mut self, result: Result<(), IndexError>) -> Result<(), IndexError> {
        match (result, self.on_error) {
            (Ok(()), _) => Ok(()),
            (Err(e), ErrorPolicy::Abort) => Err(e),
            (Err(e), ErrorPolicy::Skip) => {
                warn!("Skipping column in '{}': {}", self.table.table_name, e);
                self.report.skipped.push(e);
                Ok(())
            }
        }
    }

    fn visit_pattern(&mut self, id: PatternId) -> Result<(), IndexError> {
        let table = self.table;
        let pattern = table
            .pattern(id)
            .ok_or(IndexError::UnknownPattern { pattern: id })?;

        self.builder
            .add_type(IndexedType::new(self.resolver.resolve(&pattern.fact_type)));

        for column in pattern.columns() {
            let result = self.visit_condition(*column);
            self.guard(result)?;
        }
        Ok(())
    }

    fn visit_condition(&mut self, id: ColumnId) -> Result<(), IndexError> {
        let table = self.table;
        let column = table.condition(id).ok_or_else(|| IndexError::UnboundCondition {
            column: id,
            label: id.to_string(),
        })?;
        // The owner is looked up again rather than taken from the pattern
        // being walked, so a moved column reports its current pattern.
        let owner = table
            .pattern_of(id)
            .ok_or_else(|| IndexError::UnboundCondition {
                column: id,
                label: column.label().to_string(),
            })?;

        self.builder.add_field(TypeField::new(
            &column.fact_field,
            self.resolver.resolve_field_type(&column.field_type),
            self.resolver.resolve(&owner.fact_type),
        ));
        Ok(())
    }

    fn visit_brl_condition(&mut self, column: &BrlConditionColumn) -> Result<(), IndexError> {
        let fragment =
            RuleFragment::with_conditions(self.table.imports.clone(), column.definition.clone());
        self.delegate(&fragment)
    }

    fn visit_brl_action(&mut self, column: &BrlActionColumn) -> Result<(), IndexError> {
        let fragment =
            RuleFragment::with_actions(self.table.imports.clone(), column.definition.clone());
        self.delegate(&fragment)
    }

    fn delegate(&mut self, fragment: &RuleFragment) -> Result<(), IndexError> {
        let facts = self.fragments.index(&mut *self.builder, fragment)?;
        self.report.facts.extend(facts);
        Ok(())
    }

    fn visit_insert_fact(&mut self, column: &ActionInsertFactColumn) {
        let fact_type = self.resolver.resolve(&column.fact_type);
        self.builder.add_type(IndexedType::new(fact_type.clone()));
        self.builder.add_field(TypeField::new(
            &column.fact_field,
            self.resolver.resolve_field_type(&column.field_type),
            fact_type,
        ));
    }

    fn visit_set_field(&mut self, column: &ActionSetFieldColumn) -> Result<(), IndexError> {
        let pattern = self
            .table
            .condition_pattern(&column.bound_name)
            .ok_or_else(|| IndexError::UnboundAction {
                column: column.label().to_string(),
                bound_name: column.bound_name.clone(),
            })?;

        self.builder.add_field(TypeField::new(
            &column.fact_field,
            self.resolver.resolve_field_type(&column.field_type),
            self.resolver.resolve(&pattern.fact_type),
        ));
        Ok(())
    }
}
