//! # dtable-index
//!
//! Index extraction for guided decision tables.
//!
//! Walks a decision table's attribute, condition and action columns and
//! extracts the facts a project-wide search/refactoring index needs: which
//! types are used, which fields of those types are referenced, and which rule
//! attributes are set. Unqualified type names are resolved against the
//! table's imports and package. BRL columns embed free-form rule fragments
//! and are handed to a fragment indexer that shares the same sink.
//!
//! ## Example
//!
//! ```
//! use dtable_index::{
//!     ConditionColumn, DecisionTable, DecisionTableIndexer, DefaultIndexBuilder, Fact, Pattern,
//!     TypeField,
//! };
//!
//! let mut table = DecisionTable::new("com.acme");
//! let person = table.add_pattern(Pattern::new("Person", "$p"));
//! table.add_condition(person, ConditionColumn::new("age", "int")).unwrap();
//!
//! let mut builder = DefaultIndexBuilder::new();
//! let facts = DecisionTableIndexer::new(&table).index(&mut builder).unwrap();
//!
//! assert!(facts.contains(&Fact::new("type_name", "com.acme.Person")));
//! for fact in TypeField::new("age", "int", "com.acme.Person").facts() {
//!     assert!(facts.contains(&fact));
//! }
//! ```

pub mod batch;
pub mod config;
mod error;
mod extractor;
pub mod fragment;
mod index;
mod model;
mod resolver;
mod types;

pub use batch::{AssetIndex, BatchError, BatchIndexer, BatchReport};
pub use config::{Config, ConfigError, ErrorPolicy};
pub use error::{IndexError, ModelError};
pub use extractor::{DecisionTableIndexer, IndexReport};
pub use fragment::{FragmentIndexer, RuleFragment, RuleFragmentIndexer};
pub use index::{DefaultIndexBuilder, IndexBuilder};
pub use model::{
    ActionColumn, ActionInsertFactColumn, ActionRetractFactColumn, ActionSetFieldColumn,
    AttributeColumn, BrlActionColumn, BrlConditionColumn, CellValue, ColumnId, ConditionColumn,
    ConditionDocument, ConditionEntry, DecisionTable, Pattern, PatternDocument, PatternId,
    TableDocument,
};
pub use resolver::{resolve_type_name, TypeResolver, DEFAULT_BUILTIN_TYPES};
pub use types::{Fact, IndexElement, IndexedType, RuleAttribute, TypeField};
